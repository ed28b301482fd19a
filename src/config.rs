//! # Configuration
//!
//! Tunable policy for the hint engine, read from a TOML file. Every field has
//! a default, so an empty file (or no file at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the weight of a derivation edge is computed for shortest paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Weighting {
    /// `1 / popularity` of the edge itself.
    #[default]
    EdgePopularity,

    /// `1 / popularity` of the answer the edge leads to.
    NodePopularity,

    /// The edit distance stored on the edge.
    EditDistance,
}

impl std::str::FromStr for Weighting {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(&format!("\"{}\"", s))
    }
}

/// Which node matcher feeds the edit-script builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum MatcherKind {
    #[default]
    Distance,
    Isomorphism,
}

impl std::str::FromStr for MatcherKind {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(&format!("\"{}\"", s))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub weighting: Weighting,

    /// Weight of an edge (or answer) nobody has taken yet. Larger than any
    /// `1 / popularity`, so fresh edges are disfavored but still usable.
    pub zero_popularity_weight: f64,

    pub matcher: MatcherKind,

    /// Minimum Dice coefficient for the isomorphism matcher.
    pub similarity_threshold: f64,

    /// Stop the sequential bridge scan at the first candidate at distance 1.
    /// The parallel scan measures every candidate. Both settle on the first
    /// candidate (most popular first) at the smallest distance, so this only
    /// changes how much work the sequential scan does.
    pub bridge_early_exit: bool,

    /// Compute independent distances and scripts on the rayon pool.
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weighting: Weighting::default(),
            zero_popularity_weight: 1.5,
            matcher: MatcherKind::default(),
            similarity_threshold: 0.5,
            bridge_early_exit: true,
            parallel: true,
        }
    }
}

impl Config {
    pub fn from_toml(src: &str) -> Result<Self, String> {
        toml::from_str(src).map_err(|e| e.to_string())
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let src = std::fs::read_to_string(path)
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        Self::from_toml(&src)
    }

    /// Weight for something observed `popularity` times.
    pub fn popularity_weight(&self, popularity: usize) -> f64 {
        if popularity == 0 {
            self.zero_popularity_weight
        } else {
            1.0 / popularity as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_file() {
        let config = Config::from_toml(
            "weighting = \"NodePopularity\"\nzero_popularity_weight = 3.0\n",
        )
        .unwrap();
        assert_eq!(config.weighting, Weighting::NodePopularity);
        assert_eq!(config.popularity_weight(0), 3.0);
        assert_eq!(config.popularity_weight(4), 0.25);
        assert_eq!(config.matcher, MatcherKind::Distance);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("weight = 1").is_err());
    }

    #[test]
    fn enums_parse_from_cli_text() {
        assert_eq!("EditDistance".parse::<Weighting>().unwrap(), Weighting::EditDistance);
        assert_eq!("Isomorphism".parse::<MatcherKind>().unwrap(), MatcherKind::Isomorphism);
        assert!("Fastest".parse::<MatcherKind>().is_err());
    }
}
