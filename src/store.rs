//! # Corpus persistence
//!
//! A corpus is loaded once per exercise and saved after every mutation. The
//! engine only sees the [`Store`] trait; the two implementations here keep
//! corpora in memory or as one JSON file per exercise.

use crate::corpus::Corpus;
use crate::engine::ExerciseKey;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug)]
pub enum StoreError {
    Io(String),
    Serde(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(msg) => write!(f, "store I/O error: {}", msg),
            StoreError::Serde(msg) => write!(f, "malformed corpus: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

pub trait Store: Send + Sync {
    /// The stored corpus for an exercise, if any.
    fn load(&self, key: &ExerciseKey) -> Result<Option<Corpus>, StoreError>;

    fn save(&self, key: &ExerciseKey, corpus: &Corpus) -> Result<(), StoreError>;
}

////////////////////////////////////////////////////////////////////////////////
// In memory

#[derive(Debug, Default)]
pub struct MemoryStore {
    corpora: Mutex<HashMap<ExerciseKey, Corpus>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn load(&self, key: &ExerciseKey) -> Result<Option<Corpus>, StoreError> {
        let corpora = self.corpora.lock().unwrap_or_else(|e| e.into_inner());
        Ok(corpora.get(key).cloned())
    }

    fn save(&self, key: &ExerciseKey, corpus: &Corpus) -> Result<(), StoreError> {
        let mut corpora = self.corpora.lock().unwrap_or_else(|e| e.into_inner());
        corpora.insert(key.clone(), corpus.clone());
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// JSON files

/// One `<challenge>__<predicate>.json` file per exercise in a directory.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, key: &ExerciseKey) -> PathBuf {
        let sanitize = |s: &str| -> String {
            s.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect()
        };
        self.dir.join(format!(
            "{}__{}.json",
            sanitize(&key.challenge),
            sanitize(&key.predicate)
        ))
    }
}

impl Store for JsonStore {
    fn load(&self, key: &ExerciseKey) -> Result<Option<Corpus>, StoreError> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let src = std::fs::read_to_string(&path)
            .map_err(|e| StoreError::Io(format!("{}: {}", path.display(), e)))?;
        let corpus: Corpus = serde_json::from_str(&src)
            .map_err(|e| StoreError::Serde(format!("{}: {}", path.display(), e)))?;
        log::info!(
            "loaded {} answer(s) for {} from {}",
            corpus.statistics().answers,
            key,
            path.display()
        );
        Ok(Some(corpus))
    }

    fn save(&self, key: &ExerciseKey, corpus: &Corpus) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::Io(format!("{}: {}", self.dir.display(), e)))?;
        let path = self.path(key);
        let json = serde_json::to_string_pretty(corpus)
            .map_err(|e| StoreError::Serde(e.to_string()))?;
        std::fs::write(&path, json)
            .map_err(|e| StoreError::Io(format!("{}: {}", path.display(), e)))?;
        log::info!("saved corpus for {} to {}", key, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    fn key() -> ExerciseKey {
        ExerciseKey::new("trash", "inv1")
    }

    fn corpus() -> Corpus {
        let mut c = Corpus::new("sig File {}");
        let tree = Tree::root(vec!["{no{sig/File}}".parse().unwrap()]);
        c.add_answer("no File", "", tree, true);
        c
    }

    #[test]
    fn memory_store() {
        let store = MemoryStore::new();
        assert!(store.load(&key()).unwrap().is_none());
        store.save(&key(), &corpus()).unwrap();
        let back = store.load(&key()).unwrap().unwrap();
        assert_eq!(back.statistics().correct, 1);
    }

    #[test]
    fn json_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("corpora"));
        assert!(store.load(&key()).unwrap().is_none());
        store.save(&key(), &corpus()).unwrap();
        assert!(store.path(&key()).ends_with("trash__inv1.json"));
        let back = store.load(&key()).unwrap().unwrap();
        assert_eq!(back.model(), "sig File {}");
        assert_eq!(back.statistics().answers, 1);
    }

    #[test]
    fn malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        std::fs::write(store.path(&key()), "{ nope").unwrap();
        assert!(matches!(store.load(&key()), Err(StoreError::Serde(_))));
    }
}
