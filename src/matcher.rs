//! # Node matchers
//!
//! The edit-script builder accepts any one-to-one node alignment. This module
//! provides the two strategies used in practice: the optimal alignment
//! recovered from the tree edit distance, and a GumTree-style matcher that
//! looks for isomorphic subtrees first and similar parents second.

use crate::config::{Config, MatcherKind};
use crate::ted::{self, Alignment};
use crate::tree::{PostOrder, Tree};

use std::collections::HashMap;

/// A strategy for aligning the nodes of two trees.
pub trait TreeMatcher: Send + Sync {
    fn align(&self, t1: &Tree, t2: &Tree) -> Alignment;
}

/// The matcher selected by a configuration.
pub fn from_config(config: &Config) -> Box<dyn TreeMatcher> {
    match config.matcher {
        MatcherKind::Distance => Box::new(DistanceMatcher),
        MatcherKind::Isomorphism => Box::new(IsomorphismMatcher {
            similarity_threshold: config.similarity_threshold,
            min_height: 1,
        }),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Distance matcher

/// Aligns nodes along an optimal tree edit sequence.
#[derive(Debug, Clone, Default)]
pub struct DistanceMatcher;

impl TreeMatcher for DistanceMatcher {
    fn align(&self, t1: &Tree, t2: &Tree) -> Alignment {
        ted::compute_distance(t1, t2).1
    }
}

////////////////////////////////////////////////////////////////////////////////
// Isomorphism matcher

/// Matches identical subtrees top-down, then internal nodes bottom-up by the
/// Dice coefficient of their matched descendants.
#[derive(Debug, Clone)]
pub struct IsomorphismMatcher {
    /// Minimum Dice coefficient for a bottom-up match.
    pub similarity_threshold: f64,

    /// Subtrees lower than this are left to the bottom-up phase.
    pub min_height: usize,
}

impl Default for IsomorphismMatcher {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            min_height: 1,
        }
    }
}

fn match_subtrees(
    a: &PostOrder,
    b: &PostOrder,
    i: usize,
    j: usize,
    alignment: &mut Alignment,
) {
    if alignment.contains_a(i) || alignment.contains_b(j) {
        return;
    }
    alignment.add(i, j);
    for (&ci, &cj) in a.children(i).iter().zip(b.children(j)) {
        match_subtrees(a, b, ci, cj, alignment);
    }
}

impl IsomorphismMatcher {
    fn top_down(&self, a: &PostOrder, b: &PostOrder, alignment: &mut Alignment) {
        let mut b_by_tree: HashMap<&Tree, Vec<usize>> = HashMap::new();
        for j in b.pre_order() {
            b_by_tree.entry(b.node(j)).or_default().push(j);
        }

        let mut candidates: Vec<usize> = a
            .pre_order()
            .into_iter()
            .filter(|&i| a.node(i).height() >= self.min_height)
            .collect();
        // Tallest first; the sort is stable so ties stay in pre-order.
        candidates.sort_by_key(|&i| std::cmp::Reverse(a.node(i).height()));

        for i in candidates {
            if alignment.contains_a(i) {
                continue;
            }
            let Some(js) = b_by_tree.get(a.node(i)) else {
                continue;
            };
            if let Some(&j) = js.iter().find(|&&j| !alignment.contains_b(j)) {
                log::trace!("top-down: {} ~ {}", a.label(i), b.label(j));
                match_subtrees(a, b, i, j, alignment);
            }
        }
    }

    fn dice(
        &self,
        a: &PostOrder,
        b: &PostOrder,
        i: usize,
        j: usize,
        alignment: &Alignment,
    ) -> f64 {
        let below_i = a.subtree(i).count() - 1;
        let below_j = b.subtree(j).count() - 1;
        if below_i + below_j == 0 {
            return 0.0;
        }
        let common = a
            .subtree(i)
            .filter(|&d| d != i)
            .filter_map(|d| alignment.get_b(d))
            .filter(|&e| e != j && b.is_descendant(e, j))
            .count();
        2.0 * common as f64 / (below_i + below_j) as f64
    }

    fn bottom_up(&self, a: &PostOrder, b: &PostOrder, alignment: &mut Alignment) {
        // Internal nodes, children before parents
        for i in 1..=a.len() {
            if alignment.contains_a(i) || a.children(i).is_empty() {
                continue;
            }
            let mut best: Option<(usize, f64)> = None;
            for j in 1..=b.len() {
                if alignment.contains_b(j) || b.label(j) != a.label(i) {
                    continue;
                }
                let score = self.dice(a, b, i, j, alignment);
                if score >= self.similarity_threshold
                    && best.map_or(true, |(_, s)| score > s)
                {
                    best = Some((j, score));
                }
            }
            if let Some((j, score)) = best {
                log::trace!("bottom-up: {} ~ {} ({:.2})", a.label(i), b.label(j), score);
                alignment.add(i, j);
            }
        }

        if !alignment.contains_a(a.root())
            && !alignment.contains_b(b.root())
            && a.label(a.root()) == b.label(b.root())
        {
            alignment.add(a.root(), b.root());
        }

        // Remaining nodes under matched parents, by label in sibling order
        for i in a.pre_order() {
            if alignment.contains_a(i) {
                continue;
            }
            let Some(pj) = a.parent(i).and_then(|p| alignment.get_b(p)) else {
                continue;
            };
            if let Some(&j) = b
                .children(pj)
                .iter()
                .find(|&&j| !alignment.contains_b(j) && b.label(j) == a.label(i))
            {
                alignment.add(i, j);
            }
        }
    }
}

impl TreeMatcher for IsomorphismMatcher {
    fn align(&self, t1: &Tree, t2: &Tree) -> Alignment {
        let a = PostOrder::new(t1);
        let b = PostOrder::new(t2);
        let mut alignment = Alignment::new(a.len(), b.len());
        self.top_down(&a, &b, &mut alignment);
        self.bottom_up(&a, &b, &mut alignment);
        log::debug!(
            "isomorphism matcher aligned {} of {}/{} nodes",
            alignment.len(),
            a.len(),
            b.len()
        );
        alignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Tree {
        s.parse().unwrap()
    }

    #[test]
    fn identical_subtrees_are_matched_whole() {
        let t1 = t("{root{no{sig/Trash}}}");
        let t2 = t("{root{and{no{sig/Protected}}{no{sig/Trash}}}}");
        let alignment = IsomorphismMatcher::default().align(&t1, &t2);
        let (a, b) = (PostOrder::new(&t1), PostOrder::new(&t2));

        // no{sig/Trash} is post-order 2 in t1 and 4 in t2
        assert_eq!(a.label(2), "no");
        assert_eq!(b.node(4).to_string(), "{no{sig/Trash}}");
        assert_eq!(alignment.get_b(2), Some(4));
        assert_eq!(alignment.get_b(1), Some(3));
        assert_eq!(alignment.get_b(a.root()), Some(b.root()));
        assert_eq!(alignment.len(), 3);
    }

    #[test]
    fn relabeled_leaf_is_left_unmatched() {
        let t1 = t("{root{in{sig/A}{sig/B}}}");
        let t2 = t("{root{in{sig/A}{sig/C}}}");
        let alignment = IsomorphismMatcher::default().align(&t1, &t2);
        let (a, b) = (PostOrder::new(&t1), PostOrder::new(&t2));
        // `in` and `sig/A` are reached through their matched parents
        assert_eq!(alignment.get_b(3), Some(3));
        assert_eq!(alignment.get_b(1), Some(1));
        assert!(!alignment.contains_a(2));
        assert_eq!(alignment.get_b(a.root()), Some(b.root()));
    }

    #[test]
    fn distance_matcher_is_optimal() {
        let t1 = t("{root{in{sig/A}{sig/B}}}");
        let t2 = t("{root{in{sig/A}{sig/C}}}");
        let alignment = DistanceMatcher.align(&t1, &t2);
        let (a, b) = (PostOrder::new(&t1), PostOrder::new(&t2));
        assert_eq!(alignment.cost(&a, &b), ted::distance(&t1, &t2));
        assert_eq!(alignment.len(), 4);
    }
}
