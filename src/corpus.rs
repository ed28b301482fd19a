//! # Corpus graph
//!
//! All answers seen for one exercise, linked by derivation edges that record
//! how one answer was edited into another. Answers are keyed by their
//! canonical tree; edges carry the edit distance and edit script between
//! their endpoints, a popularity (how many times the derivation was
//! observed) and a weight derived from it for shortest-path search.

use crate::components::UnionFind;
use crate::config::{Config, MatcherKind, Weighting};
use crate::matcher;
use crate::script::{self, EditAction};
use crate::shortest_path::{self, Arc};
use crate::ted;
use crate::tree::Tree;

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

////////////////////////////////////////////////////////////////////////////////
// Answers and edges

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
pub struct AnswerId(pub usize);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
pub struct EdgeId(pub usize);

impl std::fmt::Display for AnswerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a{}", self.0)
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// A submitted answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Answer {
    pub id: AnswerId,

    /// The submitted expression text
    pub expr: String,

    /// The full source the expression was taken from
    pub code: String,

    /// Canonical tree, wrapped in a root node
    pub tree: Tree,

    pub correct: bool,
    pub popularity: usize,
}

/// A directed "was edited into" link between two answers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DerivationEdge {
    pub id: EdgeId,
    pub from: AnswerId,
    pub to: AnswerId,
    pub edit_distance: usize,
    pub actions: Vec<EditAction>,
    pub popularity: usize,
    pub weight: f64,
}

/// Which answers a bridge may lead to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Correct,
    Incorrect,
    Any,
}

impl Category {
    pub fn admits(&self, answer: &Answer) -> bool {
        match self {
            Category::Correct => answer.correct,
            Category::Incorrect => !answer.correct,
            Category::Any => true,
        }
    }
}

/// No correct answer is reachable, or no bridge candidate exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotFound;

impl std::fmt::Display for NotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "not found")
    }
}

impl std::error::Error for NotFound {}

/// The cheapest way from an answer to a correct one.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectPath {
    pub answers: Vec<AnswerId>,
    pub edges: Vec<EdgeId>,
    pub cost: f64,
}

impl CorrectPath {
    pub fn first_edge(&self) -> Option<EdgeId> {
        self.edges.first().copied()
    }

    pub fn target(&self) -> Option<AnswerId> {
        self.answers.last().copied()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub answers: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub edges: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupSummary {
    pub groups_merged: usize,
    pub answers_removed: usize,
    pub loops_dropped: usize,
    pub edges_merged: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Diffing

/// Edit distance and edit script from one tree to another, using the matcher
/// the configuration selects.
pub fn diff(from: &Tree, to: &Tree, config: &Config) -> (usize, Vec<EditAction>) {
    let (distance, alignment) = ted::compute_distance(from, to);
    let alignment = match config.matcher {
        MatcherKind::Distance => alignment,
        MatcherKind::Isomorphism => matcher::from_config(config).align(from, to),
    };
    (distance, script::build_script(from, to, &alignment))
}

fn diff_all(
    pairs: Vec<(&Tree, &Tree)>,
    config: &Config,
) -> Vec<(usize, Vec<EditAction>)> {
    if config.parallel {
        pairs
            .into_par_iter()
            .map(|(a, b)| diff(a, b, config))
            .collect()
    } else {
        pairs.into_iter().map(|(a, b)| diff(a, b, config)).collect()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Corpus

/// The answers and derivations of one exercise.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(from = "CorpusData", into = "CorpusData")]
pub struct Corpus {
    model: String,
    answers: IndexMap<AnswerId, Answer>,
    edges: IndexMap<EdgeId, DerivationEdge>,
    index: HashMap<Tree, AnswerId>,
    next_answer: usize,
    next_edge: usize,
}

#[derive(Deserialize, Serialize)]
struct CorpusData {
    model: String,
    answers: Vec<Answer>,
    edges: Vec<DerivationEdge>,
}

impl From<CorpusData> for Corpus {
    fn from(data: CorpusData) -> Self {
        let mut corpus = Corpus::new(data.model);
        for answer in data.answers {
            corpus.next_answer = corpus.next_answer.max(answer.id.0 + 1);
            corpus.index.entry(answer.tree.clone()).or_insert(answer.id);
            corpus.answers.insert(answer.id, answer);
        }
        for edge in data.edges {
            corpus.next_edge = corpus.next_edge.max(edge.id.0 + 1);
            corpus.edges.insert(edge.id, edge);
        }
        corpus
    }
}

impl From<Corpus> for CorpusData {
    fn from(corpus: Corpus) -> Self {
        CorpusData {
            model: corpus.model,
            answers: corpus.answers.into_values().collect(),
            edges: corpus.edges.into_values().collect(),
        }
    }
}

impl Corpus {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            answers: IndexMap::new(),
            edges: IndexMap::new(),
            index: HashMap::new(),
            next_answer: 0,
            next_edge: 0,
        }
    }

    /// The exercise model (the source of the empty submission).
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn answer(&self, id: AnswerId) -> Option<&Answer> {
        self.answers.get(&id)
    }

    pub fn answers(&self) -> impl Iterator<Item = &Answer> {
        self.answers.values()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&DerivationEdge> {
        self.edges.get(&id)
    }

    pub fn edges(&self) -> impl Iterator<Item = &DerivationEdge> {
        self.edges.values()
    }

    pub fn edge_between(&self, from: AnswerId, to: AnswerId) -> Option<EdgeId> {
        self.edges
            .values()
            .find(|e| e.from == from && e.to == to)
            .map(|e| e.id)
    }

    /// The first stored answer with exactly this canonical tree.
    pub fn find(&self, tree: &Tree) -> Option<AnswerId> {
        self.index.get(tree).copied()
    }

    pub fn has_correct(&self) -> bool {
        self.answers.values().any(|a| a.correct)
    }

    pub fn statistics(&self) -> Statistics {
        let correct = self.answers.values().filter(|a| a.correct).count();
        Statistics {
            answers: self.answers.len(),
            correct,
            incorrect: self.answers.len() - correct,
            edges: self.edges.len(),
        }
    }

    /// Stores a new answer even if its tree is already present; the
    /// deduplication pass merges such answers later.
    pub fn add_answer(
        &mut self,
        expr: impl Into<String>,
        code: impl Into<String>,
        tree: Tree,
        correct: bool,
    ) -> AnswerId {
        let id = AnswerId(self.next_answer);
        self.next_answer += 1;
        self.index.entry(tree.clone()).or_insert(id);
        let answer = Answer {
            id,
            expr: expr.into(),
            code: code.into(),
            tree,
            correct,
            popularity: 1,
        };
        log::debug!("created answer {} for '{}'", id, answer.expr);
        self.answers.insert(id, answer);
        id
    }

    /// The answer with this canonical tree, creating an incorrect one if
    /// none exists. The flag tells whether the answer is new.
    pub fn find_or_create(
        &mut self,
        tree: Tree,
        expr: &str,
        code: &str,
    ) -> (AnswerId, bool) {
        match self.find(&tree) {
            Some(id) => (id, false),
            None => (self.add_answer(expr, code, tree, false), true),
        }
    }

    fn weight(&self, edge: &DerivationEdge, config: &Config) -> f64 {
        match config.weighting {
            Weighting::EdgePopularity => config.popularity_weight(edge.popularity),
            Weighting::NodePopularity => config.popularity_weight(
                self.answers.get(&edge.to).map_or(0, |a| a.popularity),
            ),
            Weighting::EditDistance => edge.edit_distance as f64,
        }
    }

    /// Recomputes every edge weight from the current popularities.
    pub fn refresh_weights(&mut self, config: &Config) {
        let weights: Vec<f64> =
            self.edges.values().map(|e| self.weight(e, config)).collect();
        for (edge, w) in self.edges.values_mut().zip(weights) {
            edge.weight = w;
        }
    }

    fn insert_edge(
        &mut self,
        from: AnswerId,
        to: AnswerId,
        payload: (usize, Vec<EditAction>),
        popularity: usize,
        config: &Config,
    ) -> EdgeId {
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        let (edit_distance, actions) = payload;
        let mut edge = DerivationEdge {
            id,
            from,
            to,
            edit_distance,
            actions,
            popularity,
            weight: 0.0,
        };
        edge.weight = self.weight(&edge, config);
        log::debug!(
            "created edge {} from {} to {} (distance {}, popularity {})",
            id,
            from,
            to,
            edge.edit_distance,
            popularity
        );
        self.edges.insert(id, edge);
        id
    }

    fn tree_of(&self, id: AnswerId) -> Result<&Tree, NotFound> {
        self.answers.get(&id).map(|a| &a.tree).ok_or(NotFound)
    }

    /// Records one observed derivation. A repeated derivation makes the
    /// existing edge more popular; a new one gets a fresh edge. Derivations
    /// of an answer from itself are ignored.
    pub fn record_derivation(
        &mut self,
        from: AnswerId,
        to: AnswerId,
        config: &Config,
    ) -> Result<Option<EdgeId>, NotFound> {
        Ok(self.record_derivations(&[(from, to)], config)?.pop().flatten())
    }

    /// Records many derivations at once, computing the scripts of new edges
    /// in parallel when configured to.
    pub fn record_derivations(
        &mut self,
        pairs: &[(AnswerId, AnswerId)],
        config: &Config,
    ) -> Result<Vec<Option<EdgeId>>, NotFound> {
        let mut fresh: Vec<(AnswerId, AnswerId)> = vec![];
        for &(from, to) in pairs {
            self.tree_of(from)?;
            self.tree_of(to)?;
            if from != to
                && self.edge_between(from, to).is_none()
                && !fresh.contains(&(from, to))
            {
                fresh.push((from, to));
            }
        }

        let trees = fresh
            .iter()
            .map(|&(f, t)| -> Result<_, NotFound> {
                Ok((self.tree_of(f)?, self.tree_of(t)?))
            })
            .collect::<Result<Vec<_>, NotFound>>()?;
        let payloads = diff_all(trees, config);
        for (&(from, to), payload) in fresh.iter().zip(payloads) {
            self.insert_edge(from, to, payload, 0, config);
        }

        let mut ids = Vec::with_capacity(pairs.len());
        for &(from, to) in pairs {
            if from == to {
                ids.push(None);
                continue;
            }
            let id = self.edge_between(from, to).ok_or(NotFound)?;
            if let Some(edge) = self.edges.get_mut(&id) {
                edge.popularity += 1;
            }
            ids.push(Some(id));
        }

        self.refresh_weights(config);
        Ok(ids)
    }

    /// Merges answers with identical canonical trees into the first one
    /// inserted, rewiring their edges onto it.
    pub fn deduplicate(&mut self, config: &Config) -> DedupSummary {
        let ids: Vec<AnswerId> = self.answers.keys().copied().collect();
        let mut uf = UnionFind::new(ids.len());
        let mut first_with_tree: HashMap<&Tree, usize> = HashMap::new();
        for (pos, answer) in self.answers.values().enumerate() {
            match first_with_tree.get(&answer.tree) {
                Some(&first) => uf.union(first, pos),
                None => {
                    first_with_tree.insert(&answer.tree, pos);
                }
            }
        }
        let groups = uf.groups();

        let mut summary = DedupSummary::default();
        let mut representative: HashMap<AnswerId, AnswerId> = HashMap::new();
        for group in &groups {
            let rep = ids[group[0]];
            for &pos in group {
                representative.insert(ids[pos], rep);
            }
            if group.len() < 2 {
                continue;
            }
            summary.groups_merged += 1;
            summary.answers_removed += group.len() - 1;

            let members: Vec<&Answer> = group
                .iter()
                .filter_map(|&p| self.answers.get(&ids[p]))
                .collect();
            let popularity: usize = members.iter().map(|a| a.popularity).sum();
            let correct = members.iter().any(|a| a.correct);
            if let Some(answer) = self.answers.get_mut(&rep) {
                answer.popularity = popularity;
                answer.correct = correct;
            }
            for &pos in &group[1..] {
                self.answers.shift_remove(&ids[pos]);
            }
        }

        // Rewire edges onto representatives
        let old_edges = std::mem::take(&mut self.edges);
        let mut by_endpoints: HashMap<(AnswerId, AnswerId), EdgeId> = HashMap::new();
        let mut stale: Vec<EdgeId> = vec![];
        for (id, mut edge) in old_edges {
            let from = representative.get(&edge.from).copied().unwrap_or(edge.from);
            let to = representative.get(&edge.to).copied().unwrap_or(edge.to);
            if from == to {
                summary.loops_dropped += 1;
                continue;
            }
            if let Some(existing) = by_endpoints.get(&(from, to)) {
                if let Some(kept) = self.edges.get_mut(existing) {
                    kept.popularity += edge.popularity;
                }
                summary.edges_merged += 1;
                continue;
            }
            if from != edge.from || to != edge.to {
                stale.push(id);
            }
            edge.from = from;
            edge.to = to;
            by_endpoints.insert((from, to), id);
            self.edges.insert(id, edge);
        }

        // Scripts of rewired edges are recomputed against the representatives
        let pairs: Vec<(&Tree, &Tree)> = stale
            .iter()
            .filter_map(|id| self.edges.get(id))
            .filter_map(|e| {
                let from = self.answers.get(&e.from)?;
                let to = self.answers.get(&e.to)?;
                Some((&from.tree, &to.tree))
            })
            .collect();
        if pairs.len() == stale.len() {
            let payloads = diff_all(pairs, config);
            for (id, (distance, actions)) in stale.iter().zip(payloads) {
                if let Some(edge) = self.edges.get_mut(id) {
                    edge.edit_distance = distance;
                    edge.actions = actions;
                }
            }
        } else {
            log::warn!("some rewired edges point at missing answers");
        }

        self.index = self
            .answers
            .values()
            .map(|a| (a.tree.clone(), a.id))
            .collect();
        self.refresh_weights(config);

        log::info!(
            "deduplicated corpus: {} group(s) merged, {} answer(s) removed, \
             {} loop(s) dropped, {} edge(s) merged",
            summary.groups_merged,
            summary.answers_removed,
            summary.loops_dropped,
            summary.edges_merged
        );
        summary
    }

    /// The cheapest path of derivation edges from `start` to a correct answer
    /// other than `start`.
    pub fn shortest_path_to_correct(
        &self,
        start: AnswerId,
    ) -> Result<CorrectPath, NotFound> {
        let position = |id: AnswerId| self.answers.get_index_of(&id);
        let start_pos = position(start).ok_or(NotFound)?;

        let mut out = vec![vec![]; self.answers.len()];
        let edge_ids: Vec<EdgeId> = self.edges.keys().copied().collect();
        for (k, edge) in self.edges.values().enumerate() {
            if let (Some(from), Some(to)) = (position(edge.from), position(edge.to)) {
                out[from].push(Arc {
                    id: k,
                    to,
                    weight: edge.weight,
                });
            }
        }

        let answers: Vec<&Answer> = self.answers.values().collect();
        let route = shortest_path::dijkstra(&out, start_pos, |n| answers[n].correct);
        match route {
            Some(route) => {
                log::debug!(
                    "path from {} to a correct answer: {} edge(s), cost {}",
                    start,
                    route.edges.len(),
                    route.cost
                );
                Ok(CorrectPath {
                    answers: route.nodes.iter().map(|&n| answers[n].id).collect(),
                    edges: route.edges.iter().map(|&k| edge_ids[k]).collect(),
                    cost: route.cost,
                })
            }
            None => {
                log::debug!("no path from {} to a correct answer", start);
                Err(NotFound)
            }
        }
    }

    /// Connects `start` to the closest answer of the given category (most
    /// popular first among equals), creating a zero-popularity edge unless
    /// one already exists. Answers at distance 0 are skipped.
    pub fn bridge_to_nearest(
        &mut self,
        start: AnswerId,
        category: Category,
        config: &Config,
    ) -> Result<EdgeId, NotFound> {
        let start_tree = self.tree_of(start)?.clone();

        let mut candidates: Vec<&Answer> = self
            .answers
            .values()
            .filter(|a| a.id != start && category.admits(a))
            .collect();
        candidates.sort_by(|a, b| b.popularity.cmp(&a.popularity));

        let best = if config.parallel {
            let distances: Vec<usize> = candidates
                .par_iter()
                .map(|a| ted::distance(&start_tree, &a.tree))
                .collect();
            candidates
                .iter()
                .zip(distances)
                .filter(|(_, d)| *d > 0)
                .min_by_key(|(_, d)| *d)
                .map(|(a, d)| (a.id, d))
        } else {
            let mut best: Option<(AnswerId, usize)> = None;
            for a in &candidates {
                let d = ted::distance(&start_tree, &a.tree);
                if d > 0 && best.map_or(true, |(_, b)| d < b) {
                    best = Some((a.id, d));
                    if config.bridge_early_exit && d == 1 {
                        break;
                    }
                }
            }
            best
        };

        let (target, distance) = best.ok_or(NotFound)?;
        if let Some(existing) = self.edge_between(start, target) {
            return Ok(existing);
        }

        let target_tree = self.tree_of(target)?.clone();
        let payload = diff(&start_tree, &target_tree, config);
        let id = self.insert_edge(start, target, payload, 0, config);
        log::info!(
            "bridged {} to {} ({:?}, distance {})",
            start,
            target,
            category,
            distance
        );
        Ok(id)
    }

    /// Connects every incorrect answer that leads nowhere to its nearest
    /// correct answer, so that paths through it reach a solution. Returns
    /// the number of bridges created.
    pub fn bridge_dead_ends(&mut self, config: &Config) -> usize {
        let sources: IndexSet<AnswerId> = self.edges.values().map(|e| e.from).collect();
        let dead_ends: Vec<AnswerId> = self
            .answers
            .values()
            .filter(|a| !a.correct && !sources.contains(&a.id))
            .map(|a| a.id)
            .collect();

        let bridged = dead_ends
            .into_iter()
            .filter(|&id| self.bridge_to_nearest(id, Category::Correct, config).is_ok())
            .count();
        if bridged > 0 {
            log::info!("bridged {} dead-end answer(s) to a correct answer", bridged);
        }
        bridged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;

    fn answer_tree(s: &str) -> Tree {
        Tree::root(vec![canonicalize(s.parse().unwrap())])
    }

    const NO_TRASH: &str = "{no{sig/Trash}}";
    const BOTH: &str = "{and{no{sig/Trash}}{no{sig/Protected}}}";

    fn config() -> Config {
        Config {
            parallel: false,
            ..Config::default()
        }
    }

    #[test]
    fn find_or_create_reuses_answers() {
        let mut c = Corpus::new("");
        let (a, new_a) = c.find_or_create(answer_tree(NO_TRASH), "no Trash", "");
        let (b, new_b) = c.find_or_create(answer_tree(NO_TRASH), "no  Trash", "");
        assert!(new_a);
        assert!(!new_b);
        assert_eq!(a, b);
        assert_eq!(c.answer(a).map(|x| x.popularity), Some(1));
        assert_eq!(c.answer(a).map(|x| x.correct), Some(false));
    }

    #[test]
    fn repeated_derivations_are_popular() {
        let config = config();
        let mut c = Corpus::new("");
        let a = c.add_answer("no Trash", "", answer_tree(NO_TRASH), false);
        let b = c.add_answer("both", "", answer_tree(BOTH), true);
        let e1 = c.record_derivation(a, b, &config).unwrap();
        let e2 = c.record_derivation(a, b, &config).unwrap();
        assert_eq!(e1, e2);
        let edge = c.edge(e1.unwrap()).unwrap();
        assert_eq!(edge.popularity, 2);
        assert_eq!(edge.weight, 0.5);
        assert_eq!(edge.edit_distance, 3);
        assert_eq!(c.record_derivation(a, a, &config), Ok(None));
    }

    #[test]
    fn deduplicate_merges_identical_trees() {
        let config = config();
        let mut c = Corpus::new("");
        let start = c.add_answer("no File", "", answer_tree("{no{sig/File}}"), false);
        let a = c.add_answer("no Trash", "", answer_tree(NO_TRASH), false);
        let b = c.add_answer("no Trash ", "", answer_tree(NO_TRASH), false);
        let goal = c.add_answer("both", "", answer_tree(BOTH), true);
        c.record_derivation(start, b, &config).unwrap();
        c.record_derivation(b, goal, &config).unwrap();
        c.record_derivation(a, b, &config).unwrap();

        let summary = c.deduplicate(&config);
        assert_eq!(summary.answers_removed, 1);
        assert_eq!(summary.loops_dropped, 1);
        assert_eq!(c.answers().count(), 3);
        assert!(c.answer(b).is_none());
        assert_eq!(c.answer(a).map(|x| x.popularity), Some(2));

        let rewired = c.edge_between(start, a).and_then(|e| c.edge(e)).unwrap();
        assert_eq!(rewired.edit_distance, 1);
        let (distance, actions) = diff(&answer_tree("{no{sig/File}}"), &answer_tree(NO_TRASH), &config);
        assert_eq!(rewired.edit_distance, distance);
        assert_eq!(rewired.actions, actions);
        assert!(c.edge_between(a, goal).is_some());
        assert_eq!(c.edges().count(), 2);
        assert_eq!(c.find(&answer_tree(NO_TRASH)), Some(a));
    }

    #[test]
    fn deduplicate_merges_parallel_edges() {
        let config = config();
        let mut c = Corpus::new("");
        let a1 = c.add_answer("x", "", answer_tree(NO_TRASH), false);
        let a2 = c.add_answer("y", "", answer_tree(NO_TRASH), false);
        let goal = c.add_answer("both", "", answer_tree(BOTH), true);
        c.record_derivation(a1, goal, &config).unwrap();
        c.record_derivation(a2, goal, &config).unwrap();

        let summary = c.deduplicate(&config);
        assert_eq!(summary.edges_merged, 1);
        let edge = c.edge_between(a1, goal).and_then(|e| c.edge(e)).unwrap();
        assert_eq!(edge.popularity, 2);
        assert_eq!(edge.weight, 0.5);
    }

    #[test]
    fn popular_paths_are_preferred() {
        let config = config();
        let mut c = Corpus::new("");
        let s = c.add_answer("s", "", answer_tree("{no{sig/A}}"), false);
        let m = c.add_answer("m", "", answer_tree("{no{sig/B}}"), false);
        let g1 = c.add_answer("g1", "", answer_tree("{no{sig/C}}"), true);
        let g2 = c.add_answer("g2", "", answer_tree("{no{sig/D}}"), true);
        c.record_derivation(s, g1, &config).unwrap();
        for _ in 0..4 {
            c.record_derivation(s, m, &config).unwrap();
            c.record_derivation(m, g2, &config).unwrap();
        }
        let path = c.shortest_path_to_correct(s).unwrap();
        assert_eq!(path.answers, vec![s, m, g2]);
        assert_eq!(path.cost, 0.5);
        assert_eq!(path.target(), Some(g2));
    }

    #[test]
    fn no_path_then_bridge() {
        let config = config();
        let mut c = Corpus::new("");
        let s = c.add_answer("s", "", answer_tree(NO_TRASH), false);
        let far = c.add_answer("far", "", answer_tree("{or{in{sig/A}{sig/B}}{no{sig/C}}}"), true);
        let near = c.add_answer("near", "", answer_tree(BOTH), true);
        let same = c.add_answer("same", "", answer_tree(NO_TRASH), true);
        assert_eq!(c.shortest_path_to_correct(s), Err(NotFound));

        let bridge = c.bridge_to_nearest(s, Category::Correct, &config).unwrap();
        let edge = c.edge(bridge).unwrap();
        assert_eq!(edge.from, s);
        assert_eq!(edge.to, near);
        assert_ne!(edge.to, same);
        assert_ne!(edge.to, far);
        assert_eq!(edge.popularity, 0);
        assert_eq!(edge.weight, config.zero_popularity_weight);
        assert!(edge.edit_distance > 0);
        assert_eq!(c.shortest_path_to_correct(s).unwrap().edges, vec![bridge]);
    }

    #[test]
    fn parallel_bridge_agrees() {
        let mut c = Corpus::new("");
        let s = c.add_answer("s", "", answer_tree(NO_TRASH), false);
        c.add_answer("far", "", answer_tree("{or{in{sig/A}{sig/B}}{no{sig/C}}}"), true);
        let near = c.add_answer("near", "", answer_tree(BOTH), true);
        let config = Config::default();
        let bridge = c.bridge_to_nearest(s, Category::Correct, &config).unwrap();
        assert_eq!(c.edge(bridge).map(|e| e.to), Some(near));
        assert_eq!(
            c.bridge_to_nearest(s, Category::Correct, &config),
            Ok(bridge)
        );
    }

    #[test]
    fn bridging_takes_the_first_popular_neighbor() {
        let mut c = Corpus::new("");
        let s = c.add_answer("s", "", answer_tree(NO_TRASH), false);
        let far = c.add_answer("far", "", answer_tree(BOTH), true);
        c.add_answer("late", "", answer_tree("{no{sig/B}}"), true);
        let first = c.add_answer("first", "", answer_tree("{no{sig/A}}"), true);
        let tie = c.add_answer("tie", "", answer_tree("{some{sig/Trash}}"), true);
        for (id, popularity) in [(far, 3), (first, 2), (tie, 2)] {
            if let Some(a) = c.answers.get_mut(&id) {
                a.popularity = popularity;
            }
        }

        // far is scanned first, then three candidates at distance 1
        for (parallel, bridge_early_exit) in
            [(false, true), (false, false), (true, true), (true, false)]
        {
            let config = Config {
                parallel,
                bridge_early_exit,
                ..Config::default()
            };
            let mut c = c.clone();
            let bridge = c.bridge_to_nearest(s, Category::Correct, &config).unwrap();
            let edge = c.edge(bridge).unwrap();
            assert_eq!(edge.to, first, "parallel {}, early exit {}", parallel, bridge_early_exit);
            assert_eq!(edge.edit_distance, 1);
        }
    }

    #[test]
    fn dead_ends_are_bridged() {
        let config = config();
        let mut c = Corpus::new("");
        let s = c.add_answer("s", "", answer_tree("{no{sig/A}}"), false);
        let dead = c.add_answer("dead", "", answer_tree("{no{sig/B}}"), false);
        let lone = c.add_answer("lone", "", answer_tree("{no{sig/C}}"), false);
        let goal = c.add_answer("goal", "", answer_tree(BOTH), true);
        let other = c.add_answer("other", "", answer_tree("{and{no{sig/B}}{no{sig/C}}}"), true);
        c.record_derivation(s, dead, &config).unwrap();
        assert_eq!(c.shortest_path_to_correct(s), Err(NotFound));

        assert_eq!(c.bridge_dead_ends(&config), 2);
        assert_eq!(c.edges().filter(|e| e.from == s).count(), 1);
        assert!(c.edge_between(dead, other).is_some());
        assert!(c.edge_between(lone, other).is_some());
        assert_eq!(c.shortest_path_to_correct(s).unwrap().answers, vec![s, dead, other]);
        assert!(c.edges().all(|e| e.from != goal && e.from != other));
        assert_eq!(c.bridge_dead_ends(&config), 0);
    }

    #[test]
    fn bridge_without_candidates() {
        let mut c = Corpus::new("");
        let s = c.add_answer("s", "", answer_tree(NO_TRASH), false);
        assert_eq!(
            c.bridge_to_nearest(s, Category::Correct, &config()),
            Err(NotFound)
        );
    }

    #[test]
    fn serialization_rebuilds_the_index() {
        let config = config();
        let mut c = Corpus::new("sig Trash {}");
        let a = c.add_answer("no Trash", "", answer_tree(NO_TRASH), false);
        let b = c.add_answer("both", "", answer_tree(BOTH), true);
        c.record_derivation(a, b, &config).unwrap();

        let json = serde_json::to_string(&c).unwrap();
        let mut back: Corpus = serde_json::from_str(&json).unwrap();
        assert_eq!(back.model(), "sig Trash {}");
        assert_eq!(back.find(&answer_tree(BOTH)), Some(b));
        assert_eq!(back.statistics(), c.statistics());
        let (fresh, created) = back.find_or_create(answer_tree("{no{sig/X}}"), "no X", "");
        assert!(created);
        assert_eq!(fresh, AnswerId(2));
    }
}
