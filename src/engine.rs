//! # Hint engine
//!
//! The entry point used by callers: turns a submission into a next-step hint
//! by locating it in the exercise's corpus, walking the cheapest derivation
//! path toward a correct answer, and phrasing the first edit on that path.
//! Also ingests batches of historical submissions into a corpus.
//!
//! Each exercise corpus sits behind its own lock, held for the whole of a
//! request, so answer creation and deduplication never race.

use crate::canonical::canonicalize;
use crate::config::Config;
use crate::corpus::{AnswerId, Category, Corpus, DedupSummary, NotFound};
use crate::hint::{self, HintResult};
use crate::producer::{AstProducer, ParseError};
use crate::store::{Store, StoreError};
use crate::ted;
use crate::tree::Tree;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

////////////////////////////////////////////////////////////////////////////////
// Requests and outcomes

/// Identifies an exercise: a challenge and the predicate being written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct ExerciseKey {
    pub challenge: String,
    pub predicate: String,
}

impl ExerciseKey {
    pub fn new(challenge: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self {
            challenge: challenge.into(),
            predicate: predicate.into(),
        }
    }
}

impl std::fmt::Display for ExerciseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.challenge, self.predicate)
    }
}

/// One historical submission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Submission {
    pub id: String,
    pub expr: String,

    /// The submission this one was edited from
    pub parent: Option<String>,

    pub correct: bool,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HintOutcome {
    Hint(HintResult),
    AlreadyCorrect,
    NoHintAvailable(String),
}

#[derive(Debug)]
pub enum HintError {
    ParseFailure(ParseError),
    StoreUnavailable(StoreError),
}

impl std::fmt::Display for HintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HintError::ParseFailure(e) => write!(f, "{}", e),
            HintError::StoreUnavailable(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for HintError {}

impl From<ParseError> for HintError {
    fn from(e: ParseError) -> Self {
        HintError::ParseFailure(e)
    }
}

impl From<StoreError> for HintError {
    fn from(e: StoreError) -> Self {
        HintError::StoreUnavailable(e)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub submissions: usize,
    pub skipped: usize,
    pub derivations: usize,
    pub dedup: DedupSummary,
    /// Dead-end incorrect answers linked to their nearest correct answer.
    pub bridged: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Engine

/// The canonical, root-wrapped tree of an expression. A blank expression is
/// the empty answer.
pub fn answer_tree(
    producer: &impl AstProducer,
    model: &str,
    expr: &str,
) -> Result<Tree, ParseError> {
    if expr.trim().is_empty() {
        return Ok(Tree::empty());
    }
    let raw = producer.parse(model, expr)?;
    Ok(Tree::root(vec![canonicalize(raw)]))
}

pub struct HintEngine<P: AstProducer, S: Store> {
    producer: P,
    store: S,
    config: Config,
    corpora: Mutex<IndexMap<ExerciseKey, Arc<Mutex<Corpus>>>>,
}

impl<P: AstProducer, S: Store> HintEngine<P, S> {
    pub fn new(producer: P, store: S, config: Config) -> Self {
        Self {
            producer,
            store,
            config,
            corpora: Mutex::new(IndexMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn answer_tree(&self, model: &str, expr: &str) -> Result<Tree, ParseError> {
        answer_tree(&self.producer, model, expr)
    }

    fn handle(&self, key: &ExerciseKey) -> Result<Arc<Mutex<Corpus>>, StoreError> {
        let mut corpora = self.corpora.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = corpora.get(key) {
            return Ok(handle.clone());
        }
        let corpus = match self.store.load(key)? {
            Some(corpus) => corpus,
            None => {
                log::info!("starting an empty corpus for {}", key);
                Corpus::new("")
            }
        };
        let handle = Arc::new(Mutex::new(corpus));
        corpora.insert(key.clone(), handle.clone());
        Ok(handle)
    }

    /// A snapshot of an exercise corpus.
    pub fn corpus(&self, key: &ExerciseKey) -> Result<Corpus, StoreError> {
        let handle = self.handle(key)?;
        let corpus = handle.lock().unwrap_or_else(|e| e.into_inner());
        Ok(corpus.clone())
    }

    /// A hint for `expr`, written against `model` (or the model stored with
    /// the corpus when none is given).
    pub fn generate_hint(
        &self,
        key: &ExerciseKey,
        expr: &str,
        model: Option<&str>,
    ) -> Result<HintOutcome, HintError> {
        let handle = self.handle(key)?;
        let mut corpus = handle.lock().unwrap_or_else(|e| e.into_inner());

        let model = model.unwrap_or(corpus.model()).to_owned();
        let tree = self.answer_tree(&model, expr)?;

        if !corpus.has_correct() {
            return Ok(HintOutcome::NoHintAvailable(format!(
                "the corpus for {} has no correct answers",
                key
            )));
        }

        let before = corpus.statistics();
        let (start, created) = corpus.find_or_create(tree, expr, &model);
        let outcome = self.hint_from(&mut corpus, start, created);
        if corpus.statistics() != before {
            self.store.save(key, &corpus)?;
        }
        Ok(outcome)
    }

    fn hint_from(
        &self,
        corpus: &mut Corpus,
        start: AnswerId,
        created: bool,
    ) -> HintOutcome {
        if corpus.answer(start).is_some_and(|a| a.correct) {
            return HintOutcome::AlreadyCorrect;
        }

        if created {
            if let Err(NotFound) =
                corpus.bridge_to_nearest(start, Category::Any, &self.config)
            {
                log::debug!("nothing to connect the new answer {} to", start);
            }
        }

        let path = match corpus.shortest_path_to_correct(start) {
            Ok(path) => path,
            Err(NotFound) => {
                let bridged = corpus
                    .bridge_to_nearest(start, Category::Correct, &self.config)
                    .and_then(|_| corpus.shortest_path_to_correct(start));
                match bridged {
                    Ok(path) => path,
                    Err(NotFound) => {
                        return HintOutcome::NoHintAvailable(
                            "no correct answer differs from the submission"
                                .to_owned(),
                        )
                    }
                }
            }
        };

        let edge = path.first_edge().and_then(|id| corpus.edge(id));
        let target = path.target().and_then(|id| corpus.answer(id));
        let (Some(edge), Some(target), Some(answer)) =
            (edge, target, corpus.answer(start))
        else {
            return HintOutcome::NoHintAvailable(
                "the path to a correct answer is empty".to_owned(),
            );
        };

        let distance = ted::distance(&answer.tree, &target.tree);
        match hint::hint(distance, &edge.actions) {
            Ok(result) => HintOutcome::Hint(result),
            Err(_) => HintOutcome::AlreadyCorrect,
        }
    }

    /// Adds a batch of historical submissions to a corpus: one answer per
    /// parsable submission, one derivation per known parent, then a
    /// deduplication pass. Incorrect answers left without a way forward are
    /// finally bridged to their nearest correct answer.
    pub fn ingest_corpus(
        &self,
        key: &ExerciseKey,
        model: Option<&str>,
        submissions: &[Submission],
    ) -> Result<IngestReport, HintError> {
        let handle = self.handle(key)?;
        let mut corpus = handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(model) = model {
            corpus.set_model(model);
        }
        let model = corpus.model().to_owned();

        let parse = |s: &Submission| self.answer_tree(&model, &s.expr);
        let trees: Vec<Result<Tree, ParseError>> = if self.config.parallel {
            submissions.par_iter().map(parse).collect()
        } else {
            submissions.iter().map(parse).collect()
        };

        let mut report = IngestReport {
            submissions: submissions.len(),
            ..IngestReport::default()
        };
        let mut ids = HashMap::new();
        for (s, tree) in submissions.iter().zip(trees) {
            match tree {
                Ok(tree) => {
                    let id = corpus.add_answer(&s.expr, &s.code, tree, s.correct);
                    ids.insert(s.id.as_str(), id);
                }
                Err(e) => {
                    log::warn!("skipping submission {}: {}", s.id, e);
                    report.skipped += 1;
                }
            }
        }

        let mut pairs = vec![];
        for s in submissions {
            let (Some(parent), Some(&child)) = (&s.parent, ids.get(s.id.as_str()))
            else {
                continue;
            };
            match ids.get(parent.as_str()) {
                Some(&parent) => pairs.push((parent, child)),
                None => log::debug!(
                    "submission {} derives from unknown submission {}",
                    s.id,
                    parent
                ),
            }
        }
        match corpus.record_derivations(&pairs, &self.config) {
            Ok(edges) => report.derivations = edges.iter().flatten().count(),
            Err(NotFound) => log::warn!("derivations refer to missing answers"),
        }

        report.dedup = corpus.deduplicate(&self.config);
        report.bridged = corpus.bridge_dead_ends(&self.config);
        self.store.save(key, &corpus)?;
        Ok(report)
    }
}
