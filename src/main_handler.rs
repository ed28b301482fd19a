use crate::*;

use ansi_term::Color::*;
use serde::Deserialize;
use std::path::PathBuf;

fn read_model(model: Option<PathBuf>) -> Result<Option<String>, String> {
    match model {
        Some(path) => std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| format!("{}: {}", path.display(), e)),
        None => Ok(None),
    }
}

fn engine(
    store: PathBuf,
    syntax: producer::Syntax,
    config: config::Config,
) -> engine::HintEngine<producer::Syntax, store::JsonStore> {
    engine::HintEngine::new(syntax, store::JsonStore::new(store), config)
}

fn hint_error(e: engine::HintError) -> String {
    match e {
        engine::HintError::ParseFailure(e) => {
            format!("{}\n{}", Red.bold().paint("parse error:"), e.message)
        }
        engine::HintError::StoreUnavailable(e) => {
            format!("{} {}", Red.bold().paint("store error:"), e)
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Ingestion

/// A row of a submissions export.
#[derive(Deserialize)]
struct Record {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    code: String,
    #[serde(rename = "derivationOf", default)]
    derivation_of: String,
    sat: Option<i64>,
    #[serde(default)]
    expr: String,
}

impl Record {
    fn into_submission(self) -> engine::Submission {
        let parent = match self.derivation_of.trim() {
            "" | "-1" => None,
            p => Some(p.to_owned()),
        };
        engine::Submission {
            id: self.id,
            expr: self.expr,
            parent,
            correct: self.sat == Some(0),
            code: self.code,
        }
    }
}

pub fn ingest(
    store: PathBuf,
    key: engine::ExerciseKey,
    csv_path: PathBuf,
    model: Option<PathBuf>,
    syntax: producer::Syntax,
    config: config::Config,
) -> Result<(), String> {
    let model = read_model(model)?;

    let mut reader = csv::Reader::from_path(&csv_path)
        .map_err(|e| format!("{}: {}", csv_path.display(), e))?;
    let submissions = reader
        .deserialize::<Record>()
        .map(|r| r.map(Record::into_submission))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("{}: {}", csv_path.display(), e))?;

    let engine = engine(store, syntax, config);
    let report = engine
        .ingest_corpus(&key, model.as_deref(), &submissions)
        .map_err(hint_error)?;
    let stats = engine.corpus(&key).map_err(|e| e.to_string())?.statistics();

    println!(
        "{} {}\n\n  submissions: {}\n  skipped:     {}\n  derivations: {}\n  merged:      {}\n  bridged:     {}\n\n{}",
        Cyan.bold().paint("Ingested"),
        key,
        report.submissions,
        Yellow.paint(report.skipped.to_string()),
        report.derivations,
        report.dedup.answers_removed,
        report.bridged,
        Fixed(8).paint(format!(
            "{} answers ({} correct), {} edges",
            stats.answers, stats.correct, stats.edges
        )),
    );

    Ok(())
}

////////////////////////////////////////////////////////////////////////////////
// Hints

pub fn hint(
    store: PathBuf,
    key: engine::ExerciseKey,
    expr: String,
    model: Option<PathBuf>,
    syntax: producer::Syntax,
    config: config::Config,
) -> Result<(), String> {
    let model = read_model(model)?;
    let engine = engine(store, syntax, config);

    match engine
        .generate_hint(&key, &expr, model.as_deref())
        .map_err(hint_error)?
    {
        engine::HintOutcome::Hint(h) => println!(
            "{}\n\n  {}\n\n{}",
            Cyan.bold().paint("Hint:"),
            h.message,
            Fixed(8).paint(format!(
                "distance to solution: {}, action: {}",
                h.distance_to_solution, h.action
            )),
        ),
        engine::HintOutcome::AlreadyCorrect => {
            println!("{}", Green.bold().paint("Already correct!"))
        }
        engine::HintOutcome::NoHintAvailable(reason) => println!(
            "{} {}",
            Yellow.bold().paint("No hint available:"),
            reason
        ),
    }

    Ok(())
}

////////////////////////////////////////////////////////////////////////////////
// Diffs

pub fn diff(
    from: String,
    to: String,
    model: Option<PathBuf>,
    syntax: producer::Syntax,
    config: config::Config,
) -> Result<(), String> {
    let model = read_model(model)?.unwrap_or_default();

    let parse = |expr: &str, which: &str| {
        engine::answer_tree(&syntax, &model, expr).map_err(|e| {
            format!(
                "{}\n{}",
                Red.bold().paint(format!("parse error ({}):", which)),
                e.message
            )
        })
    };
    let t1 = parse(&from, "from")?;
    let t2 = parse(&to, "to")?;

    let (distance, actions) = corpus::diff(&t1, &t2, &config);
    let json = serde_json::to_string_pretty(&actions).map_err(|e| e.to_string())?;

    println!(
        "{}\n\n{}\n{}\n\n{}\n{}\n{} {}\n\n{}\n{}",
        Cyan.bold().paint("From:"),
        t1.pretty(),
        Cyan.bold().paint("To:"),
        t2.pretty(),
        Fixed(8).paint("═".repeat(40)),
        Purple.bold().paint("Distance:"),
        distance,
        Purple.bold().paint("Script:"),
        json,
    );

    if let Ok(h) = hint::hint(distance, &actions) {
        println!("\n{}\n\n  {}", Cyan.bold().paint("Hint:"), h.message);
    }

    Ok(())
}

////////////////////////////////////////////////////////////////////////////////
// Statistics

pub fn stats(
    store: PathBuf,
    key: engine::ExerciseKey,
    config: config::Config,
) -> Result<(), String> {
    use crate::store::Store;

    let store = store::JsonStore::new(store);
    let mut corpus = store
        .load(&key)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| {
            format!(
                "{} no corpus for {} in {}",
                Red.bold().paint("error:"),
                key,
                store.dir().display()
            )
        })?;
    let stats = corpus.statistics();

    // Stored weights may come from another configuration
    corpus.refresh_weights(&config);
    let reachable = corpus
        .answers()
        .filter(|a| !a.correct)
        .filter(|a| corpus.shortest_path_to_correct(a.id).is_ok())
        .count();

    println!(
        "{} {}\n\n  answers:   {}\n  correct:   {}\n  incorrect: {}\n  edges:     {}\n\n{}",
        Cyan.bold().paint("Corpus"),
        key,
        stats.answers,
        Green.paint(stats.correct.to_string()),
        Yellow.paint(stats.incorrect.to_string()),
        stats.edges,
        Fixed(8).paint(format!(
            "{} of {} incorrect answers have a path to a correct one",
            reachable, stats.incorrect
        )),
    );

    Ok(())
}
