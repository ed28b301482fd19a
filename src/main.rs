use hintgen::{engine, main_handler, producer};

use ansi_term::Color::*;
use clap::{builder::styling::*, Args, Parser, Subcommand};
use std::path::PathBuf;

mod custom_parse {
    use hintgen::config::Config;
    use std::path::PathBuf;

    pub fn at_most_one_path(s: &str) -> Option<PathBuf> {
        if s.is_empty() {
            None
        } else {
            Some(PathBuf::from(s))
        }
    }

    pub fn config(s: &str) -> Result<Config, String> {
        match at_most_one_path(s) {
            Some(path) => Config::load(&path),
            None => Ok(Config::default()),
        }
    }
}

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default())
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Yellow.on_default())
}

#[derive(Parser)]
#[command(
    version,
    about = format!("{} from {}",
        Purple.bold().paint("Next-step hints"),
        Yellow.bold().paint("past answers"),
    ),
    long_about = None,
    styles = styles(),
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Exercise {
    /// The directory holding corpus files
    #[arg(short, long, value_name = "DIR")]
    store: PathBuf,

    /// The challenge the exercise belongs to
    #[arg(short, long, value_name = "ID")]
    challenge: String,

    /// The predicate being written
    #[arg(short, long, value_name = "NAME")]
    predicate: String,
}

impl Exercise {
    fn split(self) -> (PathBuf, engine::ExerciseKey) {
        (
            self.store,
            engine::ExerciseKey::new(self.challenge, self.predicate),
        )
    }
}

#[derive(Subcommand)]
enum Command {
    /// Add a CSV export of submissions to an exercise corpus
    Ingest {
        #[command(flatten)]
        exercise: Exercise,

        /// The submissions (columns _id, code, derivationOf, sat, expr)
        #[arg(long, value_name = "FILE")]
        csv: PathBuf,

        /// The exercise model (blank to keep the stored one)
        #[arg(short, long, value_name = "FILE", default_value = "")]
        model: String,

        /// The notation expressions are written in
        #[arg(long, value_name = "SYNTAX", default_value = "Alloy")]
        syntax: producer::Syntax,

        /// Configuration file (.toml, blank for defaults)
        #[arg(long, value_name = "FILE", default_value = "")]
        config: String,
    },

    /// Suggest the next step for a submission
    Hint {
        #[command(flatten)]
        exercise: Exercise,

        /// The submitted expression
        #[arg(short, long, value_name = "EXPR")]
        expr: String,

        /// The exercise model (blank to use the stored one)
        #[arg(short, long, value_name = "FILE", default_value = "")]
        model: String,

        /// The notation expressions are written in
        #[arg(long, value_name = "SYNTAX", default_value = "Alloy")]
        syntax: producer::Syntax,

        /// Configuration file (.toml, blank for defaults)
        #[arg(long, value_name = "FILE", default_value = "")]
        config: String,
    },

    /// Show the edit script between two expressions
    Diff {
        /// The expression to edit
        #[arg(short, long, value_name = "EXPR")]
        from: String,

        /// The expression to reach
        #[arg(short, long, value_name = "EXPR")]
        to: String,

        /// The exercise model (blank for none)
        #[arg(short, long, value_name = "FILE", default_value = "")]
        model: String,

        /// The notation expressions are written in
        #[arg(long, value_name = "SYNTAX", default_value = "Alloy")]
        syntax: producer::Syntax,

        /// Configuration file (.toml, blank for defaults)
        #[arg(long, value_name = "FILE", default_value = "")]
        config: String,
    },

    /// Summarize an exercise corpus
    Stats {
        #[command(flatten)]
        exercise: Exercise,

        /// Configuration file (.toml, blank for defaults)
        #[arg(long, value_name = "FILE", default_value = "")]
        config: String,
    },
}

impl Command {
    pub fn handle(self) -> Result<(), String> {
        match self {
            Self::Ingest {
                exercise,
                csv,
                model,
                syntax,
                config,
            } => {
                let (store, key) = exercise.split();
                main_handler::ingest(
                    store,
                    key,
                    csv,
                    custom_parse::at_most_one_path(&model),
                    syntax,
                    custom_parse::config(&config)?,
                )
            }
            Self::Hint {
                exercise,
                expr,
                model,
                syntax,
                config,
            } => {
                let (store, key) = exercise.split();
                main_handler::hint(
                    store,
                    key,
                    expr,
                    custom_parse::at_most_one_path(&model),
                    syntax,
                    custom_parse::config(&config)?,
                )
            }
            Self::Diff {
                from,
                to,
                model,
                syntax,
                config,
            } => main_handler::diff(
                from,
                to,
                custom_parse::at_most_one_path(&model),
                syntax,
                custom_parse::config(&config)?,
            ),
            Self::Stats { exercise, config } => {
                let (store, key) = exercise.split();
                main_handler::stats(store, key, custom_parse::config(&config)?)
            }
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = cli.command.handle();

    match result {
        Ok(()) => (),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1)
        }
    }
}
