//! `prep`: load, check and exercise the exam-prep engine from the command line.

use std::process;

use clap::{Parser, Subcommand};
use prep_core::model::{Difficulty, Section};
use tracing_subscriber::EnvFilter;

mod commands;
mod load;

#[derive(Parser)]
#[command(name = "prep", version, about = "Blueprint-weighted exam practice engine")]
struct Cli {
    #[command(flatten)]
    sources: load::Sources,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the blueprint and question corpus and print coverage
    Validate,

    /// Compose one session and print its questions in order
    Compose {
        /// Exam section (SEE1, SEE2, SEE3)
        #[arg(long, default_value = "SEE1")]
        section: Section,

        /// Number of questions
        #[arg(long, default_value_t = 20)]
        count: usize,

        /// RNG seed for a reproducible session
        #[arg(long)]
        seed: Option<u64>,

        /// Restrict to blueprint areas (repeatable)
        #[arg(long = "area")]
        areas: Vec<String>,

        /// Only draw questions of this difficulty
        #[arg(long)]
        difficulty: Option<Difficulty>,
    },

    /// Run scripted practice sessions in memory and print readiness
    Simulate {
        #[arg(long, default_value = "SEE1")]
        section: Section,

        /// Questions per session
        #[arg(long, default_value_t = 20)]
        count: usize,

        /// Number of sessions to submit
        #[arg(long, default_value_t = 3)]
        sessions: usize,

        /// Probability of answering a question correctly
        #[arg(long, default_value_t = 0.7)]
        accuracy: f64,

        #[arg(long, default_value_t = 7)]
        seed: u64,

        #[arg(long, default_value = "demo")]
        user: String,
    },
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_env("PREP_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate => commands::validate::execute(&cli.sources),
        Commands::Compose {
            section,
            count,
            seed,
            areas,
            difficulty,
        } => commands::compose::execute(&cli.sources, section, count, seed, areas, difficulty),
        Commands::Simulate {
            section,
            count,
            sessions,
            accuracy,
            seed,
            user,
        } => {
            commands::simulate::execute(&cli.sources, section, count, sessions, accuracy, seed, user)
                .await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
