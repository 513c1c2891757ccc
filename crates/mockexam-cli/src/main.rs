//! mockexam CLI — timed, resumable mock exams in the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use mockexam_core::model::ExamPart;

mod commands;

#[derive(Parser)]
#[command(name = "mockexam", version, about = "Timed, resumable mock exams")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// User id (overrides config and MOCKEXAM_USER)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start or resume a timed attempt
    Start {
        /// Exam part: part_a or part_b
        #[arg(long)]
        part: ExamPart,

        /// Discard an in-progress attempt at the other part first
        #[arg(long)]
        discard_existing: bool,
    },

    /// Show completed attempts, most recent first
    History {
        /// Only show this exam part
        #[arg(long)]
        part: Option<ExamPart>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Review the answers of a completed attempt
    Review {
        /// Session id (a unique prefix is enough)
        session_id: String,

        /// Only show questions answered incorrectly or skipped
        #[arg(long)]
        incorrect_only: bool,
    },

    /// Show the in-progress attempt, if any
    Status,

    /// Abandon the in-progress attempt
    Discard,

    /// Validate question bank TOML files
    Validate {
        /// Path to question bank file or directory
        #[arg(long)]
        banks: PathBuf,
    },

    /// Create starter config and example question banks
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mockexam=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Start {
            part,
            discard_existing,
        } => commands::start::execute(config, cli.user, part, discard_existing).await,
        Commands::History { part, format } => {
            commands::history::execute(config, cli.user, part, format)
        }
        Commands::Review {
            session_id,
            incorrect_only,
        } => commands::review::execute(config, cli.user, session_id, incorrect_only),
        Commands::Status => commands::status::execute(config, cli.user),
        Commands::Discard => commands::discard::execute(config, cli.user),
        Commands::Validate { banks } => commands::validate::execute(banks),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
