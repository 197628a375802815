//! CLI for MedBench.
//!
//! This crate provides the `medbench` command-line interface: running
//! benchmarks against Ollama endpoints, browsing the question bank and
//! managing stored results.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

mod output;
pub mod progress;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use medbench_adapters::OllamaClient;
use medbench_benchmarks::io::{write_outputs, OUTPUT_DIR};
use medbench_benchmarks::{
    markdown, BenchmarkOrchestrator, JsonFileStore, OutputFormat, ResultStore, RunRequest,
};
use medbench_core::config::{AppConfig, ExecutionStrategy, LoggingConfig};
use medbench_core::{Category, QuestionBank};
use progress::ProgressBarSink;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// MedBench CLI.
#[derive(Parser, Debug)]
#[command(name = "medbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $MEDBENCH_CONFIG or medbench.toml).
    #[arg(short, long, global = true, env = "MEDBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a benchmark and write the results.
    ///
    /// The run is stored in the configured results directory and written to
    /// the output directory:
    /// - <output>/<run_id>.json - The full run
    /// - <output>/<run_id>.md - Markdown report
    /// - <output>/summary.md - Markdown summary table
    Run {
        /// Model to test (repeatable).
        #[arg(short, long = "model", required = true)]
        models: Vec<String>,

        /// Question id to ask (repeatable).
        #[arg(short, long = "question")]
        questions: Vec<String>,

        /// Ask every question in the bank.
        #[arg(long, conflicts_with = "questions")]
        all_questions: bool,

        /// Output directory override (optional).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: json, markdown, or both (default: both).
        #[arg(short, long, default_value = "both")]
        format: String,

        /// Run models hosted on different endpoints side by side.
        #[arg(short, long)]
        parallel: bool,

        /// Verbose output.
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the question bank.
    Questions {
        /// Only show one category.
        #[arg(long)]
        category: Option<Category>,
    },

    /// Inspect or delete stored runs.
    Results {
        /// Results operation.
        #[command(subcommand)]
        action: ResultsCommand,
    },

    /// Show configuration and endpoint health.
    Status {
        /// Show detailed status information.
        #[arg(short, long)]
        detailed: bool,
    },
}

/// Operations on stored runs.
#[derive(Subcommand, Debug)]
pub enum ResultsCommand {
    /// List stored runs, newest first.
    List,

    /// Show one run.
    Show {
        /// Run identifier.
        id: String,

        /// Print raw JSON instead of a report.
        #[arg(long)]
        json: bool,
    },

    /// Delete one run, or every run with --all.
    Delete {
        /// Run identifier.
        #[arg(required_unless_present = "all")]
        id: Option<String>,

        /// Delete every stored run.
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(logging: &LoggingConfig, default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Run the CLI with the given arguments.
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if the command fails.
pub fn run() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    let level = if verbose {
        config.logging.level.as_str()
    } else {
        "warn"
    };
    init_tracing(&config.logging, level);

    match cli.command {
        Commands::Run {
            models,
            questions,
            all_questions,
            output,
            format,
            parallel,
            verbose,
        } => {
            let format: OutputFormat = format.parse().map_err(anyhow::Error::msg)?;
            let bank = Arc::new(QuestionBank::builtin());
            let question_ids = if all_questions { bank.ids() } else { questions };
            if question_ids.is_empty() {
                bail!("pass at least one --question, or --all-questions");
            }

            let store = Arc::new(
                JsonFileStore::open(&config.storage.results_dir)
                    .context("failed to open results directory")?,
            );
            let strategy = if parallel {
                ExecutionStrategy::PerEndpoint
            } else {
                config.benchmark.strategy
            };
            let orchestrator = BenchmarkOrchestrator::new(
                Arc::new(OllamaClient::new()?),
                Arc::new(config.endpoints.clone()),
                bank,
            )
            .with_store(store)
            .with_strategy(strategy);

            let request = RunRequest::new(models, question_ids);
            let mut sink = ProgressBarSink::new(verbose);
            let runtime = tokio::runtime::Runtime::new()?;
            let run = runtime.block_on(orchestrator.run(
                &request,
                config.benchmark.batch,
                &mut sink,
            ))?;

            output::print_run_summary(&run);

            let dir = output.unwrap_or_else(|| PathBuf::from(OUTPUT_DIR));
            let written = write_outputs(&run, &dir, format)
                .with_context(|| format!("failed to write outputs to {}", dir.display()))?;
            println!("\nResults written to {}/", dir.display());
            if verbose {
                for path in &written {
                    println!("  - {}", path.display());
                }
            }

            Ok(())
        }
        Commands::Questions { category } => {
            let bank = QuestionBank::builtin();
            let questions = match category {
                Some(category) => bank.by_category(category),
                None => bank.all().iter().collect(),
            };

            output::section("Questions");
            for question in &questions {
                output::print_question(question);
            }
            println!("\n{} questions", questions.len());
            Ok(())
        }
        Commands::Results { action } => {
            let store = JsonFileStore::open(&config.storage.results_dir)
                .context("failed to open results directory")?;

            match action {
                ResultsCommand::List => {
                    let runs = store.list()?;
                    output::section("Stored runs");
                    for run in &runs {
                        output::print_run_line(run);
                    }
                    println!("\n{} runs in {}", runs.len(), store.dir().display());
                }
                ResultsCommand::Show { id, json } => {
                    let run = store.load(&id)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&run)?);
                    } else {
                        print!("{}", markdown::generate_run_report(&run));
                    }
                }
                ResultsCommand::Delete { id, all } => {
                    if all {
                        let removed = store.delete_all()?;
                        println!("Deleted {} runs", removed);
                    } else if let Some(id) = id {
                        store.delete(&id)?;
                        println!("Deleted {}", id);
                    }
                }
            }
            Ok(())
        }
        Commands::Status { detailed } => {
            println!("MedBench Benchmark System");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));

            output::section("Configuration");
            output::kv("API address", config.bind_address());
            output::kv("Results directory", config.storage.results_dir.display());
            output::kv("Strategy", format!("{:?}", config.benchmark.strategy));
            output::kv("Default endpoint", &config.endpoints.default_endpoint);

            if detailed {
                output::section("Endpoint rules");
                for rule in &config.endpoints.rules {
                    output::kv(&format!("{:?}", rule.matcher), &rule.endpoint);
                }
                for (model, endpoint) in &config.endpoints.overrides {
                    output::kv(model, endpoint);
                }
                output::kv(
                    "Batch timeout",
                    format!("{:?}", config.benchmark.batch.timeout()),
                );
                output::kv(
                    "Streaming timeout",
                    format!("{:?}", config.benchmark.streaming.timeout()),
                );
            }

            output::section("Endpoints");
            let client = OllamaClient::new()?;
            let runtime = tokio::runtime::Runtime::new()?;
            for endpoint in config.endpoints.endpoints() {
                let health = runtime.block_on(client.health(&endpoint));
                output::print_health(&health);
                if detailed && !health.models.is_empty() {
                    println!("      {}", health.models.join(", "));
                }
            }

            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_accepts_repeated_models_and_questions() {
        let cli = Cli::try_parse_from([
            "medbench", "run", "-m", "meditron:7b", "-m", "llama3", "-q", "osteo_principles",
            "--parallel",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                models,
                questions,
                parallel,
                format,
                ..
            } => {
                assert_eq!(models, vec!["meditron:7b", "llama3"]);
                assert_eq!(questions, vec!["osteo_principles"]);
                assert!(parallel);
                assert_eq!(format, "both");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_run_requires_a_model() {
        assert!(Cli::try_parse_from(["medbench", "run", "--all-questions"]).is_err());
    }

    #[test]
    fn test_all_questions_conflicts_with_explicit_ids() {
        let result = Cli::try_parse_from([
            "medbench", "run", "-m", "llama3", "-q", "general_capital", "--all-questions",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_questions_category_is_parsed() {
        let cli = Cli::try_parse_from(["medbench", "questions", "--category", "osteopathy"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Questions {
                category: Some(Category::Osteopathy)
            }
        ));
        assert!(Cli::try_parse_from(["medbench", "questions", "--category", "astrology"]).is_err());
    }

    #[test]
    fn test_results_delete_needs_id_or_all() {
        assert!(Cli::try_parse_from(["medbench", "results", "delete"]).is_err());
        assert!(Cli::try_parse_from(["medbench", "results", "delete", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["medbench", "results", "delete", "run_1"]).is_ok());
    }
}
