//! manifold-workflow - drive a region graph from the command line

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use manifold_workflow::config::{self, Config, WorkflowPaths};
use manifold_workflow::{demo, session};

#[derive(Parser)]
#[command(name = "manifold-workflow")]
#[command(author, version, about = "Intent-driven workflow engine over nested regions")]
struct Cli {
    /// Config file (defaults to ~/.manifold-workflow/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config file
    Init,

    /// Run the nested demonstration workflow
    Demo {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify a prompt and print the intent
    Classify {
        /// Prompt text
        prompt: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive session over the demonstration workflow
    Repl,
}

fn init_tracing(config: &Config) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(WorkflowPaths::new()?.config),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = config_path(&cli)?;
    let config = config::load_config_from(&path)?;
    init_tracing(&config);

    match cli.command {
        Commands::Init => {
            if path.exists() {
                println!("Config already exists at {}", path.display());
                return Ok(());
            }
            if let Some(dir) = path.parent() {
                WorkflowPaths::at(dir).ensure_dirs()?;
            }
            config::save_config(&Config::default(), &path)?;
            println!("✓ Wrote default config to {}", path.display());
        }
        Commands::Demo { json } => {
            let classifier = config.classifier.build(&config.llm)?;
            let mut manifold = demo::build_demo_manifold(classifier);
            let reports = demo::run_demo(&mut manifold).await;

            if json {
                let output = serde_json::json!({
                    "steps": reports,
                    "state": manifold.state(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                for report in &reports {
                    println!("{}", report.description);
                    println!("  prompt:   {}", report.prompt);
                    println!(
                        "  navigate: {}  execute: {}  region: {}",
                        report.navigated,
                        report.executed,
                        report.region.as_deref().unwrap_or("-")
                    );
                }
                println!();
                println!("Final state:");
                println!("{}", serde_json::to_string_pretty(&manifold.state())?);
            }
        }
        Commands::Classify { prompt, json } => {
            let classifier = config.classifier.build(&config.llm)?;
            let intent = classifier.query(&prompt).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&intent)?);
            } else {
                let verdict = if intent.passes_gate() { "accepted" } else { "below gate" };
                println!("{} [{}]", intent, verdict);
            }
        }
        Commands::Repl => {
            let classifier = config.classifier.build(&config.llm)?;
            let manifold = demo::build_demo_manifold(classifier);
            let mut session = session::WorkflowSession::new(manifold);
            session.run().await?;
        }
    }

    Ok(())
}
