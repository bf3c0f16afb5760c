//! decai command line interface
//!
//! Deploys a collaborative trainer from a config file, then inspects it,
//! predicts with it, or replays a script of transactions against it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use decai_classifier::Features;
use decai_trainer::{CollaborativeTrainer, Deployment, DeploymentConfig};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod script;

use script::{replay, Script};

#[derive(Parser, Debug)]
#[command(name = "decai")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Collaborative training deployments with deposit-backed incentives", long_about = None)]
struct Cli {
    /// Verbose logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deploy from a config file and print the resulting model summary
    Inspect {
        /// Deployment config (TOML, or JSON by extension)
        config: PathBuf,
    },
    /// Predict the class of one encoded sample
    Predict {
        config: PathBuf,
        /// Sample as JSON, e.g. '{"dense": ["0.5", "1.5"]}'
        #[arg(long)]
        data: String,
    },
    /// Apply a JSON script of add_data, refund and report steps in order
    Replay {
        config: PathBuf,
        script: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { config } => {
            let trainer = deploy(&config)?;
            let summary = json!({
                "name": trainer.name(),
                "description": trainer.description(),
                "owner": trainer.owner(),
                "classifier": trainer.classifier().kind(),
                "classifications": trainer.classifications(),
                "dimension": trainer.classifier().dimension(),
                "incentive": trainer.incentive().kind(),
                "params": trainer.incentive_params(),
                "model_hash": trainer.model_hash()?,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Predict { config, data } => {
            let trainer = deploy(&config)?;
            let features: Features =
                serde_json::from_str(&data).context("Failed to parse --data as features")?;
            let class = trainer.predict(&features)?;
            let label = trainer
                .classifications()
                .get(class as usize)
                .cloned()
                .unwrap_or_default();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "class": class, "label": label }))?
            );
        }
        Commands::Replay { config, script } => {
            let mut trainer = deploy(&config)?;
            let content = fs::read_to_string(&script)
                .with_context(|| format!("Failed to read script {}", script.display()))?;
            let script: Script =
                serde_json::from_str(&content).context("Failed to parse replay script")?;
            info!("Replaying {} steps", script.steps.len());
            let summary = replay(&mut trainer, &script)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

fn deploy(path: &Path) -> Result<CollaborativeTrainer> {
    let config = DeploymentConfig::load(path)
        .with_context(|| format!("Failed to load deployment config {}", path.display()))?;
    let trainer = Deployment::from_config(&config)
        .context("Failed to build deployment")?
        .finish()
        .context("Failed to finalise deployment")?;
    info!(
        "Deployed '{}' ({} classes, model hash {})",
        trainer.name(),
        trainer.classifications().len(),
        trainer.model_hash()?
    );
    Ok(trainer)
}
