use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fertiblend_core::{
    defaults::default_targets,
    snapshot::{ReferenceSnapshot, SharedReference},
};
use request::CalculationRequest;
use tracing_subscriber::EnvFilter;

mod config;
mod request;
mod workflow;

#[derive(Parser)]
#[command(name = "fertiblend")]
#[command(about = "Fertigation nutrient-solution design")]
#[command(version)]
struct Cli {
    /// Knowledge-base directory.
    #[arg(long, default_value = "./data/knowledge_base")]
    kb: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute dosages for a request file and write a run directory.
    Calculate {
        #[arg(short, long, default_value = "fertiblend-app/request.yaml")]
        request: String,
        #[arg(short, long, default_value = "./data/runs")]
        output: String,
    },
    /// Show which composition a fertilizer name resolves to.
    Resolve {
        name: String,
        #[arg(long)]
        formula: Option<String>,
    },
    /// Apply the safety caps to a crop profile and report the outcome.
    Caps {
        #[arg(long)]
        profile: Option<String>,
        /// Warn instead of adjusting out-of-range targets.
        #[arg(long)]
        lenient: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    println!("--- Fertiblend ---");
    let reference = SharedReference::new(ReferenceSnapshot::standard().context("Failed to build reference data")?);

    match cli.command {
        Commands::Calculate { request, output } => {
            let calculation = CalculationRequest::from_yaml_file(&request)?;
            let kb = config::KnowledgeBase::load(&cli.kb)?;
            let run_dir = workflow::run_calculation(&calculation, &request, &kb, &reference, &output)?;
            println!("\nCalculation complete. Results are in '{}'", run_dir.display());
        }
        Commands::Resolve { name, formula } => {
            let snapshot = reference.load();
            let found = snapshot.registry.find(&name, formula.as_deref())?;
            let composition = &found.entry.composition;
            println!(
                "'{}' -> {} [{}] via {} match",
                name,
                composition.name(),
                composition.formula(),
                found.strategy
            );
            for (element, fraction) in composition.cations().iter().chain(composition.anions()) {
                println!("  - {:<4} {:>7.3}%", element, fraction);
            }
        }
        Commands::Caps { profile, lenient } => {
            let kb = config::KnowledgeBase::load(&cli.kb)?;
            let targets = match &profile {
                Some(id) => kb
                    .crop_profiles
                    .get(id)
                    .map(|p| p.targets.clone())
                    .with_context(|| format!("Crop profile '{}' not found", id))?,
                None => default_targets(),
            };
            let capped = reference.load().caps.apply(&targets, !lenient);
            for adjustment in &capped.adjustments {
                println!("  * {}: {}", adjustment.element, adjustment.reason);
            }
            for warning in &capped.warnings {
                println!("  [{}] {}: {}", warning.severity, warning.subject, warning.message);
            }
            println!("Safety score: {:.0}", capped.summary.safety_score);
        }
    }

    Ok(())
}
