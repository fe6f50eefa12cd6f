//! lakehouse - Bronze to Silver ETL entry point

use clap::{Parser, Subcommand};
use lakehouse_core::SystemClock;
use lakehouse_etl::config::EtlConfig;
use lakehouse_etl::error::Result;
use lakehouse_etl::{jobs, logging, AppState};
use std::path::PathBuf;

/// FHIR lakehouse ETL
#[derive(Parser)]
#[command(name = "lakehouse")]
#[command(version, about = "Bronze to Silver FHIR pipeline with PII masking", long_about = None)]
struct Cli {
    /// Config file (default: lakehouse.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic FHIR bundles into the Bronze layer
    Ingest {
        /// Number of bundles (overrides ingest.batches)
        #[arg(short, long)]
        batches: Option<usize>,
        /// Patients per bundle (overrides ingest.batch_size)
        #[arg(short = 's', long)]
        batch_size: Option<usize>,
        /// Document name prefix (default: fhir_raw_<timestamp>)
        #[arg(short, long)]
        prefix: Option<String>,
    },
    /// Transform one Bronze bundle into the Silver layer
    Silver {
        /// Bronze document name (default: the newest)
        name: Option<String>,
    },
    /// Run the pipeline on built-in records and print before/after
    Demo {
        /// Also write the result to the Silver layer
        #[arg(short, long)]
        save: bool,
    },
    /// List recent pipeline runs
    Runs {
        /// Maximum number of entries
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match EtlConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(&config.log) {
        eprintln!("{}", e);
    }

    if let Err(e) = run(cli.command, config) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands, mut config: EtlConfig) -> Result<()> {
    let clock = SystemClock;

    match command {
        Commands::Ingest {
            batches,
            batch_size,
            prefix,
        } => {
            if let Some(n) = batches {
                config.ingest.batches = n;
            }
            if let Some(n) = batch_size {
                config.ingest.batch_size = n;
            }
            let state = AppState::open(config)?;
            let written = jobs::run_ingest(&state, &clock, prefix.as_deref())?;
            for batch in &written {
                println!("{}  {} resources", batch.name, batch.resources);
            }
        }
        Commands::Silver { name } => {
            let state = AppState::open(config)?;
            let run = jobs::run_silver(&state, &clock, name.as_deref())?;
            println!(
                "{}: {} patients, {} observations, {} dropped",
                run.source,
                run.batch.summary.patients_out,
                run.batch.summary.observations_passed,
                run.dropped()
            );
            println!("{}", serde_json::to_string_pretty(&run.batch.report)?);
        }
        Commands::Demo { save } => {
            let run = jobs::run_demo(&clock, &config.transform)?;
            print!("{}", run.render());
            if save {
                let state = AppState::open(config)?;
                jobs::save_demo(&state, &run)?;
            }
        }
        Commands::Runs { limit } => {
            let state = AppState::open(config)?;
            for entry in jobs::recent_runs(&state, limit)? {
                println!("{}", jobs::format_run(&entry));
            }
        }
    }

    Ok(())
}
