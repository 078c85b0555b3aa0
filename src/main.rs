use std::time::Instant;

use clap::{Parser, Subcommand};
use job_features_preprocess::{Config, Pipeline, Result, TableWriter};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "job_features_preprocess")]
#[command(about = "Standardize job feature strings for model input", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit statistics on a dataset, persist them and write its features
    Fit {
        dataset: String,
        /// Skip writing the feature table
        #[arg(long)]
        no_write: bool,
    },
    /// Write features of a dataset using previously fitted statistics
    Transform {
        dataset: String,
        /// Skip writing the feature table
        #[arg(long)]
        no_write: bool,
    },
    /// Print the persisted statistics
    ShowStats,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "job_features_preprocess=debug"
    } else {
        "job_features_preprocess=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());

    let log_format = std::env::var("JOB_FEATURES_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    match log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        _ => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

fn execute(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;

    let (dataset, fit, no_write) = match cli.command {
        Commands::Fit { dataset, no_write } => (dataset, true, no_write),
        Commands::Transform { dataset, no_write } => (dataset, false, no_write),
        Commands::ShowStats => {
            let stats = config.statistics_store().load()?;
            println!("{:<24} {:>24} {:>24}", "column", "mean", "std");
            for (column, scaler) in stats.iter() {
                println!("{:<24} {:>24} {:>24}", column.name(), scaler.mean(), scaler.std_dev());
            }
            return Ok(());
        }
    };

    let pipeline = Pipeline::new(config.table_reader()?, config.statistics_store());
    let features = pipeline.run(&dataset, fit)?;

    if !no_write {
        let path = config.table_writer()?.write(&dataset, &features)?;
        info!(path = %path.display(), rows = features.len(), "wrote features");
    }
    Ok(())
}

fn main() {
    let now = Instant::now();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = execute(cli) {
        error!("{}", e);
        std::process::exit(1);
    }

    let elapsed = now.elapsed();
    info!("Elapsed: {:.2?}", elapsed);
}
