// Match Analysis CLI
// Replays matching engine output and reports execution quality per job

use clap::{Parser, Subcommand};
use match_analysis::{AnalysisConfig, ConfigError};
use std::path::PathBuf;
use tracing::{error, info, Level};

// Load command module from cli directory
#[path = "../cli/commands.rs"]
mod commands;

#[derive(Parser)]
#[command(name = "match-analysis")]
#[command(version = "0.1.0")]
#[command(about = "Execution quality analysis for simulated batch-auction matching", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "analysis.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// List the built-in token table for a chain
    Tokens {
        /// Chain name (ethereum, arbitrum)
        #[arg(long, default_value = "ethereum")]
        chain: String,

        /// Also list the default analysis pairs
        #[arg(short, long)]
        pairs: bool,
    },

    /// Run the configured jobs and aggregate statistics
    Run {
        #[command(flatten)]
        inputs: InputArgs,

        /// Remove price improvement outliers before computing statistics
        #[arg(long)]
        trim_outliers: bool,

        /// Write the statistics rows here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Write the enriched trades of one job
    Enrich {
        #[command(flatten)]
        inputs: InputArgs,

        /// Engine-assigned job id
        #[arg(short, long)]
        job: u64,

        /// Write the enriched trades here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Trades as a JSON array
    #[arg(short, long)]
    trades: PathBuf,

    /// Recorded engine output as a JSON array of jobs
    #[arg(short, long)]
    recorded: PathBuf,

    /// Reference prices as a JSON array
    #[arg(short, long)]
    prices: Option<PathBuf>,
}

impl From<InputArgs> for commands::Inputs {
    fn from(args: InputArgs) -> Self {
        Self {
            trades: args.trades,
            recorded: args.recorded,
            prices: args.prices,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging first (before the full config load so config errors are visible)
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        AnalysisConfig::from_file(&cli.config)
            .ok()
            .and_then(|c| c.log_level().ok())
            .unwrap_or(Level::INFO)
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("🚀 Match Analysis v0.1.0");

    match cli.command {
        // Init and tokens don't require a config
        Commands::Init { force } => {
            commands::init_config(&cli.config, force)?;
        }

        Commands::Tokens { chain, pairs } => {
            commands::list_tokens(&chain, pairs)?;
        }

        Commands::Run { inputs, trim_outliers, out } => {
            let config = load_config_or_exit(&cli.config);
            commands::run_analysis(&config, &inputs.into(), trim_outliers, out.as_deref())?;
        }

        Commands::Enrich { inputs, job, out } => {
            let config = load_config_or_exit(&cli.config);
            commands::enrich_job(&config, &inputs.into(), job, out.as_deref())?;
        }
    }

    Ok(())
}

/// Load config or exit with helpful error message
fn load_config_or_exit(path: &str) -> AnalysisConfig {
    info!("📁 Config: {}", path);
    match AnalysisConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Configuration Error");
            error!("{}", e);

            if matches!(e, ConfigError::FileRead(_)) {
                error!("");
                error!("💡 Quick fix:");
                error!("   1. Run: match-analysis init");
                error!("   2. Edit {} with your jobs", path);
                error!("   3. Try again");
            }

            std::process::exit(1);
        }
    }
}
