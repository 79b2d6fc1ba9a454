// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use will_it_fit::MeasurementMode;

mod cli;

#[derive(Parser)]
#[command(name = "will-it-fit")]
#[command(about = "Check whether a product fits through a door or into a space")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Configuration file (default: ~/.config/will-it-fit/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tap protocol for a measurement mode
    Steps {
        #[arg(short, long, value_enum, default_value = "door")]
        mode: ModeArg,
    },

    /// List products in the catalog
    Products {
        /// Catalog file (default: configured catalog or built-in list)
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },

    /// Replay a recorded scenario and print the verdict
    Replay {
        /// Scenario JSON file
        scenario: PathBuf,

        /// Product id, overriding the one in the scenario
        #[arg(short, long)]
        product: Option<String>,

        /// Catalog file (default: configured catalog or built-in list)
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Door,
    Space,
    Placement,
}

impl From<ModeArg> for MeasurementMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Door => MeasurementMode::Door,
            ModeArg::Space => MeasurementMode::Space,
            ModeArg::Placement => MeasurementMode::VirtualPlacement,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=will_it_fit=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Steps { mode } => cli::print_steps(mode.into()),
        Commands::Products { catalog } => cli::list_products(&config, catalog),
        Commands::Replay {
            scenario,
            product,
            catalog,
        } => cli::replay(&config, &scenario, product, catalog),
        Commands::Config => cli::print_config(&config),
    }?;

    Ok(())
}
