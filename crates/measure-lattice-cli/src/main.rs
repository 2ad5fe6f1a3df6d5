mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use measure_lattice_core::EngineConfig;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::filtration::FiltrationArgs;
use commands::lattice::LatticeArgs;
use commands::partition::{PartitionArgs, SigmaAlgebraArgs};

/// Finite measurable spaces and binomial option pricing
#[derive(Parser)]
#[command(
    name = "mlat",
    version,
    about = "Finite measurable spaces and binomial option pricing",
    long_about = "A CLI for partitioning a sample space into atoms, enumerating the \
                  generated sigma-algebras and filtrations, and pricing European \
                  options on a recombining binomial lattice with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (cut policy and enumeration limits), JSON or YAML
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log engine events at debug level to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Partition a rectangle with cut lines and summarise its atoms
    Partition(PartitionArgs),
    /// Enumerate the power set or a partition-generated sigma-algebra
    SigmaAlgebra(SigmaAlgebraArgs),
    /// Build the recombining price lattice
    Lattice(LatticeArgs),
    /// Enumerate every price path with its probabilities
    Paths(LatticeArgs),
    /// Price a European option by backward induction
    PriceOption(LatticeArgs),
    /// Verify the discounted price process is a martingale under p*
    Martingale(LatticeArgs),
    /// Full binomial model: lattice, paths, valuation and martingale check
    BinomialModel(LatticeArgs),
    /// Build a filtration of partition-generated sigma-algebras
    Filtration(FiltrationArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "measure_lattice_core=debug,mlat=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match cli.config.as_deref().map(input::file::read_structured::<EngineConfig>) {
        Some(Ok(config)) => Some(config),
        Some(Err(e)) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
        None => None,
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Partition(args) => commands::partition::run_partition(args, config),
        Commands::SigmaAlgebra(args) => commands::partition::run_sigma_algebra(args, config),
        Commands::Lattice(args) => commands::lattice::run_lattice(args, config),
        Commands::Paths(args) => commands::lattice::run_paths(args, config),
        Commands::PriceOption(args) => commands::lattice::run_price_option(args, config),
        Commands::Martingale(args) => commands::lattice::run_martingale(args, config),
        Commands::BinomialModel(args) => commands::lattice::run_binomial_model(args, config),
        Commands::Filtration(args) => commands::filtration::run_filtration(args, config),
        Commands::Version => {
            println!("mlat {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
