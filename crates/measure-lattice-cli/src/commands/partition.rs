use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;

use measure_lattice_core::partition::grid::atom_label;
use measure_lattice_core::partition::session::{self, PartitionInput};
use measure_lattice_core::partition::sigma::{self, SigmaAlgebraInput};
use measure_lattice_core::EngineConfig;

use crate::input;

/// Arguments for a grid partition
#[derive(Args)]
pub struct PartitionArgs {
    /// Width of the sample-space rectangle
    #[arg(long, default_value = "560")]
    pub width: Decimal,

    /// Height of the sample-space rectangle
    #[arg(long, default_value = "360")]
    pub height: Decimal,

    /// Vertical cut coordinates (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub vertical: Vec<Decimal>,

    /// Horizontal cut coordinates (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub horizontal: Vec<Decimal>,

    /// Random-variable value for an atom, as INDEX=VALUE (repeatable, 1-based)
    #[arg(long = "value", value_parser = parse_assignment)]
    pub values: Vec<(usize, Decimal)>,

    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for sigma-algebra enumeration
#[derive(Args)]
pub struct SigmaAlgebraArgs {
    /// Sample-space item labels (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub items: Vec<String>,

    /// Generate labels A1..An instead of listing items
    #[arg(long, conflicts_with = "items")]
    pub count: Option<usize>,

    /// A generating block of item labels, comma-separated (repeatable)
    #[arg(long = "block")]
    pub blocks: Vec<String>,

    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

fn parse_assignment(raw: &str) -> Result<(usize, Decimal), String> {
    let (index, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=VALUE, got '{raw}'"))?;
    let index: usize = index
        .trim()
        .parse()
        .map_err(|e| format!("bad atom index '{index}': {e}"))?;
    let value: Decimal = value
        .trim()
        .parse()
        .map_err(|e| format!("bad value '{value}': {e}"))?;
    Ok((index, value))
}

pub fn run_partition(
    args: PartitionArgs,
    config: Option<EngineConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut partition_input: PartitionInput = if let Some(ref path) = args.input {
        input::file::read_structured(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        PartitionInput {
            width: args.width,
            height: args.height,
            vertical_cuts: args.vertical,
            horizontal_cuts: args.horizontal,
            values: args.values.into_iter().collect::<BTreeMap<_, _>>(),
            config: EngineConfig::default(),
        }
    };
    if let Some(config) = config {
        partition_input.config = config;
    }

    let result = session::analyze_partition(&partition_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_sigma_algebra(
    args: SigmaAlgebraArgs,
    config: Option<EngineConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut sigma_input: SigmaAlgebraInput = if let Some(ref path) = args.input {
        input::file::read_structured(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let items: Vec<String> = match args.count {
            Some(n) => (1..=n).map(atom_label).collect(),
            None if !args.items.is_empty() => args.items,
            None => return Err("--items, --count, --input or stdin required".into()),
        };
        let blocks = if args.blocks.is_empty() {
            None
        } else {
            Some(
                args.blocks
                    .iter()
                    .map(|b| b.split(',').map(|s| s.trim().to_string()).collect())
                    .collect(),
            )
        };
        SigmaAlgebraInput {
            items,
            blocks,
            config: EngineConfig::default(),
        }
    };
    if let Some(config) = config {
        sigma_input.config = config;
    }

    let result = sigma::analyze_sigma_algebra(&sigma_input)?;
    Ok(serde_json::to_value(result)?)
}
