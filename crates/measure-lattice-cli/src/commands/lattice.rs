use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use measure_lattice_core::lattice::model;
use measure_lattice_core::lattice::params::LatticeParams;
use measure_lattice_core::lattice::pricer::OptionType;
use measure_lattice_core::martingale;
use measure_lattice_core::EngineConfig;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OptionKind {
    Call,
    Put,
}

impl From<OptionKind> for OptionType {
    fn from(kind: OptionKind) -> Self {
        match kind {
            OptionKind::Call => OptionType::Call,
            OptionKind::Put => OptionType::Put,
        }
    }
}

/// Arguments shared by every lattice computation. Unset flags fall back to
/// the three-step reference model.
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct LatticeArgs {
    /// Initial asset price S0
    #[arg(long)]
    pub s0: Option<Decimal>,

    /// Up factor per step (e.g. 1.25)
    #[arg(long)]
    pub up: Option<Decimal>,

    /// Down factor per step (e.g. 0.75)
    #[arg(long)]
    pub down: Option<Decimal>,

    /// Continuously compounded risk-free rate per step (e.g. 0.05 for 5%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Number of steps T
    #[arg(long)]
    pub steps: Option<u32>,

    /// Strike price K
    #[arg(long)]
    pub strike: Option<Decimal>,

    /// Real-world probability of an up-move
    #[arg(long)]
    pub p_real: Option<Decimal>,

    /// Option type
    #[arg(long)]
    pub option_type: Option<OptionKind>,

    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

fn resolve_params(args: LatticeArgs) -> Result<LatticeParams, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        return input::file::read_structured(path);
    }
    if let Some(data) = input::stdin::read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }

    let defaults = LatticeParams::default();
    Ok(LatticeParams {
        s0: args.s0.unwrap_or(defaults.s0),
        u: args.up.unwrap_or(defaults.u),
        d: args.down.unwrap_or(defaults.d),
        r: args.rate.unwrap_or(defaults.r),
        steps: args.steps.unwrap_or(defaults.steps),
        strike: args.strike.unwrap_or(defaults.strike),
        p_real: args.p_real.unwrap_or(defaults.p_real),
        option_type: args
            .option_type
            .map(OptionType::from)
            .unwrap_or(defaults.option_type),
    })
}

pub fn run_lattice(
    args: LatticeArgs,
    config: Option<EngineConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let params = resolve_params(args)?;
    let result = model::analyze_lattice(&params, &config.unwrap_or_default())?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_paths(
    args: LatticeArgs,
    config: Option<EngineConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let params = resolve_params(args)?;
    let result = model::analyze_paths(&params, &config.unwrap_or_default())?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_price_option(
    args: LatticeArgs,
    config: Option<EngineConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let params = resolve_params(args)?;
    let result = model::price_european_option(&params, &config.unwrap_or_default())?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_martingale(
    args: LatticeArgs,
    config: Option<EngineConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let params = resolve_params(args)?;
    let result = martingale::analyze_martingale(&params, &config.unwrap_or_default())?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_binomial_model(
    args: LatticeArgs,
    config: Option<EngineConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let params = resolve_params(args)?;
    let result = model::analyze_binomial_model(&params, &config.unwrap_or_default())?;
    Ok(serde_json::to_value(result)?)
}
