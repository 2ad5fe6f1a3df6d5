use clap::Args;
use serde_json::Value;

use measure_lattice_core::filtration::{self, FiltrationInput};
use measure_lattice_core::EngineConfig;

use crate::input;

/// Arguments for a filtration
#[derive(Args)]
pub struct FiltrationArgs {
    /// Build the natural filtration of this many coin moves instead of reading steps
    #[arg(long)]
    pub binomial_steps: Option<u32>,

    /// Path to JSON or YAML input file with universe and steps
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_filtration(
    args: FiltrationArgs,
    config: Option<EngineConfig>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut filtration_input: FiltrationInput = if let Some(steps) = args.binomial_steps {
        let limits = config.as_ref().map(|c| c.limits).unwrap_or_default();
        filtration::binomial_filtration(steps, &limits)?
    } else if let Some(ref path) = args.input {
        input::file::read_structured(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--binomial-steps, --input <file> or stdin required for filtration".into());
    };
    if let Some(config) = config {
        filtration_input.config = config;
    }

    let result = filtration::analyze_filtration(&filtration_input)?;
    Ok(serde_json::to_value(result)?)
}
