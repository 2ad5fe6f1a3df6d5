use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::EngineConfig;
use crate::error::LatticeError;
use crate::lattice::params::LatticeParams;
use crate::lattice::paths::{enumerate_paths, total_probability, PricePath};
use crate::lattice::pricer::{
    backward_induction, risk_neutral_expectation, OptionType, ValuationTable,
};
use crate::lattice::risk_neutral::{
    derive_risk_neutral_probability, rate_out_of_range, RiskNeutralMeasure,
};
use crate::lattice::tree::{build_lattice, BinomialLattice, LatticeNode};
use crate::math::exp_decimal;
use crate::types::*;
use crate::LatticeResult;

#[cfg(feature = "martingale")]
use crate::martingale::{verify_martingale, MartingaleReport};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatticeOutput {
    pub lattice: BinomialLattice,
    pub nodes: Vec<LatticeNode>,
    pub node_count: usize,
    /// Absent when the no-arbitrage condition fails.
    pub p_star: Option<Probability>,
    /// Absent when e^(rΔt) is outside Decimal's range.
    pub growth_factor: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathTableOutput {
    pub steps: u32,
    pub path_count: usize,
    pub paths: Vec<PricePath>,
    pub total_real_world_probability: Probability,
    pub total_risk_neutral_probability: Option<Probability>,
    pub p_star: Option<Probability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionValuation {
    pub option_type: OptionType,
    pub strike: Price,
    pub option_price: Price,
    pub p_star: Probability,
    pub q_star: Probability,
    pub discount_factor: Decimal,
    /// e^(−rT)·Σ p*(path)·payoff over all paths.
    pub risk_neutral_expectation: Price,
    /// The opposite option implied by C − P = S0 − K·e^(−rT).
    pub put_call_parity_price: Price,
    pub table: ValuationTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinomialModelOutput {
    pub params: LatticeParams,
    pub model_valid: bool,
    pub p_star: Option<Probability>,
    pub growth_factor: Option<Decimal>,
    pub lattice: BinomialLattice,
    pub paths: Vec<PricePath>,
    pub valuation: Option<OptionValuation>,
    #[cfg(feature = "martingale")]
    pub martingale: Option<MartingaleReport>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn prepare(
    params: &LatticeParams,
    config: &EngineConfig,
) -> LatticeResult<(BinomialLattice, LatticeResult<RiskNeutralMeasure>)> {
    config.validate()?;
    params.validate(&config.limits)?;
    let lattice = build_lattice(params.s0, params.u, params.d, params.steps)?;
    let measure = derive_risk_neutral_probability(params.u, params.d, params.r, LatticeParams::DT);
    Ok((lattice, measure))
}

/// A model error becomes a warning; any other failure is returned.
fn soften(
    measure: LatticeResult<RiskNeutralMeasure>,
    warnings: &mut Vec<String>,
) -> LatticeResult<Option<RiskNeutralMeasure>> {
    match measure {
        Ok(m) => Ok(Some(m)),
        Err(e @ LatticeError::ModelError { .. }) | Err(e @ LatticeError::DivisionByZero { .. }) => {
            warnings.push(e.to_string());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn growth(params: &LatticeParams) -> Option<Decimal> {
    params
        .r
        .checked_mul(LatticeParams::DT)
        .and_then(exp_decimal)
}

fn value_option(
    params: &LatticeParams,
    lattice: &BinomialLattice,
    measure: &RiskNeutralMeasure,
    paths: &[PricePath],
) -> LatticeResult<OptionValuation> {
    let contract = params.contract();
    let table = backward_induction(lattice, &contract, measure)?;
    let direct = risk_neutral_expectation(paths, &contract, measure, params.steps)?;

    let horizon = params.r * LatticeParams::DT * Decimal::from(params.steps);
    let pv_strike = params.strike * exp_decimal(-horizon).ok_or_else(rate_out_of_range)?;
    let put_call_parity_price = match params.option_type {
        // P = C − S0 + K·e^(−rT)
        OptionType::Call => table.option_price - params.s0 + pv_strike,
        // C = P + S0 − K·e^(−rT)
        OptionType::Put => table.option_price + params.s0 - pv_strike,
    };

    Ok(OptionValuation {
        option_type: params.option_type,
        strike: params.strike,
        option_price: table.option_price,
        p_star: measure.p_star(),
        q_star: measure.q_down(),
        discount_factor: measure.discount_factor(),
        risk_neutral_expectation: direct,
        put_call_parity_price,
        table,
    })
}

fn assumptions(params: &LatticeParams, config: &EngineConfig) -> serde_json::Value {
    serde_json::json!({
        "s0": params.s0.to_string(),
        "u": params.u.to_string(),
        "d": params.d.to_string(),
        "r": params.r.to_string(),
        "dt": LatticeParams::DT.to_string(),
        "steps": params.steps,
        "max_steps": config.limits.max_steps,
        "compounding": "continuous",
    })
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// The price tree alone; p* is attached when admissible.
pub fn analyze_lattice(
    params: &LatticeParams,
    config: &EngineConfig,
) -> LatticeResult<ComputationOutput<LatticeOutput>> {
    let start = Instant::now();
    let (lattice, measure) = prepare(params, config)?;
    let mut warnings = Vec::new();
    let measure = soften(measure, &mut warnings)?;

    let output = LatticeOutput {
        nodes: lattice.nodes(),
        node_count: lattice.node_count(),
        p_star: measure.map(|m| m.p_star()),
        growth_factor: growth(params),
        lattice,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Recombining binomial price lattice",
        &assumptions(params, config),
        warnings,
        elapsed,
        output,
    ))
}

/// All 2^T paths with real-world and, when admissible, risk-neutral
/// probabilities.
pub fn analyze_paths(
    params: &LatticeParams,
    config: &EngineConfig,
) -> LatticeResult<ComputationOutput<PathTableOutput>> {
    let start = Instant::now();
    let (lattice, measure) = prepare(params, config)?;
    let mut warnings = Vec::new();
    let measure = soften(measure, &mut warnings)?;

    let paths = enumerate_paths(
        &lattice,
        params.p_real,
        measure.as_ref(),
        config.limits.max_steps,
    )?;

    let output = PathTableOutput {
        steps: params.steps,
        path_count: paths.len(),
        total_real_world_probability: total_probability(&paths, false)
            .unwrap_or(Decimal::ZERO),
        total_risk_neutral_probability: total_probability(&paths, true),
        p_star: measure.map(|m| m.p_star()),
        paths,
    };

    let mut assumptions = assumptions(params, config);
    assumptions["p_real"] = serde_json::json!(params.p_real.to_string());

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Exhaustive binomial path enumeration",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

/// European option value by backward induction. Fails with `ModelError`
/// when p* is inadmissible.
pub fn price_european_option(
    params: &LatticeParams,
    config: &EngineConfig,
) -> LatticeResult<ComputationOutput<OptionValuation>> {
    let start = Instant::now();
    let (lattice, measure) = prepare(params, config)?;
    let measure = measure?;
    let paths = enumerate_paths(&lattice, params.p_real, Some(&measure), config.limits.max_steps)?;
    let valuation = value_option(params, &lattice, &measure, &paths)?;

    let mut warnings = Vec::new();
    if (valuation.option_price - valuation.risk_neutral_expectation).abs()
        > Decimal::new(1, 9) * params.s0
    {
        warnings.push(format!(
            "backward induction {} differs from path expectation {}",
            valuation.option_price, valuation.risk_neutral_expectation
        ));
    }

    let mut assumptions = assumptions(params, config);
    assumptions["strike"] = serde_json::json!(params.strike.to_string());
    assumptions["option_type"] = serde_json::json!(format!("{:?}", params.option_type));
    assumptions["exercise"] = serde_json::json!("European");

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Backward induction on binomial lattice (risk-neutral)",
        &assumptions,
        warnings,
        elapsed,
        valuation,
    ))
}

/// Lattice, path table and, when the measure is admissible, valuation and
/// martingale check. An inadmissible p* is reported through `model_valid`
/// and the warnings rather than as an error.
pub fn analyze_binomial_model(
    params: &LatticeParams,
    config: &EngineConfig,
) -> LatticeResult<ComputationOutput<BinomialModelOutput>> {
    let start = Instant::now();
    let (lattice, measure) = prepare(params, config)?;
    let mut warnings = Vec::new();
    let measure = soften(measure, &mut warnings)?;

    let paths = enumerate_paths(
        &lattice,
        params.p_real,
        measure.as_ref(),
        config.limits.max_steps,
    )?;

    let valuation = match &measure {
        Some(m) => Some(value_option(params, &lattice, m, &paths)?),
        None => None,
    };

    #[cfg(feature = "martingale")]
    let martingale = measure.as_ref().map(|m| verify_martingale(&lattice, m));

    let output = BinomialModelOutput {
        params: params.clone(),
        model_valid: measure.is_some(),
        p_star: measure.map(|m| m.p_star()),
        growth_factor: growth(params),
        lattice,
        paths,
        valuation,
        #[cfg(feature = "martingale")]
        martingale,
    };

    let mut assumptions = assumptions(params, config);
    assumptions["p_real"] = serde_json::json!(params.p_real.to_string());
    assumptions["strike"] = serde_json::json!(params.strike.to_string());

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Binomial asset pricing model (CRR lattice, risk-neutral valuation)",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
