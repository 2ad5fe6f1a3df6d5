//! Martingale check of the discounted price process under p*.
//!
//! At every non-terminal node the one-step conditional expectation of the
//! next price, discounted by e^(−rΔt), must return the node price. The
//! marginal distribution of S_t under p* is reported alongside, together
//! with its mean against the forward S0·e^(rt).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::EngineConfig;
use crate::lattice::params::LatticeParams;
use crate::lattice::risk_neutral::{derive_risk_neutral_probability, RiskNeutralMeasure};
use crate::lattice::tree::{build_lattice, BinomialLattice};
use crate::math::{binomial_coefficient, exp_decimal, pow_decimal};
use crate::types::*;
use crate::LatticeResult;

/// Relative tolerance on the discounted one-step expectation.
pub const MARTINGALE_TOLERANCE: Decimal = dec!(0.000000001);

/// Absolute tolerance for calling the undiscounted process a martingale.
pub const UNDISCOUNTED_TOLERANCE: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCheck {
    pub t: u32,
    pub up_moves: u32,
    pub price: Price,
    /// p*·S·u + (1 − p*)·S·d
    pub expected_next: Price,
    pub discounted_expectation: Price,
    pub deviation: Decimal,
    pub holds: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionPoint {
    pub up_moves: u32,
    pub price: Price,
    pub probability: Probability,
}

/// Law of S_t under p*.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDistribution {
    pub t: u32,
    pub points: Vec<DistributionPoint>,
    pub expected_price: Price,
    /// S0·e^(r·t·Δt); absent when it does not fit in a Decimal.
    pub forward_price: Option<Price>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MartingaleReport {
    pub p_star: Probability,
    pub q_star: Probability,
    pub growth_factor: Decimal,
    pub nodes: Vec<NodeCheck>,
    pub holds: bool,
    pub distributions: Vec<TimeDistribution>,
    /// E*[S_1] before discounting.
    pub expected_first_step: Price,
    pub undiscounted_martingale: bool,
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

pub fn verify_martingale(
    lattice: &BinomialLattice,
    measure: &RiskNeutralMeasure,
) -> MartingaleReport {
    let p = measure.p_star();
    let q = measure.q_down();
    let disc = measure.discount_factor();

    let mut nodes = Vec::new();
    for (t, row) in lattice.prices.iter().enumerate().take(lattice.steps as usize) {
        for (i, &price) in row.iter().enumerate() {
            let expected_next = p * price * lattice.u + q * price * lattice.d;
            let discounted_expectation = disc * expected_next;
            let deviation = discounted_expectation - price;
            nodes.push(NodeCheck {
                t: t as u32,
                up_moves: i as u32,
                price,
                expected_next,
                discounted_expectation,
                deviation,
                holds: deviation.abs() <= MARTINGALE_TOLERANCE * price,
            });
        }
    }
    let holds = nodes.iter().all(|n| n.holds);
    if !holds {
        tracing::warn!(p_star = %p, "discounted price process is not a martingale");
    }

    let distributions = lattice
        .prices
        .iter()
        .enumerate()
        .map(|(t, row)| {
            let t = t as u32;
            let points: Vec<DistributionPoint> = row
                .iter()
                .enumerate()
                .map(|(i, &price)| {
                    let i = i as u32;
                    // p, q <= 1 so the powers cannot overflow
                    let weight = pow_decimal(p, i).unwrap_or(Decimal::ZERO)
                        * pow_decimal(q, t - i).unwrap_or(Decimal::ZERO);
                    DistributionPoint {
                        up_moves: i,
                        price,
                        probability: binomial_coefficient(t, i) * weight,
                    }
                })
                .collect();
            let expected_price = points.iter().map(|pt| pt.probability * pt.price).sum();
            let horizon = measure.rate() * measure.dt() * Decimal::from(t);
            TimeDistribution {
                t,
                points,
                expected_price,
                forward_price: exp_decimal(horizon).and_then(|g| lattice.s0.checked_mul(g)),
            }
        })
        .collect();

    let expected_first_step = lattice.s0 * (p * lattice.u + q * lattice.d);

    MartingaleReport {
        p_star: p,
        q_star: q,
        growth_factor: measure.growth_factor(),
        nodes,
        holds,
        distributions,
        expected_first_step,
        undiscounted_martingale: (expected_first_step - lattice.s0).abs() < UNDISCOUNTED_TOLERANCE,
    }
}

/// Build the lattice from `params`, derive p* and verify. Fails with
/// `ModelError` when p* is inadmissible.
pub fn analyze_martingale(
    params: &LatticeParams,
    config: &EngineConfig,
) -> LatticeResult<ComputationOutput<MartingaleReport>> {
    let start = Instant::now();
    config.validate()?;
    params.validate(&config.limits)?;

    let lattice = build_lattice(params.s0, params.u, params.d, params.steps)?;
    let measure = derive_risk_neutral_probability(params.u, params.d, params.r, LatticeParams::DT)?;
    let report = verify_martingale(&lattice, &measure);

    let mut warnings = Vec::new();
    if report.undiscounted_martingale {
        warnings.push("price process is a martingale even before discounting".to_string());
    }

    let assumptions = serde_json::json!({
        "s0": params.s0.to_string(),
        "u": params.u.to_string(),
        "d": params.d.to_string(),
        "r": params.r.to_string(),
        "steps": params.steps,
        "dt": LatticeParams::DT.to_string(),
        "tolerance": "1e-9 relative to node price",
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Discounted price martingale check under risk-neutral measure",
        &assumptions,
        warnings,
        elapsed,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
