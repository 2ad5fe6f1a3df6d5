use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LatticeError;
use crate::lattice::paths::PricePath;
use crate::lattice::risk_neutral::{check_probability, rate_out_of_range, RiskNeutralMeasure};
use crate::lattice::tree::BinomialLattice;
use crate::math::exp_decimal;
use crate::types::{Price, Probability, Rate};
use crate::LatticeResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    #[default]
    Call,
    Put,
}

/// European claim paid at the terminal nodes only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionContract {
    pub strike: Price,
    #[serde(default)]
    pub option_type: OptionType,
}

impl OptionContract {
    pub fn call(strike: Price) -> Self {
        Self {
            strike,
            option_type: OptionType::Call,
        }
    }

    pub fn put(strike: Price) -> Self {
        Self {
            strike,
            option_type: OptionType::Put,
        }
    }

    pub fn payoff(&self, price: Price) -> Price {
        match self.option_type {
            OptionType::Call => (price - self.strike).max(Decimal::ZERO),
            OptionType::Put => (self.strike - price).max(Decimal::ZERO),
        }
    }

    pub fn in_the_money(&self, price: Price) -> bool {
        self.payoff(price) > Decimal::ZERO
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalPayoff {
    pub up_moves: u32,
    pub price: Price,
    pub payoff: Price,
    pub in_the_money: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationNode {
    pub t: u32,
    pub up_moves: u32,
    pub price: Price,
    pub value: Price,
}

/// Discounted expected value at every node; `values[t][i]`, `i` = up-count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationTable {
    pub option_price: Price,
    pub values: Vec<Vec<Price>>,
    pub nodes: Vec<ValuationNode>,
    pub terminal_payoffs: Vec<TerminalPayoff>,
}

impl ValuationTable {
    pub fn value(&self, t: u32, up_moves: u32) -> Option<Price> {
        self.values
            .get(t as usize)
            .and_then(|row| row.get(up_moves as usize))
            .copied()
    }
}

// ---------------------------------------------------------------------------
// Backward induction
// ---------------------------------------------------------------------------

/// Value `contract` on `lattice` under a validated measure.
///
/// From node `(t, i)` an up-move reaches `(t+1, i+1)` and a down-move
/// reaches `(t+1, i)`, because `i` counts up-moves. With that indexing
/// `V(t,i) = e^(−rΔt) · (p*·V(t+1,i+1) + (1−p*)·V(t+1,i))`.
pub fn backward_induction(
    lattice: &BinomialLattice,
    contract: &OptionContract,
    measure: &RiskNeutralMeasure,
) -> LatticeResult<ValuationTable> {
    induct(
        lattice,
        contract,
        measure.p_star(),
        measure.discount_factor(),
    )
}

/// Same as [`backward_induction`] with a caller-supplied p* and rate,
/// refusing any p* outside [0, 1].
pub fn price_with_probability(
    lattice: &BinomialLattice,
    contract: &OptionContract,
    p_star: Probability,
    r: Rate,
) -> LatticeResult<ValuationTable> {
    check_probability(p_star, lattice.u, lattice.d, r)?;
    let discount = exp_decimal(-r).ok_or_else(rate_out_of_range)?;
    induct(lattice, contract, p_star, discount)
}

fn induct(
    lattice: &BinomialLattice,
    contract: &OptionContract,
    p_star: Probability,
    discount: Decimal,
) -> LatticeResult<ValuationTable> {
    if lattice.prices.len() != lattice.steps as usize + 1 {
        return Err(LatticeError::InvalidInput {
            field: "lattice".into(),
            reason: "lattice has not been built for its step count".into(),
        });
    }
    if contract.strike < Decimal::ZERO {
        return Err(LatticeError::InvalidInput {
            field: "strike".into(),
            reason: "must be non-negative".into(),
        });
    }

    let q = Decimal::ONE - p_star;
    let steps = lattice.steps as usize;

    let terminal: Vec<Price> = lattice
        .terminal_prices()
        .iter()
        .map(|&price| contract.payoff(price))
        .collect();

    let mut values: Vec<Vec<Price>> = vec![Vec::new(); steps + 1];
    values[steps] = terminal;
    for t in (0..steps).rev() {
        let next = &values[t + 1];
        let row: Vec<Price> = (0..=t)
            .map(|i| discount * (p_star * next[i + 1] + q * next[i]))
            .collect();
        values[t] = row;
    }

    let option_price = values[0][0];

    let nodes = values
        .iter()
        .enumerate()
        .flat_map(|(t, row)| {
            let prices = &lattice.prices[t];
            row.iter().enumerate().map(move |(i, value)| ValuationNode {
                t: t as u32,
                up_moves: i as u32,
                price: prices[i],
                value: *value,
            })
        })
        .collect();

    let terminal_payoffs = lattice
        .terminal_prices()
        .iter()
        .enumerate()
        .map(|(i, &price)| TerminalPayoff {
            up_moves: i as u32,
            price,
            payoff: contract.payoff(price),
            in_the_money: contract.in_the_money(price),
        })
        .collect();

    tracing::debug!(%option_price, %p_star, steps, "backward induction complete");

    Ok(ValuationTable {
        option_price,
        values,
        nodes,
        terminal_payoffs,
    })
}

/// e^(−r·T·Δt) · Σ p*(path) · payoff(terminal price): the same value as
/// backward induction, summed over paths instead of nodes.
pub fn risk_neutral_expectation(
    paths: &[PricePath],
    contract: &OptionContract,
    measure: &RiskNeutralMeasure,
    steps: u32,
) -> LatticeResult<Price> {
    let mut expected = Decimal::ZERO;
    for path in paths {
        let q = path
            .risk_neutral_probability
            .ok_or_else(|| LatticeError::InvalidInput {
                field: "paths".into(),
                reason: "paths were enumerated without a risk-neutral measure".into(),
            })?;
        expected += q * contract.payoff(path.terminal_price);
    }
    let horizon = measure.rate() * measure.dt() * Decimal::from(steps);
    let discount = exp_decimal(-horizon).ok_or_else(rate_out_of_range)?;
    Ok(discount * expected)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
