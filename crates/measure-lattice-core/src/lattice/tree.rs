use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LatticeError;
use crate::math::pow_decimal;
use crate::types::Price;
use crate::LatticeResult;

/// One node of the recombining tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatticeNode {
    pub t: u32,
    pub up_moves: u32,
    pub down_moves: u32,
    pub price: Price,
}

/// Recombining price tree. `prices[t][i] = S0 · u^i · d^(t−i)` where `i` is
/// the number of up-moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinomialLattice {
    pub s0: Price,
    pub u: Decimal,
    pub d: Decimal,
    pub steps: u32,
    pub prices: Vec<Vec<Price>>,
}

impl BinomialLattice {
    /// Price at time `t` after `up_moves` up-moves, if the node exists.
    pub fn price(&self, t: u32, up_moves: u32) -> Option<Price> {
        self.prices
            .get(t as usize)
            .and_then(|row| row.get(up_moves as usize))
            .copied()
    }

    /// Terminal prices indexed by up-count.
    pub fn terminal_prices(&self) -> &[Price] {
        self.prices.last().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes(&self) -> Vec<LatticeNode> {
        self.prices
            .iter()
            .enumerate()
            .flat_map(|(t, row)| {
                row.iter().enumerate().map(move |(i, price)| LatticeNode {
                    t: t as u32,
                    up_moves: i as u32,
                    down_moves: (t - i) as u32,
                    price: *price,
                })
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.prices.iter().map(Vec::len).sum()
    }
}

pub(crate) fn validate_factors(s0: Price, u: Decimal, d: Decimal) -> LatticeResult<()> {
    if s0 <= Decimal::ZERO {
        return Err(LatticeError::InvalidInput {
            field: "s0".into(),
            reason: "initial price must be positive".into(),
        });
    }
    if u <= Decimal::ZERO {
        return Err(LatticeError::InvalidInput {
            field: "u".into(),
            reason: "up factor must be positive".into(),
        });
    }
    if d <= Decimal::ZERO {
        return Err(LatticeError::InvalidInput {
            field: "d".into(),
            reason: "down factor must be positive".into(),
        });
    }
    Ok(())
}

/// Build the price tree for `t = 0..=steps`, `i = 0..=t`.
pub fn build_lattice(s0: Price, u: Decimal, d: Decimal, steps: u32) -> LatticeResult<BinomialLattice> {
    validate_factors(s0, u, d)?;

    let overflow = || LatticeError::InvalidInput {
        field: "steps".into(),
        reason: format!("node prices overflow Decimal range at {steps} steps"),
    };

    let mut prices = Vec::with_capacity(steps as usize + 1);
    for t in 0..=steps {
        let mut row = Vec::with_capacity(t as usize + 1);
        for i in 0..=t {
            let up = pow_decimal(u, i).ok_or_else(overflow)?;
            let down = pow_decimal(d, t - i).ok_or_else(overflow)?;
            let price = s0
                .checked_mul(up)
                .and_then(|p| p.checked_mul(down))
                .ok_or_else(overflow)?;
            row.push(price);
        }
        prices.push(row);
    }

    tracing::debug!(%s0, %u, %d, steps, "lattice built");

    Ok(BinomialLattice {
        s0,
        u,
        d,
        steps,
        prices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_root_is_s0() {
        let l = build_lattice(dec!(100), dec!(1.25), dec!(0.75), 0).unwrap();
        assert_eq!(l.prices, vec![vec![dec!(100)]]);
        assert_eq!(l.terminal_prices(), &[dec!(100)]);
    }

    #[test]
    fn test_three_step_terminal_prices() {
        let l = build_lattice(dec!(100), dec!(1.25), dec!(0.75), 3).unwrap();
        // up-counts 0..=3
        assert_eq!(
            l.terminal_prices(),
            &[dec!(42.1875), dec!(70.3125), dec!(117.1875), dec!(195.3125)]
        );
        assert_eq!(l.price(1, 1), Some(dec!(125)));
        assert_eq!(l.price(1, 0), Some(dec!(75)));
        assert_eq!(l.price(2, 1), Some(dec!(93.75)));
        assert_eq!(l.price(2, 3), None);
        assert_eq!(l.price(4, 0), None);
    }

    #[test]
    fn test_recombination() {
        let l = build_lattice(dec!(50), dec!(1.1), dec!(0.9), 4).unwrap();
        for t in 0..4u32 {
            for i in 0..=t {
                let p = l.price(t, i).unwrap();
                // up then down equals down then up
                assert_eq!(l.price(t + 1, i + 1).unwrap(), p * dec!(1.1));
                assert_eq!(l.price(t + 1, i).unwrap(), p * dec!(0.9));
            }
        }
    }

    #[test]
    fn test_nodes_listing() {
        let l = build_lattice(dec!(100), dec!(1.2), dec!(0.8), 2).unwrap();
        assert_eq!(l.node_count(), 6);
        let nodes = l.nodes();
        assert_eq!(nodes.len(), 6);
        assert_eq!(
            nodes[4],
            LatticeNode {
                t: 2,
                up_moves: 1,
                down_moves: 1,
                price: dec!(96),
            }
        );
    }

    #[test]
    fn test_invalid_factors() {
        assert!(build_lattice(dec!(0), dec!(1.2), dec!(0.8), 2).is_err());
        assert!(build_lattice(dec!(100), dec!(-1.2), dec!(0.8), 2).is_err());
        assert!(build_lattice(dec!(100), dec!(1.2), dec!(0), 2).is_err());
    }

    #[test]
    fn test_overflow_reported() {
        assert!(build_lattice(dec!(1000000), dec!(1000000), dec!(0.5), 8).is_err());
    }
}
