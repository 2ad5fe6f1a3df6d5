use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enumerate::BinaryEnumerator;
use crate::error::LatticeError;
use crate::lattice::risk_neutral::RiskNeutralMeasure;
use crate::lattice::tree::BinomialLattice;
use crate::types::{Price, Probability};
use crate::LatticeResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    Up,
    Down,
}

impl Move {
    pub fn symbol(self) -> char {
        match self {
            Move::Up => 'U',
            Move::Down => 'D',
        }
    }
}

/// One of the 2^T move sequences through the lattice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePath {
    /// Bit k set means step k moved up.
    pub mask: u64,
    /// e.g. "UUD", step 0 first.
    pub moves: String,
    pub up_moves: u32,
    pub terminal_price: Price,
    pub real_world_probability: Probability,
    /// Absent when no valid risk-neutral measure was available.
    pub risk_neutral_probability: Option<Probability>,
}

#[derive(Clone)]
struct PathAccumulator {
    moves: String,
    up_moves: u32,
    price: Price,
    real: Probability,
    star: Option<Probability>,
}

/// Enumerate every path of `lattice.steps` moves, multiplying in the price
/// factor and both step probabilities in step order, then sort by descending
/// terminal price (ties keep mask order).
pub fn enumerate_paths(
    lattice: &BinomialLattice,
    p_real: Probability,
    measure: Option<&RiskNeutralMeasure>,
    max_steps: u32,
) -> LatticeResult<Vec<PricePath>> {
    if p_real < Decimal::ZERO || p_real > Decimal::ONE {
        return Err(LatticeError::InvalidInput {
            field: "p_real".into(),
            reason: "real-world probability must be in [0, 1]".into(),
        });
    }
    let enumerator = BinaryEnumerator::new(lattice.steps, max_steps, "steps")?;

    let q_real = Decimal::ONE - p_real;
    let star = measure.map(|m| (m.p_star(), m.q_down()));

    let seed = PathAccumulator {
        moves: String::with_capacity(lattice.steps as usize),
        up_moves: 0,
        price: lattice.s0,
        real: Decimal::ONE,
        star: star.map(|_| Decimal::ONE),
    };

    let folded = enumerator.fold(seed, |mut acc, _, up| {
        let step = if up { Move::Up } else { Move::Down };
        acc.moves.push(step.symbol());
        match step {
            Move::Up => {
                acc.up_moves += 1;
                acc.price *= lattice.u;
                acc.real *= p_real;
                if let (Some(p), Some((p_up, _))) = (acc.star.as_mut(), star) {
                    *p *= p_up;
                }
            }
            Move::Down => {
                acc.price *= lattice.d;
                acc.real *= q_real;
                if let (Some(p), Some((_, p_down))) = (acc.star.as_mut(), star) {
                    *p *= p_down;
                }
            }
        }
        acc
    });

    let mut paths: Vec<PricePath> = folded
        .into_iter()
        .map(|(mask, acc)| PricePath {
            mask,
            moves: acc.moves,
            up_moves: acc.up_moves,
            terminal_price: acc.price,
            real_world_probability: acc.real,
            risk_neutral_probability: acc.star,
        })
        .collect();

    paths.sort_by(|a, b| b.terminal_price.cmp(&a.terminal_price));
    Ok(paths)
}

/// Σ probability over all paths for the chosen column.
pub fn total_probability(paths: &[PricePath], risk_neutral: bool) -> Option<Probability> {
    if risk_neutral {
        paths.iter().map(|p| p.risk_neutral_probability).sum()
    } else {
        Some(paths.iter().map(|p| p.real_world_probability).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::risk_neutral::derive_risk_neutral_probability;
    use crate::lattice::tree::build_lattice;
    use rust_decimal_macros::dec;

    fn approx_eq(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        (a - b).abs() < tol
    }

    fn reference() -> (BinomialLattice, RiskNeutralMeasure) {
        let lattice = build_lattice(dec!(100), dec!(1.25), dec!(0.75), 3).unwrap();
        let m = derive_risk_neutral_probability(dec!(1.25), dec!(0.75), dec!(0.05), Decimal::ONE)
            .unwrap();
        (lattice, m)
    }

    #[test]
    fn test_path_count_and_order() {
        let (lattice, m) = reference();
        let paths = enumerate_paths(&lattice, dec!(0.5), Some(&m), 16).unwrap();
        assert_eq!(paths.len(), 8);
        assert_eq!(paths[0].moves, "UUU");
        assert_eq!(paths[0].terminal_price, dec!(195.3125));
        assert_eq!(paths[7].moves, "DDD");
        assert_eq!(paths[7].terminal_price, dec!(42.1875));
        assert!(paths
            .windows(2)
            .all(|w| w[0].terminal_price >= w[1].terminal_price));
    }

    #[test]
    fn test_ties_keep_mask_order() {
        let (lattice, m) = reference();
        let paths = enumerate_paths(&lattice, dec!(0.5), Some(&m), 16).unwrap();
        // the three two-up paths, mask 3 (UUD), 5 (UDU), 6 (DUU)
        let two_up: Vec<&str> = paths
            .iter()
            .filter(|p| p.up_moves == 2)
            .map(|p| p.moves.as_str())
            .collect();
        assert_eq!(two_up, vec!["UUD", "UDU", "DUU"]);
        assert!(paths[1..4].iter().all(|p| p.terminal_price == dec!(117.1875)));
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (lattice, m) = reference();
        let paths = enumerate_paths(&lattice, dec!(0.3), Some(&m), 16).unwrap();
        let tol = dec!(0.000000001);
        assert!(approx_eq(total_probability(&paths, false).unwrap(), Decimal::ONE, tol));
        assert!(approx_eq(total_probability(&paths, true).unwrap(), Decimal::ONE, tol));
        assert_eq!(paths[0].real_world_probability, dec!(0.027));
    }

    #[test]
    fn test_terminal_price_matches_lattice() {
        let (lattice, m) = reference();
        for path in enumerate_paths(&lattice, dec!(0.5), Some(&m), 16).unwrap() {
            assert_eq!(Some(path.terminal_price), lattice.price(3, path.up_moves));
        }
    }

    #[test]
    fn test_without_measure_risk_neutral_column_absent() {
        let (lattice, _) = reference();
        let paths = enumerate_paths(&lattice, dec!(0.5), None, 16).unwrap();
        assert!(paths.iter().all(|p| p.risk_neutral_probability.is_none()));
        assert_eq!(total_probability(&paths, true), None);
    }

    #[test]
    fn test_zero_steps_single_empty_path() {
        let lattice = build_lattice(dec!(100), dec!(1.25), dec!(0.75), 0).unwrap();
        let paths = enumerate_paths(&lattice, dec!(0.5), None, 16).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].moves, "");
        assert_eq!(paths[0].terminal_price, dec!(100));
        assert_eq!(paths[0].real_world_probability, Decimal::ONE);
    }

    #[test]
    fn test_step_limit_and_bad_probability() {
        let lattice = build_lattice(dec!(100), dec!(1.1), dec!(0.9), 10).unwrap();
        assert!(matches!(
            enumerate_paths(&lattice, dec!(0.5), None, 8),
            Err(LatticeError::LimitExceeded { .. })
        ));
        assert!(matches!(
            enumerate_paths(&lattice, dec!(1.5), None, 16),
            Err(LatticeError::InvalidInput { .. })
        ));
    }
}
