use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::LatticeError;
use crate::math::exp_decimal;
use crate::types::{Probability, Rate};
use crate::LatticeResult;

/// A risk-neutral measure that satisfied the no-arbitrage check.
///
/// The only constructor is [`derive_risk_neutral_probability`], so holding a
/// value of this type means `0 <= p_star <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskNeutralMeasure {
    p_star: Probability,
    growth_factor: Decimal,
    discount_factor: Decimal,
    rate: Rate,
    dt: Decimal,
}

impl RiskNeutralMeasure {
    pub fn p_star(&self) -> Probability {
        self.p_star
    }

    pub fn q_down(&self) -> Probability {
        Decimal::ONE - self.p_star
    }

    /// e^(r·Δt)
    pub fn growth_factor(&self) -> Decimal {
        self.growth_factor
    }

    /// e^(−r·Δt)
    pub fn discount_factor(&self) -> Decimal {
        self.discount_factor
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    pub fn dt(&self) -> Decimal {
        self.dt
    }
}

/// Raw p* = (e^(r·Δt) − d) / (u − d), unchecked against [0, 1].
///
/// When either e^(r·Δt) or the quotient leaves Decimal's range the true p*
/// is far outside [0, 1], so the result is a `ModelError` carrying
/// `Decimal::MAX` or `Decimal::MIN` on the side p* lies.
pub fn raw_risk_neutral_probability(
    u: Decimal,
    d: Decimal,
    r: Rate,
    dt: Decimal,
) -> LatticeResult<(Probability, Decimal)> {
    if u == d {
        return Err(LatticeError::DivisionByZero {
            context: "risk-neutral probability (u == d)".into(),
        });
    }
    let exponent = r.checked_mul(dt).ok_or_else(rate_out_of_range)?;
    let growth = match exp_decimal(exponent) {
        Some(g) => g,
        None => {
            return Err(LatticeError::ModelError {
                p_star: unbounded_p_star(Decimal::ONE, u, d),
                growth_factor: Decimal::MAX,
                u,
                d,
            })
        }
    };
    let numerator = growth.saturating_sub(d);
    match numerator.checked_div(u.saturating_sub(d)) {
        Some(p_star) => Ok((p_star, growth)),
        None => Err(LatticeError::ModelError {
            p_star: unbounded_p_star(numerator, u, d),
            growth_factor: growth,
            u,
            d,
        }),
    }
}

/// Stand-in for a p* too large to represent; only its sign is meaningful.
fn unbounded_p_star(numerator: Decimal, u: Decimal, d: Decimal) -> Probability {
    if numerator.is_sign_negative() == (u < d) {
        Decimal::MAX
    } else {
        Decimal::MIN
    }
}

pub(crate) fn rate_out_of_range() -> LatticeError {
    LatticeError::InvalidInput {
        field: "r".into(),
        reason: "rate puts e^(±r·Δt) outside the representable range".into(),
    }
}

/// Solve p*·u + (1 − p*)·d = e^(r·Δt) and enforce 0 ≤ p* ≤ 1.
///
/// An inverted tree (u < d) is rejected even when the formula happens to
/// land in [0, 1]: the labels "up" and "down" would be swapped and
/// d ≤ e^(r·Δt) ≤ u cannot hold.
pub fn derive_risk_neutral_probability(
    u: Decimal,
    d: Decimal,
    r: Rate,
    dt: Decimal,
) -> LatticeResult<RiskNeutralMeasure> {
    if dt <= Decimal::ZERO {
        return Err(LatticeError::InvalidInput {
            field: "dt".into(),
            reason: "time step must be positive".into(),
        });
    }
    let (p_star, growth_factor) = match raw_risk_neutral_probability(u, d, r, dt) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(%u, %d, %r, "no-arbitrage condition violated: {e}");
            return Err(e);
        }
    };
    if u < d || p_star < Decimal::ZERO || p_star > Decimal::ONE {
        tracing::warn!(%p_star, %u, %d, %r, "no-arbitrage condition violated");
        return Err(LatticeError::ModelError {
            p_star,
            growth_factor,
            u,
            d,
        });
    }
    let discount_factor = exp_decimal(-(r * dt)).ok_or_else(rate_out_of_range)?;
    Ok(RiskNeutralMeasure {
        p_star,
        growth_factor,
        discount_factor,
        rate: r,
        dt,
    })
}

/// Validate an externally supplied p* against [0, 1].
pub(crate) fn check_probability(
    p_star: Probability,
    u: Decimal,
    d: Decimal,
    r: Rate,
) -> LatticeResult<()> {
    if p_star < Decimal::ZERO || p_star > Decimal::ONE {
        return Err(LatticeError::ModelError {
            p_star,
            growth_factor: exp_decimal(r).unwrap_or(Decimal::MAX),
            u,
            d,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn approx_eq(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_reference_p_star() {
        let m = derive_risk_neutral_probability(dec!(1.25), dec!(0.75), dec!(0.05), Decimal::ONE)
            .unwrap();
        // (e^0.05 - 0.75) / 0.5
        assert!(approx_eq(m.p_star(), dec!(0.602542192752048), dec!(0.000000001)));
        assert_eq!(m.p_star() + m.q_down(), Decimal::ONE);
        assert!(approx_eq(
            m.growth_factor() * m.discount_factor(),
            Decimal::ONE,
            dec!(0.000000000001)
        ));
    }

    #[test]
    fn test_zero_rate_symmetric_tree() {
        let m = derive_risk_neutral_probability(dec!(1.2), dec!(0.8), Decimal::ZERO, Decimal::ONE)
            .unwrap();
        assert_eq!(m.p_star(), dec!(0.5));
        assert_eq!(m.discount_factor(), Decimal::ONE);
    }

    #[test]
    fn test_inverted_factors_model_error() {
        let err = derive_risk_neutral_probability(dec!(0.9), dec!(1.1), dec!(0.05), Decimal::ONE)
            .unwrap_err();
        // the formula alone gives ~0.2436 here
        match err {
            LatticeError::ModelError { u, d, .. } => assert!(u < d),
            other => panic!("Expected ModelError, got {other:?}"),
        }
    }

    #[test]
    fn test_inverted_factors_negative_p_star() {
        let err = derive_risk_neutral_probability(dec!(0.9), dec!(1.1), dec!(0.3), Decimal::ONE)
            .unwrap_err();
        match err {
            LatticeError::ModelError { p_star, .. } => assert!(p_star < Decimal::ZERO),
            other => panic!("Expected ModelError, got {other:?}"),
        }
    }

    #[test]
    fn test_growth_above_up_factor_model_error() {
        // e^0.3 ≈ 1.35 > u
        let err = derive_risk_neutral_probability(dec!(1.2), dec!(0.8), dec!(0.3), Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, LatticeError::ModelError { .. }));
    }

    #[test]
    fn test_equal_factors_division_by_zero() {
        let err = derive_risk_neutral_probability(dec!(1), dec!(1), dec!(0.05), Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, LatticeError::DivisionByZero { .. }));
    }

    #[test]
    fn test_boundary_probability_allowed() {
        // e^0 = 1 = d gives p* = 0 exactly
        let m = derive_risk_neutral_probability(dec!(1.5), dec!(1), Decimal::ZERO, Decimal::ONE)
            .unwrap();
        assert_eq!(m.p_star(), Decimal::ZERO);
    }

    #[test]
    fn test_overflowing_growth_is_model_error() {
        // e^70 does not fit in a Decimal
        let err = derive_risk_neutral_probability(dec!(1.25), dec!(0.75), dec!(70), Decimal::ONE)
            .unwrap_err();
        match err {
            LatticeError::ModelError {
                p_star,
                growth_factor,
                ..
            } => {
                assert_eq!(p_star, Decimal::MAX);
                assert_eq!(growth_factor, Decimal::MAX);
            }
            other => panic!("Expected ModelError, got {other:?}"),
        }

        let inverted =
            derive_risk_neutral_probability(dec!(0.75), dec!(1.25), dec!(70), Decimal::ONE)
                .unwrap_err();
        assert!(matches!(
            inverted,
            LatticeError::ModelError { p_star, .. } if p_star < Decimal::ZERO
        ));
    }

    #[test]
    fn test_tiny_spread_is_model_error() {
        // (e^3 − 1) / 1e-28 overflows the quotient
        let err = derive_risk_neutral_probability(
            dec!(1.0000000000000000000000000001),
            dec!(1),
            dec!(3),
            Decimal::ONE,
        )
        .unwrap_err();
        match err {
            LatticeError::ModelError {
                p_star,
                growth_factor,
                ..
            } => {
                assert_eq!(p_star, Decimal::MAX);
                assert!(approx_eq(growth_factor, dec!(20.085536923187668), dec!(0.000000001)));
            }
            other => panic!("Expected ModelError, got {other:?}"),
        }
    }

    #[test]
    fn test_non_positive_dt_rejected() {
        assert!(derive_risk_neutral_probability(dec!(1.2), dec!(0.8), dec!(0.05), Decimal::ZERO)
            .is_err());
    }
}
