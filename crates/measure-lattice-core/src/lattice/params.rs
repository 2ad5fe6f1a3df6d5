use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::EngineLimits;
use crate::error::LatticeError;
use crate::lattice::pricer::{OptionContract, OptionType};
use crate::lattice::tree::validate_factors;
use crate::types::{Price, Probability, Rate};
use crate::LatticeResult;

/// Flat parameter set for every lattice computation. Missing fields take the
/// three-step reference model (S0 = 100, u = 1.25, d = 0.75, r = 5%, K = 100).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatticeParams {
    #[serde(default = "default_s0")]
    pub s0: Price,
    #[serde(default = "default_u")]
    pub u: Decimal,
    #[serde(default = "default_d")]
    pub d: Decimal,
    /// Continuously compounded rate per step.
    #[serde(default = "default_r")]
    pub r: Rate,
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default = "default_strike")]
    pub strike: Price,
    #[serde(default = "default_p_real")]
    pub p_real: Probability,
    #[serde(default)]
    pub option_type: OptionType,
}

fn default_s0() -> Price {
    dec!(100)
}

fn default_u() -> Decimal {
    dec!(1.25)
}

fn default_d() -> Decimal {
    dec!(0.75)
}

fn default_r() -> Rate {
    dec!(0.05)
}

fn default_steps() -> u32 {
    3
}

fn default_strike() -> Price {
    dec!(100)
}

fn default_p_real() -> Probability {
    dec!(0.5)
}

impl Default for LatticeParams {
    fn default() -> Self {
        Self {
            s0: default_s0(),
            u: default_u(),
            d: default_d(),
            r: default_r(),
            steps: default_steps(),
            strike: default_strike(),
            p_real: default_p_real(),
            option_type: OptionType::default(),
        }
    }
}

impl LatticeParams {
    /// Length of one step; rates are quoted per step.
    pub const DT: Decimal = Decimal::ONE;

    pub fn contract(&self) -> OptionContract {
        OptionContract {
            strike: self.strike,
            option_type: self.option_type,
        }
    }

    /// Shape checks only. Whether p* is admissible is decided by the
    /// risk-neutral derivation, not here.
    pub fn validate(&self, limits: &EngineLimits) -> LatticeResult<()> {
        validate_factors(self.s0, self.u, self.d)?;
        if self.steps > limits.max_steps {
            return Err(LatticeError::LimitExceeded {
                what: "steps".into(),
                requested: self.steps as u64,
                max: limits.max_steps as u64,
            });
        }
        if self.strike < Decimal::ZERO {
            return Err(LatticeError::InvalidInput {
                field: "strike".into(),
                reason: "must be non-negative".into(),
            });
        }
        if self.p_real < Decimal::ZERO || self.p_real > Decimal::ONE {
            return Err(LatticeError::InvalidInput {
                field: "p_real".into(),
                reason: "real-world probability must be in [0, 1]".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let p: LatticeParams = serde_json::from_str("{}").unwrap();
        assert_eq!(p, LatticeParams::default());
        assert_eq!(p.contract(), OptionContract::call(dec!(100)));
    }

    #[test]
    fn test_partial_override() {
        let p: LatticeParams =
            serde_json::from_str(r#"{"steps": 5, "option_type": "put", "u": "1.1"}"#).unwrap();
        assert_eq!(p.steps, 5);
        assert_eq!(p.u, dec!(1.1));
        assert_eq!(p.option_type, OptionType::Put);
        assert_eq!(p.d, dec!(0.75));
    }

    #[test]
    fn test_validation() {
        let limits = EngineLimits::default();
        assert!(LatticeParams::default().validate(&limits).is_ok());

        let too_deep = LatticeParams {
            steps: 40,
            ..Default::default()
        };
        assert!(matches!(
            too_deep.validate(&limits),
            Err(LatticeError::LimitExceeded { requested: 40, .. })
        ));

        let bad_p = LatticeParams {
            p_real: dec!(1.01),
            ..Default::default()
        };
        assert!(bad_p.validate(&limits).is_err());

        let bad_s0 = LatticeParams {
            s0: dec!(-1),
            ..Default::default()
        };
        assert!(bad_s0.validate(&limits).is_err());
    }

    #[test]
    fn test_inverted_factors_pass_shape_checks() {
        let p = LatticeParams {
            u: dec!(0.9),
            d: dec!(1.1),
            ..Default::default()
        };
        assert!(p.validate(&EngineLimits::default()).is_ok());
    }
}
