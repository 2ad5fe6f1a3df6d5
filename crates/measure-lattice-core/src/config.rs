use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LatticeError;
use crate::LatticeResult;

/// Hard ceiling on any enumeration width; a `u64` mask cannot address more.
pub const MAX_ENUMERATION_BITS: u32 = 63;

/// Acceptance rules for new or moved cut lines.
///
/// Defaults match a 600×400 drawing surface with a 20-unit margin. Callers
/// working in another coordinate scale should override all three.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutPolicy {
    /// Accepted coordinates are rounded to a multiple of this. Zero disables snapping.
    #[serde(default = "default_snap_grid")]
    pub snap_grid: Decimal,
    /// A cut closer than this to another cut on the same axis is rejected.
    #[serde(default = "default_min_separation")]
    pub min_separation: Decimal,
    /// A cut must lie strictly inside (margin, length - margin).
    #[serde(default = "default_boundary_margin")]
    pub boundary_margin: Decimal,
}

fn default_snap_grid() -> Decimal {
    dec!(10)
}

fn default_min_separation() -> Decimal {
    dec!(30)
}

fn default_boundary_margin() -> Decimal {
    dec!(10)
}

impl Default for CutPolicy {
    fn default() -> Self {
        Self {
            snap_grid: default_snap_grid(),
            min_separation: default_min_separation(),
            boundary_margin: default_boundary_margin(),
        }
    }
}

impl CutPolicy {
    pub fn validate(&self) -> LatticeResult<()> {
        if self.snap_grid < Decimal::ZERO {
            return Err(LatticeError::InvalidInput {
                field: "cut_policy.snap_grid".into(),
                reason: "must be non-negative".into(),
            });
        }
        if self.min_separation < Decimal::ZERO {
            return Err(LatticeError::InvalidInput {
                field: "cut_policy.min_separation".into(),
                reason: "must be non-negative".into(),
            });
        }
        if self.boundary_margin < Decimal::ZERO {
            return Err(LatticeError::InvalidInput {
                field: "cut_policy.boundary_margin".into(),
                reason: "must be non-negative".into(),
            });
        }
        Ok(())
    }
}

/// Caps on the exponential enumerations (2^atoms subsets, 2^steps paths).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineLimits {
    #[serde(default = "default_max_atoms")]
    pub max_atoms: u32,
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
}

fn default_max_atoms() -> u32 {
    16
}

fn default_max_steps() -> u32 {
    16
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_atoms: default_max_atoms(),
            max_steps: default_max_steps(),
        }
    }
}

impl EngineLimits {
    pub fn validate(&self) -> LatticeResult<()> {
        if self.max_atoms > MAX_ENUMERATION_BITS {
            return Err(LatticeError::LimitExceeded {
                what: "limits.max_atoms".into(),
                requested: self.max_atoms as u64,
                max: MAX_ENUMERATION_BITS as u64,
            });
        }
        if self.max_steps > MAX_ENUMERATION_BITS {
            return Err(LatticeError::LimitExceeded {
                what: "limits.max_steps".into(),
                requested: self.max_steps as u64,
                max: MAX_ENUMERATION_BITS as u64,
            });
        }
        Ok(())
    }
}

/// Everything tunable about the engines, loadable from JSON or YAML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cut_policy: CutPolicy,
    #[serde(default)]
    pub limits: EngineLimits,
}

impl EngineConfig {
    pub fn validate(&self) -> LatticeResult<()> {
        self.cut_policy.validate()?;
        self.limits.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_display_scale() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.cut_policy.snap_grid, dec!(10));
        assert_eq!(cfg.cut_policy.min_separation, dec!(30));
        assert_eq!(cfg.cut_policy.boundary_margin, dec!(10));
        assert_eq!(cfg.limits.max_atoms, 16);
        assert_eq!(cfg.limits.max_steps, 16);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"cut_policy": {"snap_grid": "5"}, "limits": {"max_steps": 8}}"#)
                .unwrap();
        assert_eq!(cfg.cut_policy.snap_grid, dec!(5));
        assert_eq!(cfg.cut_policy.min_separation, dec!(30));
        assert_eq!(cfg.limits.max_steps, 8);
        assert_eq!(cfg.limits.max_atoms, 16);
    }

    #[test]
    fn test_negative_policy_rejected() {
        let policy = CutPolicy {
            min_separation: dec!(-1),
            ..CutPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_limits_above_mask_width_rejected() {
        let limits = EngineLimits {
            max_atoms: 64,
            max_steps: 16,
        };
        match limits.validate() {
            Err(LatticeError::LimitExceeded { requested, max, .. }) => {
                assert_eq!(requested, 64);
                assert_eq!(max, 63);
            }
            other => panic!("Expected LimitExceeded, got {other:?}"),
        }
    }
}
