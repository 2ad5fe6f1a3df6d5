use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::config::CutPolicy;
use crate::error::LatticeError;
use crate::types::Coordinate;
use crate::LatticeResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Cuts at x-coordinates (vertical lines).
    Vertical,
    /// Cuts at y-coordinates (horizontal lines).
    Horizontal,
}

/// Why a candidate cut was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Within the boundary margin, or outside the interval.
    NearBoundary,
    /// Within the minimum separation of another cut on the same axis.
    TooCloseToExisting,
}

/// Result of `add_cut` / `move_cut`. Rejection is an expected outcome and
/// leaves the partition untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CutOutcome {
    Accepted {
        /// Position of the cut in the sorted list after the operation.
        index: usize,
        coordinate: Coordinate,
    },
    Rejected {
        requested: Coordinate,
        snapped: Coordinate,
        reason: RejectReason,
    },
}

impl CutOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CutOutcome::Accepted { .. })
    }
}

/// Sorted interior cuts on `[0, length]`. The endpoints are implicit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisPartition {
    length: Coordinate,
    cuts: Vec<Coordinate>,
}

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

impl AxisPartition {
    pub fn new(length: Coordinate) -> LatticeResult<Self> {
        if length <= Decimal::ZERO {
            return Err(LatticeError::InvalidInput {
                field: "length".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(Self {
            length,
            cuts: Vec::new(),
        })
    }

    pub fn length(&self) -> Coordinate {
        self.length
    }

    pub fn cuts(&self) -> &[Coordinate] {
        &self.cuts
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// `[0, cuts..., length]`, sorted and deduplicated.
    pub fn bounds(&self) -> Vec<Coordinate> {
        let mut points = Vec::with_capacity(self.cuts.len() + 2);
        points.push(Decimal::ZERO);
        points.extend(self.cuts.iter().copied());
        points.push(self.length);
        points.sort();
        points.dedup();
        points
    }

    /// Consecutive pairs of `bounds()`.
    pub fn intervals(&self) -> Vec<(Coordinate, Coordinate)> {
        self.bounds().windows(2).map(|w| (w[0], w[1])).collect()
    }

    pub fn add_cut(&mut self, raw: Coordinate, policy: &CutPolicy) -> CutOutcome {
        let snapped = snap(raw, policy.snap_grid);
        if let Some(reason) = self.check(snapped, None, policy) {
            tracing::debug!(%raw, %snapped, ?reason, "cut rejected");
            return CutOutcome::Rejected {
                requested: raw,
                snapped,
                reason,
            };
        }
        let index = self.insert_sorted(snapped);
        CutOutcome::Accepted {
            index,
            coordinate: snapped,
        }
    }

    pub fn remove_cut(&mut self, index: usize) -> LatticeResult<Coordinate> {
        if index >= self.cuts.len() {
            return Err(LatticeError::InvalidInput {
                field: "index".into(),
                reason: format!("no cut at index {index} ({} cuts)", self.cuts.len()),
            });
        }
        Ok(self.cuts.remove(index))
    }

    /// Move the cut at `index`. Separation is checked against the other cuts
    /// only; the list is re-sorted and the outcome reports the new index.
    pub fn move_cut(
        &mut self,
        index: usize,
        target: Coordinate,
        policy: &CutPolicy,
    ) -> LatticeResult<CutOutcome> {
        if index >= self.cuts.len() {
            return Err(LatticeError::InvalidInput {
                field: "index".into(),
                reason: format!("no cut at index {index} ({} cuts)", self.cuts.len()),
            });
        }
        let snapped = snap(target, policy.snap_grid);
        if let Some(reason) = self.check(snapped, Some(index), policy) {
            tracing::debug!(%target, %snapped, ?reason, "move rejected");
            return Ok(CutOutcome::Rejected {
                requested: target,
                snapped,
                reason,
            });
        }
        self.cuts.remove(index);
        let new_index = self.insert_sorted(snapped);
        Ok(CutOutcome::Accepted {
            index: new_index,
            coordinate: snapped,
        })
    }

    fn check(
        &self,
        candidate: Coordinate,
        skip: Option<usize>,
        policy: &CutPolicy,
    ) -> Option<RejectReason> {
        let margin = policy.boundary_margin;
        if candidate <= margin || candidate >= self.length - margin {
            return Some(RejectReason::NearBoundary);
        }
        let crowded = self
            .cuts
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .any(|(_, existing)| (*existing - candidate).abs() < policy.min_separation);
        if crowded {
            return Some(RejectReason::TooCloseToExisting);
        }
        None
    }

    fn insert_sorted(&mut self, value: Coordinate) -> usize {
        let index = self.cuts.partition_point(|c| *c < value);
        self.cuts.insert(index, value);
        index
    }
}

/// Round `raw` to the precision of `grid` (whole units for a grid of 10),
/// then to the nearest multiple of `grid`. Halves go away from zero at both
/// stages, so 124.5 becomes 125 and then 130.
fn snap(raw: Coordinate, grid: Decimal) -> Coordinate {
    if grid.is_zero() {
        return raw;
    }
    let coarse =
        raw.round_dp_with_strategy(grid.scale(), RoundingStrategy::MidpointAwayFromZero);
    (coarse / grid).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * grid
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
