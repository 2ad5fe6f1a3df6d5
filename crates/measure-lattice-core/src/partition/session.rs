use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::error::LatticeError;
use crate::partition::axis::{Axis, AxisPartition, CutOutcome};
use crate::partition::grid::{compute_atoms, Atom};
use crate::partition::random_variable::{ConditioningClass, RandomVariable};
use crate::partition::sigma::{enumerate_subsets, SigmaAlgebra};
use crate::types::*;
use crate::LatticeResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The cut list of one axis after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutUpdate {
    pub axis: Axis,
    pub outcome: CutOutcome,
    pub cuts: Vec<Coordinate>,
}

/// Everything derived from the current partition state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSnapshot {
    pub width: Coordinate,
    pub height: Coordinate,
    pub vertical_cuts: Vec<Coordinate>,
    pub horizontal_cuts: Vec<Coordinate>,
    pub atoms: Vec<Atom>,
    pub atom_count: usize,
    pub sigma_algebra: SigmaAlgebra,
    pub conditioning_classes: Vec<ConditioningClass>,
    /// Unweighted mean of the assigned values.
    pub simple_average: Option<Decimal>,
}

/// Batch input: raw cuts are replayed through the same acceptance rules as
/// interactive edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionInput {
    #[serde(default = "default_width")]
    pub width: Coordinate,
    #[serde(default = "default_height")]
    pub height: Coordinate,
    #[serde(default)]
    pub vertical_cuts: Vec<Coordinate>,
    #[serde(default)]
    pub horizontal_cuts: Vec<Coordinate>,
    /// Atom index (1-based) to value.
    #[serde(default)]
    pub values: BTreeMap<usize, Decimal>,
    #[serde(default)]
    pub config: EngineConfig,
}

fn default_width() -> Coordinate {
    Decimal::from(560)
}

fn default_height() -> Coordinate {
    Decimal::from(360)
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Per-session partition state owned by the interaction layer: created at
/// session start, mutated by user edits, discarded at the end. Every read
/// recomputes from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSession {
    config: EngineConfig,
    vertical: AxisPartition,
    horizontal: AxisPartition,
    random_variable: RandomVariable,
}

impl PartitionSession {
    pub fn new(width: Coordinate, height: Coordinate, config: EngineConfig) -> LatticeResult<Self> {
        config.validate()?;
        let vertical = AxisPartition::new(width).map_err(|_| LatticeError::InvalidInput {
            field: "width".into(),
            reason: "must be positive".into(),
        })?;
        let horizontal = AxisPartition::new(height).map_err(|_| LatticeError::InvalidInput {
            field: "height".into(),
            reason: "must be positive".into(),
        })?;
        Ok(Self {
            config,
            vertical,
            horizontal,
            random_variable: RandomVariable::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn axis(&self, axis: Axis) -> &AxisPartition {
        match axis {
            Axis::Vertical => &self.vertical,
            Axis::Horizontal => &self.horizontal,
        }
    }

    fn axis_mut(&mut self, axis: Axis) -> &mut AxisPartition {
        match axis {
            Axis::Vertical => &mut self.vertical,
            Axis::Horizontal => &mut self.horizontal,
        }
    }

    pub fn random_variable(&self) -> &RandomVariable {
        &self.random_variable
    }

    pub fn add_cut(&mut self, axis: Axis, raw: Coordinate) -> CutUpdate {
        let policy = self.config.cut_policy.clone();
        let outcome = self.axis_mut(axis).add_cut(raw, &policy);
        self.cut_update(axis, outcome)
    }

    pub fn remove_cut(&mut self, axis: Axis, index: usize) -> LatticeResult<CutUpdate> {
        let coordinate = self.axis_mut(axis).remove_cut(index)?;
        self.prune_values();
        // reports the removed cut
        Ok(self.cut_update(axis, CutOutcome::Accepted { index, coordinate }))
    }

    pub fn move_cut(
        &mut self,
        axis: Axis,
        index: usize,
        target: Coordinate,
    ) -> LatticeResult<CutUpdate> {
        let policy = self.config.cut_policy.clone();
        let outcome = self.axis_mut(axis).move_cut(index, target, &policy)?;
        Ok(self.cut_update(axis, outcome))
    }

    fn cut_update(&self, axis: Axis, outcome: CutOutcome) -> CutUpdate {
        CutUpdate {
            axis,
            outcome,
            cuts: self.axis(axis).cuts().to_vec(),
        }
    }

    fn prune_values(&mut self) {
        let count = self.atom_count();
        let dropped = self.random_variable.prune(count);
        if dropped > 0 {
            tracing::debug!(dropped, atoms = count, "dropped values of removed atoms");
        }
    }

    pub fn atom_count(&self) -> usize {
        (self.vertical.cuts().len() + 1) * (self.horizontal.cuts().len() + 1)
    }

    pub fn atoms(&self) -> Vec<Atom> {
        compute_atoms(&self.vertical, &self.horizontal)
    }

    pub fn sigma_algebra(&self) -> LatticeResult<SigmaAlgebra> {
        let labels: Vec<String> = self.atoms().into_iter().map(|a| a.label).collect();
        enumerate_subsets(&labels, self.config.limits.max_atoms)
    }

    pub fn assign_value(&mut self, atom_index: usize, value: Decimal) -> LatticeResult<()> {
        let count = self.atom_count();
        if atom_index > count {
            return Err(LatticeError::InvalidInput {
                field: "atom_index".into(),
                reason: format!("atom {atom_index} does not exist ({count} atoms)"),
            });
        }
        self.random_variable.assign(atom_index, value)
    }

    pub fn clear_value(&mut self, atom_index: usize) -> Option<Decimal> {
        self.random_variable.unassign(atom_index)
    }

    pub fn conditioning_classes(&self) -> Vec<ConditioningClass> {
        self.random_variable.group_by_value(&self.atoms())
    }

    pub fn simple_average(&self) -> Option<Decimal> {
        self.random_variable.simple_average()
    }

    pub fn snapshot(&self) -> LatticeResult<PartitionSnapshot> {
        let atoms = self.atoms();
        let labels: Vec<String> = atoms.iter().map(|a| a.label.clone()).collect();
        let sigma_algebra = enumerate_subsets(&labels, self.config.limits.max_atoms)?;
        let conditioning_classes = self.random_variable.group_by_value(&atoms);
        Ok(PartitionSnapshot {
            width: self.vertical.length(),
            height: self.horizontal.length(),
            vertical_cuts: self.vertical.cuts().to_vec(),
            horizontal_cuts: self.horizontal.cuts().to_vec(),
            atom_count: atoms.len(),
            atoms,
            sigma_algebra,
            conditioning_classes,
            simple_average: self.random_variable.simple_average(),
        })
    }
}

// ---------------------------------------------------------------------------
// Public API: analyze_partition
// ---------------------------------------------------------------------------

pub fn analyze_partition(
    input: &PartitionInput,
) -> LatticeResult<ComputationOutput<PartitionSnapshot>> {
    let start = Instant::now();
    let mut session = PartitionSession::new(input.width, input.height, input.config.clone())?;
    let mut warnings = Vec::new();

    let cuts = input
        .vertical_cuts
        .iter()
        .map(|c| (Axis::Vertical, *c))
        .chain(input.horizontal_cuts.iter().map(|c| (Axis::Horizontal, *c)));
    for (axis, raw) in cuts {
        if let CutOutcome::Rejected {
            snapped, reason, ..
        } = session.add_cut(axis, raw).outcome
        {
            warnings.push(format!(
                "{axis:?} cut at {raw} (snapped {snapped}) rejected: {reason:?}"
            ));
        }
    }

    for (index, value) in &input.values {
        if let Err(e) = session.assign_value(*index, *value) {
            warnings.push(format!("value for atom {index} ignored: {e}"));
        }
    }

    let snapshot = session.snapshot()?;

    let assumptions = serde_json::json!({
        "width": input.width.to_string(),
        "height": input.height.to_string(),
        "snap_grid": input.config.cut_policy.snap_grid.to_string(),
        "min_separation": input.config.cut_policy.min_separation.to_string(),
        "boundary_margin": input.config.cut_policy.boundary_margin.to_string(),
        "max_atoms": input.config.limits.max_atoms,
        "average": "unweighted over assigned atoms",
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Grid partition with power-set sigma-algebra",
        &assumptions,
        warnings,
        elapsed,
        snapshot,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn session() -> PartitionSession {
        PartitionSession::new(dec!(560), dec!(360), EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_new_session_single_atom() {
        let s = session();
        let snap = s.snapshot().unwrap();
        assert_eq!(snap.atom_count, 1);
        assert_eq!(snap.sigma_algebra.labels(), vec!["∅", "Ω"]);
        assert_eq!(snap.simple_average, None);
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(PartitionSession::new(dec!(0), dec!(360), EngineConfig::default()).is_err());
        assert!(PartitionSession::new(dec!(560), dec!(-1), EngineConfig::default()).is_err());
    }

    #[test]
    fn test_add_cut_returns_updated_list() {
        let mut s = session();
        let update = s.add_cut(Axis::Vertical, dec!(280));
        assert_eq!(update.cuts, vec![dec!(280)]);
        assert!(update.outcome.is_accepted());
        let update = s.add_cut(Axis::Vertical, dec!(290));
        assert!(!update.outcome.is_accepted());
        assert_eq!(update.cuts, vec![dec!(280)]);
        assert_eq!(s.atom_count(), 2);
    }

    #[test]
    fn test_remove_cut_prunes_values() {
        let mut s = session();
        s.add_cut(Axis::Horizontal, dec!(180));
        s.assign_value(2, dec!(50)).unwrap();
        s.assign_value(1, dec!(70)).unwrap();
        let update = s.remove_cut(Axis::Horizontal, 0).unwrap();
        assert!(update.cuts.is_empty());
        assert_eq!(s.random_variable().value(2), None);
        assert_eq!(s.random_variable().value(1), Some(dec!(70)));
    }

    #[test]
    fn test_assign_to_missing_atom_rejected() {
        let mut s = session();
        assert!(s.assign_value(2, dec!(1)).is_err());
    }

    #[test]
    fn test_conditioning_classes_from_session() {
        let mut s = session();
        s.add_cut(Axis::Vertical, dec!(200));
        s.add_cut(Axis::Vertical, dec!(400));
        s.assign_value(1, dec!(90)).unwrap();
        s.assign_value(3, dec!(90)).unwrap();
        let classes = s.conditioning_classes();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].atoms, vec!["A1".to_string(), "A3".to_string()]);
        assert_eq!(s.simple_average(), Some(dec!(90)));
    }

    #[test]
    fn test_analyze_partition_reports_rejections() {
        let input = PartitionInput {
            width: dec!(560),
            height: dec!(360),
            vertical_cuts: vec![dec!(280), dec!(290)],
            horizontal_cuts: vec![dec!(5)],
            values: BTreeMap::from([(1, dec!(100)), (2, dec!(80)), (9, dec!(1))]),
            config: EngineConfig::default(),
        };
        let out = analyze_partition(&input).unwrap();
        assert_eq!(out.result.atom_count, 2);
        assert_eq!(out.result.sigma_algebra.cardinality, 4);
        assert_eq!(out.warnings.len(), 3);
        assert_eq!(out.result.simple_average, Some(dec!(90)));
    }

    #[test]
    fn test_partition_input_defaults() {
        let input: PartitionInput = serde_json::from_str(r#"{"vertical_cuts": [280]}"#).unwrap();
        assert_eq!(input.width, dec!(560));
        assert_eq!(input.height, dec!(360));
        let out = analyze_partition(&input).unwrap();
        assert_eq!(out.result.sigma_algebra.labels(), vec!["∅", "{A1}", "{A2}", "Ω"]);
    }
}
