use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::LatticeError;
use crate::partition::grid::Atom;
use crate::LatticeResult;

/// Atoms sharing one assigned value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditioningClass {
    pub value: Decimal,
    pub atoms: Vec<String>,
}

/// Partial assignment of a value ("price") to atoms, keyed by 1-based atom
/// index. Unassigned atoms are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomVariable {
    values: BTreeMap<usize, Decimal>,
}

impl RandomVariable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: BTreeMap<usize, Decimal>) -> LatticeResult<Self> {
        let mut rv = Self::new();
        for (index, value) in values {
            rv.assign(index, value)?;
        }
        Ok(rv)
    }

    /// Store or overwrite the value for `atom_index`.
    pub fn assign(&mut self, atom_index: usize, value: Decimal) -> LatticeResult<()> {
        if atom_index == 0 {
            return Err(LatticeError::InvalidInput {
                field: "atom_index".into(),
                reason: "atom indices start at 1".into(),
            });
        }
        self.values.insert(atom_index, value);
        Ok(())
    }

    pub fn unassign(&mut self, atom_index: usize) -> Option<Decimal> {
        self.values.remove(&atom_index)
    }

    pub fn value(&self, atom_index: usize) -> Option<Decimal> {
        self.values.get(&atom_index).copied()
    }

    pub fn values(&self) -> &BTreeMap<usize, Decimal> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop values for atoms beyond `atom_count` after the grid shrank.
    pub fn prune(&mut self, atom_count: usize) -> usize {
        let before = self.values.len();
        self.values.retain(|index, _| *index <= atom_count);
        before - self.values.len()
    }

    /// Group assigned atoms by identical value, ascending by value. Labels
    /// within a class keep atom order.
    pub fn group_by_value(&self, atoms: &[Atom]) -> Vec<ConditioningClass> {
        let mut groups: BTreeMap<Decimal, Vec<String>> = BTreeMap::new();
        for atom in atoms {
            if let Some(value) = self.values.get(&atom.index) {
                // normalize so 10 and 10.00 land in one class
                groups
                    .entry(value.normalize())
                    .or_default()
                    .push(atom.label.clone());
            }
        }
        groups
            .into_iter()
            .map(|(value, atoms)| ConditioningClass { value, atoms })
            .collect()
    }

    /// Equal-weight mean of the assigned values, `None` when nothing is
    /// assigned.
    ///
    /// This is a display value, not an expectation: atoms are not weighted by
    /// their probability (area). The probability-weighted expectation lives in
    /// the lattice engine.
    pub fn simple_average(&self) -> Option<Decimal> {
        if self.values.is_empty() {
            return None;
        }
        let total: Decimal = self.values.values().sum();
        Some(total / Decimal::from(self.values.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::grid::atom_label;
    use rust_decimal_macros::dec;

    fn atoms(n: usize) -> Vec<Atom> {
        (1..=n)
            .map(|i| Atom {
                index: i,
                x1: Decimal::from(i as u64 - 1),
                x2: Decimal::from(i as u64),
                y1: Decimal::ZERO,
                y2: Decimal::ONE,
                label: atom_label(i),
            })
            .collect()
    }

    #[test]
    fn test_assign_and_overwrite() {
        let mut rv = RandomVariable::new();
        rv.assign(1, dec!(100)).unwrap();
        rv.assign(1, dec!(120)).unwrap();
        assert_eq!(rv.value(1), Some(dec!(120)));
        assert_eq!(rv.len(), 1);
    }

    #[test]
    fn test_index_zero_rejected() {
        let mut rv = RandomVariable::new();
        assert!(rv.assign(0, dec!(1)).is_err());
    }

    #[test]
    fn test_group_by_value_excludes_unset() {
        let mut rv = RandomVariable::new();
        rv.assign(1, dec!(120)).unwrap();
        rv.assign(2, dec!(80)).unwrap();
        rv.assign(4, dec!(120)).unwrap();
        let classes = rv.group_by_value(&atoms(4));
        assert_eq!(
            classes,
            vec![
                ConditioningClass {
                    value: dec!(80),
                    atoms: vec!["A2".into()],
                },
                ConditioningClass {
                    value: dec!(120),
                    atoms: vec!["A1".into(), "A4".into()],
                },
            ]
        );
    }

    #[test]
    fn test_equal_values_different_scale_share_class() {
        let mut rv = RandomVariable::new();
        rv.assign(1, dec!(10)).unwrap();
        rv.assign(2, dec!(10.00)).unwrap();
        let classes = rv.group_by_value(&atoms(2));
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].atoms.len(), 2);
    }

    #[test]
    fn test_values_for_missing_atoms_ignored() {
        let mut rv = RandomVariable::new();
        rv.assign(7, dec!(5)).unwrap();
        assert!(rv.group_by_value(&atoms(2)).is_empty());
        assert_eq!(rv.prune(2), 1);
        assert!(rv.is_empty());
    }

    #[test]
    fn test_simple_average_unweighted() {
        let mut rv = RandomVariable::new();
        assert_eq!(rv.simple_average(), None);
        rv.assign(1, dec!(100)).unwrap();
        rv.assign(3, dec!(80)).unwrap();
        rv.assign(4, dec!(60)).unwrap();
        assert_eq!(rv.simple_average(), Some(dec!(80)));
        rv.unassign(1);
        assert_eq!(rv.simple_average(), Some(dec!(70)));
    }
}
