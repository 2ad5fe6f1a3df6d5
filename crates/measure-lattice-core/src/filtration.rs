//! Filtrations: increasing sequences of σ-algebras, each generated by a
//! partition of the same finite universe that refines the one before it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

use crate::config::{EngineConfig, EngineLimits};
use crate::enumerate::BinaryEnumerator;
use crate::error::LatticeError;
use crate::partition::sigma::{enumerate_unions, SigmaAlgebra};
use crate::types::*;
use crate::LatticeResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Information available at one time: a partition of the universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiltrationStep {
    pub name: String,
    pub blocks: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltrationInput {
    pub universe: Vec<String>,
    pub steps: Vec<FiltrationStep>,
    #[serde(default)]
    pub config: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltrationLevel {
    pub t: usize,
    pub name: String,
    pub blocks: Vec<Vec<String>>,
    pub sigma_algebra: SigmaAlgebra,
    pub cardinality: u64,
    /// Labels measurable now that were not measurable at t − 1.
    pub new_events: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltrationOutput {
    pub universe: Vec<String>,
    pub levels: Vec<FiltrationLevel>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Blocks must be non-empty, pairwise disjoint, and cover `universe`.
pub fn validate_partition(blocks: &[Vec<String>], universe: &[String]) -> LatticeResult<()> {
    let known: HashSet<&str> = universe.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();

    for (b, block) in blocks.iter().enumerate() {
        if block.is_empty() {
            return Err(LatticeError::InvalidInput {
                field: format!("blocks[{b}]"),
                reason: "partition blocks must be non-empty".into(),
            });
        }
        for label in block {
            if !known.contains(label.as_str()) {
                return Err(LatticeError::InvalidInput {
                    field: format!("blocks[{b}]"),
                    reason: format!("'{label}' is not in the universe"),
                });
            }
            if !seen.insert(label.as_str()) {
                return Err(LatticeError::InvalidInput {
                    field: format!("blocks[{b}]"),
                    reason: format!("'{label}' appears in more than one block"),
                });
            }
        }
    }

    if seen.len() != known.len() {
        let missing: Vec<&str> = universe
            .iter()
            .map(String::as_str)
            .filter(|u| !seen.contains(u))
            .collect();
        return Err(LatticeError::InvalidInput {
            field: "blocks".into(),
            reason: format!("blocks do not cover {}", missing.join(",")),
        });
    }
    Ok(())
}

/// Every block of `finer` lies inside a single block of `coarser`.
pub fn refines(finer: &[Vec<String>], coarser: &[Vec<String>]) -> bool {
    let coarse_sets: Vec<BTreeSet<&str>> = coarser
        .iter()
        .map(|b| b.iter().map(String::as_str).collect())
        .collect();
    finer.iter().all(|block| {
        coarse_sets
            .iter()
            .any(|coarse| block.iter().all(|label| coarse.contains(label.as_str())))
    })
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

pub fn build_filtration(
    universe: &[String],
    steps: &[FiltrationStep],
    limits: &EngineLimits,
) -> LatticeResult<Vec<FiltrationLevel>> {
    let distinct: HashSet<&str> = universe.iter().map(String::as_str).collect();
    if distinct.len() != universe.len() {
        return Err(LatticeError::InvalidInput {
            field: "universe".into(),
            reason: "outcome labels must be unique".into(),
        });
    }

    let mut levels: Vec<FiltrationLevel> = Vec::with_capacity(steps.len());
    for (t, step) in steps.iter().enumerate() {
        validate_partition(&step.blocks, universe).map_err(|e| match e {
            LatticeError::InvalidInput { field, reason } => LatticeError::InvalidInput {
                field: format!("steps[{t}].{field}"),
                reason,
            },
            other => other,
        })?;
        if let Some(prev) = levels.last() {
            if !refines(&step.blocks, &prev.blocks) {
                return Err(LatticeError::InvalidInput {
                    field: format!("steps[{t}]"),
                    reason: format!("'{}' does not refine '{}'", step.name, prev.name),
                });
            }
        }

        let sigma_algebra = enumerate_unions(&step.blocks, universe, limits.max_atoms)?;
        let new_events = match levels.last() {
            Some(prev) => sigma_algebra
                .labels()
                .into_iter()
                .filter(|l| !prev.sigma_algebra.contains_label(l))
                .map(str::to_string)
                .collect(),
            None => sigma_algebra.labels().into_iter().map(str::to_string).collect(),
        };

        tracing::debug!(t, name = %step.name, events = sigma_algebra.cardinality, "filtration level");

        levels.push(FiltrationLevel {
            t,
            name: step.name.clone(),
            blocks: step.blocks.clone(),
            cardinality: sigma_algebra.cardinality,
            sigma_algebra,
            new_events,
        });
    }
    Ok(levels)
}

/// The natural filtration of `steps` coin moves: outcomes are move strings
/// ("UU", "UD", "DU", "DD" for two steps) and `F_t` groups outcomes that
/// share their first `t` moves.
pub fn binomial_filtration(steps: u32, limits: &EngineLimits) -> LatticeResult<FiltrationInput> {
    BinaryEnumerator::new(steps, limits.max_steps, "steps")?;

    let mut outcomes = vec![String::new()];
    for _ in 0..steps {
        outcomes = outcomes
            .into_iter()
            .flat_map(|o| [format!("{o}U"), format!("{o}D")])
            .collect();
    }

    let filtration_steps = (0..=steps as usize)
        .map(|t| {
            let mut blocks: Vec<Vec<String>> = Vec::new();
            for outcome in &outcomes {
                let prefix = &outcome[..t];
                match blocks.last_mut() {
                    Some(block) if block[0].starts_with(prefix) => block.push(outcome.clone()),
                    _ => blocks.push(vec![outcome.clone()]),
                }
            }
            FiltrationStep {
                name: format!("F{t}"),
                blocks,
            }
        })
        .collect();

    Ok(FiltrationInput {
        universe: outcomes,
        steps: filtration_steps,
        config: EngineConfig {
            limits: *limits,
            ..Default::default()
        },
    })
}

pub fn analyze_filtration(
    input: &FiltrationInput,
) -> LatticeResult<ComputationOutput<FiltrationOutput>> {
    let start = Instant::now();
    input.config.validate()?;
    if input.steps.is_empty() {
        return Err(LatticeError::InvalidInput {
            field: "steps".into(),
            reason: "at least one step is required".into(),
        });
    }

    let levels = build_filtration(&input.universe, &input.steps, &input.config.limits)?;

    let mut warnings = Vec::new();
    if let Some(first) = levels.first() {
        if first.blocks.len() > 1 {
            warnings.push(format!(
                "'{}' is not trivial: information is already revealed at the first step",
                first.name
            ));
        }
    }

    let assumptions = serde_json::json!({
        "outcomes": input.universe.len(),
        "steps": input.steps.len(),
        "max_atoms": input.config.limits.max_atoms,
    });

    let output = FiltrationOutput {
        universe: input.universe.clone(),
        levels,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Filtration of partition-generated sigma-algebras",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn s(items: &[&str]) -> Vec<String> {
        items.iter().map(|x| x.to_string()).collect()
    }

    fn four_atom_steps() -> Vec<FiltrationStep> {
        vec![
            FiltrationStep {
                name: "F0".into(),
                blocks: vec![s(&["A1", "A2", "A3", "A4"])],
            },
            FiltrationStep {
                name: "F1".into(),
                blocks: vec![s(&["A1", "A2"]), s(&["A3", "A4"])],
            },
            FiltrationStep {
                name: "F2".into(),
                blocks: vec![s(&["A1"]), s(&["A2"]), s(&["A3"]), s(&["A4"])],
            },
        ]
    }

    #[test]
    fn test_four_atom_filtration() {
        let universe = s(&["A1", "A2", "A3", "A4"]);
        let levels =
            build_filtration(&universe, &four_atom_steps(), &EngineLimits::default()).unwrap();
        let sizes: Vec<u64> = levels.iter().map(|l| l.cardinality).collect();
        assert_eq!(sizes, vec![2, 4, 16]);
        assert_eq!(levels[0].new_events, vec!["∅", "Ω"]);
        assert_eq!(levels[1].new_events, vec!["{A1,A2}", "{A3,A4}"]);
        assert_eq!(levels[2].new_events.len(), 12);
    }

    #[test]
    fn test_overlapping_blocks_rejected() {
        let universe = s(&["A1", "A2", "A3"]);
        let err = validate_partition(&[s(&["A1", "A2"]), s(&["A2", "A3"])], &universe).unwrap_err();
        assert!(err.to_string().contains("more than one block"));
    }

    #[test]
    fn test_uncovered_and_empty_blocks_rejected() {
        let universe = s(&["A1", "A2", "A3"]);
        assert!(validate_partition(&[s(&["A1", "A2"])], &universe).is_err());
        assert!(validate_partition(&[s(&["A1", "A2", "A3"]), vec![]], &universe).is_err());
        assert!(validate_partition(&[s(&["A1", "A2", "A9"])], &universe).is_err());
    }

    #[test]
    fn test_non_refining_step_rejected() {
        let universe = s(&["A1", "A2", "A3", "A4"]);
        let steps = vec![
            FiltrationStep {
                name: "F1".into(),
                blocks: vec![s(&["A1", "A2"]), s(&["A3", "A4"])],
            },
            FiltrationStep {
                name: "F2".into(),
                blocks: vec![s(&["A1", "A3"]), s(&["A2", "A4"])],
            },
        ];
        let err = build_filtration(&universe, &steps, &EngineLimits::default()).unwrap_err();
        assert!(err.to_string().contains("does not refine"));
    }

    #[test]
    fn test_binomial_filtration_two_steps() {
        let input = binomial_filtration(2, &EngineLimits::default()).unwrap();
        assert_eq!(input.universe, s(&["UU", "UD", "DU", "DD"]));
        assert_eq!(input.steps.len(), 3);
        assert_eq!(input.steps[0].blocks, vec![s(&["UU", "UD", "DU", "DD"])]);
        assert_eq!(input.steps[1].blocks, vec![s(&["UU", "UD"]), s(&["DU", "DD"])]);
        assert_eq!(input.steps[2].blocks.len(), 4);
    }

    #[test]
    fn test_binomial_filtration_cardinalities() {
        let input = binomial_filtration(3, &EngineLimits::default()).unwrap();
        let out = analyze_filtration(&input).unwrap();
        let sizes: Vec<u64> = out.result.levels.iter().map(|l| l.cardinality).collect();
        // |F_t| = 2^(2^t)
        assert_eq!(sizes, vec![2, 4, 16, 256]);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_binomial_filtration_step_cap() {
        let limits = EngineLimits {
            max_atoms: 16,
            max_steps: 2,
        };
        assert!(matches!(
            binomial_filtration(3, &limits),
            Err(LatticeError::LimitExceeded { .. })
        ));
    }

    #[test]
    fn test_nontrivial_first_level_warns() {
        let input = FiltrationInput {
            universe: s(&["A1", "A2"]),
            steps: vec![FiltrationStep {
                name: "G".into(),
                blocks: vec![s(&["A1"]), s(&["A2"])],
            }],
            config: EngineConfig::default(),
        };
        let out = analyze_filtration(&input).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.result.levels[0].cardinality, 4);
    }
}
