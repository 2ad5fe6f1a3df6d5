use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

use crate::config::EngineConfig;
use crate::enumerate::BinaryEnumerator;
use crate::error::LatticeError;
use crate::types::{with_metadata, ComputationOutput};
use crate::LatticeResult;

pub const EMPTY_SET_LABEL: &str = "∅";
pub const SAMPLE_SPACE_LABEL: &str = "Ω";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One event of a finite σ-algebra.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigmaAlgebraElement {
    /// Atom labels in universe order.
    pub members: Vec<String>,
    /// `∅`, `Ω`, or `{A1,A3}`.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigmaAlgebra {
    pub elements: Vec<SigmaAlgebraElement>,
    /// 2^N for the power set of N atoms; for unions of blocks, the number of
    /// distinct events.
    pub cardinality: u64,
}

impl SigmaAlgebra {
    pub fn labels(&self) -> Vec<&str> {
        self.elements.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.elements.iter().any(|e| e.label == label)
    }
}

// ---------------------------------------------------------------------------
// Labelling
// ---------------------------------------------------------------------------

/// Canonical label for a subset of a universe of `universe_size` atoms.
pub fn canonical_label(members: &[String], universe_size: usize) -> String {
    if members.is_empty() {
        EMPTY_SET_LABEL.to_string()
    } else if members.len() == universe_size {
        SAMPLE_SPACE_LABEL.to_string()
    } else {
        format!("{{{}}}", members.join(","))
    }
}

// ---------------------------------------------------------------------------
// Enumeration
// ---------------------------------------------------------------------------

/// The power set of `items`, bit j of the mask selecting item j.
///
/// Zero items yield the single element `∅` (empty set and sample space
/// coincide). The reported cardinality is always `2^N`.
pub fn enumerate_subsets(items: &[String], max_items: u32) -> LatticeResult<SigmaAlgebra> {
    let blocks: Vec<Vec<String>> = items.iter().map(|i| vec![i.clone()]).collect();
    let mut algebra = enumerate_unions(&blocks, items, max_items)?;
    algebra.cardinality = 1u64 << items.len();
    Ok(algebra)
}

/// Every union of the given blocks, labelled by its atoms in `universe`
/// order and de-duplicated by label (first occurrence wins).
///
/// When the blocks partition the universe this is the σ-algebra generated by
/// that partition. Blocks may also overlap, in which case several masks
/// collapse onto the same event.
pub fn enumerate_unions(
    blocks: &[Vec<String>],
    universe: &[String],
    max_blocks: u32,
) -> LatticeResult<SigmaAlgebra> {
    let block_positions = resolve_blocks(blocks, universe)?;
    let bits = u32::try_from(blocks.len()).unwrap_or(u32::MAX);
    let enumerator = BinaryEnumerator::new(bits, max_blocks, "atoms")?;

    if blocks.is_empty() {
        return Ok(SigmaAlgebra {
            elements: vec![SigmaAlgebraElement {
                members: Vec::new(),
                label: EMPTY_SET_LABEL.to_string(),
            }],
            cardinality: 1,
        });
    }

    let unions = enumerator.fold(BTreeSet::new(), |mut acc, bit, selected| {
        if selected {
            acc.extend(block_positions[bit].iter().copied());
        }
        acc
    });

    let mut seen = HashSet::new();
    let mut elements = Vec::with_capacity(unions.len());
    for (_, positions) in unions {
        let members: Vec<String> = positions.iter().map(|&p| universe[p].clone()).collect();
        let label = canonical_label(&members, universe.len());
        if seen.insert(label.clone()) {
            elements.push(SigmaAlgebraElement { members, label });
        }
    }

    tracing::debug!(
        blocks = blocks.len(),
        events = elements.len(),
        "sigma-algebra enumerated"
    );

    Ok(SigmaAlgebra {
        cardinality: elements.len() as u64,
        elements,
    })
}

/// Map each block's labels to universe positions.
fn resolve_blocks(blocks: &[Vec<String>], universe: &[String]) -> LatticeResult<Vec<Vec<usize>>> {
    blocks
        .iter()
        .map(|block| {
            block
                .iter()
                .map(|label| {
                    universe
                        .iter()
                        .position(|u| u == label)
                        .ok_or_else(|| LatticeError::InvalidInput {
                            field: "blocks".into(),
                            reason: format!("'{label}' is not in the universe"),
                        })
                })
                .collect()
        })
        .collect()
}

/// A finite universe, optionally with a generating partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigmaAlgebraInput {
    pub items: Vec<String>,
    /// When present, the σ-algebra generated by these blocks instead of
    /// the full power set.
    #[serde(default)]
    pub blocks: Option<Vec<Vec<String>>>,
    #[serde(default)]
    pub config: EngineConfig,
}

pub fn analyze_sigma_algebra(
    input: &SigmaAlgebraInput,
) -> LatticeResult<ComputationOutput<SigmaAlgebra>> {
    let start = Instant::now();
    input.config.validate()?;
    let distinct: HashSet<&String> = input.items.iter().collect();
    if distinct.len() != input.items.len() {
        return Err(LatticeError::InvalidInput {
            field: "items".into(),
            reason: "item labels must be unique".into(),
        });
    }

    let max = input.config.limits.max_atoms;
    let (algebra, methodology) = match &input.blocks {
        Some(blocks) => (
            enumerate_unions(blocks, &input.items, max)?,
            "Sigma-algebra generated by a partition (all unions of blocks)",
        ),
        None => (
            enumerate_subsets(&input.items, max)?,
            "Power set of a finite sample space",
        ),
    };

    let assumptions = serde_json::json!({
        "items": input.items.len(),
        "blocks": input.blocks.as_ref().map(Vec::len),
        "max_atoms": max,
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        methodology,
        &assumptions,
        Vec::new(),
        elapsed,
        algebra,
    ))
}
