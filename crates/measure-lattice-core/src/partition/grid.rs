use serde::{Deserialize, Serialize};

use crate::partition::axis::AxisPartition;
use crate::types::Coordinate;

/// One cell of the grid partition. Indices are 1-based in traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Atom {
    pub index: usize,
    pub x1: Coordinate,
    pub x2: Coordinate,
    pub y1: Coordinate,
    pub y2: Coordinate,
    pub label: String,
}

impl Atom {
    pub fn width(&self) -> Coordinate {
        self.x2 - self.x1
    }

    pub fn height(&self) -> Coordinate {
        self.y2 - self.y1
    }

    pub fn area(&self) -> Coordinate {
        self.width() * self.height()
    }
}

/// Display label for the atom with 1-based `index`.
pub fn atom_label(index: usize) -> String {
    format!("A{index}")
}

/// Cross the two axes into rectangular atoms.
///
/// The outer loop runs over x-intervals and the inner loop over y-intervals,
/// so with two vertical cuts and one horizontal cut the order is
/// `A1 = (x0, y0), A2 = (x0, y1), A3 = (x1, y0), ...`. No cuts on either axis
/// yields a single atom covering the whole rectangle.
pub fn compute_atoms(vertical: &AxisPartition, horizontal: &AxisPartition) -> Vec<Atom> {
    let xs = vertical.intervals();
    let ys = horizontal.intervals();
    let mut atoms = Vec::with_capacity(xs.len() * ys.len());
    for (x1, x2) in &xs {
        for (y1, y2) in &ys {
            let index = atoms.len() + 1;
            atoms.push(Atom {
                index,
                x1: *x1,
                x2: *x2,
                y1: *y1,
                y2: *y2,
                label: atom_label(index),
            });
        }
    }
    tracing::debug!(
        vertical_cuts = vertical.cuts().len(),
        horizontal_cuts = horizontal.cuts().len(),
        atoms = atoms.len(),
        "grid partition computed"
    );
    atoms
}
