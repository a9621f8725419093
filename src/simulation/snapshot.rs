use std::fmt;

use serde::{Deserialize, Serialize};

use crate::simulation::cell::Cell;

/// Frozen copy of a grid matrix, as recorded in history and saved to disk
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub dimension: usize,
    /// Row-major cell values
    pub cells: Vec<Cell>,
}

impl GridSnapshot {
    pub fn new(dimension: usize, cells: Vec<Cell>) -> Self {
        debug_assert_eq!(cells.len(), dimension * dimension);
        Self { dimension, cells }
    }

    /// Raw signed values, one Vec per row
    pub fn to_rows(&self) -> Vec<Vec<i32>> {
        self.cells
            .chunks(self.dimension.max(1))
            .map(|row| row.iter().map(|c| c.raw()).collect())
            .collect()
    }

    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_alive()).count()
    }
}

/// Nested list dump on a single line: `[[-1, 2], [1, -3]]`
impl fmt::Display for GridSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (r, row) in self.cells.chunks(self.dimension.max(1)).enumerate() {
            if r > 0 {
                f.write_str(", ")?;
            }
            f.write_str("[")?;
            for (c, cell) in row.iter().enumerate() {
                if c > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", cell.raw())?;
            }
            f.write_str("]")?;
        }
        f.write_str("]")
    }
}
