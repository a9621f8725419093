use rand::Rng;

use crate::simulation::Grid;

/// A named seed pattern, cells given as (row, col) relative to its top-left corner
pub struct Pattern {
    pub name: &'static str,
    pub cells: &'static [(usize, usize)],
}

impl Pattern {
    /// (rows, cols) of the pattern's bounding box
    pub fn extent(&self) -> (usize, usize) {
        let rows = self.cells.iter().map(|&(r, _)| r + 1).max().unwrap_or(0);
        let cols = self.cells.iter().map(|&(_, c)| c + 1).max().unwrap_or(0);
        (rows, cols)
    }
}

pub const PATTERNS: &[Pattern] = &[
    Pattern {
        name: "Block",
        cells: &[(0, 0), (0, 1), (1, 0), (1, 1)],
    },
    Pattern {
        name: "Blinker",
        cells: &[(0, 0), (0, 1), (0, 2)],
    },
    Pattern {
        name: "Toad",
        cells: &[(0, 1), (0, 2), (0, 3), (1, 0), (1, 1), (1, 2)],
    },
    Pattern {
        name: "Beacon",
        cells: &[(0, 0), (0, 1), (1, 0), (1, 1), (2, 2), (2, 3), (3, 2), (3, 3)],
    },
    Pattern {
        name: "Glider",
        cells: &[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)],
    },
    Pattern {
        name: "R-pentomino",
        cells: &[(0, 1), (0, 2), (1, 0), (1, 1), (2, 1)],
    },
];

/// Look a pattern up by name, ignoring case
pub fn find(name: &str) -> Option<&'static Pattern> {
    PATTERNS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Clear the grid and stamp `pattern` in its centre. Cells that do not fit wrap around.
pub fn apply(grid: &mut Grid, pattern: &Pattern) {
    grid.clear();

    let n = grid.dimension();
    let (rows, cols) = pattern.extent();
    let row_offset = n.saturating_sub(rows) / 2;
    let col_offset = n.saturating_sub(cols) / 2;

    for &(r, c) in pattern.cells {
        grid.set_alive_wrapping(r + row_offset, c + col_offset, true);
    }
}

/// Clear the grid and bring each cell to life with probability `density`.
/// Densities outside [0, 1] are clamped; NaN leaves the grid empty.
pub fn randomize<R: Rng + ?Sized>(grid: &mut Grid, density: f64, rng: &mut R) {
    grid.clear();

    if density.is_nan() {
        log::warn!("Random density is NaN, leaving the grid empty");
        return;
    }
    let density = density.clamp(0.0, 1.0);
    let n = grid.dimension();
    for row in 0..n {
        for col in 0..n {
            if rng.gen_bool(density) {
                grid.set_alive_wrapping(row, col, true);
            }
        }
    }
}
