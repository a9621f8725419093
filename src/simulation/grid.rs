use std::fmt;

use crate::config::DEFAULT_GRID_SPAN;
use crate::error::{Error, Result};
use crate::simulation::cell::{Cell, Intensity, Shading};
use crate::simulation::snapshot::GridSnapshot;

/// Square toroidal grid of aged cells
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    dimension: usize,
    shading: Shading,
    /// Row-major, always `dimension * dimension` long
    cells: Vec<Cell>,
}

/// Alive/dead totals over the whole grid
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Population {
    pub alive: usize,
    pub dead: usize,
}

impl Grid {
    /// Create an all-dead grid of `dimension x dimension` cells
    pub fn new(dimension: usize, shading: Shading) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidDimension(dimension));
        }
        Ok(Self {
            dimension,
            shading,
            cells: vec![Cell::DEAD; dimension * dimension],
        })
    }

    /// Create an unshaded grid with the default span
    pub fn new_default() -> Self {
        Self {
            dimension: DEFAULT_GRID_SPAN,
            shading: Shading::Unshaded,
            cells: vec![Cell::DEAD; DEFAULT_GRID_SPAN * DEFAULT_GRID_SPAN],
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn shading(&self) -> Shading {
        self.shading
    }

    pub fn set_shading(&mut self, shading: Shading) {
        self.shading = shading;
    }

    /// Cell at (row, col), or None when out of range
    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        self.index(row, col).map(|i| self.cells[i])
    }

    /// Whether the cell at (row, col) is alive.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is not below `dimension()`.
    pub fn is_alive(&self, row: usize, col: usize) -> bool {
        self.expect_cell(row, col).is_alive()
    }

    /// Display intensity for the cell at (row, col) under the current shading.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is not below `dimension()`.
    pub fn color_intensity(&self, row: usize, col: usize) -> Intensity {
        self.expect_cell(row, col).intensity(self.shading)
    }

    /// Flip the liveness of one cell, resetting its age
    pub fn toggle(&mut self, row: usize, col: usize) -> Result<()> {
        let i = self.checked_index(row, col)?;
        self.cells[i] = self.cells[i].toggled();
        Ok(())
    }

    /// Force a cell alive or dead. A cell already in the requested state keeps its age.
    pub fn set_alive(&mut self, row: usize, col: usize, alive: bool) -> Result<()> {
        let i = self.checked_index(row, col)?;
        self.set_alive_at(i, alive);
        Ok(())
    }

    /// `set_alive` with coordinates taken mod `dimension()`, so it cannot fail
    pub(crate) fn set_alive_wrapping(&mut self, row: usize, col: usize, alive: bool) {
        let n = self.dimension;
        self.set_alive_at((row % n) * n + col % n, alive);
    }

    fn set_alive_at(&mut self, i: usize, alive: bool) {
        if self.cells[i].is_alive() != alive {
            self.cells[i] = self.cells[i].toggled();
        }
    }

    /// Replace the matrix with an all-dead one of the new size
    pub fn resize(&mut self, dimension: usize) -> Result<()> {
        if dimension == 0 {
            return Err(Error::InvalidDimension(dimension));
        }
        self.dimension = dimension;
        self.cells = vec![Cell::DEAD; dimension * dimension];
        Ok(())
    }

    /// Kill every cell, keeping the dimension
    pub fn clear(&mut self) {
        self.cells = vec![Cell::DEAD; self.dimension * self.dimension];
    }

    /// Replace the whole matrix. The dimension is taken from the number of rows,
    /// and every row must be that long with no zero entries.
    pub fn set_state<R: AsRef<[i32]>>(&mut self, rows: &[R]) -> Result<()> {
        let dimension = rows.len();
        if dimension == 0 {
            return Err(Error::MalformedState("state has no rows".into()));
        }

        let mut cells = Vec::with_capacity(dimension * dimension);
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != dimension {
                return Err(Error::MalformedState(format!(
                    "row {} has {} cells, expected {}",
                    r,
                    row.len(),
                    dimension
                )));
            }
            for (c, &raw) in row.iter().enumerate() {
                let cell = Cell::new(raw).ok_or_else(|| {
                    Error::MalformedState(format!("cell ({}, {}) is 0", r, c))
                })?;
                cells.push(cell);
            }
        }

        self.dimension = dimension;
        self.cells = cells;
        Ok(())
    }

    /// Restore a previously captured snapshot
    pub fn restore(&mut self, snapshot: &GridSnapshot) -> Result<()> {
        self.set_state(&snapshot.to_rows())
    }

    /// Advance one generation.
    ///
    /// Every cell is computed from the current matrix only; the new matrix
    /// replaces the old one in a single assignment.
    pub fn step(&mut self) {
        let n = self.dimension;
        let next: Vec<Cell> = self
            .cells
            .iter()
            .enumerate()
            .map(|(i, cell)| cell.evolve(self.live_neighbours(i / n, i % n)))
            .collect();
        self.cells = next;
    }

    /// Count live cells among the 8 neighbours, wrapping around all edges
    fn live_neighbours(&self, row: usize, col: usize) -> u8 {
        let n = self.dimension as isize;
        let mut count = 0;

        for row_offset in -1..=1 {
            for col_offset in -1..=1 {
                if row_offset == 0 && col_offset == 0 {
                    continue;
                }

                let r = (row as isize + row_offset).rem_euclid(n) as usize;
                let c = (col as isize + col_offset).rem_euclid(n) as usize;

                if self.cells[r * self.dimension + c].is_alive() {
                    count += 1;
                }
            }
        }

        count
    }

    pub fn population(&self) -> Population {
        let alive = self.cells.iter().filter(|c| c.is_alive()).count();
        Population {
            alive,
            dead: self.cells.len() - alive,
        }
    }

    /// Rows of the grid, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.dimension)
    }

    /// Copy of the current matrix
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot::new(self.dimension, self.cells.clone())
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.dimension && col < self.dimension).then(|| row * self.dimension + col)
    }

    fn checked_index(&self, row: usize, col: usize) -> Result<usize> {
        self.index(row, col).ok_or(Error::OutOfBounds {
            row,
            col,
            dimension: self.dimension,
        })
    }

    fn expect_cell(&self, row: usize, col: usize) -> Cell {
        match self.cell(row, col) {
            Some(cell) => cell,
            None => panic!(
                "cell ({}, {}) is outside a {}x{} grid",
                row, col, self.dimension, self.dimension
            ),
        }
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new_default()
    }
}

/// `#` for live cells, `.` for dead ones, one line per row
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for cell in row {
                f.write_str(if cell.is_alive() { "#" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(dimension: usize, alive: &[(usize, usize)]) -> Grid {
        let mut grid = Grid::new(dimension, Shading::Unshaded).unwrap();
        for &(r, c) in alive {
            grid.set_alive(r, c, true).unwrap();
        }
        grid
    }

    fn alive_cells(grid: &Grid) -> Vec<(usize, usize)> {
        let n = grid.dimension();
        (0..n)
            .flat_map(|r| (0..n).map(move |c| (r, c)))
            .filter(|&(r, c)| grid.is_alive(r, c))
            .collect()
    }

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(30, Shading::Shaded).unwrap();
        assert_eq!(grid.dimension(), 30);
        assert_eq!(grid.rows().count(), 30);
        assert!(grid.rows().flatten().all(|c| *c == Cell::DEAD));
        assert_eq!(grid.population(), Population { alive: 0, dead: 900 });
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            Grid::new(0, Shading::Unshaded),
            Err(Error::InvalidDimension(0))
        ));
        let mut grid = Grid::new_default();
        assert!(grid.resize(0).is_err());
        assert_eq!(grid.dimension(), DEFAULT_GRID_SPAN);
    }

    #[test]
    fn test_step_preserves_dimension() {
        for n in 1..=7 {
            let mut grid = grid_with(n, &[(0, 0)]);
            grid.step();
            assert_eq!(grid.dimension(), n);
            assert_eq!(grid.rows().count(), n);
            assert!(grid.rows().all(|row| row.len() == n));
        }
    }

    #[test]
    fn test_wraparound_counts_far_corners() {
        for n in 3..=8 {
            let last = n - 1;
            for &neighbour in &[(last, last), (last, 0), (0, last), (last, 1), (1, last)] {
                let grid = grid_with(n, &[neighbour]);
                assert_eq!(
                    grid.live_neighbours(0, 0),
                    1,
                    "n = {}, neighbour {:?} not counted exactly once",
                    n,
                    neighbour
                );
            }
        }

        // On a 2x2 torus every other cell is a neighbour several times over
        let grid = grid_with(2, &[(1, 1)]);
        assert!(grid.live_neighbours(0, 0) > 0);
    }

    #[test]
    fn test_wraparound_near_upper_edge() {
        // (n-1, n-1) sees (0, 0) through the bottom-right corner
        let grid = grid_with(10, &[(0, 0), (0, 9), (9, 0)]);
        assert_eq!(grid.live_neighbours(9, 9), 3);

        let mut grid = grid;
        grid.step();
        assert!(grid.is_alive(9, 9), "corner cell should be born across the wrap");
    }

    #[test]
    fn test_block_is_stable() {
        let block = [(1, 1), (1, 2), (2, 1), (2, 2)];
        for n in 4..=6 {
            let mut grid = grid_with(n, &block);
            for _ in 0..10 {
                grid.step();
                assert_eq!(alive_cells(&grid), block.to_vec());
            }
            assert_eq!(grid.cell(1, 1).unwrap().raw(), 11);
        }
    }

    #[test]
    fn test_isolated_cell_dies() {
        let mut grid = grid_with(5, &[(2, 2)]);
        grid.step();
        assert!(!grid.is_alive(2, 2));
        assert_eq!(grid.cell(2, 2), Some(Cell::DEAD));
        assert_eq!(grid.population().alive, 0);
    }

    #[test]
    fn test_birth_needs_exactly_three() {
        let around = [(1, 1), (1, 2), (1, 3), (2, 1), (2, 3)];
        for k in 0..=5 {
            let mut grid = grid_with(7, &around[..k]);
            grid.step();
            assert_eq!(grid.is_alive(2, 2), k == 3, "dead cell with {} neighbours", k);
        }
    }

    #[test]
    fn test_blinker_oscillates() {
        let horizontal = vec![(2, 1), (2, 2), (2, 3)];
        let vertical = vec![(1, 2), (2, 2), (3, 2)];
        let mut grid = grid_with(5, &horizontal);
        grid.step();
        assert_eq!(alive_cells(&grid), vertical);
        grid.step();
        assert_eq!(alive_cells(&grid), horizontal);
        // The centre never changed state
        assert_eq!(grid.cell(2, 2).unwrap().raw(), 3);
    }

    #[test]
    fn test_glider_wraps_back_home() {
        let glider = [(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)];
        let mut grid = grid_with(8, &glider);
        let start = alive_cells(&grid);
        // A glider moves one cell diagonally every 4 generations
        for _ in 0..32 {
            grid.step();
            assert_eq!(grid.population().alive, 5);
        }
        assert_eq!(alive_cells(&grid), start);
    }

    #[test]
    fn test_toggle_twice_restores_liveness() {
        let mut grid = grid_with(4, &[(1, 1)]);
        grid.step();
        let before = grid.is_alive(3, 3);
        grid.toggle(3, 3).unwrap();
        assert_ne!(grid.is_alive(3, 3), before);
        grid.toggle(3, 3).unwrap();
        assert_eq!(grid.is_alive(3, 3), before);
    }

    #[test]
    fn test_toggle_out_of_range() {
        let mut grid = Grid::new(4, Shading::Unshaded).unwrap();
        assert!(matches!(
            grid.toggle(4, 0),
            Err(Error::OutOfBounds { row: 4, col: 0, dimension: 4 })
        ));
        assert!(grid.toggle(0, 10).is_err());
    }

    #[test]
    fn test_set_alive_wrapping_reduces_coordinates() {
        let mut grid = Grid::new(4, Shading::Unshaded).unwrap();
        for (row, col) in [(5, 5), (5, 6), (6, 5), (6, 6)] {
            grid.set_alive_wrapping(row, col, true);
        }
        assert_eq!(alive_cells(&grid), vec![(1, 1), (1, 2), (2, 1), (2, 2)]);

        // A block survives and ages; reviving a live cell keeps its age
        grid.step();
        let aged = grid.cell(1, 1);
        grid.set_alive_wrapping(5, 9, true);
        assert_eq!(grid.cell(1, 1), aged);

        grid.set_alive_wrapping(9, 5, false);
        assert!(!grid.is_alive(1, 1));
    }

    #[test]
    #[should_panic]
    fn test_is_alive_out_of_range_panics() {
        let grid = Grid::new(4, Shading::Unshaded).unwrap();
        grid.is_alive(0, 4);
    }

    #[test]
    fn test_resize_and_clear_reset_cells() {
        let mut grid = grid_with(5, &[(0, 0), (4, 4)]);
        grid.resize(8).unwrap();
        assert_eq!(grid.dimension(), 8);
        assert_eq!(grid.population().alive, 0);

        grid.set_alive(7, 7, true).unwrap();
        grid.clear();
        assert_eq!(grid.dimension(), 8);
        assert!(grid.rows().flatten().all(|c| *c == Cell::DEAD));
    }

    #[test]
    fn test_set_state_takes_dimension_from_input() {
        let mut grid = Grid::new_default();
        grid.set_state(&[vec![5, -1, -2], vec![-1, 1, -1], vec![-3, -1, 2]])
            .unwrap();
        assert_eq!(grid.dimension(), 3);
        assert!(grid.is_alive(0, 0));
        assert_eq!(grid.cell(0, 0).unwrap().age(), 5);
        assert_eq!(grid.population(), Population { alive: 3, dead: 6 });
    }

    #[test]
    fn test_set_state_rejects_bad_input() {
        let mut grid = Grid::new(2, Shading::Unshaded).unwrap();
        let empty: [Vec<i32>; 0] = [];
        assert!(grid.set_state(&empty).is_err());
        assert!(grid.set_state(&[vec![1, -1], vec![-1]]).is_err());
        assert!(grid.set_state(&[vec![1, 0], vec![-1, -1]]).is_err());
        // Rejected input leaves the grid untouched
        assert_eq!(grid.dimension(), 2);
        assert_eq!(grid.population().alive, 0);
    }

    #[test]
    fn test_color_intensity_follows_shading() {
        let mut grid = grid_with(4, &[(1, 1), (1, 2), (2, 1), (2, 2)]);
        for _ in 0..100 {
            grid.step();
        }
        assert_eq!(grid.color_intensity(1, 1).level, 250);
        grid.set_shading(Shading::Shaded);
        let shaded = grid.color_intensity(1, 1);
        assert!(shaded.alive);
        assert_eq!(shaded.level, 101);
        assert!(!grid.color_intensity(0, 0).alive);
    }

    #[test]
    fn test_display() {
        let grid = grid_with(3, &[(0, 1), (2, 2)]);
        assert_eq!(grid.to_string(), ".#.\n...\n..#\n");
    }
}
