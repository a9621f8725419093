use serde::{Deserialize, Serialize};

use crate::config::{AGE_CAP, NEEDED_FOR_BIRTH, NEEDED_TO_SURVIVE, SHADE_MAX, SHADE_MIN};
use crate::error::Error;

/// A single grid cell, encoding liveness and age in one signed value.
///
/// - value > 0: alive, magnitude = consecutive generations spent alive
/// - value < 0: dead, magnitude = consecutive generations spent dead
/// - value == 0: never stored; fresh cells start as `Cell::DEAD` (-1)
///
/// Magnitudes saturate at `AGE_CAP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Cell(i32);

impl Cell {
    /// Freshly dead cell (age 1)
    pub const DEAD: Cell = Cell(-1);

    /// Freshly born cell (age 1)
    pub const ALIVE: Cell = Cell(1);

    /// Build a cell from its raw signed value. Zero is rejected; magnitudes
    /// beyond `AGE_CAP` are saturated.
    pub fn new(raw: i32) -> Option<Self> {
        match raw {
            0 => None,
            r if r > 0 => Some(Cell(r.min(AGE_CAP))),
            r => Some(Cell(r.max(-AGE_CAP))),
        }
    }

    /// Raw signed value
    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn is_alive(self) -> bool {
        self.0 > 0
    }

    /// Consecutive generations spent in the current state (always >= 1)
    pub fn age(self) -> u32 {
        self.0.unsigned_abs()
    }

    /// Flip liveness, resetting the age to 1
    pub fn toggled(self) -> Self {
        if self.is_alive() {
            Cell::DEAD
        } else {
            Cell::ALIVE
        }
    }

    /// Apply the B3/S23 rule given the number of live neighbours.
    ///
    /// Keeping the same liveness ages the cell by one generation; flipping
    /// resets the age to 1 in the new sign.
    pub fn evolve(self, live_neighbours: u8) -> Self {
        let alive_next = match (self.is_alive(), live_neighbours) {
            (true, n) => n == NEEDED_TO_SURVIVE || n == NEEDED_FOR_BIRTH,
            (false, n) => n == NEEDED_FOR_BIRTH,
        };

        if alive_next == self.is_alive() {
            self.aged()
        } else if alive_next {
            Cell::ALIVE
        } else {
            Cell::DEAD
        }
    }

    fn aged(self) -> Self {
        if self.0 > 0 {
            Cell((self.0 + 1).min(AGE_CAP))
        } else {
            Cell((self.0 - 1).max(-AGE_CAP))
        }
    }

    /// Display intensity for this cell under the given shading mode
    pub fn intensity(self, shading: Shading) -> Intensity {
        let level = match shading {
            Shading::Unshaded => SHADE_MAX,
            Shading::Shaded => self.age().clamp(SHADE_MIN as u32, SHADE_MAX as u32) as u8,
        };
        Intensity {
            alive: self.is_alive(),
            level,
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::DEAD
    }
}

impl TryFrom<i32> for Cell {
    type Error = Error;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        Cell::new(raw).ok_or_else(|| Error::MalformedState("cell value 0 is not a valid state".into()))
    }
}

impl From<Cell> for i32 {
    fn from(cell: Cell) -> i32 {
        cell.0
    }
}

/// Whether display colour follows cell age or only liveness
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shading {
    /// Two colours: alive or dead
    #[default]
    Unshaded,
    /// Colour level grows with the time spent in the current state
    Shaded,
}

/// Colour intensity handed to display collaborators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Intensity {
    pub alive: bool,
    /// Channel level in [SHADE_MIN, SHADE_MAX]
    pub level: u8,
}

impl Intensity {
    /// Green channel for live cells, red channel for dead ones
    pub fn rgb(self) -> [u8; 3] {
        if self.alive {
            [0, self.level, 0]
        } else {
            [self.level, 0, 0]
        }
    }
}
