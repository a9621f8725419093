mod cell;
mod grid;
mod snapshot;

pub use cell::{Cell, Intensity, Shading};
pub use grid::{Grid, Population};
pub use snapshot::GridSnapshot;
