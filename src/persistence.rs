//! History files and snapshot save/load.
//!
//! The history text format is a header with the total iteration count and the
//! grid span, then one block per recorded generation:
//!
//! ```text
//! Iterations: 12
//! Grid span: 3
//! Iteration: 0
//! [[-1, 1, -2], [-1, 1, -2], [-3, 1, -1]]
//!
//! Iteration: 1
//! ...
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::driver::Simulation;
use crate::error::{Error, Result};
use crate::simulation::GridSnapshot;

/// Data a history file is written from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub generation_count: u64,
    pub dimension: usize,
    pub history: Vec<GridSnapshot>,
}

/// Write `record` in the history text format
pub fn write_history<W: Write>(mut out: W, record: &HistoryRecord) -> Result<()> {
    writeln!(out, "Iterations: {}", record.generation_count)?;
    writeln!(out, "Grid span: {}", record.dimension)?;
    for (i, snapshot) in record.history.iter().enumerate() {
        writeln!(out, "Iteration: {}", i)?;
        writeln!(out, "{}", snapshot)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Write the simulation's history to `path`, replacing any existing file
pub fn save_history(path: impl AsRef<Path>, sim: &Simulation) -> Result<()> {
    let path = path.as_ref();
    let record = sim.history_record();
    let file = File::create(path)?;
    write_history(BufWriter::new(file), &record)?;
    log::info!(
        "Saved {} recorded generations to {}",
        record.history.len(),
        path.display()
    );
    Ok(())
}

pub fn save_snapshot_json(path: impl AsRef<Path>, snapshot: &GridSnapshot) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, snapshot)?;
    out.flush()?;
    Ok(())
}

/// Load a snapshot written by `save_snapshot_json`. The cell count must match
/// the stored dimension.
pub fn load_snapshot_json(path: impl AsRef<Path>) -> Result<GridSnapshot> {
    let file = File::open(path.as_ref())?;
    let snapshot: GridSnapshot = serde_json::from_reader(BufReader::new(file))?;
    if snapshot.dimension == 0 || snapshot.cells.len() != snapshot.dimension * snapshot.dimension {
        return Err(Error::MalformedState(format!(
            "snapshot has {} cells for dimension {}",
            snapshot.cells.len(),
            snapshot.dimension
        )));
    }
    Ok(snapshot)
}
