//! Conway's Game of Life on a toroidal grid, with per-cell age shading,
//! history recording and a timed driver.
//!
//! # Architecture
//!
//! - **Simulation**: `Grid` owns the cell matrix and the transition rule
//! - **Driver**: `Simulation` ticks the grid on a timer and notifies observers
//! - **Persistence**: history text files and JSON snapshots
//! - **Patterns**: named seeds and random fill
//!
//! # Usage
//!
//! ```no_run
//! use shaded_life::{Grid, Shading, Simulation, SimulationConfig, SimulationEvent};
//!
//! let mut grid = Grid::new(20, Shading::Shaded)?;
//! grid.toggle(1, 2)?;
//!
//! let sim = Simulation::new(grid, SimulationConfig::default())?;
//! sim.subscribe(|event, view| {
//!     if let SimulationEvent::Tick { generation } = event {
//!         println!("{}: {} alive", generation, view.population().alive);
//!     }
//! });
//! sim.start();
//! # Ok::<(), shaded_life::Error>(())
//! ```

pub mod app;
pub mod config;
pub mod driver;
pub mod error;
pub mod patterns;
pub mod persistence;
pub mod simulation;

pub use config::SimulationConfig;
pub use driver::{
    ObserverId, RunState, Simulation, SimulationEvent, SimulationObserver, SimulationView,
};
pub use error::{Error, Result};
pub use simulation::{Cell, Grid, GridSnapshot, Intensity, Population, Shading};
