//! Change notifications from the driver to display collaborators.

use serde::{Deserialize, Serialize};

use crate::simulation::{Grid, Population};

/// Whether the recurring tick is scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// No ticks are scheduled; the grid may be edited
    #[default]
    Stopped,
    /// Ticks fire at the configured interval; the grid is owned by the driver
    Running,
}

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEvent {
    /// A generation was computed
    Tick { generation: u64 },
    /// The recurring tick was cancelled
    Stopped { generation: u64 },
    /// The grid was edited while stopped (toggle, resize, clear, load, shading)
    GridEdited,
}

/// Driver state captured when a change was published. Observers receive it
/// after the driver lock is released, so it is an owned copy.
#[derive(Debug, Clone)]
pub struct SimulationView {
    state: RunState,
    generation: u64,
    grid: Grid,
}

impl SimulationView {
    pub(crate) fn new(state: RunState, generation: u64, grid: Grid) -> Self {
        Self {
            state,
            generation,
            grid,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn generation_count(&self) -> u64 {
        self.generation
    }

    /// Grid as of this notification, for per-cell `is_alive` / `color_intensity`
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn population(&self) -> Population {
        self.grid.population()
    }
}

/// Listener invoked by the driver after each state change.
///
/// Notifications are delivered in the order the changes happened and never
/// concurrently with each other. They run outside the driver lock, so an
/// observer may call back into the `Simulation`, for example to `stop()` it.
/// Events published by such a call are delivered after the current one returns.
pub trait SimulationObserver: Send + Sync {
    fn notify(&self, event: SimulationEvent, view: &SimulationView);
}

impl<F> SimulationObserver for F
where
    F: Fn(SimulationEvent, &SimulationView) + Send + Sync,
{
    fn notify(&self, event: SimulationEvent, view: &SimulationView) {
        self(event, view)
    }
}

/// Handle returned on registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);
