//! Timed simulation driver.
//!
//! Owns the grid, the generation counter, the optional history buffer and the
//! observer list. Ticks run on a single-worker tokio runtime; every tick and
//! every edit takes the same lock, so generations are computed strictly one at
//! a time and never interleave with a mutation.
//!
//! Changes are published to a queue while the lock is held and delivered to
//! observers after it is released, one notification at a time.

mod observer;

pub use observer::{ObserverId, RunState, SimulationEvent, SimulationObserver, SimulationView};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[cfg(test)]
use std::sync::atomic::AtomicUsize;

use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::{clamp_interval, SimulationConfig};
use crate::error::{Error, Result};
use crate::persistence::HistoryRecord;
use crate::simulation::{Grid, GridSnapshot, Population, Shading};

/// Mutable driver state, guarded by `Shared::core`
struct Core {
    grid: Grid,
    state: RunState,
    generation: u64,
    tick_interval: Duration,
    history_enabled: bool,
    history: Vec<GridSnapshot>,
    /// Bumped on every reschedule/stop; a timer task only ticks while its epoch is current
    epoch: u64,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    core: Mutex<Core>,
    observers: Mutex<Vec<(ObserverId, Arc<dyn SimulationObserver>)>>,
    next_observer: AtomicU64,
    /// Published but not yet delivered, in publish order
    pending: Mutex<VecDeque<(SimulationEvent, SimulationView)>>,
    /// Set while some thread is delivering `pending`
    dispatching: AtomicBool,
    #[cfg(test)]
    steps_in_flight: AtomicUsize,
    #[cfg(test)]
    overlapping_steps: AtomicUsize,
}

/// Clears `Shared::dispatching` on scope exit, including when an observer panics
struct DispatchGuard<'a>(&'a AtomicBool);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Core> {
        // A panicking observer must not wedge the driver
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observers(&self) -> Vec<Arc<dyn SimulationObserver>> {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }

    fn has_observers(&self) -> bool {
        !self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    fn pending(&self) -> MutexGuard<'_, VecDeque<(SimulationEvent, SimulationView)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `event` with a copy of the current state. Called with the core
    /// lock held, which fixes the delivery order.
    fn publish(&self, core: &Core, event: SimulationEvent) {
        if !self.has_observers() {
            return;
        }
        let view = SimulationView::new(core.state, core.generation, core.grid.clone());
        self.pending().push_back((event, view));
    }

    /// Deliver queued notifications. Must be called without the core lock.
    ///
    /// Only one thread delivers at a time. A call that finds delivery already
    /// in progress (on another thread, or further up this thread's stack when
    /// an observer calls back into the driver) returns at once and leaves its
    /// events to the active dispatcher.
    fn dispatch(&self) {
        loop {
            if self
                .dispatching
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            let guard = DispatchGuard(&self.dispatching);
            while let Some((event, view)) = self.next_pending() {
                for observer in self.observers() {
                    observer.notify(event, &view);
                }
            }
            drop(guard);

            // Something may have been queued between the last pop and the release
            if self.pending().is_empty() {
                return;
            }
        }
    }

    fn next_pending(&self) -> Option<(SimulationEvent, SimulationView)> {
        self.pending().pop_front()
    }

    /// One generation: snapshot (pre-step), step, count, publish
    fn tick(&self, core: &mut Core) {
        if core.history_enabled {
            let snapshot = core.grid.snapshot();
            core.history.push(snapshot);
        }

        #[cfg(test)]
        if self.steps_in_flight.fetch_add(1, Ordering::SeqCst) != 0 {
            self.overlapping_steps.fetch_add(1, Ordering::SeqCst);
        }
        core.grid.step();
        #[cfg(test)]
        self.steps_in_flight.fetch_sub(1, Ordering::SeqCst);

        core.generation += 1;
        log::debug!(
            "Generation {} ({} alive)",
            core.generation,
            core.grid.population().alive
        );
        self.publish(
            core,
            SimulationEvent::Tick {
                generation: core.generation,
            },
        );
    }
}

/// Recurring timer task. Fixed-rate: the schedule stays anchored to its start,
/// late ticks are skipped rather than bunched up.
async fn run_schedule(shared: Arc<Shared>, epoch: u64, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        {
            let mut core = shared.lock();
            if core.epoch != epoch || core.state != RunState::Running {
                log::trace!("Timer task for epoch {} retired", epoch);
                break;
            }
            shared.tick(&mut core);
        }
        shared.dispatch();
    }
}

/// Game of Life simulation driver.
///
/// All methods take `&self`; wrap the driver in an `Arc` to share it between a
/// display thread and an input thread.
pub struct Simulation {
    shared: Arc<Shared>,
    handle: Handle,
    /// Present when the driver built its own runtime
    runtime: Option<Runtime>,
}

impl Simulation {
    /// Create a stopped driver around `grid`, with its own ticker runtime.
    pub fn new(grid: Grid, config: SimulationConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("life-ticker")
            .enable_time()
            .build()
            .map_err(Error::Scheduler)?;
        let handle = runtime.handle().clone();
        Ok(Self::build(grid, config, handle, Some(runtime)))
    }

    /// Create a stopped driver that schedules its ticks on an existing runtime.
    pub fn with_handle(grid: Grid, config: SimulationConfig, handle: Handle) -> Self {
        Self::build(grid, config, handle, None)
    }

    fn build(grid: Grid, config: SimulationConfig, handle: Handle, runtime: Option<Runtime>) -> Self {
        let core = Core {
            grid,
            state: RunState::Stopped,
            generation: 0,
            tick_interval: clamp_interval(config.tick_interval),
            history_enabled: config.history_enabled,
            history: Vec::new(),
            epoch: 0,
            task: None,
        };
        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                observers: Mutex::new(Vec::new()),
                next_observer: AtomicU64::new(0),
                pending: Mutex::new(VecDeque::new()),
                dispatching: AtomicBool::new(false),
                #[cfg(test)]
                steps_in_flight: AtomicUsize::new(0),
                #[cfg(test)]
                overlapping_steps: AtomicUsize::new(0),
            }),
            handle,
            runtime,
        }
    }

    // ============================================
    // Run control
    // ============================================

    /// Start ticking at the current interval, first tick immediately.
    ///
    /// When already running this cancels the pending schedule and starts a new
    /// one; the generation count is kept.
    pub fn start(&self) {
        let mut core = self.shared.lock();
        if core.state == RunState::Running {
            log::trace!("Rescheduling at {:?}", core.tick_interval);
        } else {
            log::info!(
                "Simulation started at generation {}, every {:?}",
                core.generation,
                core.tick_interval
            );
        }
        self.schedule(&mut core);
    }

    fn schedule(&self, core: &mut Core) {
        if let Some(task) = core.task.take() {
            task.abort();
        }
        core.epoch += 1;
        core.state = RunState::Running;
        let task = self.handle.spawn(run_schedule(
            Arc::clone(&self.shared),
            core.epoch,
            core.tick_interval,
        ));
        core.task = Some(task);
    }

    /// Cancel the recurring tick and notify observers. No-op when stopped.
    ///
    /// Returns once no generation is being computed; none will start
    /// afterwards. May be called from inside an observer.
    pub fn stop(&self) {
        {
            let mut core = self.shared.lock();
            if core.state == RunState::Stopped {
                return;
            }
            Self::cancel(&mut core);
            log::info!("Simulation stopped at generation {}", core.generation);
            self.shared.publish(
                &core,
                SimulationEvent::Stopped {
                    generation: core.generation,
                },
            );
        }
        self.shared.dispatch();
    }

    fn cancel(core: &mut Core) {
        core.state = RunState::Stopped;
        core.epoch += 1;
        if let Some(task) = core.task.take() {
            task.abort();
        }
    }

    /// Compute one generation right now. Only allowed while stopped.
    pub fn advance(&self) -> Result<u64> {
        let generation = {
            let mut core = self.shared.lock();
            if core.state == RunState::Running {
                return Err(Error::Running);
            }
            self.shared.tick(&mut core);
            core.generation
        };
        self.shared.dispatch();
        Ok(generation)
    }

    /// Change the tick interval, clamped to the supported range. A running
    /// simulation is rescheduled in place. Returns the effective interval.
    pub fn set_tick_interval(&self, requested: Duration) -> Duration {
        let interval = clamp_interval(requested);
        if interval != requested {
            log::warn!("Tick interval {:?} clamped to {:?}", requested, interval);
        }

        let mut core = self.shared.lock();
        core.tick_interval = interval;
        if core.state == RunState::Running {
            self.schedule(&mut core);
        }
        interval
    }

    // ============================================
    // History
    // ============================================

    /// Turn per-tick recording on or off. Existing history is kept.
    pub fn enable_history(&self, enabled: bool) {
        self.shared.lock().history_enabled = enabled;
    }

    pub fn clear_history(&self) {
        self.shared.lock().history.clear();
    }

    /// Recorded pre-step snapshots, oldest first
    pub fn history(&self) -> Vec<GridSnapshot> {
        self.shared.lock().history.clone()
    }

    pub fn history_len(&self) -> usize {
        self.shared.lock().history.len()
    }

    /// Everything a history file needs, captured under one lock
    pub fn history_record(&self) -> HistoryRecord {
        let core = self.shared.lock();
        HistoryRecord {
            generation_count: core.generation,
            dimension: core.grid.dimension(),
            history: core.history.clone(),
        }
    }

    pub fn reset_generation_count(&self) {
        self.shared.lock().generation = 0;
    }

    // ============================================
    // Observers
    // ============================================

    pub fn register(&self, observer: Arc<dyn SimulationObserver>) -> ObserverId {
        let id = ObserverId(self.shared.next_observer.fetch_add(1, Ordering::Relaxed));
        self.shared
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    /// Register a closure as an observer
    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(SimulationEvent, &SimulationView) + Send + Sync + 'static,
    {
        self.register(Arc::new(observer))
    }

    /// Returns false if the id was not registered
    pub fn unregister(&self, id: ObserverId) -> bool {
        let mut observers = self
            .shared
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    // ============================================
    // Reads
    // ============================================

    pub fn state(&self) -> RunState {
        self.shared.lock().state
    }

    pub fn generation_count(&self) -> u64 {
        self.shared.lock().generation
    }

    pub fn tick_interval(&self) -> Duration {
        self.shared.lock().tick_interval
    }

    pub fn history_enabled(&self) -> bool {
        self.shared.lock().history_enabled
    }

    pub fn dimension(&self) -> usize {
        self.shared.lock().grid.dimension()
    }

    pub fn population(&self) -> Population {
        self.shared.lock().grid.population()
    }

    /// Read the grid under the driver lock
    pub fn with_grid<T>(&self, f: impl FnOnce(&Grid) -> T) -> T {
        f(&self.shared.lock().grid)
    }

    // ============================================
    // Edits (stopped only)
    // ============================================

    /// Edit the grid directly. Fails with `Error::Running` while ticking.
    pub fn with_grid_mut<T>(&self, f: impl FnOnce(&mut Grid) -> T) -> Result<T> {
        self.edit(|grid| Ok(f(grid)))
    }

    fn edit<T>(&self, f: impl FnOnce(&mut Grid) -> Result<T>) -> Result<T> {
        let out = {
            let mut core = self.shared.lock();
            if core.state == RunState::Running {
                return Err(Error::Running);
            }
            let out = f(&mut core.grid)?;
            self.shared.publish(&core, SimulationEvent::GridEdited);
            out
        };
        self.shared.dispatch();
        Ok(out)
    }

    pub fn toggle(&self, row: usize, col: usize) -> Result<()> {
        self.edit(|grid| grid.toggle(row, col))
    }

    pub fn resize(&self, dimension: usize) -> Result<()> {
        self.edit(|grid| grid.resize(dimension))?;
        log::info!("Grid resized to {}x{}", dimension, dimension);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.edit(|grid| {
            grid.clear();
            Ok(())
        })?;
        log::info!("Grid cleared");
        Ok(())
    }

    pub fn set_state<R: AsRef<[i32]>>(&self, rows: &[R]) -> Result<()> {
        self.edit(|grid| grid.set_state(rows))
    }

    pub fn restore(&self, snapshot: &GridSnapshot) -> Result<()> {
        self.edit(|grid| grid.restore(snapshot))
    }

    pub fn set_shading(&self, shading: Shading) -> Result<()> {
        self.edit(|grid| {
            grid.set_shading(shading);
            Ok(())
        })
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        Self::cancel(&mut self.shared.lock());
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
