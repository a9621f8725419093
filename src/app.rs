//! Headless runner: seeds a grid, drives it for a number of generations and
//! prints each frame to stdout.

use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{SimulationConfig, DEFAULT_FREQUENCY, DEFAULT_GRID_SPAN};
use crate::driver::{Simulation, SimulationEvent};
use crate::error::{Error, Result};
use crate::patterns;
use crate::persistence;
use crate::simulation::{Grid, Shading};

/// How the initial grid is populated
#[derive(Debug, Clone, PartialEq)]
pub enum Seed {
    Empty,
    Pattern(String),
    Random { density: f64, seed: Option<u64> },
    Load(PathBuf),
}

/// How frames are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStyle {
    None,
    Ascii,
    /// 24-bit ANSI colour using the cell intensity
    Color,
}

#[derive(Debug, Clone)]
pub struct AppOptions {
    pub size: usize,
    pub tick_interval: Duration,
    pub generations: u64,
    pub seed: Seed,
    pub shading: Shading,
    pub frames: FrameStyle,
    /// Step back-to-back instead of waiting on the timer
    pub fast: bool,
    pub history_path: Option<PathBuf>,
    pub save_final: Option<PathBuf>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_GRID_SPAN,
            tick_interval: DEFAULT_FREQUENCY,
            generations: 10,
            seed: Seed::Pattern("Glider".into()),
            shading: Shading::Unshaded,
            frames: FrameStyle::Ascii,
            fast: false,
            history_path: None,
            save_final: None,
        }
    }
}

/// Outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub generations: u64,
    pub alive: usize,
    pub dead: usize,
    pub recorded: usize,
}

/// Application state
pub struct App {
    sim: Simulation,
    options: AppOptions,
}

impl App {
    pub fn new(options: AppOptions) -> Result<Self> {
        let grid = build_grid(&options)?;
        log::info!(
            "Grid size: {}x{} ({} alive)",
            grid.dimension(),
            grid.dimension(),
            grid.population().alive
        );

        let config = SimulationConfig {
            tick_interval: options.tick_interval,
            history_enabled: options.history_path.is_some(),
        };
        let sim = Simulation::new(grid, config)?;
        Ok(Self { sim, options })
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Drive the simulation until the requested number of generations has
    /// been computed, then write any requested files.
    pub fn run(&self) -> Result<RunSummary> {
        let target = self.options.generations;

        self.sim.with_grid(|grid| print_frame(self.options.frames, 0, grid));

        let (tx, rx) = mpsc::channel();
        let frames = self.options.frames;
        let rate = Mutex::new(TickRateCounter::new());
        let tx = Mutex::new(tx);
        let observer = self.sim.subscribe(move |event, view| {
            if let SimulationEvent::Tick { generation } = event {
                print_frame(frames, generation, view.grid());
                if let Some(tps) = rate.lock().ok().and_then(|mut r| r.tick()) {
                    log::debug!("{:.2} generations/s", tps);
                }
                // The receiver goes away once the target is reached
                if let Ok(tx) = tx.lock() {
                    let _ = tx.send(generation);
                }
            }
        });

        if self.options.fast {
            while self.sim.generation_count() < target {
                self.sim.advance()?;
            }
        } else if target > 0 {
            self.sim.start();
            let timeout = self.sim.tick_interval() * 4 + Duration::from_secs(1);
            let reached = wait_for_generation(&rx, target, timeout);
            self.sim.stop();
            reached?;
        }
        self.sim.unregister(observer);

        self.write_outputs()?;

        let population = self.sim.population();
        let summary = RunSummary {
            generations: self.sim.generation_count(),
            alive: population.alive,
            dead: population.dead,
            recorded: self.sim.history_len(),
        };
        log::info!(
            "Finished after {} generations: {} alive, {} dead",
            summary.generations,
            summary.alive,
            summary.dead
        );
        Ok(summary)
    }

    fn write_outputs(&self) -> Result<()> {
        if let Some(path) = &self.options.history_path {
            persistence::save_history(path, &self.sim)?;
        }
        if let Some(path) = &self.options.save_final {
            let snapshot = self.sim.with_grid(|grid| grid.snapshot());
            persistence::save_snapshot_json(path, &snapshot)?;
            log::info!("Saved final grid to {}", path.display());
        }
        Ok(())
    }
}

fn build_grid(options: &AppOptions) -> Result<Grid> {
    let mut grid = Grid::new(options.size, options.shading)?;

    match &options.seed {
        Seed::Empty => {}
        Seed::Pattern(name) => {
            let pattern = patterns::find(name).ok_or_else(|| {
                Error::MalformedState(format!("unknown pattern {:?}", name))
            })?;
            patterns::apply(&mut grid, pattern);
        }
        Seed::Random { density, seed } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(*seed),
                None => StdRng::from_entropy(),
            };
            patterns::randomize(&mut grid, *density, &mut rng);
        }
        Seed::Load(path) => {
            let snapshot = persistence::load_snapshot_json(path)?;
            grid.restore(&snapshot)?;
            log::info!(
                "Loaded {}x{} grid from {}",
                snapshot.dimension,
                snapshot.dimension,
                path.display()
            );
        }
    }

    Ok(grid)
}

/// Block until a generation at or past `target` is reported. Each gap between
/// reports may be at most `timeout`.
fn wait_for_generation(rx: &mpsc::Receiver<u64>, target: u64, timeout: Duration) -> Result<()> {
    loop {
        match rx.recv_timeout(timeout) {
            Ok(generation) if generation >= target => return Ok(()),
            Ok(_) => {}
            Err(_) => return Err(Error::Stalled(timeout)),
        }
    }
}

fn print_frame(style: FrameStyle, generation: u64, grid: &Grid) {
    if style == FrameStyle::None {
        return;
    }
    let population = grid.population();
    let mut out = String::new();
    out.push_str(&format!(
        "generation {} | alive {} | dead {}\n",
        generation, population.alive, population.dead
    ));

    match style {
        FrameStyle::None => {}
        FrameStyle::Ascii => out.push_str(&grid.to_string()),
        FrameStyle::Color => {
            let n = grid.dimension();
            for row in 0..n {
                for col in 0..n {
                    let [r, g, b] = grid.color_intensity(row, col).rgb();
                    out.push_str(&format!("\x1b[48;2;{};{};{}m  ", r, g, b));
                }
                out.push_str("\x1b[0m\n");
            }
        }
    }

    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    if let Err(e) = writeln!(lock, "{}", out) {
        log::warn!("Failed to write frame: {}", e);
    }
}

/// Generations-per-second counter, reports once a second
struct TickRateCounter {
    last_update: Instant,
    tick_count: u32,
}

impl TickRateCounter {
    fn new() -> Self {
        Self {
            last_update: Instant::now(),
            tick_count: 0,
        }
    }

    /// Count a tick, returns Some(rate) every second
    fn tick(&mut self) -> Option<f64> {
        self.tick_count += 1;
        let elapsed = self.last_update.elapsed();

        if elapsed.as_secs_f64() >= 1.0 {
            let rate = self.tick_count as f64 / elapsed.as_secs_f64();
            self.tick_count = 0;
            self.last_update = Instant::now();
            Some(rate)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_FREQUENCY;

    fn quiet(seed: Seed) -> AppOptions {
        AppOptions {
            size: 8,
            tick_interval: MIN_FREQUENCY,
            generations: 4,
            seed,
            frames: FrameStyle::None,
            ..AppOptions::default()
        }
    }

    #[test]
    fn test_fast_run_reaches_target() {
        let app = App::new(AppOptions {
            fast: true,
            ..quiet(Seed::Pattern("glider".into()))
        })
        .unwrap();
        let summary = app.run().unwrap();
        assert_eq!(summary.generations, 4);
        assert_eq!(summary.alive, 5);
        assert_eq!(summary.alive + summary.dead, 64);
    }

    #[test]
    fn test_timed_run_reaches_target() {
        let app = App::new(quiet(Seed::Pattern("blinker".into()))).unwrap();
        let summary = app.run().unwrap();
        assert!(summary.generations >= 4);
        assert_eq!(summary.alive, 3);
        assert_eq!(app.simulation().state(), crate::driver::RunState::Stopped);
    }

    #[test]
    fn test_unknown_pattern_is_rejected() {
        assert!(matches!(
            App::new(quiet(Seed::Pattern("nope".into()))),
            Err(Error::MalformedState(_))
        ));
    }

    #[test]
    fn test_history_and_final_state_files() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("history.txt");
        let final_state = dir.path().join("final.json");

        let app = App::new(AppOptions {
            fast: true,
            history_path: Some(history.clone()),
            save_final: Some(final_state.clone()),
            ..quiet(Seed::Random {
                density: 0.4,
                seed: Some(3),
            })
        })
        .unwrap();
        let summary = app.run().unwrap();
        assert_eq!(summary.recorded, 4);

        let text = std::fs::read_to_string(&history).unwrap();
        assert!(text.starts_with("Iterations: 4\nGrid span: 8\n"));
        assert_eq!(text.matches("Iteration: ").count(), 4);

        // The saved final grid seeds a new run
        let reloaded = App::new(AppOptions {
            fast: true,
            generations: 0,
            ..quiet(Seed::Load(final_state))
        })
        .unwrap();
        let expected = app.simulation().with_grid(|grid| grid.snapshot());
        assert_eq!(reloaded.simulation().with_grid(|grid| grid.snapshot()), expected);
    }

    #[test]
    fn test_missing_generations_report_stalled() {
        let (tx, rx) = mpsc::channel();
        tx.send(1).unwrap();
        tx.send(2).unwrap();
        let wait = Duration::from_millis(20);
        assert!(matches!(
            wait_for_generation(&rx, 3, wait),
            Err(Error::Stalled(d)) if d == wait
        ));

        tx.send(3).unwrap();
        assert!(wait_for_generation(&rx, 3, wait).is_ok());
    }

    #[test]
    fn test_tick_rate_counter_waits_a_second() {
        let mut counter = TickRateCounter::new();
        assert_eq!(counter.tick(), None);
        assert_eq!(counter.tick_count, 1);
    }
}
