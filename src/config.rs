use std::time::Duration;

/// Grid span limits offered to interactive front ends (20x20 up to 100x100)
pub const GRID_MINIMUM_SPAN: usize = 20;
pub const GRID_MAXIMUM_SPAN: usize = 100;
pub const DEFAULT_GRID_SPAN: usize = GRID_MINIMUM_SPAN;

/// Tick interval bounds; requested intervals are clamped into this range
pub const MIN_FREQUENCY: Duration = Duration::from_millis(150);
pub const MAX_FREQUENCY: Duration = Duration::from_millis(1500);
pub const DEFAULT_FREQUENCY: Duration = Duration::from_millis(1000);

// ============================================
// Life Rules
// ============================================

/// Live neighbours needed for a dead cell to be born (and for a live one to survive)
pub const NEEDED_FOR_BIRTH: u8 = 3;

/// The other neighbour count that lets a live cell survive
pub const NEEDED_TO_SURVIVE: u8 = 2;

// ============================================
// Aging / Shading
// ============================================

/// Upper bound on a cell's age magnitude. Ages saturate here instead of growing
/// without limit over long runs.
pub const AGE_CAP: i32 = 10_000;

/// Colour channel range used when shading by age
pub const SHADE_MIN: u8 = 80;
pub const SHADE_MAX: u8 = 250;

/// Runtime settings for the simulation driver
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Delay between generations, clamped to [MIN_FREQUENCY, MAX_FREQUENCY]
    pub tick_interval: Duration,
    /// Record a snapshot of the grid before every generation
    pub history_enabled: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_FREQUENCY,
            history_enabled: false,
        }
    }
}

/// Clamp a requested tick interval into the supported range
pub fn clamp_interval(requested: Duration) -> Duration {
    requested.clamp(MIN_FREQUENCY, MAX_FREQUENCY)
}
