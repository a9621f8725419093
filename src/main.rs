//! Command-line runner for the shaded-life simulation.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use shaded_life::app::{App, AppOptions, FrameStyle, Seed};
use shaded_life::config::{DEFAULT_GRID_SPAN, GRID_MAXIMUM_SPAN};
use shaded_life::Shading;

/// Run Conway's Game of Life on a toroidal grid without a GUI.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Side length of the square grid.
    #[arg(short, long, default_value_t = DEFAULT_GRID_SPAN)]
    size: usize,

    /// Milliseconds between generations, clamped to 150..=1500.
    #[arg(short, long = "interval-ms", default_value_t = 1000)]
    interval_ms: u64,

    /// Number of generations to compute.
    #[arg(short, long, default_value_t = 10)]
    generations: u64,

    /// Seed pattern by name (Block, Blinker, Toad, Beacon, Glider, R-pentomino).
    #[arg(short, long, conflicts_with_all = ["random", "load"])]
    pattern: Option<String>,

    /// Fill the grid randomly with this live-cell density (0.0 to 1.0).
    #[arg(short, long, value_name = "DENSITY", conflicts_with = "load")]
    random: Option<f64>,

    /// RNG seed for --random.
    #[arg(long, requires = "random")]
    seed: Option<u64>,

    /// Load the initial grid from a JSON snapshot.
    #[arg(long, value_name = "FILE")]
    load: Option<PathBuf>,

    /// Shade cells by age.
    #[arg(long)]
    shaded: bool,

    /// Print frames with ANSI colours instead of ASCII.
    #[arg(long, conflicts_with = "quiet")]
    color: bool,

    /// Do not print frames.
    #[arg(short, long)]
    quiet: bool,

    /// Step as fast as possible instead of waiting on the timer.
    #[arg(long)]
    fast: bool,

    /// Record every generation and write the history text file here.
    #[arg(long, value_name = "FILE")]
    history: Option<PathBuf>,

    /// Write the final grid as a JSON snapshot.
    #[arg(long, value_name = "FILE")]
    save_final: Option<PathBuf>,
}

impl Cli {
    fn into_options(self) -> Result<AppOptions, String> {
        if self.size == 0 {
            return Err("grid size must be at least 1".into());
        }
        if self.size > GRID_MAXIMUM_SPAN {
            log::warn!(
                "Grid size {} is above the usual maximum of {}",
                self.size,
                GRID_MAXIMUM_SPAN
            );
        }

        let seed = match (self.pattern, self.random, self.load) {
            (_, _, Some(path)) => Seed::Load(path),
            (_, Some(density), _) => {
                if !(0.0..=1.0).contains(&density) {
                    return Err(format!("density {} is not between 0 and 1", density));
                }
                Seed::Random {
                    density,
                    seed: self.seed,
                }
            }
            (Some(name), _, _) => Seed::Pattern(name),
            (None, None, None) => Seed::Pattern("Glider".into()),
        };

        let frames = if self.quiet {
            FrameStyle::None
        } else if self.color {
            FrameStyle::Color
        } else {
            FrameStyle::Ascii
        };

        Ok(AppOptions {
            size: self.size,
            tick_interval: Duration::from_millis(self.interval_ms),
            generations: self.generations,
            seed,
            shading: if self.shaded {
                Shading::Shaded
            } else {
                Shading::Unshaded
            },
            frames,
            fast: self.fast,
            history_path: self.history,
            save_final: self.save_final,
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = Cli::parse().into_options()?;

    log::info!("Initializing shaded-life...");
    let app = App::new(options)?;
    app.run()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("shaded-life").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let options = parse(&[]).into_options().unwrap();
        assert_eq!(options.size, DEFAULT_GRID_SPAN);
        assert_eq!(options.seed, Seed::Pattern("Glider".into()));
        assert_eq!(options.frames, FrameStyle::Ascii);
        assert_eq!(options.shading, Shading::Unshaded);
    }

    #[test]
    fn test_random_seed_options() {
        let options = parse(&["--random", "0.25", "--seed", "9", "--shaded", "-q"])
            .into_options()
            .unwrap();
        assert_eq!(
            options.seed,
            Seed::Random {
                density: 0.25,
                seed: Some(9)
            }
        );
        assert_eq!(options.shading, Shading::Shaded);
        assert_eq!(options.frames, FrameStyle::None);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse(&["--random", "1.5"]).into_options().is_err());
        assert!(parse(&["--size", "0"]).into_options().is_err());
        assert!(Cli::try_parse_from(["shaded-life", "--seed", "3"]).is_err());
        assert!(Cli::try_parse_from(["shaded-life", "--pattern", "block", "--random", "0.1"]).is_err());
    }
}
