//! # Placement Replay
//!
//! Replays a recorded wall-art placement session through `placement-core` and
//! prints the engine outputs after every step, one JSON object per line.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p placement-replay -- placement-replay/traces/wall_session.json
//! ```
//!
//! ## With a config file and real-time pacing:
//!
//! ```bash
//! PLACEMENT_MAX_OBJECTS=3 cargo run -p placement-replay -- \
//!     --config placement.toml --fps 60 placement-replay/traces/wall_session.json
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `EngineOverrides` / `load_engine_config` - TOML file plus flag overrides
//! - `Trace` / `TraceStep` - The recorded session format
//! - `Replayer` - Drives an `ArSession` and reports each step

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod error;
mod trace;

use std::path::PathBuf;

pub use config::{load_engine_config, parse_engine_config, EngineOverrides};
pub use error::{ReplayError, ReplayResult};
pub use trace::{Replayer, StepOutcome, StepReport, Trace, TraceStep};

use clap::Parser;

/// Command-line arguments for placement-replay.
#[derive(Debug, Clone, Parser)]
#[command(name = "placement-replay")]
#[command(about = "Replay a recorded wall-art placement session")]
#[command(version)]
pub struct CliArgs {
    /// Trace file (JSON)
    pub trace: PathBuf,

    /// Engine configuration file (TOML)
    #[arg(long, env = "PLACEMENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum number of placed objects kept at once
    #[arg(long, env = "PLACEMENT_MAX_OBJECTS")]
    pub max_objects: Option<usize>,

    /// Lower scale bound
    #[arg(long, env = "PLACEMENT_MIN_SCALE")]
    pub min_scale: Option<f32>,

    /// Upper scale bound
    #[arg(long, env = "PLACEMENT_MAX_SCALE")]
    pub max_scale: Option<f32>,

    /// World units per pixel of one-finger drag
    #[arg(long, env = "PLACEMENT_PAN_SENSITIVITY")]
    pub pan_sensitivity: Option<f32>,

    /// Surfaces with |normal.y| at or above this are not walls
    #[arg(long, env = "PLACEMENT_VERTICAL_THRESHOLD")]
    pub vertical_threshold: Option<f32>,

    /// Replay frames in real time at this rate instead of as fast as possible
    #[arg(long, env = "PLACEMENT_REPLAY_FPS")]
    pub fps: Option<f64>,

    /// Print only the final report
    #[arg(long)]
    pub summary: bool,
}

impl CliArgs {
    /// Field overrides given on the command line or through the environment.
    #[must_use]
    pub fn overrides(&self) -> EngineOverrides {
        EngineOverrides {
            max_objects: self.max_objects,
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            pan_sensitivity: self.pan_sensitivity,
            vertical_normal_threshold: self.vertical_threshold,
        }
    }
}
