//! Tunable constants for the motion controllers.
//!
//! Every field has a default calibrated for a 2in-wheel, 4.5in-base robot, so a
//! JSON document only needs to name the values it overrides:
//!
//! ```rust
//! use dwb_core::utils::controllers::config::ControlConfig;
//! let cfg = ControlConfig::from_json(br#"{"straight":{"proportional_gain":2.0}}"#).unwrap();
//! assert_eq!(cfg.straight.proportional_gain, 2.0);
//! assert_eq!(cfg.turn.max_iterations, 300);
//! ```

use serde::{Deserialize, Serialize};

use super::error::InvalidArgument;
use crate::utils::math::conversion::WheelGeometry;

/// Shortest wait allowed between zeroing the yaw reference and the first sample.
pub const MIN_SETTLE_MS: u32 = 100;

/// Gains and calibration for the gyro-corrected straight drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StraightConfig {
    /// Steering correction per degree of heading error.
    pub proportional_gain: f32,
    /// Heading error (deg) below which no correction is applied.
    pub deadband_degrees: f32,
    /// Bound on the steering term, in speed percent.
    pub steering_limit: f32,
    /// Speed at which `iterations_per_inch` was measured.
    pub reference_speed: f32,
    /// Loop iterations per inch travelled at `reference_speed`.
    pub iterations_per_inch: f32,
    /// Default safety cap on loop iterations.
    pub max_iterations: u32,
}

impl Default for StraightConfig {
    fn default() -> Self {
        Self {
            proportional_gain: 1.5,
            deadband_degrees: 1.0,
            steering_limit: 100.0,
            reference_speed: 30.0,
            iterations_per_inch: 15.0,
            max_iterations: 500,
        }
    }
}

impl StraightConfig {
    /// Open-loop estimate of how many samples it takes to cover the distance.
    pub fn estimate_iterations(
        &self,
        distance_inches: f32,
        speed: f32,
    ) -> u32 {
        let per_inch = self.iterations_per_inch * (self.reference_speed / speed);
        libm::truncf(distance_inches * per_inch) as u32
    }
}

/// Terminator settings for the gyro-guided turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// How close (deg) to the target heading counts as arrived.
    pub stop_threshold_degrees: f32,
    /// Default safety cap on loop iterations.
    pub max_iterations: u32,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            stop_threshold_degrees: 3.0,
            max_iterations: 300,
        }
    }
}

/// Full controller configuration, supplied once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub geometry: WheelGeometry,
    /// Speed used when a command does not name one (percent).
    pub default_speed: f32,
    /// Lower clamp for corrected wheel speeds (percent).
    pub min_speed: f32,
    /// Upper clamp for any commanded speed (percent).
    pub max_speed: f32,
    /// Wait between yaw samples (ms).
    pub sample_interval_ms: u32,
    /// Wait after zeroing the yaw reference before the first sample (ms);
    /// at least [`MIN_SETTLE_MS`].
    pub settle_ms: u32,
    /// Travel rate at 100% speed, used for time-based estimates (in/s).
    pub full_speed_inches_per_sec: f32,
    /// Emit a progress line every this many iterations.
    pub log_interval: u32,
    pub straight: StraightConfig,
    pub turn: TurnConfig,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            geometry: WheelGeometry::default(),
            default_speed: 30.0,
            min_speed: 10.0,
            max_speed: 100.0,
            sample_interval_ms: 20,
            settle_ms: 100,
            full_speed_inches_per_sec: 8.0,
            log_interval: 10,
            straight: StraightConfig::default(),
            turn: TurnConfig::default(),
        }
    }
}

impl ControlConfig {
    /// Parse a JSON document, filling missing fields with defaults.
    ///
    /// The result is not validated; [`ControlConfig::validate`] runs when the
    /// config is handed to a controller.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn validate(&self) -> Result<(), InvalidArgument> {
        self.geometry.validate()?;

        let positive = |field: &'static str, value: f32| {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(InvalidArgument::Config { field })
            }
        };
        positive("default_speed", self.default_speed)?;
        positive("max_speed", self.max_speed)?;
        positive("full_speed_inches_per_sec", self.full_speed_inches_per_sec)?;
        positive("straight.reference_speed", self.straight.reference_speed)?;
        positive("straight.iterations_per_inch", self.straight.iterations_per_inch)?;
        positive("straight.steering_limit", self.straight.steering_limit)?;

        if !(self.min_speed >= 0.0 && self.min_speed <= self.max_speed) {
            return Err(InvalidArgument::Config { field: "min_speed" });
        }
        if self.default_speed > self.max_speed {
            return Err(InvalidArgument::Config {
                field: "default_speed",
            });
        }
        if !(self.straight.proportional_gain >= 0.0) {
            return Err(InvalidArgument::Config {
                field: "straight.proportional_gain",
            });
        }
        if !(self.straight.deadband_degrees >= 0.0) {
            return Err(InvalidArgument::Config {
                field: "straight.deadband_degrees",
            });
        }
        if !(self.turn.stop_threshold_degrees >= 0.0) {
            return Err(InvalidArgument::Config {
                field: "turn.stop_threshold_degrees",
            });
        }
        if self.sample_interval_ms == 0 {
            return Err(InvalidArgument::Config {
                field: "sample_interval_ms",
            });
        }
        if self.settle_ms < MIN_SETTLE_MS {
            return Err(InvalidArgument::Config { field: "settle_ms" });
        }
        if self.straight.max_iterations == 0 || self.turn.max_iterations == 0 {
            return Err(InvalidArgument::IterationCap);
        }
        Ok(())
    }
}
