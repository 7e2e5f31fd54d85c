//! Abstract wheel-pair and heading-sensor interfaces.
//!
//! The controllers only ever talk to hardware through these two traits plus
//! `embedded_hal_async::delay::DelayNs`. Each target platform implements them
//! once; see [`super::i2c`] for the PCA9685 / ICM-42670 bindings.

use serde::{Deserialize, Serialize};

/// Abstract two-wheel motor interface.
///
/// Speeds are percent of full speed in `-100.0..=100.0`; the sign gives the
/// direction of each wheel.
pub trait Actuator {
    type Error: core::fmt::Debug;

    /// Command both wheels; they keep running until the next command.
    fn set_speeds(
        &mut self,
        left: f32,
        right: f32,
    ) -> Result<(), Self::Error>;

    /// Stop both wheels immediately.
    fn stop(&mut self) -> Result<(), Self::Error>;

    /// Whether [`Actuator::run_for_degrees`] is backed by wheel encoders.
    fn supports_precise_rotation(&self) -> bool {
        false
    }

    /// Rotate both wheels by `degrees` at the given speeds, returning once the
    /// rotation is complete.
    ///
    /// Only called when [`Actuator::supports_precise_rotation`] is true.
    fn run_for_degrees(
        &mut self,
        degrees: i32,
        left: f32,
        right: f32,
    ) -> Result<(), Self::Error>;
}

/// Abstract yaw sensor.
///
/// Yaw is in degrees, increasing counter-clockwise, and is not wrapped to ±180.
pub trait OrientationSensor {
    type Error: core::fmt::Debug;

    /// Read the current yaw angle.
    fn yaw_degrees(&mut self) -> Result<f32, Self::Error>;

    /// Make the current heading the zero reference.
    fn reset_yaw(&mut self) -> Result<(), Self::Error>;
}

/// How open-loop distance moves and pivots are carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuationStrategy {
    /// Hand the wheel-degree target to the actuator's encoder loop.
    PreciseRotation,
    /// Run at speed for an estimated time, then stop.
    TimedRun,
}

/// Preferred strategies, best first.
pub const STRATEGY_RANKING: [ActuationStrategy; 2] = [
    ActuationStrategy::PreciseRotation,
    ActuationStrategy::TimedRun,
];

impl ActuationStrategy {
    pub fn is_supported_by<A: Actuator>(
        self,
        actuator: &A,
    ) -> bool {
        match self {
            ActuationStrategy::PreciseRotation => actuator.supports_precise_rotation(),
            ActuationStrategy::TimedRun => true,
        }
    }

    /// Pick the first strategy in `ranking` the actuator supports, falling
    /// back to [`ActuationStrategy::TimedRun`].
    pub fn negotiate<A: Actuator>(
        ranking: &[ActuationStrategy],
        actuator: &A,
    ) -> Self {
        ranking
            .iter()
            .copied()
            .find(|strategy| strategy.is_supported_by(actuator))
            .unwrap_or(ActuationStrategy::TimedRun)
    }
}

/// A pair of signed wheel speeds (percent).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveCommand {
    pub left: f32,
    pub right: f32,
}

impl DriveCommand {
    pub fn new(
        left: f32,
        right: f32,
    ) -> Self {
        Self { left, right }
    }

    pub fn symmetric(speed: f32) -> Self {
        Self::new(speed, speed)
    }

    pub fn apply<A: Actuator>(
        self,
        actuator: &mut A,
    ) -> Result<(), A::Error> {
        actuator.set_speeds(self.left, self.right)
    }
}
