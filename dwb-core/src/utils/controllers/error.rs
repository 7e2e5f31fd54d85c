//! Error taxonomy for the motion controllers.
//!
//! A timeout is not an error: a loop that hits its iteration cap returns
//! `Ok(ControlResult { completed: false, .. })`.

use serde::Serialize;

use crate::utils::math::conversion::InvalidGeometry;

/// Arguments rejected before any command reaches the wheels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidArgument {
    /// Distance is zero, negative or not finite.
    Distance { value: f32 },
    /// Turn angle is zero, negative or not finite.
    Angle { value: f32 },
    /// Speed is outside the actuator's range for this maneuver.
    Speed { value: f32 },
    /// Duration of a timed run is zero.
    Duration,
    /// Iteration cap of zero.
    IterationCap,
    Geometry(InvalidGeometry),
    /// A config field is out of range.
    Config { field: &'static str },
}

impl From<InvalidGeometry> for InvalidArgument {
    fn from(e: InvalidGeometry) -> Self {
        InvalidArgument::Geometry(e)
    }
}

/// Failure of a maneuver. `AE` is the actuator error, `SE` the sensor error.
#[derive(Debug)]
pub enum ControlError<AE, SE> {
    InvalidArgument(InvalidArgument),
    ActuationFault(AE),
    SensorFault(SE),
    /// Early termination requested through the cancel signal.
    Cancelled { iterations_used: u32 },
}

impl<AE, SE> From<InvalidArgument> for ControlError<AE, SE> {
    fn from(e: InvalidArgument) -> Self {
        ControlError::InvalidArgument(e)
    }
}

impl<AE, SE> From<InvalidGeometry> for ControlError<AE, SE> {
    fn from(e: InvalidGeometry) -> Self {
        ControlError::InvalidArgument(e.into())
    }
}
