//! Unit conversion for a two-wheeled differential-drive robot.
//!
//! Maps linear travel (inches) to wheel rotation (degrees) and a body turn
//! angle to the rotation each wheel must perform when pivoting in place.
//!
//! All conversions use [`CALIBRATION_PI`] rather than the platform's π so that
//! distance calibration stays reproducible across floating-point
//! implementations.
//!
//! # Example
//! ```rust
//! use dwb_core::utils::math::conversion::WheelGeometry;
//! let geometry = WheelGeometry::new(2.0, 4.5).unwrap();
//! let degrees = geometry.distance_to_degrees(6.0);
//! assert!(degrees > 340.0 && degrees < 345.0);
//! ```
use serde::{Deserialize, Serialize};

/// Fixed value of π used by every conversion in the crate.
pub const CALIBRATION_PI: f32 = 3.14159;

/// A geometry parameter that is zero, negative or not finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InvalidGeometry {
    pub field: &'static str,
    pub value: f32,
}

fn check_positive(
    field: &'static str,
    value: f32,
) -> Result<f32, InvalidGeometry> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(InvalidGeometry { field, value })
    }
}

/// Convert a linear distance into degrees of wheel rotation.
///
/// One full revolution (360°) covers one wheel circumference.
pub fn distance_to_degrees(
    inches: f32,
    wheel_diameter: f32,
) -> Result<f32, InvalidGeometry> {
    let wheel_diameter = check_positive("wheel_diameter", wheel_diameter)?;
    let circumference = CALIBRATION_PI * wheel_diameter;
    Ok((inches / circumference) * 360.0)
}

/// Convert a body turn angle into the rotation each wheel performs when the
/// robot pivots in place.
///
/// Each wheel travels the arc `wheel_base * π * turn_degrees / 360`.
pub fn turn_angle_to_wheel_degrees(
    turn_degrees: f32,
    wheel_base: f32,
    wheel_diameter: f32,
) -> Result<f32, InvalidGeometry> {
    let wheel_base = check_positive("wheel_base", wheel_base)?;
    let arc_length = wheel_base * CALIBRATION_PI * turn_degrees / 360.0;
    distance_to_degrees(arc_length, wheel_diameter)
}

/// Truncate toward zero for actuators that only accept integral degrees.
pub fn truncate_degrees(degrees: f32) -> i32 {
    libm::truncf(degrees) as i32
}

/// Time in milliseconds to cover `inches` at `speed` percent, given how many
/// inches per second the robot travels at full speed.
///
/// Returns `None` when the speed or the full-speed rate is zero.
pub fn estimate_run_ms(
    inches: f32,
    speed: f32,
    full_speed_inches_per_sec: f32,
) -> Option<u32> {
    let inches_per_sec = full_speed_inches_per_sec * libm::fabsf(speed) / 100.0;
    if !(inches_per_sec > 0.0) {
        return None;
    }
    let seconds = libm::fabsf(inches) / inches_per_sec;
    Some(libm::roundf(seconds * 1000.0) as u32)
}

/// Wheel diameter and wheel base of the robot, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelGeometry {
    /// Diameter of each drive wheel (in)
    pub wheel_diameter: f32,
    /// Distance between the two wheel contact points (in)
    pub wheel_base: f32,
}

impl Default for WheelGeometry {
    fn default() -> Self {
        Self {
            wheel_diameter: 2.0,
            wheel_base: 4.5,
        }
    }
}

impl WheelGeometry {
    /// Build a geometry, rejecting non-positive dimensions.
    pub fn new(
        wheel_diameter: f32,
        wheel_base: f32,
    ) -> Result<Self, InvalidGeometry> {
        let geometry = Self {
            wheel_diameter,
            wheel_base,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<(), InvalidGeometry> {
        check_positive("wheel_diameter", self.wheel_diameter)?;
        check_positive("wheel_base", self.wheel_base)?;
        Ok(())
    }

    /// Wheel rotation in degrees needed to travel `inches`.
    pub fn distance_to_degrees(
        &self,
        inches: f32,
    ) -> f32 {
        (inches / (CALIBRATION_PI * self.wheel_diameter)) * 360.0
    }

    /// Per-wheel rotation in degrees for a pivot of `turn_degrees`.
    pub fn turn_to_wheel_degrees(
        &self,
        turn_degrees: f32,
    ) -> f32 {
        self.distance_to_degrees(self.arc_length(turn_degrees))
    }

    /// Arc length travelled by each wheel during a pivot of `turn_degrees`.
    pub fn arc_length(
        &self,
        turn_degrees: f32,
    ) -> f32 {
        self.wheel_base * CALIBRATION_PI * turn_degrees / 360.0
    }
}
