//! A kinematic stand-in for the robot: two wheels, a gyro, and drift.

use core::{cell::RefCell, convert::Infallible};

use dwb_core::utils::{
    Instant,
    WheelGeometry,
    controllers::{Actuator, ControlConfig, OrientationSensor},
};

/// Unicycle model of a differential-drive body.
///
/// Heading and odometry are advanced lazily, each time a motor or gyro
/// access observes the plant, using the wheel speeds held since the last one.
pub struct DiffDrivePlant {
    geometry: WheelGeometry,
    full_speed_inches_per_sec: f32,
    drift_dps: f32,
    speeds: (f32, f32),
    yaw: f32,
    odometer: f32,
    last: Instant,
}

impl DiffDrivePlant {
    pub fn new(
        config: &ControlConfig,
        drift_dps: f32,
    ) -> Self {
        Self {
            geometry: config.geometry,
            full_speed_inches_per_sec: config.full_speed_inches_per_sec,
            drift_dps,
            speeds: (0.0, 0.0),
            yaw: 0.0,
            odometer: 0.0,
            last: Instant::now(),
        }
    }

    fn wheel_velocity(
        &self,
        speed: f32,
    ) -> f32 {
        speed / 100.0 * self.full_speed_inches_per_sec
    }

    /// Yaw rate (deg/s) produced by the current wheel speeds plus drift.
    pub fn yaw_rate(&self) -> f32 {
        let (left, right) = self.speeds;
        let omega = (self.wheel_velocity(right) - self.wheel_velocity(left)) / self.geometry.wheel_base;
        omega.to_degrees() + self.drift_dps
    }

    fn advance(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_micros() as f32 / 1_000_000.0;
        self.last = now;

        let (left, right) = self.speeds;
        self.yaw += self.yaw_rate() * dt;
        self.odometer += (self.wheel_velocity(left) + self.wheel_velocity(right)) / 2.0 * dt;
    }

    pub fn set_speeds(
        &mut self,
        left: f32,
        right: f32,
    ) {
        self.advance();
        self.speeds = (left, right);
    }

    /// Move each wheel `degrees` in the direction of its speed, instantly.
    pub fn rotate_wheels(
        &mut self,
        degrees: i32,
        left: f32,
        right: f32,
    ) {
        self.advance();
        let travel = degrees as f32 / 360.0 * core::f32::consts::PI * self.geometry.wheel_diameter;
        let left_travel = travel * left.signum();
        let right_travel = travel * right.signum();
        self.yaw += ((right_travel - left_travel) / self.geometry.wheel_base).to_degrees();
        self.odometer += (left_travel + right_travel) / 2.0;
    }

    pub fn yaw(&mut self) -> f32 {
        self.advance();
        self.yaw
    }

    /// Signed distance travelled by the body centre (in).
    pub fn odometer(&mut self) -> f32 {
        self.advance();
        self.odometer
    }
}

/// Motor side of the plant.
pub struct SimMotors {
    plant: &'static RefCell<DiffDrivePlant>,
    precise: bool,
}

impl SimMotors {
    pub fn new(
        plant: &'static RefCell<DiffDrivePlant>,
        precise: bool,
    ) -> Self {
        Self { plant, precise }
    }
}

impl Actuator for SimMotors {
    type Error = Infallible;

    fn set_speeds(
        &mut self,
        left: f32,
        right: f32,
    ) -> Result<(), Self::Error> {
        tracing::trace!(left, right, "sim wheels");
        self.plant.borrow_mut().set_speeds(left, right);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.plant.borrow_mut().set_speeds(0.0, 0.0);
        Ok(())
    }

    fn supports_precise_rotation(&self) -> bool {
        self.precise
    }

    fn run_for_degrees(
        &mut self,
        degrees: i32,
        left: f32,
        right: f32,
    ) -> Result<(), Self::Error> {
        self.plant.borrow_mut().rotate_wheels(degrees, left, right);
        Ok(())
    }
}

/// Gyro side of the plant, reporting yaw relative to the last reset.
pub struct SimGyro {
    plant: &'static RefCell<DiffDrivePlant>,
    reference: f32,
}

impl SimGyro {
    pub fn new(plant: &'static RefCell<DiffDrivePlant>) -> Self {
        Self {
            plant,
            reference: 0.0,
        }
    }
}

impl OrientationSensor for SimGyro {
    type Error = Infallible;

    fn yaw_degrees(&mut self) -> Result<f32, Self::Error> {
        Ok(self.plant.borrow_mut().yaw() - self.reference)
    }

    fn reset_yaw(&mut self) -> Result<(), Self::Error> {
        self.reference = self.plant.borrow_mut().yaw();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pivot_rate_matches_geometry() {
        let cfg = ControlConfig::default();
        let mut plant = DiffDrivePlant::new(&cfg, 0.0);
        plant.set_speeds(30.0, -30.0);
        // 2.4 in/s per wheel on a 4.5in base, turning clockwise
        let expected = -(4.8f32 / 4.5).to_degrees();
        assert!((plant.yaw_rate() - expected).abs() < 1e-3);
    }

    #[test]
    fn precise_pivot_turns_the_body() {
        let cfg = ControlConfig::default();
        let mut plant = DiffDrivePlant::new(&cfg, 0.0);
        plant.rotate_wheels(202, -30.0, 30.0);
        let yaw = plant.yaw();
        assert!((yaw - 90.0).abs() < 1.0, "yaw was {}", yaw);
    }
}
