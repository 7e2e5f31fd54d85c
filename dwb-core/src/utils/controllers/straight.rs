//! Gyro-corrected straight drive.
//!
//! Only the heading is closed-loop. The distance is covered by an open-loop
//! estimate of how many sample intervals the move takes at the requested speed
//! (`StraightConfig::estimate_iterations`); no odometry is involved.
//!
//! # Sign convention
//!
//! Yaw grows counter-clockwise. A positive heading error means the body has
//! drifted left, so the steering term goes negative: the left wheel speeds up,
//! the right wheel slows down, and the body swings back to the right.

use embedded_hal_async::delay::DelayNs;

use super::{
    config::{ControlConfig, StraightConfig},
    driver::{Actuator, DriveCommand, OrientationSensor},
    error::{ControlError, InvalidArgument},
    ControlResult, Fault, MotionController,
};

/// Proportional steering term for a heading error, bounded by the steering limit.
pub fn steering(
    config: &StraightConfig,
    error: f32,
) -> f32 {
    (-error * config.proportional_gain).clamp(-config.steering_limit, config.steering_limit)
}

/// Corrected wheel speeds for `error`, or `None` inside the deadband.
pub fn heading_correction(
    config: &ControlConfig,
    speed: f32,
    error: f32,
) -> Option<DriveCommand> {
    if !(libm::fabsf(error) > config.straight.deadband_degrees) {
        return None;
    }
    let steering = steering(&config.straight, error);
    Some(DriveCommand::new(
        (speed - steering).clamp(config.min_speed, config.max_speed),
        (speed + steering).clamp(config.min_speed, config.max_speed),
    ))
}

struct HoldState {
    initial_yaw: f32,
    last_yaw: f32,
    iterations: u32,
}

impl<A, O, D> MotionController<A, O, D>
where
    A: Actuator,
    O: OrientationSensor,
    D: DelayNs,
{
    /// Drive forward `distance_inches` at `speed` percent while holding the
    /// starting heading.
    ///
    /// `max_iterations` defaults to `StraightConfig::max_iterations`. The
    /// wheels are stopped on every exit path; hitting the cap returns
    /// `completed: false` rather than an error.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn drive_straight(
        &mut self,
        distance_inches: f32,
        speed: f32,
        max_iterations: Option<u32>,
    ) -> Result<ControlResult, Fault<A, O>> {
        let max_iterations = max_iterations.unwrap_or(self.config.straight.max_iterations);
        if !(distance_inches > 0.0 && distance_inches.is_finite()) {
            return Err(InvalidArgument::Distance {
                value: distance_inches,
            }
            .into());
        }
        let speed = self.check_speed(speed)?;
        if max_iterations == 0 {
            return Err(InvalidArgument::IterationCap.into());
        }

        let target_iterations = self
            .config
            .straight
            .estimate_iterations(distance_inches, speed);
        tracing::info!(
            distance_inches,
            speed,
            target_iterations,
            max_iterations,
            "straight drive started"
        );

        self.cancel.reset();
        let outcome = self
            .hold_heading(speed, target_iterations, max_iterations)
            .await;
        let state = self.finish(outcome)?;

        let final_yaw = self.settled_yaw(state.last_yaw);
        let result = ControlResult {
            completed: state.iterations < max_iterations,
            iterations_used: state.iterations,
            final_error: final_yaw - state.initial_yaw,
        };
        if result.completed {
            tracing::info!(?result, "straight drive complete");
        } else {
            tracing::warn!(?result, "straight drive hit its iteration cap");
        }
        Ok(result)
    }

    async fn hold_heading(
        &mut self,
        speed: f32,
        target_iterations: u32,
        max_iterations: u32,
    ) -> Result<HoldState, Fault<A, O>> {
        let initial_yaw = self.zero_heading().await?;
        tracing::debug!(initial_yaw, "heading reference taken");

        self.command(DriveCommand::symmetric(speed))?;

        let mut state = HoldState {
            initial_yaw,
            last_yaw: initial_yaw,
            iterations: 0,
        };
        while state.iterations < target_iterations && state.iterations < max_iterations {
            let yaw = self.sample_yaw()?;
            state.last_yaw = yaw;
            let error = yaw - initial_yaw;

            let correction = heading_correction(&self.config, speed, error);
            if self.should_log(state.iterations) {
                tracing::debug!(
                    iteration = state.iterations,
                    target_iterations,
                    error,
                    ?correction,
                    "straight drive progress"
                );
            }
            if let Some(correction) = correction {
                self.command(correction)?;
            }

            self.delay.delay_ms(self.config.sample_interval_ms).await;
            state.iterations += 1;

            if self.cancel_requested() {
                tracing::info!(iterations = state.iterations, "straight drive cancelled");
                return Err(ControlError::Cancelled {
                    iterations_used: state.iterations,
                });
            }
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadband_leaves_speeds_alone() {
        let cfg = ControlConfig::default();
        assert_eq!(heading_correction(&cfg, 30.0, 0.0), None);
        assert_eq!(heading_correction(&cfg, 30.0, 1.0), None);
        assert_eq!(heading_correction(&cfg, 30.0, -0.9), None);
        assert_eq!(heading_correction(&cfg, 30.0, f32::NAN), None);
    }

    #[test]
    fn test_left_drift_slows_right_wheel() {
        let cfg = ControlConfig::default();
        let cmd = heading_correction(&cfg, 30.0, 5.0).unwrap();
        assert_eq!(cmd, DriveCommand::new(37.5, 22.5));

        let cmd = heading_correction(&cfg, 30.0, -5.0).unwrap();
        assert_eq!(cmd, DriveCommand::new(22.5, 37.5));
    }

    #[test]
    fn test_steering_monotone_until_limit() {
        let cfg = StraightConfig::default();
        let mut prev = 0.0f32;
        for step in 1..=200 {
            let magnitude = libm::fabsf(steering(&cfg, step as f32));
            assert!(magnitude >= prev, "steering shrank at error {}", step);
            assert!(magnitude <= cfg.steering_limit);
            prev = magnitude;
        }
        assert_eq!(steering(&cfg, 100.0), -100.0);
        assert_eq!(steering(&cfg, -100.0), 100.0);
    }

    #[test]
    fn test_wheel_speeds_clamped() {
        let cfg = ControlConfig::default();
        let cmd = heading_correction(&cfg, 30.0, 40.0).unwrap();
        assert_eq!(cmd, DriveCommand::new(90.0, 10.0));

        let cmd = heading_correction(&cfg, 30.0, 80.0).unwrap();
        assert_eq!(cmd, DriveCommand::new(100.0, 10.0));
    }
}
