//! Open-loop moves: distance, pivot and timed runs.
//!
//! These never read the yaw sensor. How a distance is covered depends on the
//! [`ActuationStrategy`] negotiated when the controller was built: an actuator
//! with encoders gets the wheel-degree target directly, anything else runs for
//! an estimated time.

use embedded_hal_async::delay::DelayNs;

use super::{
    driver::{ActuationStrategy, Actuator, DriveCommand, OrientationSensor},
    error::{ControlError, InvalidArgument},
    turn::TurnDirection,
    Fault, MotionController,
};
use crate::utils::math::conversion::{estimate_run_ms, truncate_degrees};

/// A validated open-loop move, resolved before any command is sent.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Plan {
    Precise { degrees: i32, command: DriveCommand },
    Timed { ms: u32, command: DriveCommand },
}

impl<A, O, D> MotionController<A, O, D>
where
    A: Actuator,
    O: OrientationSensor,
    D: DelayNs,
{
    /// Move `distance_inches` without heading correction. A negative `speed`
    /// drives backward.
    pub async fn move_distance(
        &mut self,
        distance_inches: f32,
        speed: f32,
    ) -> Result<(), Fault<A, O>> {
        if !(distance_inches > 0.0 && distance_inches.is_finite()) {
            return Err(InvalidArgument::Distance {
                value: distance_inches,
            }
            .into());
        }
        let speed = self.check_signed_speed(speed)?;

        let wheel_degrees = self.config.geometry.distance_to_degrees(distance_inches);
        let plan = self.plan(wheel_degrees, distance_inches, DriveCommand::symmetric(speed))?;
        tracing::info!(distance_inches, speed, ?plan, "open-loop move");
        self.execute_plan(plan).await
    }

    /// Pivot `degrees` in place using wheel geometry alone.
    pub async fn pivot(
        &mut self,
        degrees: f32,
        direction: TurnDirection,
        speed: f32,
    ) -> Result<(), Fault<A, O>> {
        if !(degrees > 0.0 && degrees.is_finite()) {
            return Err(InvalidArgument::Angle { value: degrees }.into());
        }
        let speed = self.check_speed(speed)?;

        let geometry = self.config.geometry;
        let plan = self.plan(
            geometry.turn_to_wheel_degrees(degrees),
            geometry.arc_length(degrees),
            direction.wheel_speeds(speed),
        )?;
        tracing::info!(degrees, ?direction, speed, ?plan, "open-loop pivot");
        self.execute_plan(plan).await
    }

    /// Run both wheels at `speed` for `duration_ms`, then stop.
    pub async fn run_for(
        &mut self,
        duration_ms: u32,
        speed: f32,
    ) -> Result<(), Fault<A, O>> {
        if duration_ms == 0 {
            return Err(InvalidArgument::Duration.into());
        }
        let speed = self.check_signed_speed(speed)?;

        tracing::info!(duration_ms, speed, "timed run");
        self.execute_plan(Plan::Timed {
            ms: duration_ms,
            command: DriveCommand::symmetric(speed),
        })
        .await
    }

    /// Stop both wheels now.
    pub fn stop(&mut self) -> Result<(), Fault<A, O>> {
        tracing::info!("stop requested");
        self.actuator.stop().map_err(ControlError::ActuationFault)
    }

    fn plan(
        &self,
        wheel_degrees: f32,
        inches: f32,
        command: DriveCommand,
    ) -> Result<Plan, InvalidArgument> {
        match self.strategy {
            ActuationStrategy::PreciseRotation => Ok(Plan::Precise {
                degrees: truncate_degrees(wheel_degrees),
                command,
            }),
            ActuationStrategy::TimedRun => {
                let speed = libm::fabsf(command.left).max(libm::fabsf(command.right));
                let ms = estimate_run_ms(inches, speed, self.config.full_speed_inches_per_sec)
                    .ok_or(InvalidArgument::Speed { value: speed })?;
                Ok(Plan::Timed { ms, command })
            }
        }
    }

    async fn execute_plan(
        &mut self,
        plan: Plan,
    ) -> Result<(), Fault<A, O>> {
        let outcome = match plan {
            Plan::Precise { degrees, command } => self
                .actuator
                .run_for_degrees(degrees, command.left, command.right)
                .map_err(ControlError::ActuationFault),
            Plan::Timed { ms, command } => match self.command(command) {
                Ok(()) => {
                    self.delay.delay_ms(ms).await;
                    Ok(())
                }
                Err(fault) => Err(fault),
            },
        };
        self.finish(outcome)
    }
}
