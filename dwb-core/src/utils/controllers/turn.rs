//! Gyro-terminated pivot turn.
//!
//! The wheels spin in opposite directions at a fixed speed and the loop only
//! decides when to stop: the first sample that crosses the target heading
//! (within the stop threshold) ends the turn. There is no overshoot correction,
//! so sensor noise near the threshold can stop the turn early.

use embedded_hal_async::delay::DelayNs;
use serde::{Deserialize, Serialize};

use super::{
    driver::{Actuator, DriveCommand, OrientationSensor},
    error::{ControlError, InvalidArgument},
    ControlResult, Fault, MotionController,
};

/// Direction of a pivot turn. Right turns decrease yaw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// Heading to reach after turning `degrees` from `initial_yaw`.
    pub fn target_yaw(
        self,
        initial_yaw: f32,
        degrees: f32,
    ) -> f32 {
        match self {
            TurnDirection::Right => initial_yaw - degrees,
            TurnDirection::Left => initial_yaw + degrees,
        }
    }

    /// Whether `yaw` has crossed `target` to within `threshold` degrees.
    pub fn reached(
        self,
        yaw: f32,
        target: f32,
        threshold: f32,
    ) -> bool {
        match self {
            TurnDirection::Right => yaw <= target + threshold,
            TurnDirection::Left => yaw >= target - threshold,
        }
    }

    /// Opposite-sign wheel speeds that pivot the body this way.
    pub fn wheel_speeds(
        self,
        speed: f32,
    ) -> DriveCommand {
        match self {
            TurnDirection::Right => DriveCommand::new(speed, -speed),
            TurnDirection::Left => DriveCommand::new(-speed, speed),
        }
    }
}

struct TurnState {
    target_yaw: f32,
    last_yaw: f32,
    iterations: u32,
}

impl<A, O, D> MotionController<A, O, D>
where
    A: Actuator,
    O: OrientationSensor,
    D: DelayNs,
{
    /// Pivot `degrees` in `direction` at `speed` percent, stopping once the
    /// yaw sensor shows the target heading.
    ///
    /// `max_iterations` defaults to `TurnConfig::max_iterations`. A zero or
    /// negative angle is rejected before any command is sent.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn turn_to_relative_angle(
        &mut self,
        degrees: f32,
        direction: TurnDirection,
        speed: f32,
        max_iterations: Option<u32>,
    ) -> Result<ControlResult, Fault<A, O>> {
        let max_iterations = max_iterations.unwrap_or(self.config.turn.max_iterations);
        if !(degrees > 0.0 && degrees.is_finite()) {
            return Err(InvalidArgument::Angle { value: degrees }.into());
        }
        let speed = self.check_speed(speed)?;
        if max_iterations == 0 {
            return Err(InvalidArgument::IterationCap.into());
        }

        tracing::info!(degrees, ?direction, speed, max_iterations, "turn started");

        self.cancel.reset();
        let outcome = self
            .pivot_until_heading(degrees, direction, speed, max_iterations)
            .await;
        let state = self.finish(outcome)?;

        let final_yaw = self.settled_yaw(state.last_yaw);
        let result = ControlResult {
            completed: state.iterations < max_iterations,
            iterations_used: state.iterations,
            final_error: final_yaw - state.target_yaw,
        };
        if result.completed {
            tracing::info!(?result, final_yaw, target = state.target_yaw, "turn complete");
        } else {
            tracing::warn!(?result, final_yaw, target = state.target_yaw, "turn hit its iteration cap");
        }
        Ok(result)
    }

    async fn pivot_until_heading(
        &mut self,
        degrees: f32,
        direction: TurnDirection,
        speed: f32,
        max_iterations: u32,
    ) -> Result<TurnState, Fault<A, O>> {
        let initial_yaw = self.zero_heading().await?;
        let target_yaw = direction.target_yaw(initial_yaw, degrees);
        let threshold = self.config.turn.stop_threshold_degrees;

        self.command(direction.wheel_speeds(speed))?;

        let mut state = TurnState {
            target_yaw,
            last_yaw: initial_yaw,
            iterations: 0,
        };
        while state.iterations < max_iterations {
            let yaw = self.sample_yaw()?;
            state.last_yaw = yaw;

            if self.should_log(state.iterations) {
                tracing::debug!(
                    iteration = state.iterations,
                    yaw,
                    target_yaw,
                    "turn progress"
                );
            }
            if direction.reached(yaw, target_yaw, threshold) {
                break;
            }

            self.delay.delay_ms(self.config.sample_interval_ms).await;
            state.iterations += 1;

            if self.cancel_requested() {
                tracing::info!(iterations = state.iterations, "turn cancelled");
                return Err(ControlError::Cancelled {
                    iterations_used: state.iterations,
                });
            }
        }
        Ok(state)
    }
}
