//! Module Exports
//!
//! This file exports the motion control system of the two-wheeled bot.
//!
//! - `driver`: actuator / orientation traits and actuation strategies.
//! - `straight`: gyro-corrected straight drive.
//! - `turn`: gyro-terminated pivot turn.
//! - `open_loop`: distance moves, pivots and timed runs without feedback.
//! - `i2c`: PCA9685 motor driver and ICM-42670 yaw sensor bindings.
//!
//! A single [`MotionController`] owns the wheel pair. Every maneuver borrows it
//! mutably, so two control loops can never command the wheels at once; the
//! [`MotionController::motion_ch`] task serializes commands arriving on
//! [`MOTION_CHANNEL`].

pub mod config;
pub mod driver;
pub mod error;
/// Module for managing I2C-connected devices.
pub mod i2c;
pub mod open_loop;
pub mod straight;
pub mod turn;

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    channel::Channel,
    signal::Signal,
};
use embedded_hal_async::delay::DelayNs;
use serde::{Deserialize, Serialize};

pub use config::ControlConfig;
pub use driver::{Actuator, ActuationStrategy, DriveCommand, OrientationSensor, STRATEGY_RANKING};
pub use error::{ControlError, InvalidArgument};
pub use turn::TurnDirection;

/// Signal used to request early termination of the running maneuver.
pub type CancelSignal = Signal<CriticalSectionRawMutex, ()>;

/// Channel used to receive motion commands (`MotionCommand` messages).
pub static MOTION_CHANNEL: Channel<CriticalSectionRawMutex, MotionCommand, 16> = Channel::new();

/// Channel on which one `MotionReport` per executed command is published.
pub static REPORT_CHANNEL: Channel<CriticalSectionRawMutex, MotionReport, 16> = Channel::new();

/// Default cancel signal watched by every controller.
pub static CANCEL_SIGNAL: CancelSignal = Signal::new();

static MOTION_BUSY: AtomicBool = AtomicBool::new(false);

/// True while the motion task is executing a command.
pub fn is_busy() -> bool {
    MOTION_BUSY.load(Ordering::Acquire)
}

/// Motion command variants.
///
/// Serialized as JSON with tag `"mc"`. Speeds are percent; a missing speed
/// falls back to `ControlConfig::default_speed`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "mc", rename_all = "snake_case")]
pub enum MotionCommand {
    /// Gyro-corrected straight drive over `d` inches.
    D {
        d: f32,
        s: Option<f32>,
        m: Option<u32>,
    },
    /// Gyro-terminated turn of `a` degrees.
    T {
        a: f32,
        dir: TurnDirection,
        s: Option<f32>,
        m: Option<u32>,
    },
    /// Open-loop move over `d` inches; a negative speed drives backward.
    M { d: f32, s: Option<f32> },
    /// Open-loop pivot of `a` degrees from wheel geometry.
    P {
        a: f32,
        dir: TurnDirection,
        s: Option<f32>,
    },
    /// Run both wheels for `ms` milliseconds.
    R { ms: u32, s: Option<f32> },
    /// Stop both wheels.
    Stop,
}

/// Outcome of one closed-loop maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlResult {
    /// False when the safety iteration cap ended the loop.
    pub completed: bool,
    pub iterations_used: u32,
    /// Heading error (deg) measured after the stop.
    pub final_error: f32,
}

/// Report published for every command the motion task executes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MotionReport {
    /// A closed-loop maneuver ran to success or timeout.
    Finished {
        command: MotionCommand,
        result: ControlResult,
    },
    /// An open-loop command completed.
    Moved { command: MotionCommand },
    Rejected {
        command: MotionCommand,
        reason: InvalidArgument,
    },
    Cancelled {
        command: MotionCommand,
        iterations_used: u32,
    },
    /// The actuator or sensor reported an error.
    Faulted { command: MotionCommand },
}

impl MotionReport {
    /// True for reports that represent a fully successful command.
    pub fn is_success(&self) -> bool {
        match self {
            MotionReport::Finished { result, .. } => result.completed,
            MotionReport::Moved { .. } => true,
            _ => false,
        }
    }
}

/// Error type of a controller over actuator `A` and sensor `O`.
pub type Fault<A, O> =
    ControlError<<A as Actuator>::Error, <O as OrientationSensor>::Error>;

/// Owns the wheel pair, the yaw sensor and the delay source.
pub struct MotionController<A, O, D> {
    pub(crate) actuator: A,
    pub(crate) sensor: O,
    pub(crate) delay: D,
    pub(crate) config: ControlConfig,
    pub(crate) strategy: ActuationStrategy,
    pub(crate) cancel: &'static CancelSignal,
}

impl<A, O, D> MotionController<A, O, D>
where
    A: Actuator,
    O: OrientationSensor,
    D: DelayNs,
{
    /// Validate `config` and negotiate the open-loop actuation strategy.
    pub fn new(
        actuator: A,
        sensor: O,
        delay: D,
        config: ControlConfig,
    ) -> Result<Self, InvalidArgument> {
        Self::with_ranking(actuator, sensor, delay, config, &STRATEGY_RANKING)
    }

    /// Like [`MotionController::new`] with a caller-supplied strategy ranking.
    pub fn with_ranking(
        actuator: A,
        sensor: O,
        delay: D,
        config: ControlConfig,
        ranking: &[ActuationStrategy],
    ) -> Result<Self, InvalidArgument> {
        config.validate()?;
        let strategy = ActuationStrategy::negotiate(ranking, &actuator);
        tracing::info!(?strategy, "motion controller ready");
        Ok(Self {
            actuator,
            sensor,
            delay,
            config,
            strategy,
            cancel: &CANCEL_SIGNAL,
        })
    }

    /// Watch `cancel` instead of the global [`CANCEL_SIGNAL`].
    pub fn with_cancel_signal(
        mut self,
        cancel: &'static CancelSignal,
    ) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn strategy(&self) -> ActuationStrategy {
        self.strategy
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn sensor(&self) -> &O {
        &self.sensor
    }

    /// Give back the actuator, sensor and delay.
    pub fn into_parts(self) -> (A, O, D) {
        (self.actuator, self.sensor, self.delay)
    }

    /// Run commands from [`MOTION_CHANNEL`] one at a time, forever.
    pub async fn motion_ch(&mut self) -> ! {
        loop {
            let command = MOTION_CHANNEL.receiver().receive().await;
            tracing::info!("Received motion command: {:?}", command);

            MOTION_BUSY.store(true, Ordering::Release);
            let report = self.execute_command(command).await;
            MOTION_BUSY.store(false, Ordering::Release);

            if REPORT_CHANNEL.try_send(report).is_err() {
                tracing::warn!(?report, "report channel full, dropping report");
            }
        }
    }

    /// Execute one command and describe its outcome.
    pub async fn execute_command(
        &mut self,
        command: MotionCommand,
    ) -> MotionReport {
        let default_speed = self.config.default_speed;
        match command {
            MotionCommand::D { d, s, m } => {
                let outcome = self.drive_straight(d, s.unwrap_or(default_speed), m).await;
                Self::report(command, outcome.map(Some))
            }
            MotionCommand::T { a, dir, s, m } => {
                let outcome = self
                    .turn_to_relative_angle(a, dir, s.unwrap_or(default_speed), m)
                    .await;
                Self::report(command, outcome.map(Some))
            }
            MotionCommand::M { d, s } => {
                let outcome = self.move_distance(d, s.unwrap_or(default_speed)).await;
                Self::report(command, outcome.map(|()| None))
            }
            MotionCommand::P { a, dir, s } => {
                let outcome = self.pivot(a, dir, s.unwrap_or(default_speed)).await;
                Self::report(command, outcome.map(|()| None))
            }
            MotionCommand::R { ms, s } => {
                let outcome = self.run_for(ms, s.unwrap_or(default_speed)).await;
                Self::report(command, outcome.map(|()| None))
            }
            MotionCommand::Stop => Self::report(command, self.stop().map(|()| None)),
        }
    }

    fn report(
        command: MotionCommand,
        outcome: Result<Option<ControlResult>, Fault<A, O>>,
    ) -> MotionReport {
        match outcome {
            Ok(done) => match done {
                Some(result) => MotionReport::Finished { command, result },
                None => MotionReport::Moved { command },
            },
            Err(ControlError::InvalidArgument(reason)) => {
                tracing::warn!(?reason, "motion command rejected");
                MotionReport::Rejected { command, reason }
            }
            Err(ControlError::Cancelled { iterations_used }) => MotionReport::Cancelled {
                command,
                iterations_used,
            },
            Err(ControlError::ActuationFault(e)) => {
                tracing::error!(error = ?e, "actuation fault");
                MotionReport::Faulted { command }
            }
            Err(ControlError::SensorFault(e)) => {
                tracing::error!(error = ?e, "sensor fault");
                MotionReport::Faulted { command }
            }
        }
    }

    /// Issue the stop that ends every maneuver and merge its outcome.
    ///
    /// A failed stop never hides an earlier fault; on an otherwise clean exit
    /// it is reported as an actuation fault because the wheels may still turn.
    pub(crate) fn finish<T>(
        &mut self,
        outcome: Result<T, Fault<A, O>>,
    ) -> Result<T, Fault<A, O>> {
        match (self.actuator.stop(), outcome) {
            (Ok(()), outcome) => outcome,
            (Err(e), Ok(_)) => {
                tracing::error!(error = ?e, "stop command failed, wheels may still be running");
                Err(ControlError::ActuationFault(e))
            }
            (Err(e), Err(fault)) => {
                tracing::error!(error = ?e, "stop command failed after fault");
                Err(fault)
            }
        }
    }

    /// Zero the yaw reference, let the sensor settle, and take the first sample.
    ///
    /// A cancel raised while settling ends the maneuver here, before the
    /// wheels are commanded.
    pub(crate) async fn zero_heading(&mut self) -> Result<f32, Fault<A, O>> {
        self.sensor.reset_yaw().map_err(ControlError::SensorFault)?;
        self.delay.delay_ms(self.config.settle_ms).await;
        let initial_yaw = self.sample_yaw()?;
        if self.cancel_requested() {
            tracing::info!("maneuver cancelled while settling");
            return Err(ControlError::Cancelled { iterations_used: 0 });
        }
        Ok(initial_yaw)
    }

    pub(crate) fn sample_yaw(&mut self) -> Result<f32, Fault<A, O>> {
        self.sensor.yaw_degrees().map_err(ControlError::SensorFault)
    }

    /// Yaw read after the stop, or `fallback` if the sensor fails.
    pub(crate) fn settled_yaw(
        &mut self,
        fallback: f32,
    ) -> f32 {
        match self.sensor.yaw_degrees() {
            Ok(yaw) => yaw,
            Err(e) => {
                tracing::warn!(error = ?e, "final yaw read failed, using last sample");
                fallback
            }
        }
    }

    pub(crate) fn command(
        &mut self,
        command: DriveCommand,
    ) -> Result<(), Fault<A, O>> {
        command
            .apply(&mut self.actuator)
            .map_err(ControlError::ActuationFault)
    }

    pub(crate) fn cancel_requested(&self) -> bool {
        self.cancel.try_take().is_some()
    }

    pub(crate) fn should_log(
        &self,
        iterations: u32,
    ) -> bool {
        iterations % self.config.log_interval.max(1) == 0
    }

    /// Speed for a forward-only maneuver: `0 < speed <= max_speed`.
    pub(crate) fn check_speed(
        &self,
        speed: f32,
    ) -> Result<f32, InvalidArgument> {
        if speed > 0.0 && speed <= self.config.max_speed {
            Ok(speed)
        } else {
            Err(InvalidArgument::Speed { value: speed })
        }
    }

    /// Signed speed for an open-loop move: nonzero, `|speed| <= max_speed`.
    pub(crate) fn check_signed_speed(
        &self,
        speed: f32,
    ) -> Result<f32, InvalidArgument> {
        let magnitude = libm::fabsf(speed);
        if magnitude > 0.0 && magnitude <= self.config.max_speed {
            Ok(speed)
        } else {
            Err(InvalidArgument::Speed { value: speed })
        }
    }
}
