//! Recording doubles for the actuator, yaw sensor and delay.
#![allow(dead_code)]

use dwb_core::utils::controllers::{Actuator, CancelSignal, OrientationSensor};

/// A command seen by [`RecordingActuator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Issued {
    Speeds(f32, f32),
    Precise(i32, f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorFailure;

/// Records every command; can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingActuator {
    pub issued: Vec<Issued>,
    pub stops: usize,
    pub precise: bool,
    /// Fail the n-th `set_speeds` call (0-based).
    pub fail_speeds_at: Option<usize>,
    pub fail_stop: bool,
    speed_calls: usize,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_precise_rotation() -> Self {
        Self {
            precise: true,
            ..Self::default()
        }
    }

    pub fn speeds(&self) -> Vec<(f32, f32)> {
        self.issued
            .iter()
            .filter_map(|cmd| match *cmd {
                Issued::Speeds(l, r) => Some((l, r)),
                Issued::Precise(..) => None,
            })
            .collect()
    }
}

impl Actuator for RecordingActuator {
    type Error = ActuatorFailure;

    fn set_speeds(
        &mut self,
        left: f32,
        right: f32,
    ) -> Result<(), Self::Error> {
        let call = self.speed_calls;
        self.speed_calls += 1;
        if self.fail_speeds_at == Some(call) {
            return Err(ActuatorFailure);
        }
        self.issued.push(Issued::Speeds(left, right));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.stops += 1;
        if self.fail_stop {
            Err(ActuatorFailure)
        } else {
            Ok(())
        }
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
        self.issued.push(Issued::Precise(degrees, left, right));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorFailure;

/// Plays back a fixed yaw sequence, one value per read; the last value
/// repeats once the script runs out.
#[derive(Default)]
pub struct ScriptedYaw {
    samples: Vec<f32>,
    pub reads: usize,
    pub resets: usize,
    /// Fail the n-th read (0-based).
    pub fail_at: Option<usize>,
    /// Raise the cancel signal on the n-th read.
    pub cancel_at: Option<(usize, &'static CancelSignal)>,
}

impl ScriptedYaw {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            ..Self::default()
        }
    }

    /// Always reads `yaw`.
    pub fn constant(yaw: f32) -> Self {
        Self::new(vec![yaw])
    }

    /// Reference read of `initial` followed by `loop_samples`.
    pub fn after_reference(
        initial: f32,
        loop_samples: impl IntoIterator<Item = f32>,
    ) -> Self {
        let mut samples = vec![initial];
        samples.extend(loop_samples);
        Self::new(samples)
    }
}

impl OrientationSensor for ScriptedYaw {
    type Error = SensorFailure;

    fn yaw_degrees(&mut self) -> Result<f32, Self::Error> {
        let idx = self.reads;
        self.reads += 1;
        if self.fail_at == Some(idx) {
            return Err(SensorFailure);
        }
        if let Some((at, signal)) = self.cancel_at {
            if at == idx {
                signal.signal(());
            }
        }
        Ok(self
            .samples
            .get(idx)
            .or(self.samples.last())
            .copied()
            .unwrap_or(0.0))
    }

    fn reset_yaw(&mut self) -> Result<(), Self::Error> {
        self.resets += 1;
        Ok(())
    }
}

/// Records requested waits without sleeping.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub waits_ms: Vec<u32>,
}

impl RecordingDelay {
    pub fn total_ms(&self) -> u64 {
        self.waits_ms.iter().map(|&ms| ms as u64).sum()
    }
}

impl embedded_hal_async::delay::DelayNs for RecordingDelay {
    async fn delay_ns(
        &mut self,
        ns: u32,
    ) {
        self.waits_ms.push(ns / 1_000_000);
    }

    async fn delay_ms(
        &mut self,
        ms: u32,
    ) {
        self.waits_ms.push(ms);
    }
}
