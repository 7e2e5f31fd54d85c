//! I2C device bindings for the Differential-Wheel Bot.
//!
//! [`PwmMotorPair`] drives two DC motors through a PCA9685 PWM controller and
//! [`ImuYaw`] derives a heading from an ICM-42670 gyro. Both borrow the same
//! `RefCell` I2C bus and implement the controller traits from [`super::driver`].

use core::cell::RefCell;

use embassy_time::Instant;
use embedded_hal::i2c::I2c;
use embedded_hal_bus::i2c::RefCellDevice;
use icm42670::{Address as ImuAddress, Error as ImuError, Icm42670, PowerMode};
use pwm_pca9685::{Address as PwmAddress, Channel, Error as PwmError, Pca9685};

use super::driver::{Actuator, OrientationSensor};
use crate::utils::math::heading::YawIntegrator;

/// Default I2C address of the PCA9685 motor controller.
pub const PWM_ADDRESS: u8 = 0x55;

const MAX_DUTY: u16 = 4095;

/// Errors that can occur when interacting with I2C-based devices.
#[derive(Debug)]
pub enum DeviceError<E: core::fmt::Debug> {
    PwmError(PwmError<E>),
    ImuError(ImuError<E>),
    /// The motor driver has no encoders to run a precise rotation.
    PreciseRotationUnsupported,
}

/// Scan the I2C bus for devices and log any found addresses.
pub fn scan_bus<I2C: I2c>(i2c_bus: &RefCell<I2C>) {
    let mut bus = i2c_bus.borrow_mut();
    for addr in 0x03..0x78 {
        if bus.write(addr, &[]).is_ok() {
            tracing::warn!("I2C device found at 0x{:02X}", addr);
        }
    }
}

/// Bring up the motor driver and the yaw sensor on a shared bus.
///
/// On failure the bus is scanned so the log shows what did answer.
pub fn init_devices<'a, I2C, E>(
    i2c_bus: &'a RefCell<I2C>
) -> Result<(PwmMotorPair<'a, I2C>, ImuYaw<'a, I2C>), DeviceError<E>>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    let devices = ImuYaw::new(i2c_bus).and_then(|imu| {
        let motors = PwmMotorPair::new(i2c_bus, PWM_ADDRESS)?;
        Ok((motors, imu))
    });
    if let Err(e) = &devices {
        tracing::warn!("I2C init failed, scanning instead: {:?}", e);
        scan_bus(i2c_bus);
    }
    devices
}

/// Two DC motors on a PCA9685, each wired to a (phase, enable) channel pair.
pub struct PwmMotorPair<'a, I2C: 'static> {
    pub pwm: Pca9685<RefCellDevice<'a, I2C>>,
    /// (phase, enable) for the left and right wheel.
    motor_channels: [(Channel, Channel); 2],
}

impl<'a, I2C, E> PwmMotorPair<'a, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    /// Create the driver at `address`; left wheel on C0/C1, right on C2/C3.
    pub fn new(
        i2c_bus: &'a RefCell<I2C>,
        address: u8,
    ) -> Result<Self, DeviceError<E>> {
        let pwm = Pca9685::new(RefCellDevice::new(i2c_bus), PwmAddress::from(address))
            .map_err(DeviceError::PwmError)?;
        Ok(PwmMotorPair {
            pwm,
            motor_channels: [(Channel::C0, Channel::C1), (Channel::C2, Channel::C3)],
        })
    }

    /// Configure and enable the PWM motor driver (prescale to 60Hz).
    pub fn configure(&mut self) -> Result<(), DeviceError<E>> {
        self.pwm.enable().map_err(DeviceError::PwmError)?;
        tracing::info!("PWM enabled");
        self.pwm.set_prescale(100).map_err(DeviceError::PwmError)?;
        tracing::info!("PWM prescale set to 60Hz");
        Ok(())
    }

    /// Put the PWM controller to sleep.
    pub fn disable(&mut self) -> Result<(), DeviceError<E>> {
        self.pwm.disable().map_err(DeviceError::PwmError)
    }

    /// Apply normalized wheel speeds in `-1.0..=1.0` (left, right).
    ///
    /// A non-finite speed stops that wheel.
    pub fn apply_wheel_speeds(
        &mut self,
        wheel_speeds: [f32; 2],
    ) -> Result<(), DeviceError<E>> {
        for (i, &(phase_channel, enable_channel)) in self.motor_channels.iter().enumerate() {
            let target = if wheel_speeds[i].is_finite() { wheel_speeds[i] } else { 0.0 };
            let speed = libm::fabsf(target).min(1.0);
            let forward = target >= 0.0;

            self.pwm
                .set_channel_on_off(phase_channel, 0, if forward { 0 } else { MAX_DUTY })
                .map_err(DeviceError::PwmError)?;
            self.pwm
                .set_channel_on_off(enable_channel, 0, (speed * MAX_DUTY as f32) as u16)
                .map_err(DeviceError::PwmError)?;
        }
        Ok(())
    }
}

impl<'a, I2C, E> Actuator for PwmMotorPair<'a, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    type Error = DeviceError<E>;

    fn set_speeds(
        &mut self,
        left: f32,
        right: f32,
    ) -> Result<(), Self::Error> {
        self.apply_wheel_speeds([left / 100.0, right / 100.0])
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.apply_wheel_speeds([0.0, 0.0])
    }

    fn run_for_degrees(
        &mut self,
        _degrees: i32,
        _left: f32,
        _right: f32,
    ) -> Result<(), Self::Error> {
        Err(DeviceError::PreciseRotationUnsupported)
    }
}

/// Heading from an ICM-42670 gyro, integrated between reads.
pub struct ImuYaw<'a, I2C: 'static> {
    imu: Icm42670<RefCellDevice<'a, I2C>>,
    integrator: YawIntegrator,
    last_sample: Option<Instant>,
}

impl<'a, I2C, E> ImuYaw<'a, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    /// Probe the IMU at its primary address.
    pub fn new(i2c_bus: &'a RefCell<I2C>) -> Result<Self, DeviceError<E>> {
        let imu = Icm42670::new(RefCellDevice::new(i2c_bus), ImuAddress::Primary)
            .map_err(DeviceError::ImuError)?;
        Ok(ImuYaw {
            imu,
            integrator: YawIntegrator::new(),
            last_sample: None,
        })
    }

    /// Power up the gyro and accelerometer in low-noise mode.
    pub fn enable(&mut self) -> Result<(), DeviceError<E>> {
        self.imu
            .set_power_mode(PowerMode::SixAxisLowNoise)
            .map_err(DeviceError::ImuError)
    }

    /// Put the IMU into sleep mode.
    pub fn disable(&mut self) -> Result<(), DeviceError<E>> {
        self.imu
            .set_power_mode(PowerMode::Sleep)
            .map_err(DeviceError::ImuError)
    }

    /// Average `samples` z-rate readings taken at rest and use them as bias.
    pub fn calibrate_bias(
        &mut self,
        samples: u16,
    ) -> Result<f32, DeviceError<E>> {
        let samples = samples.max(1);
        let mut sum = 0.0;
        for _ in 0..samples {
            sum += self.imu.gyro_norm().map_err(DeviceError::ImuError)?.z;
        }
        let bias = sum / samples as f32;
        self.integrator.set_bias(bias);
        tracing::info!(bias, "gyro bias calibrated");
        Ok(bias)
    }
}

impl<'a, I2C, E> OrientationSensor for ImuYaw<'a, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    type Error = DeviceError<E>;

    fn yaw_degrees(&mut self) -> Result<f32, Self::Error> {
        let rate = self.imu.gyro_norm().map_err(DeviceError::ImuError)?.z;
        let now = Instant::now();
        if let Some(last) = self.last_sample {
            let dt = now.duration_since(last).as_micros() as f32 / 1_000_000.0;
            self.integrator.integrate(rate, dt);
        }
        self.last_sample = Some(now);
        Ok(self.integrator.yaw())
    }

    fn reset_yaw(&mut self) -> Result<(), Self::Error> {
        self.integrator.reset();
        self.last_sample = Some(Instant::now());
        Ok(())
    }
}
