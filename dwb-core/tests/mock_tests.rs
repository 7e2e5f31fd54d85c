use core::cell::RefCell;

use dwb_core::utils::controllers::{
    i2c::{init_devices, DeviceError, ImuYaw, PwmMotorPair, PWM_ADDRESS},
    Actuator, OrientationSensor,
};
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};

/// Default I2C address for the IMU sensor.
pub const IMU_ADDRESS: u8 = 0x68;

/// Create a write transaction for the given I2C address and data payload.
pub fn write(
    addr: u8,
    data: Vec<u8>,
) -> I2cTrans {
    I2cTrans::write(addr, data)
}
/// Create a write_read transaction for the given I2C address/payloads.
pub fn write_read(
    addr: u8,
    write: Vec<u8>,
    read: Vec<u8>,
) -> I2cTrans {
    I2cTrans::write_read(addr, write, read)
}

/// Transactions the ICM-42670 driver issues while probing.
fn imu_probe() -> Vec<I2cTrans> {
    vec![
        write_read(IMU_ADDRESS, vec![0x75], vec![0x67]),
        write_read(IMU_ADDRESS, vec![0x21], vec![0x00]),
        write(IMU_ADDRESS, vec![0x21, 0x00]),
        write_read(IMU_ADDRESS, vec![0x20], vec![0x00]),
        write(IMU_ADDRESS, vec![0x20, 0x00]),
        write_read(IMU_ADDRESS, vec![0x1F], vec![0x0F]),
        write(IMU_ADDRESS, vec![0x1F, 0x0F]),
    ]
}

/// One `gyro_norm` read at the ±250 dps range (131 LSB per dps); only z moves.
fn gyro_read(z_raw: i16) -> Vec<I2cTrans> {
    let [z_hi, z_lo] = z_raw.to_be_bytes();
    vec![
        write_read(IMU_ADDRESS, vec![0x20], vec![0x60]),
        write_read(IMU_ADDRESS, vec![0x11], vec![0x00]),
        write_read(IMU_ADDRESS, vec![0x12], vec![0x00]),
        write_read(IMU_ADDRESS, vec![0x13], vec![0x00]),
        write_read(IMU_ADDRESS, vec![0x14], vec![0x00]),
        write_read(IMU_ADDRESS, vec![0x15], vec![z_hi]),
        write_read(IMU_ADDRESS, vec![0x16], vec![z_lo]),
    ]
}

#[test]
fn test_init_devices() {
    // Only the IMU talks during init; the PCA9685 is configured separately.
    let expectations = imu_probe();

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let devices = init_devices(&i2c_bus);
    assert!(devices.is_ok());
    drop(devices);
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_configure_pwm() {
    // Expected transactions for enabling PWM and setting prescale (includes sleep handling)
    let expectations = [
        write(PWM_ADDRESS, vec![0x00, 0x01]),
        write(PWM_ADDRESS, vec![0x00, 0x11]),
        write(PWM_ADDRESS, vec![0xFE, 100]),
        write(PWM_ADDRESS, vec![0x00, 0x01]),
    ];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut motors = PwmMotorPair::new(&i2c_bus, PWM_ADDRESS).unwrap();
    motors.configure().unwrap();
    drop(motors);
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_stop_zeroes_all_channels() {
    // One auto-increment write, then phase and enable for each wheel
    let expectations = [
        write(PWM_ADDRESS, vec![0x00, 0x31]),
        write(PWM_ADDRESS, vec![0x06, 0x00, 0x00, 0x00, 0x00]),
        write(PWM_ADDRESS, vec![0x0A, 0x00, 0x00, 0x00, 0x00]),
        write(PWM_ADDRESS, vec![0x0E, 0x00, 0x00, 0x00, 0x00]),
        write(PWM_ADDRESS, vec![0x12, 0x00, 0x00, 0x00, 0x00]),
    ];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut motors = PwmMotorPair::new(&i2c_bus, PWM_ADDRESS).unwrap();
    motors.stop().unwrap();
    drop(motors);
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_set_speeds_maps_sign_to_phase() {
    // Left reverse at half duty, right forward at full duty
    let expectations = [
        write(PWM_ADDRESS, vec![0x00, 0x31]),
        write(PWM_ADDRESS, vec![0x06, 0x00, 0x00, 0xFF, 0x0F]),
        write(PWM_ADDRESS, vec![0x0A, 0x00, 0x00, 0xFF, 0x07]),
        write(PWM_ADDRESS, vec![0x0E, 0x00, 0x00, 0x00, 0x00]),
        write(PWM_ADDRESS, vec![0x12, 0x00, 0x00, 0xFF, 0x0F]),
    ];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut motors = PwmMotorPair::new(&i2c_bus, PWM_ADDRESS).unwrap();
    motors.set_speeds(-50.0, 100.0).unwrap();
    drop(motors);
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_pwm_pair_has_no_encoders() {
    let expectations: [I2cTrans; 0] = [];
    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut motors = PwmMotorPair::new(&i2c_bus, PWM_ADDRESS).unwrap();

    assert!(!motors.supports_precise_rotation());
    assert!(matches!(
        motors.run_for_degrees(360, 30.0, 30.0),
        Err(DeviceError::PreciseRotationUnsupported)
    ));
    drop(motors);
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_non_finite_speeds_stop_the_wheels() {
    let expectations = [
        write(PWM_ADDRESS, vec![0x00, 0x31]),
        write(PWM_ADDRESS, vec![0x06, 0x00, 0x00, 0x00, 0x00]),
        write(PWM_ADDRESS, vec![0x0A, 0x00, 0x00, 0x00, 0x00]),
        write(PWM_ADDRESS, vec![0x0E, 0x00, 0x00, 0x00, 0x00]),
        write(PWM_ADDRESS, vec![0x12, 0x00, 0x00, 0x00, 0x00]),
    ];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut motors = PwmMotorPair::new(&i2c_bus, PWM_ADDRESS).unwrap();
    motors.apply_wheel_speeds([f32::NAN, f32::INFINITY]).unwrap();
    drop(motors);
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_gyro_bias_is_subtracted() {
    let mut expectations = imu_probe();
    // two calibration samples at 2 dps
    expectations.extend(gyro_read(262));
    expectations.extend(gyro_read(262));
    // first read after the reset: still 2 dps, i.e. at rest
    expectations.extend(gyro_read(262));
    // then turning clockwise
    expectations.extend(gyro_read(-131));

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut imu = ImuYaw::new(&i2c_bus).unwrap();

    assert_eq!(imu.calibrate_bias(2).unwrap(), 2.0);
    // no bus traffic on reset
    imu.reset_yaw().unwrap();
    assert_eq!(imu.yaw_degrees().unwrap(), 0.0);
    assert!(imu.yaw_degrees().unwrap() <= 0.0);

    drop(imu);
    i2c_bus.borrow_mut().done();
}
