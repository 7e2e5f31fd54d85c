//! Gyro-rate integration into a yaw angle.

/// Integrates a z-axis angular rate (deg/s) into an unbounded yaw angle.
///
/// Yaw increases counter-clockwise, matching the sign convention of the
/// motion controllers. A constant rest bias can be removed from every sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct YawIntegrator {
    yaw: f32,
    bias_dps: f32,
}

impl YawIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current integrated yaw (degrees).
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Rest bias subtracted from every rate sample (deg/s).
    pub fn bias(&self) -> f32 {
        self.bias_dps
    }

    pub fn set_bias(
        &mut self,
        bias_dps: f32,
    ) {
        self.bias_dps = bias_dps;
    }

    /// Advance the angle by `rate_dps` held for `dt_s` seconds.
    pub fn integrate(
        &mut self,
        rate_dps: f32,
        dt_s: f32,
    ) -> f32 {
        if dt_s > 0.0 {
            self.yaw += (rate_dps - self.bias_dps) * dt_s;
        }
        self.yaw
    }

    /// Zero the angle; the bias is kept.
    pub fn reset(&mut self) {
        self.yaw = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrates_constant_rate() {
        let mut yaw = YawIntegrator::new();
        for _ in 0..50 {
            yaw.integrate(90.0, 0.02);
        }
        assert!(libm::fabsf(yaw.yaw() - 90.0) < 1e-3);
    }

    #[test]
    fn test_bias_removed() {
        let mut yaw = YawIntegrator::new();
        yaw.set_bias(0.5);
        yaw.integrate(0.5, 10.0);
        assert_eq!(yaw.yaw(), 0.0);
    }

    #[test]
    fn test_reset_keeps_bias() {
        let mut yaw = YawIntegrator::new();
        yaw.set_bias(0.25);
        yaw.integrate(-45.25, 1.0);
        assert!(libm::fabsf(yaw.yaw() + 45.5) < 1e-4);
        yaw.reset();
        assert_eq!(yaw.yaw(), 0.0);
        assert_eq!(yaw.bias(), 0.25);
    }

    #[test]
    fn test_ignores_non_positive_dt() {
        let mut yaw = YawIntegrator::new();
        yaw.integrate(100.0, 0.0);
        yaw.integrate(100.0, -1.0);
        assert_eq!(yaw.yaw(), 0.0);
    }
}
