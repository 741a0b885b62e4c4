// Position/rate PID controller for the gearbox feedback path
//
// output = kf*setpoint + kp*e + ki*∫e dt + kd*de/dt, clamped to [-1, 1].
// The integral term is clamped so its contribution alone cannot exceed
// full output (anti-windup).

/// PID controller with feed-forward, an enable flag and an on-target
/// tolerance.
///
/// `calculate` is expected to be driven at a fixed rate by the control loop;
/// the controller itself keeps no clock.
#[derive(Debug, Clone)]
pub struct PidController {
    kp: f64,
    ki: f64,
    kd: f64,
    kf: f64,
    setpoint: f64,
    tolerance: f64,
    enabled: bool,
    integral: f64,
    last_error: f64,
}

impl PidController {
    /// Create a controller with zero gains, disabled
    pub fn new(tolerance: f64) -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            kf: 0.0,
            setpoint: 0.0,
            tolerance,
            enabled: false,
            integral: 0.0,
            last_error: 0.0,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set P, I and D together, leaving feed-forward untouched
    pub fn set_gains(&mut self, kp: f64, ki: f64, kd: f64) {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
    }

    /// Set feed-forward, leaving P, I and D untouched
    pub fn set_feed_forward(&mut self, kf: f64) {
        self.kf = kf;
    }

    /// Current gains as (kp, ki, kd, kf)
    pub fn gains(&self) -> (f64, f64, f64, f64) {
        (self.kp, self.ki, self.kd, self.kf)
    }

    /// Target value, accepted verbatim (no range restriction)
    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }

    /// True if the most recent error is within the absolute tolerance
    pub fn on_target(&self) -> bool {
        self.last_error.abs() <= self.tolerance
    }

    /// Clear the integral and derivative state and disable the controller
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.enabled = false;
    }

    /// Run one control step against the measured `input`.
    ///
    /// `dt` is the time since the previous step in seconds; the derivative
    /// term is skipped when it is not positive.
    pub fn calculate(&mut self, input: f64, dt: f64) -> f64 {
        let error = self.setpoint - input;

        self.integral += error * dt;
        if self.ki != 0.0 {
            let limit = 1.0 / self.ki.abs();
            self.integral = self.integral.clamp(-limit, limit);
        }

        let derivative = if dt > 0.0 {
            (error - self.last_error) / dt
        } else {
            0.0
        };
        self.last_error = error;

        let output = self.kf * self.setpoint
            + self.kp * error
            + self.ki * self.integral
            + self.kd * derivative;

        output.clamp(-1.0, 1.0)
    }
}
