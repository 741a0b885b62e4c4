// Gearbox: up to three motors driven as one logical actuator, optional
// encoder + PID feedback path, optional two-speed shifter.
//
// Every motor write funnels through apply_output, so the shift interlock is
// re-evaluated against the latest command on every output change. A requested
// gear change latches in target_gear and goes through the first time all
// motor commands drop below the load threshold; a persistently loaded
// gearbox blocks the shift indefinitely (no timeout, no forced shift).

use tracing::{debug, warn};

use crate::config::GearBoxConfig;
use crate::gearbox::pid::PidController;
use crate::hw::{Actuator, FeedbackMode, FeedbackSensor, GearShifter, Hal};

// Encoder and controller only ever exist as a pair
struct FeedbackPath<E> {
    encoder: E,
    pid: PidController,
}

/// One logical gearbox of a drive train.
///
/// Exactly one of manual mode and closed-loop mode is active at any instant:
/// `set_setpoint` enables the controller, `set_manual` disables it. Without a
/// feedback path the gearbox is permanently in manual mode and every
/// closed-loop operation degrades to a warning plus a no-op or zero/false
/// default.
pub struct GearBox<H: Hal> {
    motors: Vec<H::Motor>,
    feedback: Option<FeedbackPath<H::Encoder>>,
    shifter: Option<H::Shifter>,
    motor_reversed: bool,
    encoder_reversed: bool,
    target_gear: bool,
    shift_load_threshold: f64,
}

impl<H: Hal> GearBox<H> {
    /// Allocate exactly the subsystems whose channels are assigned in
    /// `config`.
    ///
    /// The feedback path is created only when both encoder channels are
    /// present; the sensor starts in distance mode and the controller starts
    /// enabled with the configured tolerance.
    pub fn new(config: &GearBoxConfig, hal: &mut H) -> Self {
        let feedback = match (config.encoder_a, config.encoder_b) {
            (Some(channel_a), Some(channel_b)) => {
                let mut encoder = hal.encoder(channel_a, channel_b);
                encoder.set_feedback_mode(FeedbackMode::Distance);
                encoder.start();

                let mut pid = PidController::new(config.pid_tolerance);
                pid.enable();

                Some(FeedbackPath { encoder, pid })
            }
            _ => None,
        };

        let shifter = config.shifter_channel.map(|channel| hal.shifter(channel));
        let motors = config.motor_channels().map(|channel| hal.motor(channel)).collect();

        Self {
            motors,
            feedback,
            shifter,
            motor_reversed: false,
            encoder_reversed: false,
            target_gear: false,
            shift_load_threshold: config.shift_load_threshold,
        }
    }

    /// True if an encoder + controller pair was configured
    pub fn has_closed_loop(&self) -> bool {
        self.feedback.is_some()
    }

    /// True if the controller exists and is currently driving the output
    pub fn closed_loop_enabled(&self) -> bool {
        self.feedback.as_ref().is_some_and(|fb| fb.pid.is_enabled())
    }

    /// Switch to closed-loop mode and set the controller target.
    ///
    /// Re-enables the controller if a manual command had disabled it. The
    /// value is accepted verbatim.
    pub fn set_setpoint(&mut self, setpoint: f64) {
        let Some(fb) = self.feedback.as_mut() else {
            warn!("setpoint {} ignored: no feedback path configured", setpoint);
            return;
        };

        if !fb.pid.is_enabled() {
            fb.pid.enable();
        }
        fb.pid.set_setpoint(setpoint);
    }

    /// Current controller target, or 0.0 without a feedback path
    pub fn setpoint(&self) -> f64 {
        match &self.feedback {
            Some(fb) => fb.pid.setpoint(),
            None => {
                warn!("no feedback path configured, reporting setpoint 0");
                0.0
            }
        }
    }

    /// Switch to manual mode and command `value` directly
    pub fn set_manual(&mut self, value: f64) {
        if let Some(fb) = self.feedback.as_mut() {
            if fb.pid.is_enabled() {
                fb.pid.disable();
            }
        }

        self.apply_output(value);
    }

    /// Last command on the reference motor, sign-corrected for reversal
    pub fn manual(&self) -> f64 {
        let raw = self.motors.first().map(Actuator::get).unwrap_or(0.0);
        if self.motor_reversed { -raw } else { raw }
    }

    /// One step of the periodic controller callback.
    ///
    /// Computes the closed-loop output from the sensor and pushes it through
    /// the shared output path. Does nothing in manual mode or without a
    /// feedback path; the last written command holds.
    pub fn iterate(&mut self, dt: f64) {
        let output = match self.feedback.as_mut() {
            Some(fb) if fb.pid.is_enabled() => fb.pid.calculate(fb.encoder.pid_input(), dt),
            _ => return,
        };

        self.apply_output(output);
    }

    /// Set P, I and D gains, preserving feed-forward
    pub fn set_pid(&mut self, kp: f64, ki: f64, kd: f64) {
        match self.feedback.as_mut() {
            Some(fb) => fb.pid.set_gains(kp, ki, kd),
            None => warn!("PID gains ignored: no feedback path configured"),
        }
    }

    /// Set feed-forward, preserving P, I and D
    pub fn set_feed_forward(&mut self, kf: f64) {
        match self.feedback.as_mut() {
            Some(fb) => fb.pid.set_feed_forward(kf),
            None => warn!("feed-forward ignored: no feedback path configured"),
        }
    }

    pub fn set_distance_per_pulse(&mut self, distance_per_pulse: f64) {
        match self.feedback.as_mut() {
            Some(fb) => fb.encoder.set_distance_per_pulse(distance_per_pulse),
            None => warn!("distance per pulse ignored: no feedback path configured"),
        }
    }

    /// Select which sensor quantity the controller reads
    pub fn set_feedback_mode(&mut self, mode: FeedbackMode) {
        match self.feedback.as_mut() {
            Some(fb) => fb.encoder.set_feedback_mode(mode),
            None => warn!("feedback mode ignored: no feedback path configured"),
        }
    }

    /// Zero the encoder's accumulated distance
    pub fn reset_encoder(&mut self) {
        match self.feedback.as_mut() {
            Some(fb) => fb.encoder.reset(),
            None => warn!("encoder reset ignored: no feedback path configured"),
        }
    }

    pub fn distance(&self) -> f64 {
        match &self.feedback {
            Some(fb) => fb.encoder.distance(),
            None => {
                warn!("no feedback path configured, reporting distance 0");
                0.0
            }
        }
    }

    pub fn rate(&self) -> f64 {
        match &self.feedback {
            Some(fb) => fb.encoder.rate(),
            None => {
                warn!("no feedback path configured, reporting rate 0");
                0.0
            }
        }
    }

    /// True if the controller's process value is within tolerance of its
    /// target
    pub fn on_target(&self) -> bool {
        match &self.feedback {
            Some(fb) => fb.pid.on_target(),
            None => {
                warn!("no feedback path configured, reporting off target");
                false
            }
        }
    }

    /// Clear the controller's accumulators, then re-enable it
    pub fn reset_pid(&mut self) {
        match self.feedback.as_mut() {
            Some(fb) => {
                fb.pid.reset();
                fb.pid.enable();
            }
            None => warn!("PID reset ignored: no feedback path configured"),
        }
    }

    /// Invert the sign of every subsequent motor command
    pub fn set_motor_reversed(&mut self, reversed: bool) {
        self.motor_reversed = reversed;
    }

    pub fn is_motor_reversed(&self) -> bool {
        self.motor_reversed
    }

    /// Push a new counting direction into the sensor.
    ///
    /// The cached flag behind `is_encoder_reversed` is tracked independently
    /// and is deliberately not updated here; the two flags can disagree (see
    /// DESIGN.md).
    pub fn set_encoder_reversed(&mut self, reversed: bool) {
        match self.feedback.as_mut() {
            Some(fb) => fb.encoder.set_reverse_direction(reversed),
            None => warn!("encoder direction ignored: no feedback path configured"),
        }
    }

    pub fn is_encoder_reversed(&self) -> bool {
        self.encoder_reversed
    }

    /// Request a gear. Latched, not immediate: the shifter moves on the next
    /// output application with all motors below the load threshold. Inert
    /// without a shifter.
    pub fn set_gear(&mut self, gear: bool) {
        if self.shifter.is_some() {
            self.target_gear = gear;
        }
    }

    /// Live shifter position, false without a shifter
    pub fn gear(&self) -> bool {
        self.shifter.as_ref().map(GearShifter::get).unwrap_or(false)
    }

    // Single choke point for motor writes: command every motor identically,
    // then re-check the shift interlock.
    fn apply_output(&mut self, output: f64) {
        let command = if self.motor_reversed { -output } else { output };
        for motor in &mut self.motors {
            motor.set(command);
        }

        self.update_gear();
    }

    // Shift interlock. Commanded magnitude is the load proxy: any motor at or
    // above the threshold defers the shift to a later output cycle.
    fn update_gear(&mut self) {
        let Some(shifter) = self.shifter.as_mut() else {
            return;
        };
        if self.target_gear == shifter.get() {
            return;
        }

        let loaded = self
            .motors
            .iter()
            .any(|motor| motor.get().abs() >= self.shift_load_threshold);
        if loaded {
            debug!(
                "gear shift deferred: motor output at or above {}",
                self.shift_load_threshold
            );
            return;
        }

        shifter.set(self.target_gear);
    }
}

impl<H: Hal> Drop for GearBox<H> {
    fn drop(&mut self) {
        // Zero the outputs and stop the sensor when the gearbox is released
        // (safety measure)
        for motor in &mut self.motors {
            motor.set(0.0);
        }
        if let Some(fb) = self.feedback.as_mut() {
            fb.pid.disable();
            fb.encoder.stop();
        }
    }
}
