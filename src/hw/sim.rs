// Simulated hardware backend
//
// Every device shares its state with the SimHal that opened it, so tests and
// the demo binary can observe motor commands, count shifter writes, and feed
// encoder counts from the outside while the gearbox owns the device handles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{Actuator, FeedbackMode, FeedbackSensor, GearShifter, Hal};

#[derive(Debug, Default)]
struct MotorState {
    output: f64,
}

#[derive(Debug)]
struct EncoderState {
    pulses: f64,
    pulse_rate: f64,
    distance_per_pulse: f64,
    reversed: bool,
    running: bool,
    mode: FeedbackMode,
}

impl Default for EncoderState {
    fn default() -> Self {
        Self {
            pulses: 0.0,
            pulse_rate: 0.0,
            distance_per_pulse: 1.0,
            reversed: false,
            running: false,
            mode: FeedbackMode::Distance,
        }
    }
}

impl EncoderState {
    fn sign(&self) -> f64 {
        if self.reversed { -1.0 } else { 1.0 }
    }
}

#[derive(Debug, Default)]
struct ShifterState {
    engaged: bool,
    writes: u32,
}

/// Simulated motor output
pub struct SimMotor {
    state: Arc<Mutex<MotorState>>,
}

impl Actuator for SimMotor {
    fn set(&mut self, output: f64) {
        self.state.lock().unwrap().output = output;
    }

    fn get(&self) -> f64 {
        self.state.lock().unwrap().output
    }
}

/// Simulated quadrature encoder
pub struct SimEncoder {
    state: Arc<Mutex<EncoderState>>,
}

impl FeedbackSensor for SimEncoder {
    fn start(&mut self) {
        self.state.lock().unwrap().running = true;
    }

    fn stop(&mut self) {
        self.state.lock().unwrap().running = false;
    }

    fn reset(&mut self) {
        self.state.lock().unwrap().pulses = 0.0;
    }

    fn distance(&self) -> f64 {
        let state = self.state.lock().unwrap();
        state.pulses * state.distance_per_pulse * state.sign()
    }

    fn rate(&self) -> f64 {
        let state = self.state.lock().unwrap();
        state.pulse_rate * state.distance_per_pulse * state.sign()
    }

    fn set_distance_per_pulse(&mut self, distance_per_pulse: f64) {
        self.state.lock().unwrap().distance_per_pulse = distance_per_pulse;
    }

    fn set_reverse_direction(&mut self, reversed: bool) {
        self.state.lock().unwrap().reversed = reversed;
    }

    fn set_feedback_mode(&mut self, mode: FeedbackMode) {
        self.state.lock().unwrap().mode = mode;
    }

    fn feedback_mode(&self) -> FeedbackMode {
        self.state.lock().unwrap().mode
    }
}

/// Simulated shift solenoid
pub struct SimShifter {
    state: Arc<Mutex<ShifterState>>,
}

impl GearShifter for SimShifter {
    fn set(&mut self, engaged: bool) {
        let mut state = self.state.lock().unwrap();
        state.engaged = engaged;
        state.writes += 1;
    }

    fn get(&self) -> bool {
        self.state.lock().unwrap().engaged
    }
}

/// Simulated device registry.
///
/// Devices opened through the [`Hal`] impl stay observable here after being
/// moved into a gearbox.
#[derive(Default)]
pub struct SimHal {
    motors: HashMap<u32, Arc<Mutex<MotorState>>>,
    encoders: HashMap<(u32, u32), Arc<Mutex<EncoderState>>>,
    shifters: HashMap<u32, Arc<Mutex<ShifterState>>>,
}

impl SimHal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last command written to the motor on `channel` (0.0 if never opened)
    pub fn motor_output(&self, channel: u32) -> f64 {
        self.motors
            .get(&channel)
            .map(|state| state.lock().unwrap().output)
            .unwrap_or(0.0)
    }

    /// Live position of the shifter on `channel`
    pub fn shifter_engaged(&self, channel: u32) -> bool {
        self.shifters
            .get(&channel)
            .map(|state| state.lock().unwrap().engaged)
            .unwrap_or(false)
    }

    /// Number of writes the shifter on `channel` has received
    pub fn shifter_writes(&self, channel: u32) -> u32 {
        self.shifters
            .get(&channel)
            .map(|state| state.lock().unwrap().writes)
            .unwrap_or(0)
    }

    /// Advance the encoder by `pulses` counts. Ignored while the encoder is
    /// stopped.
    pub fn advance_encoder(&self, channel_a: u32, channel_b: u32, pulses: f64) {
        if let Some(state) = self.encoders.get(&(channel_a, channel_b)) {
            let mut state = state.lock().unwrap();
            if state.running {
                state.pulses += pulses;
            }
        }
    }

    /// Set the encoder's instantaneous pulse rate
    pub fn set_encoder_rate(&self, channel_a: u32, channel_b: u32, pulse_rate: f64) {
        if let Some(state) = self.encoders.get(&(channel_a, channel_b)) {
            state.lock().unwrap().pulse_rate = pulse_rate;
        }
    }

    pub fn encoder_running(&self, channel_a: u32, channel_b: u32) -> bool {
        self.encoders
            .get(&(channel_a, channel_b))
            .map(|state| state.lock().unwrap().running)
            .unwrap_or(false)
    }

    pub fn encoder_reversed(&self, channel_a: u32, channel_b: u32) -> bool {
        self.encoders
            .get(&(channel_a, channel_b))
            .map(|state| state.lock().unwrap().reversed)
            .unwrap_or(false)
    }
}

impl Hal for SimHal {
    type Motor = SimMotor;
    type Encoder = SimEncoder;
    type Shifter = SimShifter;

    fn motor(&mut self, channel: u32) -> SimMotor {
        let state = self.motors.entry(channel).or_default().clone();
        SimMotor { state }
    }

    fn encoder(&mut self, channel_a: u32, channel_b: u32) -> SimEncoder {
        let state = self
            .encoders
            .entry((channel_a, channel_b))
            .or_default()
            .clone();
        SimEncoder { state }
    }

    fn shifter(&mut self, channel: u32) -> SimShifter {
        let state = self.shifters.entry(channel).or_default().clone();
        SimShifter { state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motor_command_visible_from_hal() {
        let mut hal = SimHal::new();
        let mut motor = hal.motor(4);
        motor.set(0.5);
        assert_eq!(motor.get(), 0.5);
        assert_eq!(hal.motor_output(4), 0.5);
    }

    #[test]
    fn shifter_counts_writes() {
        let mut hal = SimHal::new();
        let mut shifter = hal.shifter(0);
        assert_eq!(hal.shifter_writes(0), 0);
        shifter.set(true);
        shifter.set(false);
        assert!(!hal.shifter_engaged(0));
        assert_eq!(hal.shifter_writes(0), 2);
    }

    #[test]
    fn encoder_counts_only_while_running() {
        let mut hal = SimHal::new();
        let mut encoder = hal.encoder(2, 3);

        hal.advance_encoder(2, 3, 100.0);
        assert_eq!(encoder.distance(), 0.0);

        encoder.start();
        hal.advance_encoder(2, 3, 100.0);
        assert_eq!(encoder.distance(), 100.0);

        encoder.stop();
        hal.advance_encoder(2, 3, 100.0);
        assert_eq!(encoder.distance(), 100.0);
    }

    #[test]
    fn encoder_scale_and_direction() {
        let mut hal = SimHal::new();
        let mut encoder = hal.encoder(2, 3);
        encoder.start();
        encoder.set_distance_per_pulse(0.5);

        hal.advance_encoder(2, 3, 10.0);
        hal.set_encoder_rate(2, 3, 4.0);
        assert_eq!(encoder.distance(), 5.0);
        assert_eq!(encoder.rate(), 2.0);

        encoder.set_reverse_direction(true);
        assert_eq!(encoder.distance(), -5.0);
        assert_eq!(encoder.rate(), -2.0);
    }

    #[test]
    fn pid_input_follows_feedback_mode() {
        let mut hal = SimHal::new();
        let mut encoder = hal.encoder(2, 3);
        encoder.start();
        hal.advance_encoder(2, 3, 7.0);
        hal.set_encoder_rate(2, 3, 3.0);

        assert_eq!(encoder.pid_input(), 7.0);
        encoder.set_feedback_mode(FeedbackMode::Rate);
        assert_eq!(encoder.pid_input(), 3.0);
    }
}
