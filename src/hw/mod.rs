// Hardware interfaces consumed by the gearbox
//
// Provides:
// - Actuator / FeedbackSensor / GearShifter capability traits
// - Hal: opens devices by channel number, chosen per backend at compile time
// - Simulated backend for tests and bench runs

pub mod sim;

pub use sim::SimHal;

/// Which derived quantity the feedback sensor reports to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedbackMode {
    /// Accumulated position
    #[default]
    Distance,
    /// Rate of change of position
    Rate,
}

/// A single motor output, commanded with a signed normalized value in [-1, 1]
pub trait Actuator {
    fn set(&mut self, output: f64);
    fn get(&self) -> f64;
}

/// A position/rate sensor usable as a PID process-variable source
pub trait FeedbackSensor {
    fn start(&mut self);
    fn stop(&mut self);

    /// Zero the accumulated distance
    fn reset(&mut self);

    fn distance(&self) -> f64;
    fn rate(&self) -> f64;

    fn set_distance_per_pulse(&mut self, distance_per_pulse: f64);
    fn set_reverse_direction(&mut self, reversed: bool);
    fn set_feedback_mode(&mut self, mode: FeedbackMode);
    fn feedback_mode(&self) -> FeedbackMode;

    /// The quantity currently selected by [`FeedbackSensor::set_feedback_mode`]
    fn pid_input(&self) -> f64 {
        match self.feedback_mode() {
            FeedbackMode::Distance => self.distance(),
            FeedbackMode::Rate => self.rate(),
        }
    }
}

/// A single-bit binary-position actuator (shift solenoid)
pub trait GearShifter {
    fn set(&mut self, engaged: bool);
    fn get(&self) -> bool;
}

/// Opens devices by channel number.
///
/// The gearbox is generic over the Hal, so the concrete motor, encoder and
/// shifter types are a compile-time choice at the construction site.
pub trait Hal {
    type Motor: Actuator;
    type Encoder: FeedbackSensor;
    type Shifter: GearShifter;

    fn motor(&mut self, channel: u32) -> Self::Motor;
    fn encoder(&mut self, channel_a: u32, channel_b: u32) -> Self::Encoder;
    fn shifter(&mut self, channel: u32) -> Self::Shifter;
}
