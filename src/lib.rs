// Closed-loop actuation layer for a mobile robot drive train
//
// A GearBox bundles a bank of motors, an optional encoder + PID feedback
// path and an optional two-speed shifter behind one narrow API; the runtime
// module supplies the periodic loop that drives the controller.

pub mod config;
pub mod gearbox;
pub mod hw;
pub mod runtime;

pub use config::GearBoxConfig;
pub use gearbox::GearBox;
