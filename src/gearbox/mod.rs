// Gearbox abstraction for a closed-loop drive train
//
// Provides:
// - GearBox: up to three motors driven as one logical actuator
// - Optional encoder + PID feedback path with manual/closed-loop mode switch
// - Load-interlocked two-speed shifting

mod drive;
pub mod pid;

pub use drive::GearBox;
pub use pid::PidController;
