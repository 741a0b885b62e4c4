// Periodic control loop for the gearbox feedback path
//
// The gearbox does no locking of its own: it requires the caller's commands
// and the controller callback to be serialized externally. The mutex here is
// that serialization. Callers lock the shared handle to issue commands; the
// loop locks it once per tick to run the controller.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::time::interval;
use tracing::{info, warn};

use crate::gearbox::GearBox;
use crate::hw::Hal;

/// A gearbox shared between the control loop and command issuers
pub type SharedGearBox<H> = Arc<Mutex<GearBox<H>>>;

pub fn shared<H: Hal>(gearbox: GearBox<H>) -> SharedGearBox<H> {
    Arc::new(Mutex::new(gearbox))
}

/// Run the controller callback at `hz` until the task is dropped.
///
/// Each tick measures the real elapsed time and hands it to the gearbox as
/// the controller step; in manual mode the tick is a no-op.
pub async fn run<H: Hal>(gearbox: SharedGearBox<H>, hz: u64) {
    let hz = hz.max(1);
    let period = Duration::from_secs_f64(1.0 / hz as f64);
    let mut tick = interval(period);
    let mut last = Instant::now();

    info!("Control loop started: {}Hz", hz);

    loop {
        tick.tick().await;

        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        last = now;

        if dt > 2.0 * period.as_secs_f64() {
            warn!("control loop overrun: {:.1}ms between ticks", dt * 1e3);
        }

        gearbox
            .lock()
            .expect("gearbox mutex poisoned")
            .iterate(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GearBoxConfig;
    use crate::hw::SimHal;

    #[tokio::test]
    async fn loop_applies_controller_output() {
        let config = GearBoxConfig {
            encoder_a: Some(2),
            encoder_b: Some(3),
            motor1: Some(4),
            ..GearBoxConfig::default()
        };
        let mut hal = SimHal::new();
        let gearbox = shared(GearBox::new(&config, &mut hal));

        {
            let mut gb = gearbox.lock().unwrap();
            gb.set_pid(1.0, 0.0, 0.0);
            gb.set_setpoint(10.0);
        }

        let task = tokio::spawn(run(gearbox.clone(), 200));
        tokio::time::sleep(Duration::from_millis(100)).await;
        task.abort();

        // Encoder never moved, so the saturated output must be on the motor
        assert_eq!(hal.motor_output(4), 1.0);
    }

    #[tokio::test]
    async fn rates_above_1khz_keep_ticking() {
        let config = GearBoxConfig {
            encoder_a: Some(2),
            encoder_b: Some(3),
            motor1: Some(4),
            ..GearBoxConfig::default()
        };
        let mut hal = SimHal::new();
        let gearbox = shared(GearBox::new(&config, &mut hal));

        {
            let mut gb = gearbox.lock().unwrap();
            gb.set_pid(1.0, 0.0, 0.0);
            gb.set_setpoint(10.0);
        }

        // A sub-millisecond period must not collapse to zero
        let task = tokio::spawn(run(gearbox.clone(), 2000));
        tokio::time::sleep(Duration::from_millis(50)).await;
        task.abort();

        let err = task.await.unwrap_err();
        assert!(err.is_cancelled(), "loop task died on its own: {}", err);
        assert_eq!(hal.motor_output(4), 1.0);
    }

    #[tokio::test]
    async fn loop_leaves_manual_output_alone() {
        let config = GearBoxConfig {
            encoder_a: Some(2),
            encoder_b: Some(3),
            motor1: Some(4),
            ..GearBoxConfig::default()
        };
        let mut hal = SimHal::new();
        let gearbox = shared(GearBox::new(&config, &mut hal));

        gearbox.lock().unwrap().set_manual(0.3);

        let task = tokio::spawn(run(gearbox.clone(), 200));
        tokio::time::sleep(Duration::from_millis(100)).await;
        task.abort();

        assert_eq!(hal.motor_output(4), 0.3);
    }
}
