// Demo: drives a simulated gearbox through manual output, an interlocked
// gear shift and a closed-loop position move.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gearbox_runtime::config::{GearBoxConfig, LOOP_HZ};
use gearbox_runtime::gearbox::GearBox;
use gearbox_runtime::hw::SimHal;
use gearbox_runtime::runtime;

#[derive(Parser, Debug)]
#[command(about = "Gearbox runtime demo on simulated hardware")]
struct Args {
    /// JSON gearbox config; a built-in demo config is used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Control loop rate in Hz
    #[arg(long, default_value_t = LOOP_HZ)]
    hz: u64,
}

fn demo_config() -> GearBoxConfig {
    GearBoxConfig {
        shifter_channel: Some(0),
        encoder_a: Some(2),
        encoder_b: Some(3),
        motor1: Some(4),
        motor2: Some(5),
        ..GearBoxConfig::default()
    }
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    if let Err(e) = demo(Args::parse()).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}

async fn demo(args: Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = match &args.config {
        Some(path) => GearBoxConfig::load(path)?,
        None => demo_config(),
    };

    let mut hal = SimHal::new();
    let gearbox = runtime::shared(GearBox::new(&config, &mut hal));
    let loop_task = tokio::spawn(runtime::run(gearbox.clone(), args.hz));

    info!("Manual drive at 50% output");
    gearbox.lock().unwrap().set_manual(0.5);
    sleep(Duration::from_millis(100)).await;
    info!("manual readback: {}", gearbox.lock().unwrap().manual());

    info!("Requesting high gear under load");
    gearbox.lock().unwrap().set_gear(true);
    sleep(Duration::from_millis(100)).await;
    info!("gear engaged: {}", gearbox.lock().unwrap().gear());

    info!("Easing off to let the shift through");
    gearbox.lock().unwrap().set_manual(0.05);
    sleep(Duration::from_millis(100)).await;
    info!("gear engaged: {}", gearbox.lock().unwrap().gear());

    if let (Some(enc_a), Some(enc_b)) = (config.encoder_a, config.encoder_b) {
        info!("Closed-loop move to distance 10");
        {
            let mut gb = gearbox.lock().unwrap();
            gb.reset_encoder();
            gb.set_pid(0.2, 0.0, 0.0);
            gb.set_setpoint(10.0);
        }

        // Crude plant model: integrate the commanded output back into
        // encoder counts so the loop has something to converge on
        let motor = config.motor_channels().next();
        for _ in 0..200 {
            sleep(Duration::from_millis(20)).await;
            if let Some(channel) = motor {
                hal.advance_encoder(enc_a, enc_b, hal.motor_output(channel) * 2.0);
            }
            if gearbox.lock().unwrap().on_target() {
                break;
            }
        }

        let gb = gearbox.lock().unwrap();
        info!(
            "closed-loop move finished: distance={:.2}, on_target={}",
            gb.distance(),
            gb.on_target()
        );
    }

    gearbox.lock().unwrap().set_manual(0.0);
    loop_task.abort();
    info!("Demo finished");
    Ok(())
}
