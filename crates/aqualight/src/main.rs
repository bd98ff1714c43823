mod button;
mod clock;
mod config;
mod controller;
mod day_night;
mod error;
mod hw;
mod schedule;
mod status;

use anyhow::{Context, Result};
use std::env;
use tracing_subscriber::EnvFilter;

use button::Button;
use clock::SystemClock;
use config::PinConfig;
use controller::Controller;
use day_night::DayNightLed;
use hw::{Devices, LogDisplay, LogIndicator, PinFactory};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ──────────────────────────────────────────────────────
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = config::load(&config_path)?;
    let schedule = cfg.build_schedule()?;

    let self_test = env::var("SELF_TEST")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(cfg.self_test);

    // ── Devices ─────────────────────────────────────────────────────
    let pins = &cfg.pins;
    let factory = PinFactory::new(pins.active_low)?;
    let led_timing = cfg.led_timing();

    let devices = Devices {
        clock: Box::new(SystemClock::new(cfg.standard_offset()?)),
        co2_valve: factory.output("co2-valve", PinConfig::bcm(pins.co2_valve)?)?,
        plant_lights: factory.output("plant-lights", PinConfig::bcm(pins.plant_lights)?)?,
        lights: [
            DayNightLed::new(
                "day-night-1",
                factory.output("day-night-1", PinConfig::bcm(pins.day_night_1)?)?,
                led_timing,
            )?,
            DayNightLed::new(
                "day-night-2",
                factory.output("day-night-2", PinConfig::bcm(pins.day_night_2)?)?,
                led_timing,
            )?,
        ],
        up_button: Button::new("up", factory.input("up", PinConfig::bcm(pins.up_button)?)?),
        down_button: Button::new(
            "down",
            factory.input("down", PinConfig::bcm(pins.down_button)?)?,
        ),
        display: Box::new(LogDisplay::default()),
        indicator: Box::new(LogIndicator::default()),
    };

    tracing::info!(
        config = %config_path,
        windows = schedule.entries().len(),
        self_test,
        "aqualight starting"
    );

    // ── Control loop ────────────────────────────────────────────────
    let mut controller = Controller::new(devices, schedule, cfg.tick_interval());
    let hold = self_test.then(|| cfg.self_test_hold());

    let outcome = match controller.start(hold).await {
        Ok(()) => controller.run().await,
        Err(e) => Err(e),
    };

    // `run` only comes back on failure.
    if let Err(e) = outcome {
        tracing::error!("control loop halted: {e}");
        controller.shutdown();
        return Err(e).context("aqualight stopped");
    }
    Ok(())
}
