mod cycle;
mod pump;

use anyhow::{bail, Result};
use std::{env, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cycle::DutyCycle;
use pump::Pump;

const TICK: Duration = Duration::from_secs(1);

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(v) => match v.trim().parse() {
            Ok(n) if n > 0 => Ok(n),
            _ => bail!("{name} must be a positive integer, got '{v}'"),
        },
        Err(_) => Ok(default),
    }
}

fn parse_flag(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Env config
    let gpio = u8::try_from(env_u64("AERATOR_GPIO", 17)?)?;
    let on_sec = env_u64("AERATOR_ON_SEC", 105)?;
    let off_sec = env_u64("AERATOR_OFF_SEC", 800)?;
    // Many common relay boards are active-low. If yours is active-high, set false.
    let active_low = env::var("RELAY_ACTIVE_LOW")
        .ok()
        .map(|v| parse_flag(&v))
        .unwrap_or(true);

    let mut pump = Pump::new(gpio, active_low)?;
    let mut cycle = DutyCycle::new(on_sec, off_sec);
    info!(gpio, on_sec, off_sec, "aerator started");
    pump.set(cycle.phase().is_on());

    let mut ticker = tokio::time::interval(TICK);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Some(phase) = cycle.tick() {
            info!(%phase, "aerator switching");
            pump.set(phase.is_on());
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
