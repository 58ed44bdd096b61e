// Acquire trusted time once, retrying until a Roughtime server answers.
//
// Run with:
//   RUST_LOG=info cargo run -p ttime-client --example acquire
//
// Pass a JSON config path to override the built-in server lists:
//   cargo run -p ttime-client --example acquire -- config.json

use std::time::UNIX_EPOCH;

use ttime_client::{Schedule, SntpClient, TimeConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer());

    let dispatch = tracing::Dispatch::new(subscriber);

    // Library diagnostics are routed through the config rather than a global logger.
    let config = match std::env::args().nth(1) {
        Some(path) => TimeConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => TimeConfig::default(),
    }
    .with_dispatch(dispatch.clone());

    let ntp = SntpClient::new(config.timeout);
    let mut schedule = Schedule::default();

    let trusted = schedule.acquire_until_success(&config, &ntp).await;
    let secs = trusted.now().duration_since(UNIX_EPOCH)?.as_secs_f64();
    let next = schedule.resync_delay();
    tracing::dispatcher::with_default(&dispatch, || {
        info!(unix_secs = secs, source = %trusted.source, ?next, "trusted time");
    });
    println!("{secs:.6} from {}", trusted.source);
    Ok(())
}
