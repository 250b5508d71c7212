use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hamlet_sim::simulation::{SimulationConfig, SimulationWorld};

/// Throttle between ticks; overridable so a watching display layer can keep
/// up with the run.
const DEFAULT_TICK_MS: u64 = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Optional JSON config file as the only argument; defaults otherwise.
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str::<SimulationConfig>(&raw)?
        }
        None => SimulationConfig::default(),
    };
    let tick_ms = std::env::var("TICK_MS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_TICK_MS);

    let mut simulation = SimulationWorld::new(config)?;

    let shutdown = Arc::new(Notify::new());
    let ctrlc_notify = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        ctrlc_notify.notify_waiters();
    });

    let mut interval = tokio::time::interval(Duration::from_millis(tick_ms.max(1)));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if simulation.finished() {
                    break;
                }
                simulation.tick();
            }
            _ = shutdown.notified() => {
                info!("interrupted; reporting aggregates up to the current tick");
                break;
            }
        }
    }

    let summary = simulation.finalize();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
