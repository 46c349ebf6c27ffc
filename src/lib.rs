pub mod collector;
pub mod db;
pub mod sensing;
pub mod settings;
pub mod utils;

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use tokio::time::MissedTickBehavior;

use collector::CollectionController;
use db::Database;
use sensing::{SensorFeed, SimulatedAccelerometer};
use settings::{default_data_dir, SettingsStore};

/// Noise on the simulated accelerometer, in g.
const SIMULATED_NOISE_STDEV: f64 = 0.02;
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

pub fn run() {
    utils::logging::init_logging();
    log::info!("Motion collector starting up...");

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
        .and_then(|runtime| runtime.block_on(collect_until_interrupted()));

    if let Err(err) = result {
        error!("motion collector stopped: {err:?}");
        std::process::exit(1);
    }
}

async fn collect_until_interrupted() -> Result<()> {
    let data_dir = default_data_dir()?;
    let settings = SettingsStore::load(&data_dir)?.settings();

    let database = Database::open(
        &data_dir,
        &settings.database_name,
        settings.write_failure_policy,
    )
    .context("accelerometer store is unavailable")?;

    let source = SimulatedAccelerometer::new(SIMULATED_NOISE_STDEV)?;
    let feed = Arc::new(SensorFeed::new(source, settings.sample_interval()));
    let controller = CollectionController::new(feed, database.clone());

    controller.set_collecting(true).await?;

    let mut faults = database.faults();
    let mut status = tokio::time::interval(STATUS_INTERVAL);
    status.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            _ = status.tick() => log_status(&controller),
            changed = faults.changed() => {
                if changed.is_err() {
                    return Err(anyhow!("database worker exited"));
                }
                if let Some(fault) = faults.borrow_and_update().clone() {
                    return Err(anyhow!(fault).context("accelerometer store failed"));
                }
            }
            signal = &mut interrupted => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("Ctrl-C received");
                break;
            }
        }
    }

    controller.application_will_resign_active().await?;
    database.flush().await?;
    info!(
        "samples flushed to {}; {} sensor reads dropped",
        database.path().display(),
        controller.feed().dropped_reads()
    );
    Ok(())
}

fn log_status(controller: &CollectionController) {
    let snapshot = controller.snapshot();
    match (snapshot.started_at, snapshot.elapsed_secs) {
        (Some(started_at), Some(elapsed)) => info!(
            "collecting since {} ({}s): x={:.5} y={:.5} z={:.5}",
            started_at.format("%Y-%m-%d %H:%M:%S"),
            elapsed,
            snapshot.latest.x,
            snapshot.latest.y,
            snapshot.latest.z,
        ),
        _ => info!("not collecting"),
    }
}
