use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::Utc;
use log::{error, info, trace};
use uuid::Uuid;

use crate::{
    db::Database,
    sensing::{Acceleration, SensorFeed},
};

use super::{CollectionSnapshot, CollectionState};

/// Ties the collecting flag to the sensor feed and the store.
///
/// The flag is checked when a sample is delivered, not when it was read, so
/// samples still in flight after a stop are discarded here.
#[derive(Clone)]
pub struct CollectionController {
    state: Arc<Mutex<CollectionState>>,
    feed: Arc<SensorFeed>,
    db: Database,
    transition: Arc<tokio::sync::Mutex<()>>,
}

fn lock_state(state: &Mutex<CollectionState>) -> MutexGuard<'_, CollectionState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn handle_sample(state: &Mutex<CollectionState>, db: &Database, sample: Acceleration) {
    // Held across the enqueue so a concurrent stop cannot slip in between
    // the flag check and the insert.
    let mut state = lock_state(state);
    if !state.is_active() {
        trace!("discarding sample delivered while not collecting");
        return;
    }

    state.latest = sample;
    if let Err(err) = db.insert_accelerometer(sample.x, sample.y, sample.z) {
        error!("failed to enqueue accelerometer sample: {err}");
    }
}

impl CollectionController {
    pub fn new(feed: Arc<SensorFeed>, db: Database) -> Self {
        let state = Arc::new(Mutex::new(CollectionState::new()));

        {
            let state = Arc::clone(&state);
            let db = db.clone();
            feed.on_sample(move |sample| handle_sample(&state, &db, sample));
        }

        Self {
            state,
            feed,
            db,
            transition: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn feed(&self) -> &SensorFeed {
        &self.feed
    }

    pub fn is_collecting(&self) -> bool {
        lock_state(&self.state).is_active()
    }

    pub fn snapshot(&self) -> CollectionSnapshot {
        lock_state(&self.state).snapshot(Utc::now())
    }

    /// Starts or stops collection. Repeating the current state is a no-op.
    pub async fn set_collecting(&self, collecting: bool) -> Result<()> {
        let _transition = self.transition.lock().await;

        if collecting {
            {
                let mut state = lock_state(&self.state);
                if state.is_active() {
                    return Ok(());
                }
                let session_id = Uuid::new_v4().to_string();
                info!("collection session {session_id} started");
                state.begin_session(session_id, Utc::now());
            }
            self.feed.start().await;
        } else {
            let (ended, elapsed) = {
                let mut state = lock_state(&self.state);
                let elapsed = state.elapsed_secs(Utc::now());
                (state.end_session(), elapsed)
            };
            self.feed.stop().await?;
            if let Some(session) = ended {
                info!(
                    "collection session {} ended after {}s",
                    session.id,
                    elapsed.unwrap_or(0)
                );
            }
        }

        Ok(())
    }

    pub async fn toggle(&self) -> Result<bool> {
        let collecting = !self.is_collecting();
        self.set_collecting(collecting).await?;
        Ok(collecting)
    }

    /// Lifecycle hook for the host losing foreground focus.
    pub async fn application_will_resign_active(&self) -> Result<()> {
        if self.is_collecting() {
            info!("application resigning active, stopping collection");
        }
        self.set_collecting(false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::{
        db::{test_support::stored_samples, WriteFailurePolicy},
        sensing::{ScriptedAccelerometer, DEFAULT_SAMPLE_INTERVAL},
    };

    fn controller(dir: &tempfile::TempDir) -> CollectionController {
        let db = Database::open(dir.path(), "motion", WriteFailurePolicy::Halt).unwrap();
        let feed = Arc::new(SensorFeed::new(
            ScriptedAccelerometer::default(),
            DEFAULT_SAMPLE_INTERVAL,
        ));
        CollectionController::new(feed, db)
    }

    #[tokio::test]
    async fn samples_while_collecting_are_stored_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&dir);

        controller.set_collecting(true).await.unwrap();
        for i in 0..20 {
            controller.feed().publish(Acceleration::new(f64::from(i), 0.0, 0.0));
        }
        controller.database().flush().await.unwrap();

        let rows = stored_samples(controller.database());
        let xs: Vec<f64> = rows.iter().map(|row| row.x).collect();
        assert_eq!(xs, (0..20).map(f64::from).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn samples_while_idle_are_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&dir);

        controller.feed().publish(Acceleration::new(0.1, 0.2, 0.3));
        controller.set_collecting(true).await.unwrap();
        controller.set_collecting(false).await.unwrap();
        controller.feed().publish(Acceleration::new(0.4, 0.5, 0.6));
        controller.database().flush().await.unwrap();

        assert!(stored_samples(controller.database()).is_empty());
        assert_eq!(controller.snapshot().latest, Acceleration::ZERO);
    }

    #[tokio::test]
    async fn stop_and_restart_scenario_stores_three_rows() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&dir);

        controller.set_collecting(true).await.unwrap();
        controller.feed().publish(Acceleration::new(0.1, 0.2, 0.3));
        controller.feed().publish(Acceleration::new(0.15, 0.25, 0.35));
        controller.set_collecting(false).await.unwrap();
        controller.database().flush().await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;

        controller.set_collecting(true).await.unwrap();
        controller.feed().publish(Acceleration::new(1.0, 1.0, 1.0));
        controller.database().flush().await.unwrap();

        let rows = stored_samples(controller.database());
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[2].x, rows[2].y, rows[2].z), (1.0, 1.0, 1.0));
        assert!(rows[2].timestamp > rows[0].timestamp);
        assert!(rows[2].timestamp > rows[1].timestamp);
    }

    #[tokio::test]
    async fn resign_active_stops_collection_and_drops_in_flight_sample() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&dir);

        controller.set_collecting(true).await.unwrap();
        controller.feed().publish(Acceleration::new(0.1, 0.2, 0.3));

        controller.application_will_resign_active().await.unwrap();
        assert!(!controller.is_collecting());
        assert!(!controller.feed().is_active());

        controller.feed().publish(Acceleration::new(9.0, 9.0, 9.0));
        controller.database().flush().await.unwrap();

        let rows = stored_samples(controller.database());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].x, 0.1);
    }

    #[tokio::test]
    async fn toggle_flips_state_and_tracks_latest_sample() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&dir);

        assert!(controller.toggle().await.unwrap());
        controller.feed().publish(Acceleration::new(0.3, 0.2, 0.1));

        let snapshot = controller.snapshot();
        assert!(snapshot.is_active);
        assert!(snapshot.started_at.is_some());
        assert_eq!(snapshot.latest, Acceleration::new(0.3, 0.2, 0.1));

        assert!(!controller.toggle().await.unwrap());
        let snapshot = controller.snapshot();
        assert!(!snapshot.is_active);
        assert_eq!(snapshot.started_at, None);
        assert_eq!(snapshot.elapsed_secs, None);
    }

    #[tokio::test]
    async fn starting_twice_keeps_the_first_session() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(&dir);

        controller.set_collecting(true).await.unwrap();
        let first = controller.snapshot().started_at;
        tokio::time::sleep(Duration::from_millis(2)).await;
        controller.set_collecting(true).await.unwrap();

        assert_eq!(controller.snapshot().started_at, first);
        controller.set_collecting(false).await.unwrap();
        controller.set_collecting(false).await.unwrap();
        assert!(!controller.is_collecting());
    }
}
