use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{
    loop_worker::{feed_loop, FeedShared},
    publisher::PublisherError,
    source::{Acceleration, AccelerometerSource},
};

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

struct FeedTask {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Turns a polled accelerometer into a stream of listener callbacks.
///
/// The feed owns its source exclusively. While active, one tokio task polls
/// the source at the configured interval and calls every listener on that
/// task, so deliveries never overlap and arrive in read order.
pub struct SensorFeed {
    shared: Arc<FeedShared>,
    interval: Duration,
    active: AtomicBool,
    task: Mutex<Option<FeedTask>>,
}

impl SensorFeed {
    pub fn new<S>(source: S, interval: Duration) -> Self
    where
        S: AccelerometerSource + 'static,
    {
        let interval = if interval.is_zero() {
            warn!("zero sample interval requested, using 1ms");
            Duration::from_millis(1)
        } else {
            interval
        };

        Self {
            shared: Arc::new(FeedShared::new(Box::new(source))),
            interval,
            active: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Reads that failed and were dropped without reaching listeners.
    pub fn dropped_reads(&self) -> u64 {
        self.shared.dropped_reads()
    }

    /// Registers a callback invoked once per delivered sample.
    pub fn on_sample<F>(&self, listener: F) -> Uuid
    where
        F: Fn(Acceleration) + Send + Sync + 'static,
    {
        self.shared.publisher.register(listener)
    }

    pub fn remove_listener(&self, id: Uuid) -> Result<(), PublisherError> {
        self.shared.publisher.unregister(id)
    }

    /// Delivers a sample pushed by the platform rather than polled.
    ///
    /// Delivery does not depend on the feed being active: a push-style
    /// platform may still hand over samples after `stop()`, and listeners are
    /// expected to filter those.
    pub fn publish(&self, sample: Acceleration) {
        self.shared.publisher.notify(sample);
    }

    /// Starts polling. Does nothing if already running.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            debug!("accelerometer feed already active");
            return;
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(feed_loop(
            Arc::clone(&self.shared),
            self.interval,
            cancel_token.clone(),
        ));

        *task = Some(FeedTask {
            handle,
            cancel_token,
        });
        self.active.store(true, Ordering::SeqCst);
        info!(
            "accelerometer feed started ({}ms interval)",
            self.interval.as_millis()
        );
    }

    /// Stops polling and waits for the polling task to exit. Does nothing if
    /// not running. No polled sample is delivered after this returns.
    pub async fn stop(&self) -> Result<()> {
        let Some(task) = self.task.lock().await.take() else {
            debug!("accelerometer feed already stopped");
            return Ok(());
        };

        self.active.store(false, Ordering::SeqCst);
        task.cancel_token.cancel();
        task.handle
            .await
            .context("accelerometer feed task failed to join")?;
        info!("accelerometer feed stopped");
        Ok(())
    }
}

impl Drop for SensorFeed {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.cancel_token.cancel();
        }
    }
}
