use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use log::{info, trace};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{
    publisher::Publisher,
    source::{Acceleration, AccelerometerSource},
};

/// State shared between the feed handle and its polling task.
pub(super) struct FeedShared {
    source: Mutex<Box<dyn AccelerometerSource>>,
    pub(super) publisher: Publisher<Acceleration>,
    dropped_reads: AtomicU64,
}

impl FeedShared {
    pub(super) fn new(source: Box<dyn AccelerometerSource>) -> Self {
        Self {
            source: Mutex::new(source),
            publisher: Publisher::new(),
            dropped_reads: AtomicU64::new(0),
        }
    }

    pub(super) fn dropped_reads(&self) -> u64 {
        self.dropped_reads.load(Ordering::Relaxed)
    }

    /// Reads the source once and hands a good reading to every listener.
    /// Read errors are counted and otherwise swallowed.
    pub(super) fn poll(&self) {
        let reading = {
            let mut source = match self.source.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            source.read()
        };

        match reading {
            Ok(sample) => self.publisher.notify(sample),
            Err(err) => {
                let dropped = self.dropped_reads.fetch_add(1, Ordering::Relaxed) + 1;
                trace!("accelerometer read dropped ({dropped} so far): {err}");
            }
        }
    }
}

pub(super) async fn feed_loop(
    shared: Arc<FeedShared>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                info!("accelerometer feed loop shutting down");
                break;
            }
            _ = ticker.tick() => shared.poll(),
        }
    }
}
