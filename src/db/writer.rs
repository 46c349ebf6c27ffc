use std::{error::Error, sync::Arc};

use chrono::Utc;
use log::{error, trace};
use rusqlite::Connection;
use tokio::sync::watch;

use super::{
    helpers::next_timestamp, repositories::write_sample, AccelerometerSample, StorageError,
    WriteFailurePolicy,
};

/// Connection plus the state the worker thread carries between inserts.
pub(super) struct Writer {
    conn: Connection,
    policy: WriteFailurePolicy,
    last_timestamp: Option<f64>,
    halted: bool,
    faults: watch::Sender<Option<Arc<StorageError>>>,
}

impl Writer {
    pub(super) fn new(
        conn: Connection,
        policy: WriteFailurePolicy,
        faults: watch::Sender<Option<Arc<StorageError>>>,
    ) -> Self {
        Self {
            conn,
            policy,
            last_timestamp: None,
            halted: false,
            faults,
        }
    }

    pub(super) fn connection(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Stamps and writes one sample. The stamp is taken here, on the worker,
    /// so stamps follow execution order.
    pub(super) fn insert(&mut self, x: f64, y: f64, z: f64) {
        if self.halted {
            trace!("writer halted, dropping sample ({x}, {y}, {z})");
            return;
        }

        let sample = AccelerometerSample {
            x,
            y,
            z,
            timestamp: next_timestamp(self.last_timestamp, Utc::now()),
        };

        match write_sample(&self.conn, &sample) {
            Ok(()) => self.last_timestamp = Some(sample.timestamp),
            Err(source) => self.fail(StorageError::Insert(source)),
        }
    }

    fn fail(&mut self, err: StorageError) {
        let detail = err.source().map(|source| source.to_string()).unwrap_or_default();
        match self.policy {
            WriteFailurePolicy::LogAndDrop => {
                error!("{err}: {detail}; sample dropped");
            }
            WriteFailurePolicy::Halt => {
                error!("{err}: {detail}; halting writer");
                self.halted = true;
                self.faults.send_replace(Some(Arc::new(err)));
            }
        }
    }
}
