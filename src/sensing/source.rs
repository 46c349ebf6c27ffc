//! The platform boundary polled by the feed.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One 3-axis accelerometer reading, in g.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Acceleration {
    pub const ZERO: Acceleration = Acceleration {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("accelerometer is not available")]
    Unavailable,

    #[error("accelerometer read failed: {0}")]
    ReadFailed(String),

    #[error("invalid sensor configuration: {0}")]
    InvalidConfig(String),
}

/// A hardware (or simulated) accelerometer that can be polled.
pub trait AccelerometerSource: Send {
    fn read(&mut self) -> Result<Acceleration, SensorError>;
}

/// Replays a fixed script of readings. Once the script runs out every read
/// reports [`SensorError::Unavailable`].
///
/// Clones share the script and the read counter, so a test can keep one
/// handle while the feed owns the other.
#[derive(Clone, Default)]
pub struct ScriptedAccelerometer {
    script: Arc<Mutex<VecDeque<Result<Acceleration, SensorError>>>>,
    reads: Arc<AtomicUsize>,
}

impl ScriptedAccelerometer {
    pub fn new<I>(readings: I) -> Self
    where
        I: IntoIterator<Item = Result<Acceleration, SensorError>>,
    {
        Self {
            script: Arc::new(Mutex::new(readings.into_iter().collect())),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn push(&self, reading: Result<Acceleration, SensorError>) {
        let mut script = match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        script.push_back(reading);
    }

    /// Number of times the source has been polled.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl AccelerometerSource for ScriptedAccelerometer {
    fn read(&mut self) -> Result<Acceleration, SensorError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut script = match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        script.pop_front().unwrap_or(Err(SensorError::Unavailable))
    }
}
