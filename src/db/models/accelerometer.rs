//! Accelerometer row model.
//!
//! A sample is stamped by the writer when the insert executes, not when the
//! sensor captured it.

use serde::{Deserialize, Serialize};

/// One persisted accelerometer reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerometerSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Seconds since the UNIX epoch at insertion time.
    pub timestamp: f64,
}
