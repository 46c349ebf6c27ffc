mod feed;
mod loop_worker;
mod publisher;
mod simulated;
mod source;

pub use feed::{SensorFeed, DEFAULT_SAMPLE_INTERVAL};
pub use publisher::{Publisher, PublisherError};
pub use simulated::SimulatedAccelerometer;
pub use source::{Acceleration, AccelerometerSource, ScriptedAccelerometer, SensorError};
