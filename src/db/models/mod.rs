pub mod accelerometer;

pub use accelerometer::AccelerometerSample;
