mod accelerometer;

pub(super) use accelerometer::write_sample;
