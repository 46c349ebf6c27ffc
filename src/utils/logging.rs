//! Logger setup for the collector binary.
//!
//! `RUST_LOG` overrides the default `info` level, e.g.
//! `RUST_LOG=motion_collector_lib=trace` to see dropped sensor reads.

use log::LevelFilter;

pub fn init_logging() {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Info);
    builder.parse_default_env();

    // A second init (tests, embedding hosts) keeps the first logger.
    if builder.try_init().is_err() {
        log::debug!("logger already initialized");
    }
}
