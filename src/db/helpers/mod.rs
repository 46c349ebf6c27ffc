use chrono::{DateTime, Utc};

/// Seconds since the UNIX epoch with microsecond resolution.
pub fn unix_seconds(now: DateTime<Utc>) -> f64 {
    now.timestamp_micros() as f64 / 1_000_000.0
}

/// Wall-clock stamp that never falls below the previous one.
pub fn next_timestamp(previous: Option<f64>, now: DateTime<Utc>) -> f64 {
    let stamp = unix_seconds(now);
    match previous {
        Some(last) if last > stamp => last,
        _ => stamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn converts_to_fractional_seconds() {
        let now = Utc.timestamp_opt(1_700_000_000, 250_000_000).unwrap();
        assert_eq!(unix_seconds(now), 1_700_000_000.25);
    }

    #[test]
    fn clock_stepping_backwards_keeps_previous_stamp() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let first = next_timestamp(None, now);
        let second = next_timestamp(Some(first), now - Duration::seconds(3));
        assert_eq!(second, first);

        let third = next_timestamp(Some(second), now + Duration::milliseconds(10));
        assert!(third > second);
    }
}
