use chrono::{DateTime, Utc};
use std::time::Duration;

pub type Instant = DateTime<Utc>;

/// Leaves the timestamp untouched.
pub fn exact(ts: Instant) -> Instant {
    ts
}

/// Rounds `ts` to the nearest multiple of `granularity` since the Unix epoch,
/// halfway values rounding up. A zero granularity returns `ts` unchanged.
pub fn round_to_granularity(ts: Instant, granularity: Duration) -> Instant {
    let step = granularity.as_millis() as i64;
    if step <= 0 {
        return ts;
    }

    let millis = ts.timestamp_millis();
    let rounded = (millis + step / 2).div_euclid(step) * step;
    DateTime::from_timestamp_millis(rounded).unwrap_or(ts)
}

/// Builds the bucketing function for a configured granularity.
pub fn quantizer(granularity: Duration) -> impl Fn(Instant) -> Instant + Send + Sync + Clone {
    move |ts| {
        if granularity.is_zero() {
            exact(ts)
        } else {
            round_to_granularity(ts, granularity)
        }
    }
}
