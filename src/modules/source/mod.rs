mod http_source;
pub mod models;

pub use http_source::HttpReadingSource;
pub use models::RawReading;

use crate::shared::{errors::AppError, time::Instant};
use std::future::Future;

/// Where an aggregation cycle gets its readings from.
///
/// Implementations issue one request per call, no retry and no caching. Results are
/// expected in ascending timestamp order.
pub trait ReadingSource: Send + Sync {
    fn fetch_readings(
        &self,
        window_start: Instant,
        window_end: Instant,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<RawReading>, AppError>> + Send;
}
