use chrono::Utc;
use std::{sync::Arc, time::Duration};

use crate::modules::{
    aggregator::{aggregate, AggregationPolicy},
    publisher::{Generation, UpdatePublisher},
    scheduler::{self, CancelHandle},
    source::ReadingSource,
};
use crate::shared::{
    config::PollingConfig,
    errors::{AppError, ErrorType},
    time::quantizer,
};

/// One `fetch -> aggregate -> publish` pipeline over a reading source.
pub struct ChartFeed<S> {
    source: S,
    policy: AggregationPolicy,
    publisher: Arc<UpdatePublisher>,
    lookback: chrono::Duration,
    record_limit: u32,
    quantization: Duration,
}

impl<S> ChartFeed<S>
where
    S: ReadingSource + 'static,
{
    pub fn new(
        source: S,
        policy: AggregationPolicy,
        polling: &PollingConfig,
        publisher: Arc<UpdatePublisher>,
    ) -> Self {
        Self {
            source,
            policy,
            publisher,
            lookback: polling.lookback(),
            record_limit: polling.record_limit,
            quantization: polling.quantization(),
        }
    }

    /// Runs one cycle tagged with `generation`.
    ///
    /// Returns `Ok(false)` when the result was superseded by a newer cycle before it
    /// could be published. On error nothing is published and the previous result stays.
    pub async fn run_cycle(&self, generation: Generation) -> Result<bool, AppError> {
        let window_end = Utc::now();
        let window_start = window_end
            .checked_sub_signed(self.lookback)
            .ok_or_else(|| {
                AppError::new(
                    &format!(
                        "lookback of {}s reaches before the calendar range",
                        self.lookback.num_seconds()
                    ),
                    ErrorType::Config,
                )
            })?;

        let readings = self
            .source
            .fetch_readings(window_start, window_end, self.record_limit)
            .await?;

        let result = aggregate(&readings, &self.policy, quantizer(self.quantization));
        log::info!(
            "Cycle {:?}: {} readings aggregated into {} devices",
            generation,
            readings.len(),
            result.device_count()
        );

        Ok(self.publisher.publish(generation, result))
    }

    /// Starts polling every `period`. Each tick takes its generation when dispatched.
    pub fn start(self: Arc<Self>, period: Duration) -> Result<CancelHandle, AppError> {
        scheduler::start(
            move || {
                let feed = self.clone();
                let generation = feed.publisher.begin_cycle();
                async move { feed.run_cycle(generation).await.map(|_| ()) }
            },
            period,
        )
    }
}
