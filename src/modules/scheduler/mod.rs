use std::{future::Future, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::shared::errors::{AppError, ErrorType};

/// Stops the ticker started by [`start`]. Cycles already running are left alone.
pub struct CancelHandle {
    token: CancellationToken,
    ticker: JoinHandle<()>,
}

impl CancelHandle {
    #[allow(dead_code)]
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[allow(dead_code)]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancels and waits for the ticker task to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.ticker.await {
            log::error!("Poll ticker ended abnormally: {}", e);
        }
    }
}

/// Runs `cycle` right away and then every `period`, fixed-rate.
///
/// Every tick spawns the cycle on its own task without waiting for the previous one,
/// so slow cycles can overlap. A failed cycle is logged and the ticker keeps going.
pub fn start<F, Fut>(cycle: F, period: Duration) -> Result<CancelHandle, AppError>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), AppError>> + Send + 'static,
{
    if period.is_zero() {
        return Err(AppError::new(
            "poll interval must be greater than zero",
            ErrorType::BadRequest,
        ));
    }

    let token = CancellationToken::new();
    let ticker_token = token.clone();

    let ticker = tokio::spawn(async move {
        let mut ticks = interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Burst);
        let mut tick_count: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = ticker_token.cancelled() => break,
                _ = ticks.tick() => {}
            }

            tick_count += 1;
            log::info!("Starting poll cycle #{}", tick_count);
            let run = cycle();
            tokio::spawn(async move {
                match run.await {
                    Ok(()) => log::info!("Poll cycle #{} finished", tick_count),
                    Err(e) => log::error!("Poll cycle #{} failed: {}", tick_count, e),
                }
            });
        }

        log::info!("Poll scheduler stopped after {} cycles", tick_count);
    });

    Ok(CancelHandle { token, ticker })
}
