mod logger;
mod modules;
mod shared;

use modules::{
    aggregator::AggregationPolicy,
    api::{start_api, ChartBoard},
    charts::ChartBinding,
    feed::ChartFeed,
    publisher::UpdatePublisher,
    source::HttpReadingSource,
};
use shared::{
    config::{default_charts, Configs},
    errors::{AppError, ErrorType},
};
use std::{net::SocketAddr, sync::Arc};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    logger::start_log();

    let mut configs = Configs::from_env()?;
    if configs.charts.is_empty() {
        configs.charts = default_charts()
            .into_iter()
            .filter(|chart| configs.aggregation.aspects.contains(&chart.aspect))
            .collect();
    }
    log::info!("Configurations loaded");

    let address: SocketAddr = configs.server.address.parse().map_err(|e| {
        AppError::new(
            &format!("invalid server.address '{}': {}", configs.server.address, e),
            ErrorType::Config,
        )
    })?;

    let publisher = Arc::new(UpdatePublisher::new());
    let board = Arc::new(ChartBoard::new());

    let mut bindings: Vec<ChartBinding> = configs
        .charts
        .iter()
        .map(|chart| ChartBinding::new(chart, board.surface(&chart.aspect)))
        .collect();
    for binding in &mut bindings {
        binding.mount(&publisher);
        log::info!("Serving chart '{}' at /api/charts/{}", binding.aspect(), binding.aspect());
    }

    let source = HttpReadingSource::new(&configs.source, &configs.aggregation.aspects)?;
    let feed = Arc::new(ChartFeed::new(
        source,
        AggregationPolicy::from(&configs.aggregation),
        &configs.polling,
        publisher.clone(),
    ));
    let poller = feed.start(configs.polling.interval())?;
    log::info!(
        "Polling {} every {}s",
        configs.source.base_url,
        configs.polling.interval_secs
    );

    let api = start_api(board, address);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => log::info!("Shutdown requested"),
        res = api => {
            if let Err(e) = res {
                log::error!("Chart API stopped: {}", e);
            }
        }
    }

    poller.shutdown().await;
    for binding in &mut bindings {
        binding.teardown(&publisher);
    }

    Ok(())
}
