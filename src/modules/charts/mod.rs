pub mod option;

pub use option::{ChartOption, LineSeries};

use std::sync::{Arc, Mutex, PoisonError};

use crate::modules::{
    aggregator::AggregatedResult,
    publisher::{SubscriptionHandle, UpdatePublisher},
};
use crate::shared::config::ChartConfig;

/// Something a chart can be drawn on.
pub trait ChartSurface: Send + Sync {
    fn set_option(&self, option: ChartOption);
}

struct ChartView {
    title: String,
    aspect: String,
    formatter: String,
    surface: Arc<dyn ChartSurface>,
    // Held from reading the value until it is drawn, so the last draw is the newest value
    drawing: Mutex<()>,
}

impl ChartView {
    fn redraw(&self, publisher: &UpdatePublisher) {
        let _drawing = self.drawing.lock().unwrap_or_else(PoisonError::into_inner);
        self.render(publisher.current().as_deref());
    }

    fn render(&self, result: Option<&AggregatedResult>) {
        let option = match result {
            Some(result) => {
                let series = result
                    .aspect(&self.aspect)
                    .unwrap_or(&[])
                    .iter()
                    .map(LineSeries::from)
                    .collect();
                ChartOption::new(&self.title, &self.formatter, series, false)
            }
            None => ChartOption::new(&self.title, &self.formatter, Vec::new(), true),
        };
        self.surface.set_option(option);
    }
}

/// Keeps one surface in sync with one aspect of the published result.
pub struct ChartBinding {
    view: Arc<ChartView>,
    subscription: Option<SubscriptionHandle>,
}

impl ChartBinding {
    pub fn new(config: &ChartConfig, surface: Arc<dyn ChartSurface>) -> Self {
        Self {
            view: Arc::new(ChartView {
                title: config.title.clone(),
                aspect: config.aspect.clone(),
                formatter: config.formatter.clone(),
                surface,
                drawing: Mutex::new(()),
            }),
            subscription: None,
        }
    }

    pub fn aspect(&self) -> &str {
        &self.view.aspect
    }

    #[allow(dead_code)]
    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Subscribes and draws whatever is already published, or a loading state.
    ///
    /// Subscribing does not replay, so the initial draw pulls the current value.
    /// Mounting twice is a no-op.
    pub fn mount(&mut self, publisher: &Arc<UpdatePublisher>) {
        if self.subscription.is_some() {
            return;
        }

        let view = self.view.clone();
        let weak_publisher = Arc::downgrade(publisher);
        let handle = publisher.subscribe(move || {
            if let Some(publisher) = weak_publisher.upgrade() {
                view.redraw(&publisher);
            }
        });
        self.subscription = Some(handle);
        log::info!("Chart '{}' mounted", self.view.title);

        self.view.redraw(publisher);
    }

    pub fn teardown(&mut self, publisher: &UpdatePublisher) {
        if let Some(handle) = self.subscription.take() {
            publisher.unsubscribe(handle);
            log::info!("Chart '{}' torn down", self.view.title);
        }
    }
}
