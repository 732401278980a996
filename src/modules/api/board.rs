use futures_channel::mpsc::UnboundedSender;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::modules::charts::{ChartOption, ChartSurface};

pub type Tx = UnboundedSender<String>;

/// Latest option of every chart plus the socket clients watching each one.
#[derive(Default)]
pub struct ChartBoard {
    options: RwLock<BTreeMap<String, ChartOption>>,
    watchers: RwLock<HashMap<String, Vec<Tx>>>,
}

struct BoardSurface {
    board: Arc<ChartBoard>,
    aspect: String,
}

impl ChartSurface for BoardSurface {
    fn set_option(&self, option: ChartOption) {
        self.board.store(&self.aspect, option);
    }
}

impl ChartBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface that draws into this board under `aspect`.
    pub fn surface(self: &Arc<Self>, aspect: &str) -> Arc<dyn ChartSurface> {
        Arc::new(BoardSurface {
            board: self.clone(),
            aspect: aspect.to_string(),
        })
    }

    pub fn option(&self, aspect: &str) -> Option<ChartOption> {
        self.options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(aspect)
            .cloned()
    }

    pub fn aspects(&self) -> Vec<String> {
        self.options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Registers a client and sends it the current option, if any.
    pub fn add_watcher(&self, aspect: &str, tx: Tx) {
        let mut watchers = self.watchers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(option) = self.option(aspect) {
            if let Some(json) = to_json(&option) {
                if tx.unbounded_send(json).is_err() {
                    return;
                }
            }
        }
        watchers.entry(aspect.to_string()).or_default().push(tx);
    }

    #[allow(dead_code)]
    pub fn watcher_count(&self, aspect: &str) -> usize {
        self.watchers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(aspect)
            .map_or(0, Vec::len)
    }

    fn store(&self, aspect: &str, option: ChartOption) {
        let json = to_json(&option);
        self.options
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(aspect.to_string(), option);

        let Some(json) = json else { return };
        let mut watchers = self.watchers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(clients) = watchers.get_mut(aspect) {
            clients.retain(|client| match client.unbounded_send(json.clone()) {
                Ok(()) => true,
                Err(_) => {
                    log::info!("Dropping disconnected watcher of '{}'", aspect);
                    false
                }
            });
            if clients.is_empty() {
                watchers.remove(aspect);
            }
        }
    }
}

fn to_json(option: &ChartOption) -> Option<String> {
    match serde_json::to_string(option) {
        Ok(json) => Some(json),
        Err(e) => {
            log::error!("Failed to serialize chart option: {}", e);
            None
        }
    }
}
