use serde::{Deserialize, Serialize};

use crate::shared::time::Instant;

/// One sensor sample as returned by `/api/readings/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    pub timestamp: Instant,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub battery: Option<f64>,
    #[serde(default)]
    pub rssi: Option<f64>,
}

impl RawReading {
    /// Value of a named aspect. Unknown aspects read as null.
    pub fn value(&self, aspect: &str) -> Option<f64> {
        match aspect {
            "temperature" => self.temperature,
            "humidity" => self.humidity,
            "battery" => self.battery,
            "rssi" => self.rssi,
            _ => None,
        }
    }

    /// Grouping key: device name, then mac, then "unknown".
    pub fn device_key(&self) -> &str {
        self.device_name
            .as_deref()
            .or(self.mac.as_deref())
            .unwrap_or("unknown")
    }
}

// Paginated envelope, only `results` is used
#[derive(Debug, Deserialize)]
pub struct ReadingPage {
    pub results: Vec<RawReading>,
}

// Query string for the readings route
#[derive(Debug, Serialize)]
pub struct ReadingsQuery {
    pub fields: String,
    #[serde(rename = "timestamp__gt")]
    pub timestamp_gt: String,
    #[serde(rename = "timestamp__lt")]
    pub timestamp_lt: String,
    pub ordering: &'static str,
    pub limit: u32,
}
