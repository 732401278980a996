use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::errors::{AppError, ErrorType};

/// Longest history a cycle may ask for: ten years.
pub const MAX_LOOKBACK_SECS: u64 = 10 * 366 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Configs {
    pub source: SourceConfig,
    pub polling: PollingConfig,
    pub aggregation: AggregationConfig,
    pub server: ServerConfig,
    pub charts: Vec<ChartConfig>,
}

impl Configs {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let config_content = fs::read_to_string(&path)?;
        let configs: Configs = toml::from_str(&config_content)?;
        configs.validate()?;
        Ok(configs)
    }

    /// Loads the file named by `CHARTS_CONFIG`, or the built-in defaults when unset.
    pub fn from_env() -> Result<Self, AppError> {
        match std::env::var("CHARTS_CONFIG") {
            Ok(path) => Self::load_from_file(path),
            Err(_) => {
                log::info!("CHARTS_CONFIG not set, using default configuration");
                let configs = Configs::default();
                configs.validate()?;
                Ok(configs)
            }
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |msg: String| Err(AppError::new(&msg, ErrorType::Config));

        if self.polling.record_limit == 0 {
            return invalid("polling.record_limit must be greater than zero".into());
        }
        if self.polling.interval_secs == 0 {
            return invalid("polling.interval_secs must be greater than zero".into());
        }
        if self.polling.lookback_secs == 0 {
            return invalid("polling.lookback_secs must be greater than zero".into());
        }
        if self.polling.lookback_secs > MAX_LOOKBACK_SECS
            || self.polling.try_lookback().is_none()
        {
            return invalid(format!(
                "polling.lookback_secs must not exceed {}",
                MAX_LOOKBACK_SECS
            ));
        }
        if self.aggregation.aspects.is_empty() {
            return invalid("aggregation.aspects must not be empty".into());
        }
        for gate in &self.aggregation.require_non_null {
            if !self.aggregation.aspects.contains(gate) {
                return invalid(format!(
                    "aggregation.require_non_null names '{}' which is not a tracked aspect",
                    gate
                ));
            }
        }
        for chart in &self.charts {
            if !self.aggregation.aspects.contains(&chart.aspect) {
                return invalid(format!(
                    "chart '{}' renders untracked aspect '{}'",
                    chart.title, chart.aspect
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    Json,
    #[default]
    Msgpack,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub payload_format: PayloadFormat,
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://127.0.0.1:8000"),
            payload_format: PayloadFormat::Msgpack,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub lookback_secs: u64,
    pub record_limit: u32,
    pub interval_secs: u64,
    /// 0 keeps exact timestamps.
    pub quantization_secs: u64,
}

impl PollingConfig {
    /// `None` when the lookback does not fit a `chrono::Duration`.
    pub fn try_lookback(&self) -> Option<chrono::Duration> {
        i64::try_from(self.lookback_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }

    /// Saturates at `chrono::Duration::MAX`; `validate` rejects such values.
    pub fn lookback(&self) -> chrono::Duration {
        self.try_lookback().unwrap_or(chrono::Duration::MAX)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn quantization(&self) -> Duration {
        Duration::from_secs(self.quantization_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            lookback_secs: 24 * 60 * 60,
            record_limit: 2000,
            interval_secs: 300,
            quantization_secs: 60,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AggregationConfig {
    pub aspects: Vec<String>,
    pub require_non_null: Vec<String>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            aspects: vec![String::from("temperature"), String::from("humidity")],
            require_non_null: vec![String::from("temperature")],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("0.0.0.0:3030"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChartConfig {
    pub title: String,
    pub aspect: String,
    pub formatter: String,
}

/// Charts used when the file does not declare any.
pub fn default_charts() -> Vec<ChartConfig> {
    vec![
        ChartConfig {
            title: String::from("Temperature"),
            aspect: String::from("temperature"),
            formatter: String::from("{value}°C"),
        },
        ChartConfig {
            title: String::from("Humidity"),
            aspect: String::from("humidity"),
            formatter: String::from("{value}%"),
        },
    ]
}
