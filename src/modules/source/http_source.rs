use chrono::SecondsFormat;
use reqwest::header::ACCEPT;
use std::time::Duration;

use super::models::{RawReading, ReadingPage, ReadingsQuery};
use super::ReadingSource;
use crate::shared::{
    config::{PayloadFormat, SourceConfig},
    errors::{AppError, ErrorType},
    time::Instant,
};

const IDENTITY_FIELDS: [&str; 3] = ["device_name", "mac", "timestamp"];

impl PayloadFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            PayloadFormat::Json => "application/json",
            PayloadFormat::Msgpack => "application/msgpack",
        }
    }

    pub fn decode_page(&self, body: &[u8]) -> Result<ReadingPage, AppError> {
        let page = match self {
            PayloadFormat::Json => serde_json::from_slice(body)?,
            PayloadFormat::Msgpack => rmp_serde::from_slice(body)?,
        };
        Ok(page)
    }
}

/// Reads from the sensors REST API.
pub struct HttpReadingSource {
    client: reqwest::Client,
    base_url: String,
    format: PayloadFormat,
    fields: String,
}

impl HttpReadingSource {
    pub fn new(config: &SourceConfig, aspects: &[String]) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                AppError::new(
                    &format!("could not build http client: {}", e),
                    ErrorType::Internal,
                )
            })?;

        let fields = IDENTITY_FIELDS
            .iter()
            .map(|f| f.to_string())
            .chain(aspects.iter().cloned())
            .collect::<Vec<_>>()
            .join(",");

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            format: config.payload_format,
            fields,
        })
    }

    fn readings_url(
        &self,
        window_start: Instant,
        window_end: Instant,
        limit: u32,
    ) -> Result<String, AppError> {
        let query = ReadingsQuery {
            fields: self.fields.clone(),
            timestamp_gt: window_start.to_rfc3339_opts(SecondsFormat::Millis, true),
            timestamp_lt: window_end.to_rfc3339_opts(SecondsFormat::Millis, true),
            ordering: "timestamp",
            limit,
        };

        Ok(format!(
            "{}/api/readings/?{}",
            self.base_url,
            serde_qs::to_string(&query)?
        ))
    }
}

impl ReadingSource for HttpReadingSource {
    async fn fetch_readings(
        &self,
        window_start: Instant,
        window_end: Instant,
        limit: u32,
    ) -> Result<Vec<RawReading>, AppError> {
        if window_start >= window_end {
            return Err(AppError::new(
                "window start must be before window end",
                ErrorType::BadRequest,
            ));
        }
        if limit == 0 {
            return Err(AppError::new(
                "record limit must be greater than zero",
                ErrorType::BadRequest,
            ));
        }

        let url = self.readings_url(window_start, window_end, limit)?;
        log::debug!("Fetching readings from {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, self.format.mime())
            .send()
            .await
            .map_err(|e| {
                AppError::new(
                    &format!("request to readings endpoint failed: {}", e),
                    ErrorType::Transport,
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::new(
                &format!("readings endpoint answered {}", status),
                ErrorType::Transport,
            ));
        }

        let body = response.bytes().await?;
        let page = self.format.decode_page(&body)?;
        log::debug!("Received {} readings", page.results.len());

        Ok(page.results)
    }
}
