use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::shared::{config::AggregationConfig, time::Instant};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub timestamp: Instant,
    pub value: Option<f64>,
}

/// All points of one device for one aspect, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

/// Series lists keyed by aspect, each list sorted by device name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatedResult {
    pub aspects: BTreeMap<String, Vec<Series>>,
}

impl AggregatedResult {
    pub fn aspect(&self, aspect: &str) -> Option<&[Series]> {
        self.aspects.get(aspect).map(Vec::as_slice)
    }

    pub fn device_count(&self) -> usize {
        self.aspects.values().map(Vec::len).max().unwrap_or(0)
    }
}

/// Which aspects to build and which of them gate a reading.
///
/// A reading missing any `require_non_null` aspect is dropped from every aspect,
/// not only from the gating one.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationPolicy {
    aspects: Vec<String>,
    require_non_null: Vec<String>,
}

impl AggregationPolicy {
    pub fn new<A, R>(aspects: A, require_non_null: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for aspect in aspects.into_iter().map(Into::into) {
            if !unique.contains(&aspect) {
                unique.push(aspect);
            }
        }

        Self {
            aspects: unique,
            require_non_null: require_non_null.into_iter().map(Into::into).collect(),
        }
    }

    pub fn aspects(&self) -> &[String] {
        &self.aspects
    }

    pub fn require_non_null(&self) -> &[String] {
        &self.require_non_null
    }
}

impl From<&AggregationConfig> for AggregationPolicy {
    fn from(config: &AggregationConfig) -> Self {
        AggregationPolicy::new(
            config.aspects.iter().cloned(),
            config.require_non_null.iter().cloned(),
        )
    }
}
