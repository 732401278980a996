use serde::Serialize;

use crate::modules::aggregator::Series;
use crate::shared::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub orient: &'static str,
    pub bottom: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tooltip {
    pub trigger: &'static str,
    pub axis_pointer: AxisPointer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisPointer {
    pub animation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitLine {
    pub show: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAxis {
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub split_line: SplitLine,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisLabel {
    pub formatter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueAxis {
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub position: &'static str,
    pub split_line: SplitLine,
    pub min: &'static str,
    pub max: &'static str,
    pub axis_label: AxisLabel,
    pub min_interval: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineDatum {
    pub name: String,
    /// `[timestamp, value]`
    pub value: (Instant, Option<f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSeries {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub show_symbol: bool,
    pub data: Vec<LineDatum>,
}

impl From<&Series> for LineSeries {
    fn from(series: &Series) -> Self {
        LineSeries {
            name: series.name.clone(),
            type_: "line",
            show_symbol: false,
            data: series
                .points
                .iter()
                .map(|p| LineDatum {
                    name: p.label.clone(),
                    value: (p.timestamp, p.value),
                })
                .collect(),
        }
    }
}

/// Full option object handed to the charting front end on every redraw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOption {
    pub title: Title,
    pub legend: Legend,
    pub tooltip: Tooltip,
    pub x_axis: TimeAxis,
    pub y_axis: ValueAxis,
    pub series: Vec<LineSeries>,
    /// No data published yet.
    pub loading: bool,
}

impl ChartOption {
    pub fn new(title: &str, formatter: &str, series: Vec<LineSeries>, loading: bool) -> Self {
        ChartOption {
            title: Title {
                text: title.to_string(),
            },
            legend: Legend {
                orient: "horizontal",
                bottom: 5,
            },
            tooltip: Tooltip {
                trigger: "axis",
                axis_pointer: AxisPointer { animation: false },
            },
            x_axis: TimeAxis {
                type_: "time",
                split_line: SplitLine { show: false },
            },
            y_axis: ValueAxis {
                type_: "value",
                position: "right",
                split_line: SplitLine { show: true },
                min: "dataMin",
                max: "dataMax",
                axis_label: AxisLabel {
                    formatter: formatter.to_string(),
                },
                min_interval: 1,
            },
            series,
            loading,
        }
    }
}
