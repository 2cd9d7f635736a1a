// Weather and schedule documents returned by the simulation REST server

pub mod client;
pub mod store;

use std::{collections::HashMap, fmt::Display};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{errors::LmuWeatherError, progress::CheckpointNode, session::SessionKind};

pub use client::{RestWeatherSource, WeatherSource};
pub use store::WeatherSnapshotStore;

/// Weather metrics forecast by the server at every checkpoint node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricId {
    #[serde(rename = "WNV_TEMPERATURE")]
    Temperature,
    #[serde(rename = "WNV_WINDDIRECTION")]
    WindDirection,
    #[serde(rename = "WNV_RAIN_CHANCE")]
    RainChance,
    #[serde(rename = "WNV_WINDSPEED")]
    WindSpeed,
    #[serde(rename = "WNV_STARTTIME")]
    StartTime,
    #[serde(rename = "WNV_SKY")]
    Sky,
    #[serde(rename = "WNV_DURATION")]
    Duration,
    #[serde(rename = "WNV_HUMIDITY")]
    Humidity,
}

impl MetricId {
    pub const ALL: [MetricId; 8] = [
        Self::Temperature,
        Self::WindDirection,
        Self::RainChance,
        Self::WindSpeed,
        Self::StartTime,
        Self::Sky,
        Self::Duration,
        Self::Humidity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "WNV_TEMPERATURE",
            Self::WindDirection => "WNV_WINDDIRECTION",
            Self::RainChance => "WNV_RAIN_CHANCE",
            Self::WindSpeed => "WNV_WINDSPEED",
            Self::StartTime => "WNV_STARTTIME",
            Self::Sky => "WNV_SKY",
            Self::Duration => "WNV_DURATION",
            Self::Humidity => "WNV_HUMIDITY",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|metric| metric.as_str() == name)
    }
}

impl Display for MetricId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Both representations the server sends for a metric. Either may be null.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub current_value: Option<f64>,
    pub string_value: Option<String>,
}

impl MetricValue {
    pub fn new(current_value: f64, string_value: impl Into<String>) -> Self {
        Self {
            current_value: Some(current_value),
            string_value: Some(string_value.into()),
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            current_value: object.get("currentValue").and_then(coerce_f64),
            string_value: object.get("stringValue").and_then(coerce_string),
        })
    }
}

/// Reads a number, or a string holding one. Anything else is absent.
fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a string, stringifying numbers and booleans. Null, arrays and objects are
/// absent.
fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Immutable per-node forecast produced by one successful weather fetch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    nodes: HashMap<CheckpointNode, HashMap<MetricId, MetricValue>>,
}

impl WeatherSnapshot {
    pub fn new(nodes: HashMap<CheckpointNode, HashMap<MetricId, MetricValue>>) -> Self {
        Self { nodes }
    }

    /// Builds a snapshot from the weather endpoint's JSON body.
    ///
    /// Unknown nodes and metrics are skipped, as are entries that are not JSON
    /// objects. Only a body that is not an object at all is an error.
    pub fn from_json(url: &str, body: &Value) -> Result<Self, LmuWeatherError> {
        let root = body.as_object().ok_or(LmuWeatherError::MissingField {
            url: url.to_string(),
            field: "<weather nodes>".to_string(),
        })?;

        let mut nodes = HashMap::new();
        for (node_name, metrics) in root {
            let Some(node) = CheckpointNode::from_name(node_name) else {
                debug!("Ignoring unknown weather node '{}'", node_name);
                continue;
            };
            let Some(metrics) = metrics.as_object() else {
                continue;
            };

            let values: HashMap<MetricId, MetricValue> = metrics
                .iter()
                .filter_map(|(metric_name, value)| {
                    let metric = MetricId::from_name(metric_name)?;
                    MetricValue::from_json(value).map(|value| (metric, value))
                })
                .collect();
            nodes.insert(node, values);
        }

        Ok(Self { nodes })
    }

    pub fn metric(&self, node: CheckpointNode, metric: MetricId) -> Option<&MetricValue> {
        self.nodes.get(&node)?.get(&metric)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// One entry of the event schedule.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionScheduleEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "lengthTime")]
    pub length_time: Option<f64>,
}

impl SessionScheduleEntry {
    pub fn new(name: impl Into<String>, length_minutes: i32) -> Self {
        Self {
            name: Some(name.into()),
            length_time: Some(f64::from(length_minutes)),
        }
    }

    pub fn length_minutes(&self) -> i32 {
        // saturating float to int conversion, NaN becomes 0
        self.length_time.map(|length| length as i32).unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct SessionsInfo {
    #[serde(default, rename = "scheduledSessions")]
    scheduled_sessions: Option<Vec<Value>>,
}

/// Parses the schedule endpoint's JSON body into its entries.
///
/// Every object in `scheduledSessions` yields an entry, in order, so the first name
/// match is never skipped over. Fields are coerced like metric values: a numeric
/// string length is read as a number and an unreadable one as absent.
pub fn parse_schedule(url: &str, body: &Value) -> Result<Vec<SessionScheduleEntry>, LmuWeatherError> {
    let info: SessionsInfo =
        serde_json::from_value(body.clone()).map_err(|e| LmuWeatherError::Parse {
            url: url.to_string(),
            source: e,
        })?;
    let sessions = info
        .scheduled_sessions
        .ok_or(LmuWeatherError::MissingField {
            url: url.to_string(),
            field: "scheduledSessions".to_string(),
        })?;

    Ok(sessions
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| SessionScheduleEntry {
            name: entry.get("name").and_then(coerce_string),
            length_time: entry.get("lengthTime").and_then(coerce_f64),
        })
        .collect())
}

/// Length of the first scheduled session that belongs to `kind`.
pub fn first_matching_length(kind: SessionKind, entries: &[SessionScheduleEntry]) -> Option<i32> {
    entries
        .iter()
        .find(|entry| {
            entry
                .name
                .as_deref()
                .is_some_and(|name| kind.matches_schedule_name(name))
        })
        .map(SessionScheduleEntry::length_minutes)
}
