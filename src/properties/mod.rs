// Property naming scheme exposed to the dashboard host

pub mod resolver;

use std::collections::BTreeMap;

use itertools::iproduct;
use serde::{Deserialize, Serialize};

use crate::{progress::CheckpointNode, session::SessionKind, weather::MetricId};

pub use resolver::PropertyResolver;

pub const STRING_SUFFIX: &str = "Str";
pub const SESSION_LENGTH: &str = "CurrentSessionLengthMinutes";
pub const NODE_DURATION: &str = "CurrentNodeDurationMinutes";
pub const CURRENT_NODE_NAME: &str = "CurrentNodeName";
pub const TIME_UNTIL_PREFIX: &str = "TimeUntil_";
pub const CURRENT_NODE_PREFIX: &str = "CURRENTNODE_";

/// Which representation of a metric a property asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Number,
    Text,
}

impl ValueKind {
    /// Names ending in `Str` ask for the string representation.
    pub fn of(name: &str) -> Self {
        if name.ends_with(STRING_SUFFIX) {
            Self::Text
        } else {
            Self::Number
        }
    }

    pub fn default_value(&self) -> PropertyValue {
        match self {
            Self::Number => PropertyValue::Number(0.0),
            Self::Text => PropertyValue::Text(String::new()),
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Self::Number => "",
            Self::Text => STRING_SUFFIX,
        }
    }
}

/// A property name parsed once into what it denotes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyRequest {
    SessionLength,
    NodeDuration,
    CurrentNodeName,
    TimeUntil(CheckpointNode),
    CurrentNodeMetric(MetricId, ValueKind),
    NodeMetric(CheckpointNode, MetricId, ValueKind),
    /// Anything that does not name a known node and metric; always resolves to the
    /// default for its value kind.
    Unknown(ValueKind),
}

impl PropertyRequest {
    pub fn parse(name: &str) -> Self {
        let kind = ValueKind::of(name);
        match name {
            SESSION_LENGTH => return Self::SessionLength,
            NODE_DURATION => return Self::NodeDuration,
            CURRENT_NODE_NAME => return Self::CurrentNodeName,
            _ => {}
        }

        if let Some(node) = name.strip_prefix(TIME_UNTIL_PREFIX) {
            return match CheckpointNode::from_name(node) {
                Some(node) => Self::TimeUntil(node),
                None => Self::Unknown(kind),
            };
        }

        let clean_name = name.strip_suffix(STRING_SUFFIX).unwrap_or(name);

        if let Some(metric) = clean_name.strip_prefix(CURRENT_NODE_PREFIX) {
            return match MetricId::from_name(metric) {
                Some(metric) => Self::CurrentNodeMetric(metric, kind),
                None => Self::Unknown(kind),
            };
        }

        let Some((node, metric)) = split_node_metric(clean_name) else {
            return Self::Unknown(kind);
        };
        match (CheckpointNode::from_name(node), MetricId::from_name(metric)) {
            (Some(node), Some(metric)) => Self::NodeMetric(node, metric, kind),
            _ => Self::Unknown(kind),
        }
    }

    pub fn value_kind(&self) -> ValueKind {
        match self {
            Self::CurrentNodeName => ValueKind::Text,
            Self::SessionLength | Self::NodeDuration | Self::TimeUntil(_) => ValueKind::Number,
            Self::CurrentNodeMetric(_, kind)
            | Self::NodeMetric(_, _, kind)
            | Self::Unknown(kind) => *kind,
        }
    }
}

/// Splits `NODE_25_WNV_SKY` into (`NODE_25`, `WNV_SKY`) and `START_WNV_SKY` into
/// (`START`, `WNV_SKY`).
fn split_node_metric(name: &str) -> Option<(&str, &str)> {
    let (first, rest) = name.split_once('_')?;
    if first == "NODE" {
        if let Some((number, metric)) = rest.split_once('_') {
            if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
                let node = &name[..first.len() + 1 + number.len()];
                return Some((node, metric));
            }
        }
    }
    Some((first, rest))
}

/// Typed value handed to the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Number(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

/// Host-side registration of the property table.
///
/// Hosts want every property declared before the first read and refuse additions
/// afterwards, so registration happens once with the complete table.
pub trait PropertyRegistry {
    fn attach(&mut self, name: &str, request: PropertyRequest);
}

impl PropertyRegistry for BTreeMap<String, PropertyRequest> {
    fn attach(&mut self, name: &str, request: PropertyRequest) {
        self.insert(name.to_string(), request);
    }
}

/// Every property name the plugin exposes, paired with its parsed request.
pub fn registered_properties() -> Vec<(String, PropertyRequest)> {
    let node_metrics = iproduct!(
        CheckpointNode::ALL,
        MetricId::ALL,
        [ValueKind::Number, ValueKind::Text]
    )
    .map(|(node, metric, kind)| {
        (
            format!("{}_{}{}", node, metric, kind.suffix()),
            PropertyRequest::NodeMetric(node, metric, kind),
        )
    });

    let session = [
        (SESSION_LENGTH.to_string(), PropertyRequest::SessionLength),
        (NODE_DURATION.to_string(), PropertyRequest::NodeDuration),
        (CURRENT_NODE_NAME.to_string(), PropertyRequest::CurrentNodeName),
    ];

    let current_node = iproduct!(MetricId::ALL, [ValueKind::Number, ValueKind::Text]).map(
        |(metric, kind)| {
            (
                format!("{}{}{}", CURRENT_NODE_PREFIX, metric, kind.suffix()),
                PropertyRequest::CurrentNodeMetric(metric, kind),
            )
        },
    );

    let time_until = CheckpointNode::ALL
        .into_iter()
        .filter(|node| node.start_fraction().is_some())
        .map(|node| {
            (
                format!("{}{}", TIME_UNTIL_PREFIX, node),
                PropertyRequest::TimeUntil(node),
            )
        });

    node_metrics
        .chain(session)
        .chain(current_node)
        .chain(time_until)
        .collect()
}

/// Resolved values of every registered property at one point in time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDump {
    pub session_kind: SessionKind,
    pub current_node: CheckpointNode,
    pub values: BTreeMap<String, PropertyValue>,
}
