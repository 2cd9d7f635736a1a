use std::{
    fmt::Display,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::session::SessionKind;

/// Elapsed-time marker within the current session.
///
/// The weather server forecasts conditions at these five points, and the current
/// node is derived from how much of the session has elapsed.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CheckpointNode {
    #[default]
    #[serde(rename = "START")]
    Start,
    #[serde(rename = "NODE_25")]
    Node25,
    #[serde(rename = "NODE_50")]
    Node50,
    #[serde(rename = "NODE_75")]
    Node75,
    #[serde(rename = "FINISH")]
    Finish,
}

impl CheckpointNode {
    pub const ALL: [CheckpointNode; 5] = [
        Self::Start,
        Self::Node25,
        Self::Node50,
        Self::Node75,
        Self::Finish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Node25 => "NODE_25",
            Self::Node50 => "NODE_50",
            Self::Node75 => "NODE_75",
            Self::Finish => "FINISH",
        }
    }

    /// Looks up a node by its wire name (`START`, `NODE_25`, ..., `FINISH`).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|node| node.as_str() == name)
    }

    /// Fraction of the session at which this node begins. `START` has no upcoming
    /// start so it yields `None`.
    pub fn start_fraction(&self) -> Option<f64> {
        match self {
            Self::Start => None,
            Self::Node25 => Some(0.25),
            Self::Node50 => Some(0.5),
            Self::Node75 => Some(0.75),
            Self::Finish => Some(1.0),
        }
    }
}

impl Display for CheckpointNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps the elapsed share of the session to a checkpoint node.
///
/// Buckets are half-open and left-inclusive: a progress of exactly 0.25 is already
/// `NODE_25`. An unknown session length (`total_minutes <= 0`) always maps to `START`.
pub fn current_node(total_minutes: i32, time_left: Duration) -> CheckpointNode {
    if total_minutes <= 0 {
        return CheckpointNode::Start;
    }

    let total_seconds = f64::from(total_minutes) * 60.0;
    let elapsed_seconds = (total_seconds - time_left.as_secs_f64()).clamp(0.0, total_seconds);
    let progress = elapsed_seconds / total_seconds;

    if progress < 0.25 {
        CheckpointNode::Start
    } else if progress < 0.5 {
        CheckpointNode::Node25
    } else if progress < 0.75 {
        CheckpointNode::Node50
    } else if progress < 1.0 {
        CheckpointNode::Node75
    } else {
        CheckpointNode::Finish
    }
}

/// Minutes until `node` begins, estimated from the last sampled time left.
///
/// Never negative. Returns 0 for `START`, for an unknown session length and when no
/// time-left sample is available yet.
pub fn time_until(node: CheckpointNode, total_minutes: i32, time_left_minutes: f64) -> f64 {
    let Some(fraction) = node.start_fraction() else {
        return 0.0;
    };
    if total_minutes <= 0 || time_left_minutes <= 0.0 {
        return 0.0;
    }

    let total = f64::from(total_minutes);
    let elapsed = total - time_left_minutes;
    let target = total * fraction;
    (target - elapsed).max(0.0)
}

/// Session state derived from the last telemetry tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SessionSample {
    pub kind: SessionKind,
    pub total_minutes: i32,
    pub time_left: Duration,
    pub node: CheckpointNode,
}

impl SessionSample {
    pub fn new(kind: SessionKind, total_minutes: i32, time_left: Duration) -> Self {
        Self {
            kind,
            total_minutes,
            time_left,
            node: current_node(total_minutes, time_left),
        }
    }

    pub fn time_until(&self, node: CheckpointNode) -> f64 {
        time_until(node, self.total_minutes, self.time_left.as_secs_f64() / 60.0)
    }
}

/// Holds the sample written by the telemetry tick and read by the resolver and the
/// polling engine.
#[derive(Debug, Default)]
pub struct SessionTracker {
    sample: RwLock<SessionSample>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the current node and publishes the new sample. Returns the previous one.
    pub fn update(&self, kind: SessionKind, total_minutes: i32, time_left: Duration) -> SessionSample {
        let sample = SessionSample::new(kind, total_minutes, time_left);
        let mut guard = self.sample.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, sample)
    }

    pub fn sample(&self) -> SessionSample {
        *self.sample.read().unwrap_or_else(PoisonError::into_inner)
    }
}
