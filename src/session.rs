use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Canonical session bucket used to query the weather endpoint.
///
/// The simulator reports many raw session labels (`PRACTICE1`, `QUALIFYING`,
/// `RACEMAIN`, ...). They all collapse into one of these three kinds, and the
/// upper-case name of the kind is what the REST server expects in the weather URL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionKind {
    Practice,
    Qualify,
    #[default]
    Race,
}

const PRACTICE_LABELS: [&str; 4] = ["PRACTICE", "FREEPRACTICE", "PRACTICE1", "PRACTICE2"];
const QUALIFY_LABELS: [&str; 4] = ["QUALIFY", "QUALIFYING", "QUALIFY1", "QUALIFY2"];

impl SessionKind {
    pub const ALL: [SessionKind; 3] = [Self::Practice, Self::Qualify, Self::Race];

    /// Maps a raw session-type label to its kind. Unknown, empty or missing labels are
    /// treated as a race.
    pub fn classify(raw_label: Option<&str>) -> Self {
        let Some(label) = raw_label else {
            return Self::Race;
        };
        let label = label.to_uppercase();

        if PRACTICE_LABELS.contains(&label.as_str()) {
            Self::Practice
        } else if QUALIFY_LABELS.contains(&label.as_str()) {
            Self::Qualify
        } else {
            // RACE, RACEMAIN and anything unrecognised
            Self::Race
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Practice => "PRACTICE",
            Self::Qualify => "QUALIFY",
            Self::Race => "RACE",
        }
    }

    /// Whether a display name from the event schedule belongs to this kind.
    ///
    /// Matching is a case-insensitive containment of the canonical name, so
    /// `"Qualifying 1"` matches `Qualify` and `"Race 2"` matches `Race`.
    pub fn matches_schedule_name(&self, display_name: &str) -> bool {
        if display_name.is_empty() {
            return false;
        }
        display_name.to_uppercase().contains(self.as_str())
    }
}

impl Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
