pub(crate) mod collector;
pub mod producer;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use collector::collect_telemetry;
pub use producer::{MockTelemetryProducer, TelemetryProducer};

/// The subset of the host's per-tick game data that drives session tracking and
/// the polling gate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryFrame {
    pub point_no: usize,
    /// Whether the host reports a game process at all
    pub game_running: bool,
    pub game_paused: bool,
    pub game_in_menu: bool,
    /// Host identifier of the running game, e.g. `LMU`
    pub game_name: Option<String>,
    /// Raw session label, e.g. `QUALIFYING` or `RACEMAIN`
    pub session_type_name: Option<String>,
    /// Seconds left in the session. Negative values are read as zero.
    pub session_time_left_s: f64,
}

impl TelemetryFrame {
    /// True only while the expected simulation is running, unpaused and on track.
    pub fn should_poll(&self, expected_game: &str) -> bool {
        self.game_running
            && !self.game_paused
            && !self.game_in_menu
            && self
                .game_name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(expected_game))
    }

    pub fn session_time_left(&self) -> Duration {
        Duration::try_from_secs_f64(self.session_time_left_s.max(0.0)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_track() -> TelemetryFrame {
        TelemetryFrame {
            game_running: true,
            game_name: Some("LMU".to_string()),
            session_type_name: Some("RACE".to_string()),
            session_time_left_s: 600.,
            ..TelemetryFrame::default()
        }
    }

    #[test]
    fn test_should_poll_on_track() {
        assert!(on_track().should_poll("LMU"));
        assert!(on_track().should_poll("lmu"));
    }

    #[test]
    fn test_any_failing_condition_stops_polling() {
        let paused = TelemetryFrame {
            game_paused: true,
            ..on_track()
        };
        let in_menu = TelemetryFrame {
            game_in_menu: true,
            ..on_track()
        };
        let not_running = TelemetryFrame {
            game_running: false,
            ..on_track()
        };
        let other_game = TelemetryFrame {
            game_name: Some("IRacing".to_string()),
            ..on_track()
        };
        let unknown_game = TelemetryFrame {
            game_name: None,
            ..on_track()
        };

        for frame in [paused, in_menu, not_running, other_game, unknown_game] {
            assert!(!frame.should_poll("LMU"), "{:?}", frame);
        }
    }

    #[test]
    fn test_session_time_left() {
        assert_eq!(on_track().session_time_left(), Duration::from_secs(600));
        let negative = TelemetryFrame {
            session_time_left_s: -4.,
            ..on_track()
        };
        assert_eq!(negative.session_time_left(), Duration::ZERO);
        let nan = TelemetryFrame {
            session_time_left_s: f64::NAN,
            ..on_track()
        };
        assert_eq!(nan.session_time_left(), Duration::ZERO);
    }

    #[test]
    fn test_frame_deserializes_with_missing_fields() {
        let frame: TelemetryFrame =
            serde_json::from_str(r#"{"game_running": true, "session_type_name": "PRACTICE1"}"#)
                .unwrap();
        assert!(frame.game_running);
        assert_eq!(frame.session_type_name.as_deref(), Some("PRACTICE1"));
        assert_eq!(frame.session_time_left_s, 0.);
    }
}
