use std::{thread, time::Duration};

use log::{debug, info};

use crate::{LmuWeatherError, plugin::WeatherPlugin, weather::WeatherSource};

use super::producer::TelemetryProducer;

/// Feeds frames from `producer` into the plugin's telemetry handler every
/// `refresh_rate` until the producer fails or runs out of frames.
pub fn collect_telemetry<S: WeatherSource + 'static>(
    mut producer: impl TelemetryProducer,
    plugin: &WeatherPlugin<S>,
    refresh_rate: Duration,
) -> Result<usize, LmuWeatherError> {
    producer.start()?;

    let mut frames = 0;
    loop {
        thread::sleep(refresh_rate);
        let frame = match producer.telemetry() {
            Ok(frame) => frame,
            Err(LmuWeatherError::TelemetryProducerError { description }) if frames > 0 => {
                info!("Telemetry feed ended after {} frames: {}", frames, description);
                return Ok(frames);
            }
            Err(e) => return Err(e),
        };

        let state = plugin.data_update(&frame);
        frames += 1;
        if frames % 100 == 0 {
            debug!("Processed telemetry frame #{} (polling {:?})", frame.point_no, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        poller::PollerState,
        progress::CheckpointNode,
        session::SessionKind,
        telemetry::{MockTelemetryProducer, TelemetryFrame},
        weather::{SessionScheduleEntry, WeatherSnapshot},
    };
    use async_trait::async_trait;

    struct OfflineSource;

    #[async_trait]
    impl WeatherSource for OfflineSource {
        async fn fetch_weather(&self, _: SessionKind) -> Result<WeatherSnapshot, LmuWeatherError> {
            Err(LmuWeatherError::HttpStatus {
                url: "offline".to_string(),
                status: 503,
            })
        }

        async fn fetch_schedule(&self) -> Result<Vec<SessionScheduleEntry>, LmuWeatherError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_collector_feeds_every_frame() {
        let plugin = WeatherPlugin::new(&AppConfig::default(), OfflineSource);
        let producer = MockTelemetryProducer::from_frames(vec![
            TelemetryFrame {
                game_running: true,
                game_name: Some("LMU".to_string()),
                session_type_name: Some("QUALIFYING".to_string()),
                ..TelemetryFrame::default()
            },
            TelemetryFrame {
                game_running: true,
                game_in_menu: true,
                game_name: Some("LMU".to_string()),
                session_type_name: Some("QUALIFYING".to_string()),
                ..TelemetryFrame::default()
            },
        ]);

        let frames = collect_telemetry(producer, &plugin, Duration::from_millis(1)).unwrap();
        assert_eq!(frames, 2);
        assert_eq!(plugin.poller_state(), PollerState::Stopped);
        assert_eq!(plugin.dump().session_kind, SessionKind::Qualify);
        assert_eq!(plugin.dump().current_node, CheckpointNode::Start);
    }

    #[test]
    fn test_collector_fails_on_empty_feed() {
        let plugin = WeatherPlugin::new(&AppConfig::default(), OfflineSource);
        let producer = MockTelemetryProducer::from_frames(Vec::new());
        assert!(collect_telemetry(producer, &plugin, Duration::from_millis(1)).is_err());
    }
}
