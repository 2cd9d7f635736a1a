use std::path::Path;

use log::{debug, error};

use crate::LmuWeatherError;

use super::TelemetryFrame;

/// A source of per-tick game data.
///
/// In production the dashboard host pushes frames into the plugin directly; a
/// producer lets the standalone binary and the tests drive the same code path from
/// recorded or generated frames.
///
/// # Lifecycle
///
/// 1. Call `start()` to open the underlying source
/// 2. Call `telemetry()` repeatedly to get frames
pub trait TelemetryProducer {
    /// Initialize the producer.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be opened.
    fn start(&mut self) -> Result<(), LmuWeatherError>;

    /// Get the next frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the producer is not started or if the source is exhausted.
    fn telemetry(&mut self) -> Result<TelemetryFrame, LmuWeatherError>;
}

/// Replays a fixed list of frames, optionally loaded from a JSON Lines recording.
#[derive(Default)]
pub struct MockTelemetryProducer {
    cur_tick: usize,
    frames: Vec<TelemetryFrame>,
    /// Keep returning the last frame once the list is exhausted instead of failing
    pub hold_last: bool,
}

impl MockTelemetryProducer {
    pub fn from_frames(frames: Vec<TelemetryFrame>) -> Self {
        Self {
            cur_tick: 0,
            frames,
            hold_last: false,
        }
    }

    /// Load frames from a JSON Lines file, one `TelemetryFrame` per line.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or a line is not a valid frame.
    pub fn from_file(file: &Path) -> Result<Self, LmuWeatherError> {
        if !file.exists() {
            return Err(LmuWeatherError::InvalidTelemetryFile {
                path: format!("{:?}", file),
            });
        }

        let frames = serde_jsonlines::json_lines(file)
            .map_err(|e| LmuWeatherError::TelemetryLoaderError { source: e })?
            .collect::<Result<Vec<TelemetryFrame>, std::io::Error>>()
            .map_err(|e| {
                error!("Could not parse telemetry recording {:?}: {}", file, e);
                LmuWeatherError::TelemetryLoaderError { source: e }
            })?;
        debug!("Loaded {} telemetry frames from {:?}", frames.len(), file);

        Ok(Self::from_frames(frames))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl TelemetryProducer for MockTelemetryProducer {
    fn start(&mut self) -> Result<(), LmuWeatherError> {
        self.cur_tick = 0;
        Ok(())
    }

    fn telemetry(&mut self) -> Result<TelemetryFrame, LmuWeatherError> {
        if self.cur_tick >= self.frames.len() {
            return match self.frames.last() {
                Some(last) if self.hold_last => Ok(last.clone()),
                _ => Err(LmuWeatherError::TelemetryProducerError {
                    description: "End of frames vec".to_string(),
                }),
            };
        }

        let mut frame = self.frames[self.cur_tick].clone();
        self.cur_tick += 1;
        if frame.point_no == 0 {
            frame.point_no = self.cur_tick;
        }

        Ok(frame)
    }
}
