// Error types for lmu-weather

use crate::properties::PropertyDump;
use snafu::Snafu;
use std::{io, sync::mpsc::SendError};

#[derive(Debug, Snafu)]
pub enum LmuWeatherError {
    // Errors talking to the simulation REST server
    #[snafu(display("Request to {url} failed"))]
    Transport { url: String, source: reqwest::Error },
    #[snafu(display("Request to {url} returned HTTP {status}"))]
    HttpStatus { url: String, status: u16 },
    #[snafu(display("Could not parse response from {url}"))]
    Parse {
        url: String,
        source: serde_json::Error,
    },
    #[snafu(display("Response from {url} is missing field {field}"))]
    MissingField { url: String, field: String },
    #[snafu(display("Could not build HTTP client"))]
    HttpClientBuild { source: reqwest::Error },

    // Errors while reading the host telemetry feed
    #[snafu(display("Telemetry producer error: {description}"))]
    TelemetryProducerError { description: String },
    #[snafu(display("Error loading telemetry file"))]
    TelemetryLoaderError { source: io::Error },
    #[snafu(display("Invalid telemetry file: {path}"))]
    InvalidTelemetryFile { path: String },

    // Errors for the property writer
    #[snafu(display("Error writing property file"))]
    WriterError { source: io::Error },
    #[snafu(display("Error broadcasting property table"))]
    PropertyBroadcastError {
        source: Box<SendError<PropertyDump>>,
    },
    #[snafu(display("Error serializing property table"))]
    DumpSerializeError { source: serde_json::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    #[snafu(display("Could not start async runtime"))]
    RuntimeError { source: io::Error },
    #[snafu(display("The {thread} thread panicked"))]
    ThreadPanicked { thread: String },
}

impl From<SendError<PropertyDump>> for LmuWeatherError {
    fn from(value: SendError<PropertyDump>) -> Self {
        LmuWeatherError::PropertyBroadcastError {
            source: Box::new(value),
        }
    }
}

impl LmuWeatherError {
    /// Whether the error came from talking to the REST server rather than from local state.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::HttpStatus { .. }
                | Self::Parse { .. }
                | Self::MissingField { .. }
        )
    }
}
