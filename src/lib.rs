// Library interface for lmu-weather
// The binary and the integration tests both go through these modules

pub mod config;
pub mod errors;
pub mod plugin;
pub mod poller;
pub mod progress;
pub mod properties;
pub mod session;
pub mod telemetry;
pub mod weather;
pub mod writer;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::LmuWeatherError;
pub use plugin::WeatherPlugin;
pub use poller::PollerState;
pub use progress::CheckpointNode;
pub use properties::{PropertyDump, PropertyRequest, PropertyValue};
pub use session::SessionKind;
pub use telemetry::TelemetryFrame;
pub use weather::{MetricId, WeatherSnapshot, WeatherSource};
