use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::Value;

use crate::{errors::LmuWeatherError, session::SessionKind};

use super::{SessionScheduleEntry, WeatherSnapshot, parse_schedule};

pub const DEFAULT_BASE_URL: &str = "http://localhost:6397";
const WEATHER_PATH: &str = "/rest/sessions/weather";
const SCHEDULE_PATH: &str = "/rest/sessions/GetSessionsInfoForEvent";

/// Source of weather forecasts and the event schedule.
///
/// The production implementation talks to the simulator's REST server; tests swap in
/// canned or failing sources.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch the per-node forecast for a session kind.
    async fn fetch_weather(&self, kind: SessionKind) -> Result<WeatherSnapshot, LmuWeatherError>;

    /// Fetch every scheduled session of the current event.
    async fn fetch_schedule(&self) -> Result<Vec<SessionScheduleEntry>, LmuWeatherError>;
}

pub struct RestWeatherSource {
    client: reqwest::Client,
    base_url: String,
}

impl RestWeatherSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LmuWeatherError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LmuWeatherError::HttpClientBuild { source: e })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn weather_url(&self, kind: SessionKind) -> String {
        format!("{}{}/{}", self.base_url, WEATHER_PATH, kind)
    }

    pub fn schedule_url(&self) -> String {
        format!("{}{}", self.base_url, SCHEDULE_PATH)
    }

    async fn get_json(&self, url: &str) -> Result<Value, LmuWeatherError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LmuWeatherError::Transport {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LmuWeatherError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| LmuWeatherError::Transport {
                url: url.to_string(),
                source: e,
            })?;
        serde_json::from_str(&body).map_err(|e| LmuWeatherError::Parse {
            url: url.to_string(),
            source: e,
        })
    }
}

#[async_trait]
impl WeatherSource for RestWeatherSource {
    async fn fetch_weather(&self, kind: SessionKind) -> Result<WeatherSnapshot, LmuWeatherError> {
        let url = self.weather_url(kind);
        let body = self.get_json(&url).await?;
        WeatherSnapshot::from_json(&url, &body)
    }

    async fn fetch_schedule(&self) -> Result<Vec<SessionScheduleEntry>, LmuWeatherError> {
        let url = self.schedule_url();
        let body = self.get_json(&url).await?;
        parse_schedule(&url, &body)
    }
}
