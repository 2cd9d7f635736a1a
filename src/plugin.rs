use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

use log::{debug, info};
use tokio::{runtime::Handle, task::JoinHandle};

use crate::{
    LmuWeatherError,
    config::AppConfig,
    poller::{PollerState, PollingEngine},
    progress::SessionTracker,
    properties::{
        PropertyDump, PropertyRegistry, PropertyRequest, PropertyResolver, PropertyValue,
        SESSION_LENGTH, registered_properties,
    },
    session::SessionKind,
    telemetry::TelemetryFrame,
    weather::{RestWeatherSource, WeatherSnapshotStore, WeatherSource},
};

/// Host-facing plugin: registers the property table, consumes telemetry ticks and
/// answers property reads.
///
/// Telemetry ticks and property reads may come from different threads than the
/// polling loop; they only meet in the session tracker and the snapshot store.
pub struct WeatherPlugin<S: WeatherSource + 'static> {
    expected_game: String,
    tracker: Arc<SessionTracker>,
    store: Arc<WeatherSnapshotStore>,
    engine: Arc<PollingEngine<S>>,
    resolver: PropertyResolver,
    properties: BTreeMap<String, PropertyRequest>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl WeatherPlugin<RestWeatherSource> {
    pub fn from_config(config: &AppConfig) -> Result<Self, LmuWeatherError> {
        let source = RestWeatherSource::new(&config.base_url, config.request_timeout())?;
        Ok(Self::new(config, source))
    }
}

impl<S: WeatherSource + 'static> WeatherPlugin<S> {
    pub fn new(config: &AppConfig, source: S) -> Self {
        let tracker = Arc::new(SessionTracker::new());
        let store = Arc::new(WeatherSnapshotStore::new());
        let engine = Arc::new(PollingEngine::new(
            source,
            Arc::clone(&store),
            Arc::clone(&tracker),
            config.poll_interval(),
        ));

        Self {
            expected_game: config.expected_game.clone(),
            resolver: PropertyResolver::new(Arc::clone(&tracker), Arc::clone(&store)),
            tracker,
            store,
            engine,
            properties: registered_properties().into_iter().collect(),
            poll_task: Mutex::new(None),
        }
    }

    /// Declares every property with the host and starts the polling loop on `runtime`.
    /// Polling stays idle until a telemetry tick opens the gate.
    pub fn init(&self, registry: &mut impl PropertyRegistry, runtime: &Handle) {
        for (name, request) in &self.properties {
            registry.attach(name, *request);
        }
        debug!("Registered {} properties", self.properties.len());

        let mut poll_task = self.poll_task.lock().unwrap_or_else(PoisonError::into_inner);
        if poll_task.is_none() {
            *poll_task = Some(self.engine.spawn(runtime));
        }
        info!("Weather plugin started");
    }

    /// Per-tick telemetry handler. Never blocks on the network.
    pub fn data_update(&self, frame: &TelemetryFrame) -> PollerState {
        let kind = SessionKind::classify(frame.session_type_name.as_deref());
        let total_minutes = self.store.session_length_minutes(kind);
        let previous = self
            .tracker
            .update(kind, total_minutes, frame.session_time_left());
        let sample = self.tracker.sample();

        if previous.kind != sample.kind {
            info!("Session changed to {}", sample.kind);
        }
        if previous.node != sample.node {
            info!("Current weather node is now {}", sample.node);
        }

        self.engine.set_gate(frame.should_poll(&self.expected_game))
    }

    pub fn resolve(&self, name: &str) -> PropertyValue {
        match self.properties.get(name) {
            Some(request) => self.resolver.resolve(request),
            None => self.resolver.resolve_name(name),
        }
    }

    pub fn dump(&self) -> PropertyDump {
        self.resolver.dump(&self.properties)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn poller_state(&self) -> PollerState {
        self.engine.state()
    }

    /// Runs one fetch cycle immediately, regardless of the polling gate.
    pub async fn poll_now(&self) -> Result<(), LmuWeatherError> {
        self.engine.poll_once().await
    }

    /// One-shot table for `kind` without a host feed: fetches once and resolves every
    /// property as if the session had just started.
    pub async fn fetch_table(&self, kind: SessionKind) -> Result<PropertyDump, LmuWeatherError> {
        let frame = TelemetryFrame {
            session_type_name: Some(kind.as_str().to_string()),
            ..TelemetryFrame::default()
        };
        self.data_update(&frame);
        self.poll_now().await?;

        let length_minutes = self
            .resolve(SESSION_LENGTH)
            .as_f64()
            .unwrap_or_default();
        self.data_update(&TelemetryFrame {
            session_time_left_s: length_minutes * 60.0,
            ..frame
        });
        Ok(self.dump())
    }

    /// Stops polling and the polling loop. In-flight requests are dropped.
    pub fn end(&self) {
        self.engine.set_gate(false);
        if let Some(task) = self
            .poll_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        info!("Weather plugin has been stopped");
    }
}
