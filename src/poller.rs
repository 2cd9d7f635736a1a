use std::{sync::Arc, time::Duration};

use log::{debug, error, info};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    LmuWeatherError,
    progress::SessionTracker,
    weather::{WeatherSnapshotStore, WeatherSource},
};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PollerState {
    #[default]
    Stopped,
    Running,
}

/// Periodically refreshes the weather snapshot and the session length while the
/// game is on track.
///
/// The run state is driven from the telemetry tick through [`PollingEngine::set_gate`];
/// the fetch loop itself lives on the async runtime and never runs on the telemetry
/// path. A stop halts scheduling, but a fetch that is already in flight still
/// completes and is published.
pub struct PollingEngine<S: WeatherSource> {
    source: S,
    store: Arc<WeatherSnapshotStore>,
    tracker: Arc<SessionTracker>,
    interval: Duration,
    state: watch::Sender<PollerState>,
}

impl<S: WeatherSource + 'static> PollingEngine<S> {
    pub fn new(
        source: S,
        store: Arc<WeatherSnapshotStore>,
        tracker: Arc<SessionTracker>,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(PollerState::Stopped);
        Self {
            source,
            store,
            tracker,
            interval,
            state,
        }
    }

    pub fn state(&self) -> PollerState {
        *self.state.borrow()
    }

    /// Applies the gating predicate and returns the resulting state.
    pub fn set_gate(&self, should_run: bool) -> PollerState {
        let next = if should_run {
            PollerState::Running
        } else {
            PollerState::Stopped
        };
        let changed = self.state.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
        if changed {
            info!("Weather polling {:?}", next);
        }
        next
    }

    /// One fetch cycle: weather for the active session kind, then the event schedule.
    ///
    /// The first failure aborts the rest of the cycle; whatever was already published
    /// stays in the store.
    pub async fn poll_once(&self) -> Result<(), LmuWeatherError> {
        let kind = self.tracker.sample().kind;

        let snapshot = self.source.fetch_weather(kind).await?;
        debug!("Fetched {} weather for {} nodes", kind, snapshot.node_count());
        self.store.replace(snapshot);

        let schedule = self.source.fetch_schedule().await?;
        if self.store.record_schedule(kind, &schedule).is_none() {
            debug!("No scheduled session matches {}", kind);
        }
        Ok(())
    }

    async fn tick(&self) {
        if let Err(e) = self.poll_once().await {
            error!("Failed to fetch weather data: {}", e);
            if let Some(source) = std::error::Error::source(&e) {
                debug!("Caused by: {}", source);
            }
        }
    }

    /// Spawns the polling loop on `runtime`. The loop idles while stopped and runs a
    /// tick immediately on every transition to running.
    pub fn spawn(self: &Arc<Self>, runtime: &tokio::runtime::Handle) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        runtime.spawn(async move { engine.run().await })
    }

    async fn run(self: Arc<Self>) {
        let mut state_rx = self.state.subscribe();
        loop {
            if state_rx
                .wait_for(|state| *state == PollerState::Running)
                .await
                .is_err()
            {
                return;
            }

            let mut interval = time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if *state_rx.borrow() != PollerState::Running {
                            break;
                        }
                        self.tick().await;
                    }
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        if *state_rx.borrow_and_update() != PollerState::Running {
                            break;
                        }
                    }
                }
            }
        }
    }
}
