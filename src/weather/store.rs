use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use log::info;

use crate::session::SessionKind;

use super::{SessionScheduleEntry, WeatherSnapshot, first_matching_length};

/// Latest weather snapshot and session lengths fetched from the server.
///
/// The snapshot is swapped as a whole `Arc`, so a reader holds either the previous or
/// the new document and never a mix of both. Only the polling engine writes.
#[derive(Debug, Default)]
pub struct WeatherSnapshotStore {
    snapshot: RwLock<Option<Arc<WeatherSnapshot>>>,
    session_lengths: RwLock<HashMap<SessionKind, i32>>,
}

impl WeatherSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, snapshot: WeatherSnapshot) {
        let snapshot = Arc::new(snapshot);
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    pub fn current(&self) -> Option<Arc<WeatherSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recently fetched length for `kind`, or 0 when the schedule never listed it.
    pub fn session_length_minutes(&self, kind: SessionKind) -> i32 {
        self.session_lengths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }

    /// Adopts the length of the first schedule entry that belongs to `kind`. When no
    /// entry matches the previous length is kept.
    pub fn record_schedule(&self, kind: SessionKind, entries: &[SessionScheduleEntry]) -> Option<i32> {
        let length = first_matching_length(kind, entries)?;
        let previous = self
            .session_lengths
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, length);
        if previous != Some(length) {
            info!("{} session length is now {} minutes", kind, length);
        }
        Some(length)
    }
}
