//! Geometry Persister
//!
//! Writes the bounds of all live tracked windows back to the store as one
//! snapshot, on every move/resize and at the save/quit checkpoints.

use crate::error::StoreError;
use crate::geometry::{GeometryMap, WindowId};
use crate::registry::WindowRegistry;
use crate::state::AppState;
use crate::store::{DurableStore, KEY_WINDOW_POSITIONS};

/// Why a snapshot is being written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    WindowChanged(WindowId),
    Save,
    Quit,
}

#[derive(Debug, Default)]
pub struct GeometryPersister {
    flushes: u64,
}

impl GeometryPersister {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Bounds of every live tracked window. A live window the platform cannot
    /// measure keeps its last known rectangle; destroyed windows are left out.
    pub fn snapshot(registry: &WindowRegistry, last_known: &GeometryMap) -> GeometryMap {
        WindowId::TRACKED
            .into_iter()
            .filter(|&id| !registry.is_destroyed(id))
            .filter_map(|id| {
                registry
                    .bounds(id)
                    .filter(|r| r.is_valid())
                    .or_else(|| last_known.get(&id).copied())
                    .map(|rect| (id, rect))
            })
            .collect()
    }

    /// Snapshot and persist. Safe to repeat: without intervening moves the
    /// same map is written again. Once every window is gone nothing is written.
    pub fn flush(
        &mut self,
        reason: FlushReason,
        registry: &WindowRegistry,
        store: &DurableStore,
        state: &mut AppState,
    ) -> Result<GeometryMap, StoreError> {
        if let FlushReason::WindowChanged(WindowId::Settings) = reason {
            return Ok(state.window_geometry.clone());
        }

        let snapshot = Self::snapshot(registry, &state.window_geometry);
        if snapshot.is_empty() {
            tracing::info!("No live windows to measure, keeping last saved positions");
            return Ok(snapshot);
        }
        store.set(KEY_WINDOW_POSITIONS, &snapshot)?;
        state.window_geometry = snapshot.clone();
        self.flushes += 1;
        tracing::debug!(
            "Geometry flush #{} ({:?}): {} windows",
            self.flushes,
            reason,
            snapshot.len()
        );
        Ok(snapshot)
    }
}
