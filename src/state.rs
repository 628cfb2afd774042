use dashmap::{DashMap, DashSet};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::lifecycle::grace::GraceWindows;
use crate::models::event::MissionEvent;
use crate::models::mission::{GeoPoint, Mission};
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub missions: DashMap<Uuid, Mission>,
    pub grace: GraceWindows,
    pub mission_events_tx: broadcast::Sender<MissionEvent>,
    pub metrics: Metrics,
    pub default_origin: GeoPoint,
    pub default_radius_km: f64,
    applied_keys: DashSet<(Uuid, String)>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let (mission_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        Self {
            missions: DashMap::new(),
            grace: GraceWindows::new(config.cancel_window_secs),
            mission_events_tx,
            metrics: Metrics::new(),
            default_origin: config.fallback_origin(),
            default_radius_km: config.default_radius_km,
            applied_keys: DashSet::new(),
        }
    }

    pub fn publish(&self, event: MissionEvent) {
        let _ = self.mission_events_tx.send(event);
    }

    /// True when a transition carrying this idempotency key already committed
    /// against the mission; the caller then replays the current record
    /// instead of re-applying the side effects. Checked and recorded while
    /// the caller holds the mission's entry guard.
    pub fn transition_already_applied(&self, mission_id: Uuid, key: Option<&str>) -> bool {
        match key {
            Some(key) => self.applied_keys.contains(&(mission_id, key.to_string())),
            None => false,
        }
    }

    pub fn record_applied_transition(&self, mission_id: Uuid, key: Option<String>) {
        if let Some(key) = key {
            self.applied_keys.insert((mission_id, key));
        }
    }
}
