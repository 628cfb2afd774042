use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::mission::{Mission, MissionStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionEvent {
    pub mission_id: Uuid,
    pub status: MissionStatus,
    pub partner_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl MissionEvent {
    pub fn from_mission(mission: &Mission) -> Self {
        Self {
            mission_id: mission.id,
            status: mission.status,
            partner_id: mission.partner_id,
            occurred_at: Utc::now(),
        }
    }
}
