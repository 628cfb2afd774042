use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TIME_SLOTS: [&str; 6] = [
    "08:00 - 10:00",
    "10:00 - 12:00",
    "12:00 - 14:00",
    "14:00 - 16:00",
    "16:00 - 18:00",
    "18:00 - 20:00",
];

pub const COMMISSION_RATE: f64 = 0.20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn in_range(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat.abs() <= 90.0
            && self.lng.abs() <= 180.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageSize {
    Small,
    Medium,
    Large,
}

impl PackageSize {
    pub fn price_eur(self) -> f64 {
        match self {
            PackageSize::Small => 5.0,
            PackageSize::Medium => 8.0,
            PackageSize::Large => 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Pending,
    Accepted,
    Collected,
    InTransit,
    Delivered,
    Cancelled,
}

impl MissionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MissionStatus::Delivered | MissionStatus::Cancelled)
    }

    /// Statuses in which a mission must have an assigned partner.
    pub fn requires_partner(self) -> bool {
        match self {
            MissionStatus::Accepted
            | MissionStatus::Collected
            | MissionStatus::InTransit
            | MissionStatus::Delivered => true,
            MissionStatus::Pending | MissionStatus::Cancelled => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Actor {
    Client { id: Uuid },
    Partner { id: Uuid },
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: Uuid,
    pub client_id: Uuid,
    pub partner_id: Option<Uuid>,
    pub package_title: String,
    pub package_size: PackageSize,
    pub pickup: GeoPoint,
    pub pickup_address: String,
    pub dropoff: GeoPoint,
    pub delivery_address: String,
    pub pickup_time_slot: String,
    pub price: f64,
    pub commission: f64,
    pub status: MissionStatus,
    pub pickup_token: String,
    pub delivery_token: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Mission {
    /// Partner assignment and status must agree at every observable point.
    pub fn partner_link_consistent(&self) -> bool {
        self.partner_id.is_some() == self.status.requires_partner()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableMission {
    #[serde(flatten)]
    pub mission: Mission,
    pub distance_km: f64,
}
