use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo;
use crate::lifecycle::verify::issue_token;
use crate::models::event::MissionEvent;
use crate::models::mission::{
    AvailableMission, GeoPoint, Mission, MissionStatus, PackageSize, COMMISSION_RATE, TIME_SLOTS,
};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/missions", post(create_mission).get(list_missions))
        .route("/missions/available", get(available_missions))
        .route("/missions/:id", get(get_mission))
}

#[derive(Deserialize)]
pub struct CreateMissionRequest {
    pub client_id: Uuid,
    pub package_title: String,
    pub package_size: PackageSize,
    pub pickup: GeoPoint,
    pub pickup_address: String,
    pub dropoff: GeoPoint,
    pub delivery_address: String,
    pub pickup_time_slot: String,
}

#[derive(Deserialize)]
pub struct ListMissionsQuery {
    pub status: Option<MissionStatus>,
    pub client_id: Option<Uuid>,
    pub partner_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct AvailableMissionsQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
}

async fn create_mission(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateMissionRequest>,
) -> Result<Json<Mission>, AppError> {
    if payload.package_title.trim().is_empty() {
        return Err(AppError::BadRequest(
            "package title cannot be empty".to_string(),
        ));
    }

    if payload.pickup_address.trim().is_empty() || payload.delivery_address.trim().is_empty() {
        return Err(AppError::BadRequest(
            "pickup and delivery addresses are required".to_string(),
        ));
    }

    if !payload.pickup.in_range() {
        return Err(AppError::BadRequest(
            "pickup coordinates out of range".to_string(),
        ));
    }

    if !payload.dropoff.in_range() {
        return Err(AppError::BadRequest(
            "delivery coordinates out of range".to_string(),
        ));
    }

    if !TIME_SLOTS.contains(&payload.pickup_time_slot.as_str()) {
        return Err(AppError::BadRequest(format!(
            "unknown pickup time slot: {}",
            payload.pickup_time_slot
        )));
    }

    let price = payload.package_size.price_eur();
    let mission = Mission {
        id: Uuid::new_v4(),
        client_id: payload.client_id,
        partner_id: None,
        package_title: payload.package_title,
        package_size: payload.package_size,
        pickup: payload.pickup,
        pickup_address: payload.pickup_address,
        dropoff: payload.dropoff,
        delivery_address: payload.delivery_address,
        pickup_time_slot: payload.pickup_time_slot,
        price,
        commission: price * COMMISSION_RATE,
        status: MissionStatus::Pending,
        pickup_token: issue_token(),
        delivery_token: issue_token(),
        created_at: Utc::now(),
        completed_at: None,
    };

    state.missions.insert(mission.id, mission.clone());
    state.metrics.missions_created_total.inc();
    state.metrics.missions_active.inc();
    state.publish(MissionEvent::from_mission(&mission));

    tracing::info!(mission_id = %mission.id, client_id = %mission.client_id, "mission created");

    Ok(Json(mission))
}

async fn list_missions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListMissionsQuery>,
) -> Json<Vec<Mission>> {
    let mut missions: Vec<Mission> = state
        .missions
        .iter()
        .filter(|entry| {
            let mission = entry.value();
            query.status.is_none_or(|status| mission.status == status)
                && query.client_id.is_none_or(|id| mission.client_id == id)
                && query.partner_id.is_none_or(|id| mission.partner_id == Some(id))
        })
        .map(|entry| entry.value().clone())
        .collect();

    missions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Json(missions)
}

async fn available_missions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailableMissionsQuery>,
) -> Result<Json<Vec<AvailableMission>>, AppError> {
    let origin = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => {
            let origin = GeoPoint { lat, lng };
            if !origin.in_range() {
                return Err(AppError::BadRequest(
                    "origin coordinates out of range".to_string(),
                ));
            }
            origin
        }
        // No location from the caller; search from the configured origin.
        (None, None) => state.default_origin,
        _ => {
            return Err(AppError::BadRequest(
                "lat and lng must be supplied together".to_string(),
            ));
        }
    };

    let radius_km = query.radius_km.unwrap_or(state.default_radius_km);
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(AppError::BadRequest(
            "radius_km must be a positive number".to_string(),
        ));
    }

    let candidates: Vec<Mission> = state
        .missions
        .iter()
        .filter(|entry| entry.value().status == MissionStatus::Pending)
        .map(|entry| entry.value().clone())
        .collect();

    Ok(Json(geo::find_nearby(&origin, radius_km, &candidates)))
}

async fn get_mission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Mission>, AppError> {
    let mission = state
        .missions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("mission {} not found", id)))?;

    Ok(Json(mission.value().clone()))
}
