use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo;
use crate::lifecycle;
use crate::lifecycle::grace::WindowState;
use crate::models::event::MissionEvent;
use crate::models::mission::{Actor, GeoPoint, Mission};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/missions/:id/accept", put(accept_mission))
        .route("/missions/:id/cancel", put(cancel_mission))
        .route("/missions/:id/collect", put(collect_mission))
        .route("/missions/:id/transit", put(start_transit))
        .route("/missions/:id/deliver", put(deliver_mission))
        .route("/missions/:id/window", get(acceptance_window))
}

#[derive(Deserialize)]
pub struct AcceptMissionRequest {
    pub partner_id: Uuid,
    pub location: GeoPoint,
    pub idempotency_key: Option<String>,
}

#[derive(Serialize)]
pub struct AcceptMissionResponse {
    pub mission: Mission,
    pub cancel_window_secs: u64,
}

#[derive(Deserialize)]
pub struct CancelMissionRequest {
    pub actor: Actor,
    pub idempotency_key: Option<String>,
}

#[derive(Deserialize)]
pub struct ScanRequest {
    pub partner_id: Uuid,
    pub qr_payload: String,
    pub idempotency_key: Option<String>,
}

#[derive(Deserialize)]
pub struct PartnerActionRequest {
    pub partner_id: Uuid,
    pub idempotency_key: Option<String>,
}

async fn accept_mission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcceptMissionRequest>,
) -> Result<Json<AcceptMissionResponse>, AppError> {
    if !payload.location.in_range() {
        return Err(AppError::BadRequest(
            "partner coordinates out of range".to_string(),
        ));
    }

    let mission = {
        let mut entry = lock_mission(&state, id)?;

        if state.transition_already_applied(id, payload.idempotency_key.as_deref()) {
            entry.value().clone()
        } else {
            let distance_km = geo::haversine_km(&payload.location, &entry.pickup);
            if distance_km > state.default_radius_km {
                return Err(AppError::BadRequest(
                    "pickup point is outside the allowed radius".to_string(),
                ));
            }

            let mission = apply(
                &state,
                "accept",
                entry.value_mut(),
                payload.idempotency_key,
                |mission| lifecycle::accept(mission, payload.partner_id),
            )?;
            state.grace.start(id, payload.partner_id);
            mission
        }
    };

    let cancel_window_secs = match state.grace.state(id) {
        WindowState::Counting { remaining_secs } => remaining_secs,
        WindowState::Idle | WindowState::Expired => 0,
    };

    Ok(Json(AcceptMissionResponse {
        mission,
        cancel_window_secs,
    }))
}

/// One cancel endpoint, two meanings: a partner releases a fresh acceptance
/// through the grace window (mission returns to the pool), while the owner
/// or an admin cancels the mission outright.
async fn cancel_mission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelMissionRequest>,
) -> Result<Json<Mission>, AppError> {
    let mission = {
        let mut entry = lock_mission(&state, id)?;

        if state.transition_already_applied(id, payload.idempotency_key.as_deref()) {
            entry.value().clone()
        } else {
            match payload.actor {
                Actor::Partner { id: partner_id } => {
                    state.grace.consume(id, partner_id).inspect_err(|_| {
                        state
                            .metrics
                            .transitions_total
                            .with_label_values(&["revert", "error"])
                            .inc();
                    })?;

                    apply(
                        &state,
                        "revert",
                        entry.value_mut(),
                        payload.idempotency_key,
                        |mission| lifecycle::revert_acceptance(mission, partner_id),
                    )?
                }
                actor => {
                    let mission = apply(
                        &state,
                        "cancel",
                        entry.value_mut(),
                        payload.idempotency_key,
                        |mission| lifecycle::cancel(mission, actor),
                    )?;
                    state.grace.clear(id);
                    mission
                }
            }
        }
    };

    Ok(Json(mission))
}

async fn collect_mission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ScanRequest>,
) -> Result<Json<Mission>, AppError> {
    let mission = {
        let mut entry = lock_mission(&state, id)?;

        if state.transition_already_applied(id, payload.idempotency_key.as_deref()) {
            entry.value().clone()
        } else {
            let mission = apply(
                &state,
                "collect",
                entry.value_mut(),
                payload.idempotency_key,
                |mission| lifecycle::collect(mission, payload.partner_id, &payload.qr_payload),
            )?;
            state.grace.clear(id);
            mission
        }
    };

    Ok(Json(mission))
}

async fn start_transit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PartnerActionRequest>,
) -> Result<Json<Mission>, AppError> {
    let mission = {
        let mut entry = lock_mission(&state, id)?;

        if state.transition_already_applied(id, payload.idempotency_key.as_deref()) {
            entry.value().clone()
        } else {
            apply(
                &state,
                "transit",
                entry.value_mut(),
                payload.idempotency_key,
                |mission| lifecycle::start_transit(mission, payload.partner_id),
            )?
        }
    };

    Ok(Json(mission))
}

async fn deliver_mission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ScanRequest>,
) -> Result<Json<Mission>, AppError> {
    let mission = {
        let mut entry = lock_mission(&state, id)?;

        if state.transition_already_applied(id, payload.idempotency_key.as_deref()) {
            entry.value().clone()
        } else {
            apply(
                &state,
                "deliver",
                entry.value_mut(),
                payload.idempotency_key,
                |mission| lifecycle::deliver(mission, payload.partner_id, &payload.qr_payload),
            )?
        }
    };

    Ok(Json(mission))
}

async fn acceptance_window(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WindowState>, AppError> {
    if !state.missions.contains_key(&id) {
        return Err(AppError::NotFound(format!("mission {} not found", id)));
    }

    Ok(Json(state.grace.state(id)))
}

fn lock_mission(
    state: &AppState,
    id: Uuid,
) -> Result<dashmap::mapref::one::RefMut<'_, Uuid, Mission>, AppError> {
    state
        .missions
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("mission {} not found", id)))
}

/// Runs one transition under the caller-held entry guard: bookkeeping for
/// metrics, idempotency and the event feed happens only when the table
/// accepts the change.
fn apply<F>(
    state: &AppState,
    transition: &'static str,
    mission: &mut Mission,
    idempotency_key: Option<String>,
    op: F,
) -> Result<Mission, AppError>
where
    F: FnOnce(&mut Mission) -> Result<(), AppError>,
{
    match op(mission) {
        Ok(()) => {
            state.record_applied_transition(mission.id, idempotency_key);
            state
                .metrics
                .transitions_total
                .with_label_values(&[transition, "success"])
                .inc();
            if mission.status.is_terminal() {
                state.metrics.missions_active.dec();
            }

            let snapshot = mission.clone();
            state.publish(MissionEvent::from_mission(&snapshot));
            tracing::info!(
                mission_id = %snapshot.id,
                status = ?snapshot.status,
                transition,
                "mission transition committed"
            );
            Ok(snapshot)
        }
        Err(err) => {
            state
                .metrics
                .transitions_total
                .with_label_values(&[transition, "error"])
                .inc();
            if let AppError::VerificationMismatch(checkpoint) = &err {
                state
                    .metrics
                    .verification_failures_total
                    .with_label_values(&[checkpoint])
                    .inc();
            }
            Err(err)
        }
    }
}
