//! Transition table for a mission. Every function checks the state
//! precondition first, then the acting party, then any verification gate,
//! and only mutates once all checks pass. Callers hold the mission's map
//! entry guard across the whole call, which is what serializes racing
//! attempts on the same mission.

pub mod grace;
pub mod verify;

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::lifecycle::verify::Checkpoint;
use crate::models::mission::{Actor, Mission, MissionStatus};

pub fn accept(mission: &mut Mission, partner_id: Uuid) -> Result<(), AppError> {
    if mission.status != MissionStatus::Pending || mission.partner_id.is_some() {
        return Err(AppError::InvalidTransition(
            "mission is no longer available".to_string(),
        ));
    }

    mission.partner_id = Some(partner_id);
    mission.status = MissionStatus::Accepted;
    Ok(())
}

/// The partner's in-window reversal: `accepted` back to `pending`. The
/// grace window itself is consumed by the caller before this runs.
pub fn revert_acceptance(mission: &mut Mission, partner_id: Uuid) -> Result<(), AppError> {
    if mission.status != MissionStatus::Accepted {
        return Err(AppError::InvalidTransition(
            "acceptance can only be reverted before pickup".to_string(),
        ));
    }
    ensure_assigned_to(mission, partner_id)?;

    mission.partner_id = None;
    mission.status = MissionStatus::Pending;
    Ok(())
}

pub fn collect(mission: &mut Mission, partner_id: Uuid, scanned_payload: &str) -> Result<(), AppError> {
    if mission.status != MissionStatus::Accepted {
        return Err(AppError::InvalidTransition(
            "mission is not awaiting pickup".to_string(),
        ));
    }
    ensure_assigned_to(mission, partner_id)?;
    verify::verify(mission, scanned_payload, Checkpoint::Pickup)?;

    mission.status = MissionStatus::Collected;
    Ok(())
}

pub fn start_transit(mission: &mut Mission, partner_id: Uuid) -> Result<(), AppError> {
    if mission.status != MissionStatus::Collected {
        return Err(AppError::InvalidTransition(
            "mission has not been collected".to_string(),
        ));
    }
    ensure_assigned_to(mission, partner_id)?;

    mission.status = MissionStatus::InTransit;
    Ok(())
}

/// The in-transit step is optional: delivery can be confirmed directly from
/// `collected`.
pub fn deliver(mission: &mut Mission, partner_id: Uuid, scanned_payload: &str) -> Result<(), AppError> {
    if !matches!(
        mission.status,
        MissionStatus::Collected | MissionStatus::InTransit
    ) {
        return Err(AppError::InvalidTransition(
            "mission is not out for delivery".to_string(),
        ));
    }
    ensure_assigned_to(mission, partner_id)?;
    verify::verify(mission, scanned_payload, Checkpoint::Delivery)?;

    mission.status = MissionStatus::Delivered;
    mission.completed_at = Some(Utc::now());
    Ok(())
}

/// Owner or admin cancellation. Disallowed once the package is physically
/// collected; from then on the only path is completion.
pub fn cancel(mission: &mut Mission, actor: Actor) -> Result<(), AppError> {
    if !matches!(
        mission.status,
        MissionStatus::Pending | MissionStatus::Accepted
    ) {
        return Err(AppError::InvalidTransition(
            "mission can no longer be cancelled".to_string(),
        ));
    }

    match actor {
        Actor::Admin => {}
        Actor::Client { id } if id == mission.client_id => {}
        Actor::Client { .. } => {
            return Err(AppError::Forbidden(
                "only the mission owner can cancel".to_string(),
            ));
        }
        Actor::Partner { .. } => {
            return Err(AppError::Forbidden(
                "partners release a mission through the acceptance window".to_string(),
            ));
        }
    }

    mission.partner_id = None;
    mission.status = MissionStatus::Cancelled;
    Ok(())
}

fn ensure_assigned_to(mission: &Mission, partner_id: Uuid) -> Result<(), AppError> {
    match mission.partner_id {
        Some(assigned) if assigned == partner_id => Ok(()),
        _ => Err(AppError::Forbidden(
            "mission is assigned to another partner".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{accept, cancel, collect, deliver, revert_acceptance, start_transit};
    use crate::error::AppError;
    use crate::models::mission::{Actor, GeoPoint, Mission, MissionStatus, PackageSize};

    fn pending_mission() -> Mission {
        Mission {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            partner_id: None,
            package_title: "plant pot".to_string(),
            package_size: PackageSize::Large,
            pickup: GeoPoint { lat: 48.8566, lng: 2.3522 },
            pickup_address: "12 rue Oberkampf".to_string(),
            dropoff: GeoPoint { lat: 48.8606, lng: 2.3376 },
            delivery_address: "99 rue de Rivoli".to_string(),
            pickup_time_slot: "14:00 - 16:00".to_string(),
            price: PackageSize::Large.price_eur(),
            commission: 2.4,
            status: MissionStatus::Pending,
            pickup_token: "pickup-token".to_string(),
            delivery_token: "delivery-token".to_string(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn partner_link_holds_across_the_full_walk() {
        let mut mission = pending_mission();
        let partner = Uuid::new_v4();
        assert!(mission.partner_link_consistent());

        accept(&mut mission, partner).unwrap();
        assert!(mission.partner_link_consistent());

        collect(&mut mission, partner, "pickup-token").unwrap();
        assert!(mission.partner_link_consistent());

        start_transit(&mut mission, partner).unwrap();
        assert!(mission.partner_link_consistent());

        deliver(&mut mission, partner, "delivery-token").unwrap();
        assert!(mission.partner_link_consistent());
        assert_eq!(mission.status, MissionStatus::Delivered);
    }

    #[test]
    fn partner_link_holds_through_revert_and_cancel() {
        let mut mission = pending_mission();
        let partner = Uuid::new_v4();

        accept(&mut mission, partner).unwrap();
        revert_acceptance(&mut mission, partner).unwrap();
        assert!(mission.partner_link_consistent());
        assert_eq!(mission.status, MissionStatus::Pending);
        assert!(mission.partner_id.is_none());

        accept(&mut mission, partner).unwrap();
        cancel(&mut mission, Actor::Admin).unwrap();
        assert!(mission.partner_link_consistent());
        assert_eq!(mission.status, MissionStatus::Cancelled);
        assert!(mission.partner_id.is_none());
    }

    #[test]
    fn second_accept_sees_mission_taken() {
        let mut mission = pending_mission();

        accept(&mut mission, Uuid::new_v4()).unwrap();
        let err = accept(&mut mission, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn completed_at_set_only_on_delivery() {
        let mut mission = pending_mission();
        let partner = Uuid::new_v4();

        accept(&mut mission, partner).unwrap();
        assert!(mission.completed_at.is_none());
        collect(&mut mission, partner, "pickup-token").unwrap();
        assert!(mission.completed_at.is_none());

        deliver(&mut mission, partner, "delivery-token").unwrap();
        assert!(mission.completed_at.is_some());
    }

    #[test]
    fn delivery_is_allowed_straight_from_collected() {
        let mut mission = pending_mission();
        let partner = Uuid::new_v4();

        accept(&mut mission, partner).unwrap();
        collect(&mut mission, partner, "pickup-token").unwrap();
        deliver(&mut mission, partner, "delivery-token").unwrap();
        assert_eq!(mission.status, MissionStatus::Delivered);
    }

    #[test]
    fn wrong_scan_leaves_status_untouched() {
        let mut mission = pending_mission();
        let partner = Uuid::new_v4();

        accept(&mut mission, partner).unwrap();
        let err = collect(&mut mission, partner, "not-the-token").unwrap_err();
        assert!(matches!(err, AppError::VerificationMismatch("pickup")));
        assert_eq!(mission.status, MissionStatus::Accepted);

        collect(&mut mission, partner, "pickup-token").unwrap();
        let err = deliver(&mut mission, partner, "pickup-token").unwrap_err();
        assert!(matches!(err, AppError::VerificationMismatch("delivery")));
        assert_eq!(mission.status, MissionStatus::Collected);
    }

    #[test]
    fn only_the_assigned_partner_can_advance() {
        let mut mission = pending_mission();
        let partner = Uuid::new_v4();

        accept(&mut mission, partner).unwrap();
        let intruder = Uuid::new_v4();
        assert!(matches!(
            collect(&mut mission, intruder, "pickup-token"),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            revert_acceptance(&mut mission, intruder),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn cancellation_is_blocked_after_collection() {
        let mut mission = pending_mission();
        let partner = Uuid::new_v4();
        let owner = Actor::Client { id: mission.client_id };

        accept(&mut mission, partner).unwrap();
        collect(&mut mission, partner, "pickup-token").unwrap();

        assert!(matches!(
            cancel(&mut mission, owner),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            cancel(&mut mission, Actor::Admin),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn stranger_cannot_cancel_someone_elses_mission() {
        let mut mission = pending_mission();

        let err = cancel(&mut mission, Actor::Client { id: Uuid::new_v4() }).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(mission.status, MissionStatus::Pending);
    }

    #[test]
    fn transit_requires_collected() {
        let mut mission = pending_mission();
        let partner = Uuid::new_v4();

        accept(&mut mission, partner).unwrap();
        assert!(matches!(
            start_transit(&mut mission, partner),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn delivered_mission_rejects_further_transitions() {
        let mut mission = pending_mission();
        let partner = Uuid::new_v4();

        accept(&mut mission, partner).unwrap();
        collect(&mut mission, partner, "pickup-token").unwrap();
        deliver(&mut mission, partner, "delivery-token").unwrap();

        assert!(matches!(
            deliver(&mut mission, partner, "delivery-token"),
            Err(AppError::InvalidTransition(_))
        ));
        assert!(matches!(
            cancel(&mut mission, Actor::Admin),
            Err(AppError::InvalidTransition(_))
        ));
    }
}
