use crate::models::mission::{AvailableMission, GeoPoint, Mission};

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

/// Missions whose pickup lies within `radius_km` of `origin`, closest first.
/// Records with out-of-range or non-finite coordinates are skipped rather
/// than failing the whole query.
pub fn find_nearby(origin: &GeoPoint, radius_km: f64, candidates: &[Mission]) -> Vec<AvailableMission> {
    let mut nearby: Vec<(f64, Mission)> = candidates
        .iter()
        .filter(|mission| mission.pickup.in_range())
        .filter_map(|mission| {
            let distance = haversine_km(origin, &mission.pickup);
            (distance <= radius_km).then(|| (distance, mission.clone()))
        })
        .collect();

    nearby.sort_by(|a, b| a.0.total_cmp(&b.0));

    nearby
        .into_iter()
        .map(|(distance, mission)| AvailableMission {
            mission,
            distance_km: round_to_tenth(distance),
        })
        .collect()
}

fn round_to_tenth(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{find_nearby, haversine_km};
    use crate::models::mission::{GeoPoint, Mission, MissionStatus, PackageSize};

    fn pending_mission_at(lat: f64, lng: f64) -> Mission {
        Mission {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            partner_id: None,
            package_title: "test-package".to_string(),
            package_size: PackageSize::Small,
            pickup: GeoPoint { lat, lng },
            pickup_address: "pickup".to_string(),
            dropoff: GeoPoint { lat: lat + 0.01, lng: lng + 0.01 },
            delivery_address: "delivery".to_string(),
            pickup_time_slot: "08:00 - 10:00".to_string(),
            price: PackageSize::Small.price_eur(),
            commission: 1.0,
            status: MissionStatus::Pending,
            pickup_token: "pt".to_string(),
            delivery_token: "dt".to_string(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint {
            lat: 53.5511,
            lng: 9.9937,
        };
        let distance = haversine_km(&p, &p);
        assert!(distance < 1e-9);
    }

    #[test]
    fn london_to_paris_is_around_343_km() {
        let london = GeoPoint {
            lat: 51.5074,
            lng: -0.1278,
        };
        let paris = GeoPoint {
            lat: 48.8566,
            lng: 2.3522,
        };
        let distance = haversine_km(&london, &paris);
        assert!((distance - 343.0).abs() < 5.0);
    }

    #[test]
    fn orders_by_distance_and_drops_malformed_candidates() {
        let origin = GeoPoint {
            lat: 48.8566,
            lng: 2.3522,
        };

        // ~0.9 km and ~0.3 km due north of the origin, plus an invalid latitude.
        let far = pending_mission_at(48.8647, 2.3522);
        let near = pending_mission_at(48.8593, 2.3522);
        let malformed = pending_mission_at(91.0, 2.0);
        let candidates = vec![far.clone(), malformed, near.clone()];

        let result = find_nearby(&origin, 1.0, &candidates);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].mission.id, near.id);
        assert_eq!(result[1].mission.id, far.id);
        assert_eq!(result[0].distance_km, 0.3);
        assert_eq!(result[1].distance_km, 0.9);
    }

    #[test]
    fn excludes_candidates_beyond_radius() {
        let origin = GeoPoint {
            lat: 48.8566,
            lng: 2.3522,
        };
        // ~2.2 km north.
        let out_of_reach = pending_mission_at(48.8766, 2.3522);

        let result = find_nearby(&origin, 1.0, &[out_of_reach]);
        assert!(result.is_empty());
    }
}
