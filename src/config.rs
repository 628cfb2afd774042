use std::env;

use crate::error::AppError;
use crate::lifecycle::grace::CANCEL_WINDOW_SEC;
use crate::models::mission::GeoPoint;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub cancel_window_secs: u64,
    pub default_radius_km: f64,
    pub fallback_lat: f64,
    pub fallback_lng: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            cancel_window_secs: parse_or_default("CANCEL_WINDOW_SECS", CANCEL_WINDOW_SEC)?,
            default_radius_km: parse_or_default("DEFAULT_RADIUS_KM", 1.0)?,
            // Search origin used when a caller cannot supply a location.
            fallback_lat: parse_or_default("FALLBACK_LAT", 48.8566)?,
            fallback_lng: parse_or_default("FALLBACK_LNG", 2.3522)?,
        })
    }

    pub fn fallback_origin(&self) -> GeoPoint {
        GeoPoint {
            lat: self.fallback_lat,
            lng: self.fallback_lng,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
