use dashmap::DashMap;
use serde::Serialize;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::AppError;

pub const CANCEL_WINDOW_SEC: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WindowState {
    Idle,
    Counting { remaining_secs: u64 },
    Expired,
}

#[derive(Debug)]
struct Window {
    partner_id: Uuid,
    deadline: Instant,
}

/// Per-mission acceptance windows. Deadlines are checked lazily; an expired
/// window never reverts the acceptance, it only stops offering the reversal.
pub struct GraceWindows {
    windows: DashMap<Uuid, Window>,
    duration: Duration,
}

impl GraceWindows {
    pub fn new(window_secs: u64) -> Self {
        Self {
            windows: DashMap::new(),
            duration: Duration::from_secs(window_secs),
        }
    }

    pub fn start(&self, mission_id: Uuid, partner_id: Uuid) {
        self.windows.insert(
            mission_id,
            Window {
                partner_id,
                deadline: Instant::now() + self.duration,
            },
        );
    }

    pub fn state(&self, mission_id: Uuid) -> WindowState {
        match self.windows.get(&mission_id) {
            None => WindowState::Idle,
            Some(window) => {
                let remaining = window.deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    WindowState::Expired
                } else {
                    WindowState::Counting {
                        remaining_secs: remaining.as_secs_f64().ceil() as u64,
                    }
                }
            }
        }
    }

    /// Consumes the window for an in-window cancellation. Valid only while
    /// the countdown is still running and only for the accepting partner.
    pub fn consume(&self, mission_id: Uuid, partner_id: Uuid) -> Result<(), AppError> {
        {
            let window = self
                .windows
                .get(&mission_id)
                .ok_or(AppError::WindowExpired)?;

            if window.partner_id != partner_id {
                return Err(AppError::Forbidden(
                    "cancellation window belongs to another partner".to_string(),
                ));
            }

            if Instant::now() >= window.deadline {
                return Err(AppError::WindowExpired);
            }
        }

        self.windows.remove(&mission_id);
        Ok(())
    }

    /// Drops any window for the mission, e.g. when the mission is cancelled
    /// underneath it or moves past pickup.
    pub fn clear(&self, mission_id: Uuid) {
        self.windows.remove(&mission_id);
    }
}
