use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::mission::Mission;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    Pickup,
    Delivery,
}

impl Checkpoint {
    pub fn label(self) -> &'static str {
        match self {
            Checkpoint::Pickup => "pickup",
            Checkpoint::Delivery => "delivery",
        }
    }
}

pub fn issue_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Byte-exact comparison of a scanned payload against the token issued for
/// the checkpoint. Pure comparison; the scanning hardware stays outside and
/// tests feed literal strings.
pub fn verify(mission: &Mission, scanned_payload: &str, checkpoint: Checkpoint) -> Result<(), AppError> {
    let expected = match checkpoint {
        Checkpoint::Pickup => &mission.pickup_token,
        Checkpoint::Delivery => &mission.delivery_token,
    };

    if scanned_payload.as_bytes() == expected.as_bytes() {
        Ok(())
    } else {
        Err(AppError::VerificationMismatch(checkpoint.label()))
    }
}
