use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::trips::schema::{Importance, Month, TravelMethod, TripRequest};

pub const DEFAULT_DAYS: u32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("trip name is required")]
    EmptyName,
    #[error("trip must last at least one day")]
    ZeroDays,
}

/// Raw form input for a new trip. Missing fields fall back to the form defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDraft {
    pub name: String,
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default = "default_method")]
    pub method: TravelMethod,
    #[serde(default = "default_importance")]
    pub importance: Importance,
    #[serde(default)]
    pub preferred_month: Option<Month>,
}

impl TripDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            days: DEFAULT_DAYS,
            method: default_method(),
            importance: default_importance(),
            preferred_month: None,
        }
    }

    pub fn into_request(self) -> Result<TripRequest, IntakeError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(IntakeError::EmptyName);
        }
        if self.days == 0 {
            return Err(IntakeError::ZeroDays);
        }
        Ok(TripRequest {
            id: new_trip_id(),
            name: name.to_string(),
            days: self.days,
            method: self.method,
            importance: self.importance,
            preferred_month: self.preferred_month,
        })
    }
}

pub fn new_trip_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn default_days() -> u32 {
    DEFAULT_DAYS
}

fn default_method() -> TravelMethod {
    TravelMethod::Flight
}

fn default_importance() -> Importance {
    Importance::Medium
}
