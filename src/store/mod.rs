pub mod debounce;
pub mod memory;
pub mod migrations;
pub mod sqlite;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::trips::{AnalyzedTrip, TripRequest, UserContext};

pub use debounce::DebouncedSaver;
pub use memory::MemoryStateStore;
pub use sqlite::SqliteStateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateKey {
    Context,
    Trips,
    Plan,
}

impl StateKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Context => "dt_context",
            Self::Trips => "dt_trips_raw",
            Self::Plan => "dt_plan",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed encoding state: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("value for {key} is {bytes} bytes, over the {limit} byte quota")]
    QuotaExceeded {
        key: &'static str,
        bytes: usize,
        limit: usize,
    },
    #[error("state store lock poisoned")]
    Poisoned,
}

/// Key-value persistence used by the planner.
pub trait StatePort: Send + Sync {
    fn get(&self, key: StateKey) -> Result<Option<String>, StoreError>;
    fn put(&self, key: StateKey, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: StateKey) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersistedState {
    pub context: UserContext,
    pub trips: Vec<TripRequest>,
    /// Light plan: image payloads are never persisted.
    pub plan: Vec<AnalyzedTrip>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    PlanDropped,
}

/// Reads all keys. Missing keys fall back to defaults; unreadable JSON is logged
/// and treated as missing.
pub fn load_state(
    port: &dyn StatePort,
    default_context: UserContext,
) -> Result<PersistedState, StoreError> {
    Ok(PersistedState {
        context: read_key(port, StateKey::Context)?.unwrap_or(default_context),
        trips: read_key(port, StateKey::Trips)?.unwrap_or_default(),
        plan: read_key(port, StateKey::Plan)?.unwrap_or_default(),
    })
}

fn read_key<T: DeserializeOwned>(port: &dyn StatePort, key: StateKey) -> Result<Option<T>, StoreError> {
    let Some(raw) = port.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            warn!("ignoring unreadable {} state: {err}", key.as_str());
            Ok(None)
        }
    }
}

/// Writes all keys. A quota failure removes the plan key instead of failing.
pub fn save_state(port: &dyn StatePort, state: &PersistedState) -> Result<SaveOutcome, StoreError> {
    let plan = state
        .plan
        .iter()
        .cloned()
        .map(|mut trip| {
            trip.image_url = None;
            trip
        })
        .collect::<Vec<_>>();
    let writes = [
        (StateKey::Context, serde_json::to_string(&state.context)?),
        (StateKey::Trips, serde_json::to_string(&state.trips)?),
        (StateKey::Plan, serde_json::to_string(&plan)?),
    ];
    for (key, value) in &writes {
        match port.put(*key, value) {
            Ok(()) => {}
            Err(err @ StoreError::QuotaExceeded { .. }) => {
                warn!("{err}; dropping saved plan");
                port.remove(StateKey::Plan)?;
                return Ok(SaveOutcome::PlanDropped);
            }
            Err(err) => return Err(err),
        }
    }
    debug!(
        "saved state: {} trip(s), {} planned",
        state.trips.len(),
        state.plan.len()
    );
    Ok(SaveOutcome::Saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trips::fixtures::{context, request, trip};

    #[test]
    fn missing_and_corrupt_keys_fall_back() {
        let store = MemoryStateStore::new();
        store.put(StateKey::Trips, "{not json").unwrap();
        let state = load_state(&store, context(10.0, 20.0)).unwrap();
        assert_eq!(state.context, context(10.0, 20.0));
        assert!(state.trips.is_empty());
        assert!(state.plan.is_empty());
    }

    #[test]
    fn saved_plan_is_light() {
        let store = MemoryStateStore::new();
        let mut planned = trip("a", 100.0, Some(2));
        planned.image_url = Some("data:image/png;base64,AAAA".to_string());
        let state = PersistedState {
            context: context(1.0, 2.0),
            trips: vec![request("a", "Roma")],
            plan: vec![planned],
        };
        assert_eq!(save_state(&store, &state).unwrap(), SaveOutcome::Saved);

        let raw = store.get(StateKey::Plan).unwrap().unwrap();
        assert!(!raw.contains("imageUrl"));
        let loaded = load_state(&store, UserContext::default()).unwrap();
        assert_eq!(loaded.trips, state.trips);
        assert_eq!(loaded.plan[0].planned_month, state.plan[0].planned_month);
    }

    #[test]
    fn quota_failure_drops_only_the_plan() {
        let store = MemoryStateStore::with_quota(400);
        store.put(StateKey::Plan, "[]").unwrap();
        let state = PersistedState {
            context: context(1.0, 2.0),
            trips: vec![request("a", "Roma")],
            plan: (0..10).map(|i| trip(&i.to_string(), 5.0, Some(1))).collect(),
        };
        assert_eq!(save_state(&store, &state).unwrap(), SaveOutcome::PlanDropped);
        assert!(store.get(StateKey::Plan).unwrap().is_none());
        assert!(store.get(StateKey::Context).unwrap().is_some());
        assert!(store.get(StateKey::Trips).unwrap().is_some());
    }
}
