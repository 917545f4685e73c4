use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PlannerError;
use crate::trips::{AnalyzedTrip, BreakdownComponent, Month};

/// Trips shown on the vision board.
pub const BOARD_CAPACITY: usize = 12;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub epoch: u64,
    pub trips: Vec<AnalyzedTrip>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageRequest {
    pub epoch: u64,
    pub trip_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageArrival {
    pub epoch: u64,
    pub trip_id: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageApply {
    Applied,
    Stale,
    UnknownTrip,
}

impl Plan {
    pub fn new(epoch: u64, trips: Vec<AnalyzedTrip>) -> Self {
        Self { epoch, trips }
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    pub fn get(&self, trip_id: &str) -> Option<&AnalyzedTrip> {
        self.trips.iter().find(|trip| trip.id() == trip_id)
    }

    fn get_mut(&mut self, trip_id: &str) -> Result<&mut AnalyzedTrip, PlannerError> {
        if self.trips.is_empty() {
            return Err(PlannerError::NoPlan);
        }
        self.trips
            .iter_mut()
            .find(|trip| trip.id() == trip_id)
            .ok_or_else(|| PlannerError::UnknownTrip(trip_id.to_string()))
    }

    pub fn reassign_month(
        &mut self,
        trip_id: &str,
        month: Option<Month>,
    ) -> Result<&AnalyzedTrip, PlannerError> {
        let trip = self.get_mut(trip_id)?;
        trip.planned_month = month;
        Ok(trip)
    }

    /// Sets one cost component and pins the trip's cost to the breakdown total.
    pub fn update_breakdown(
        &mut self,
        trip_id: &str,
        component: BreakdownComponent,
        value: f64,
    ) -> Result<&AnalyzedTrip, PlannerError> {
        if !value.is_finite() || value < 0.0 {
            return Err(PlannerError::InvalidAmount(value));
        }
        let trip = self.get_mut(trip_id)?;
        let mut breakdown = trip.breakdown.unwrap_or_default();
        breakdown.set(component, value);
        trip.manual_cost = Some(breakdown.total());
        trip.breakdown = Some(breakdown);
        Ok(trip)
    }

    pub fn apply_image(&mut self, arrival: ImageArrival) -> ImageApply {
        if arrival.epoch != self.epoch {
            warn!(
                "discarding image for trip {} from plan epoch {} (current {})",
                arrival.trip_id, arrival.epoch, self.epoch
            );
            return ImageApply::Stale;
        }
        match self.trips.iter_mut().find(|trip| trip.id() == arrival.trip_id) {
            Some(trip) => {
                debug!("image attached to trip {}", arrival.trip_id);
                trip.image_url = Some(arrival.image_url);
                ImageApply::Applied
            }
            None => ImageApply::UnknownTrip,
        }
    }

    pub fn missing_images(&self) -> Vec<ImageRequest> {
        self.trips
            .iter()
            .filter(|trip| trip.image_url.is_none())
            .map(|trip| ImageRequest {
                epoch: self.epoch,
                trip_id: trip.id().to_string(),
                name: trip.name().to_string(),
            })
            .collect()
    }

    /// Copy of the trips with image payloads stripped, for persistence.
    pub fn light(&self) -> Vec<AnalyzedTrip> {
        self.trips
            .iter()
            .cloned()
            .map(|mut trip| {
                trip.image_url = None;
                trip
            })
            .collect()
    }

    /// Trips ordered by displayed month (stable), capped at the board capacity.
    pub fn board_order(&self) -> Vec<&AnalyzedTrip> {
        let mut ordered = self.by_display_month();
        ordered.truncate(BOARD_CAPACITY);
        ordered
    }

    pub fn by_display_month(&self) -> Vec<&AnalyzedTrip> {
        let mut ordered = self.trips.iter().collect::<Vec<_>>();
        ordered.sort_by_key(|trip| trip.display_month());
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trips::fixtures::trip;

    fn plan() -> Plan {
        Plan::new(
            3,
            vec![trip("a", 1000.0, Some(4)), trip("b", 800.0, None), trip("c", 500.0, Some(1))],
        )
    }

    #[test]
    fn breakdown_edit_sets_manual_cost_to_component_sum() {
        let mut plan = plan();
        plan.update_breakdown("a", BreakdownComponent::Flight, 300.0).unwrap();
        let trip = plan
            .update_breakdown("a", BreakdownComponent::Food, 120.0)
            .unwrap();
        assert_eq!(trip.manual_cost, Some(420.0));
        assert!((trip.effective_cost() - 420.0).abs() < 1e-9);
    }

    #[test]
    fn edits_reject_unknown_trip_and_bad_amounts() {
        let mut plan = plan();
        assert!(matches!(
            plan.reassign_month("zzz", Month::new(2)),
            Err(PlannerError::UnknownTrip(_))
        ));
        assert!(matches!(
            plan.update_breakdown("a", BreakdownComponent::Stay, -1.0),
            Err(PlannerError::InvalidAmount(_))
        ));
        let mut empty = Plan::default();
        assert!(matches!(
            empty.reassign_month("a", None),
            Err(PlannerError::NoPlan)
        ));
    }

    #[test]
    fn stale_image_arrivals_are_discarded() {
        let mut plan = plan();
        let stale = ImageArrival {
            epoch: 2,
            trip_id: "a".to_string(),
            image_url: "data:image/png;base64,AAAA".to_string(),
        };
        assert_eq!(plan.apply_image(stale), ImageApply::Stale);
        assert!(plan.get("a").unwrap().image_url.is_none());

        let fresh = ImageArrival {
            epoch: 3,
            trip_id: "a".to_string(),
            image_url: "data:image/png;base64,AAAA".to_string(),
        };
        assert_eq!(plan.apply_image(fresh), ImageApply::Applied);
        assert_eq!(plan.missing_images().len(), 2);
        assert!(plan.light().iter().all(|trip| trip.image_url.is_none()));
    }

    #[test]
    fn board_order_sorts_unscheduled_as_january_and_caps() {
        let plan = plan();
        let ordered = plan.board_order();
        let ids = ordered.iter().map(|trip| trip.id()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let many = Plan::new(1, (0..15).map(|i| trip(&i.to_string(), 10.0, Some((i % 12) as u8))).collect());
        assert_eq!(many.board_order().len(), BOARD_CAPACITY);
    }
}
