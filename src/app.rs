use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::PlannerError;
use crate::gemini::{analyze_trips, AnalysisOutcome, GenerativeBackend};
use crate::plan::{ImageApply, ImageArrival, ImageRequest, Plan};
use crate::projector::{project, Projection};
use crate::store::PersistedState;
use crate::trips::{
    AnalyzedTrip, BreakdownComponent, Month, TripDraft, TripRequest, UserContext,
};

/// Partial context edit; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUpdate {
    #[serde(default)]
    pub origin_country: Option<String>,
    #[serde(default)]
    pub monthly_savings: Option<f64>,
    #[serde(default)]
    pub initial_savings: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Everything the user has entered plus the current plan.
#[derive(Debug, Clone)]
pub struct Planner {
    context: UserContext,
    trips: Vec<TripRequest>,
    plan: Plan,
    next_epoch: u64,
}

impl Planner {
    pub fn new(context: UserContext) -> Self {
        Self {
            context,
            trips: Vec::new(),
            plan: Plan::default(),
            next_epoch: 1,
        }
    }

    pub fn from_state(state: PersistedState) -> Self {
        let mut planner = Self::new(state.context);
        planner.trips = state.trips;
        if !state.plan.is_empty() {
            planner.install_plan(state.plan);
        }
        planner
    }

    pub fn context(&self) -> &UserContext {
        &self.context
    }

    pub fn trips(&self) -> &[TripRequest] {
        &self.trips
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            context: self.context.clone(),
            trips: self.trips.clone(),
            plan: self.plan.light(),
        }
    }

    pub fn update_context(&mut self, update: ContextUpdate) -> Result<&UserContext, PlannerError> {
        for amount in [update.monthly_savings, update.initial_savings].into_iter().flatten() {
            if !amount.is_finite() || amount < 0.0 {
                return Err(PlannerError::InvalidAmount(amount));
            }
        }
        if let Some(origin) = update.origin_country {
            self.context.origin_country = origin.trim().to_string();
        }
        if let Some(monthly) = update.monthly_savings {
            self.context.monthly_savings = monthly;
        }
        if let Some(initial) = update.initial_savings {
            self.context.initial_savings = initial;
        }
        if let Some(currency) = update.currency {
            self.context.currency = currency.trim().to_string();
        }
        Ok(&self.context)
    }

    pub fn add_trip(&mut self, draft: TripDraft) -> Result<&TripRequest, PlannerError> {
        let request = draft.into_request()?;
        info!("added trip {} ({})", request.name, request.id);
        self.trips.push(request);
        Ok(&self.trips[self.trips.len() - 1])
    }

    pub fn remove_trip(&mut self, trip_id: &str) -> Result<TripRequest, PlannerError> {
        let position = self
            .trips
            .iter()
            .position(|trip| trip.id == trip_id)
            .ok_or_else(|| PlannerError::UnknownTrip(trip_id.to_string()))?;
        Ok(self.trips.remove(position))
    }

    pub fn ensure_ready_for_analysis(&self) -> Result<(), PlannerError> {
        if self.trips.is_empty() {
            return Err(PlannerError::EmptyTripList);
        }
        Ok(())
    }

    /// Replaces the plan under a fresh epoch and returns that epoch.
    pub fn install_plan(&mut self, trips: Vec<AnalyzedTrip>) -> u64 {
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        self.plan = Plan::new(epoch, trips);
        epoch
    }

    pub fn apply_image(&mut self, arrival: ImageArrival) -> ImageApply {
        self.plan.apply_image(arrival)
    }

    pub fn reassign_month(
        &mut self,
        trip_id: &str,
        month: Option<Month>,
    ) -> Result<&AnalyzedTrip, PlannerError> {
        self.plan.reassign_month(trip_id, month)
    }

    pub fn update_breakdown(
        &mut self,
        trip_id: &str,
        component: BreakdownComponent,
        value: f64,
    ) -> Result<&AnalyzedTrip, PlannerError> {
        self.plan.update_breakdown(trip_id, component, value)
    }

    pub fn projection(&self) -> Projection {
        project(&self.context, &self.plan.trips)
    }

    pub fn image_requests(&self) -> Vec<ImageRequest> {
        self.plan.missing_images()
    }

    /// Analyzes the current trips and installs the result.
    pub async fn run_analysis(
        &mut self,
        backend: &dyn GenerativeBackend,
    ) -> Result<AnalysisOutcome, PlannerError> {
        let outcome = analyze(backend, &self.context, &self.trips).await?;
        self.install_plan(outcome.trips.clone());
        Ok(outcome)
    }
}

/// Runs the estimation gateway, collapsing its failures into the user-facing
/// analysis error after logging the cause.
pub async fn analyze(
    backend: &dyn GenerativeBackend,
    context: &UserContext,
    trips: &[TripRequest],
) -> Result<AnalysisOutcome, PlannerError> {
    if trips.is_empty() {
        return Err(PlannerError::EmptyTripList);
    }
    analyze_trips(backend, context, trips).await.map_err(|err| {
        error!("trip analysis failed: {err}");
        PlannerError::AnalysisFailed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::fake::EchoBackend;
    use crate::trips::fixtures::{context, trip};

    #[test]
    fn trip_list_edits() {
        let mut planner = Planner::new(context(0.0, 100.0));
        assert!(matches!(
            planner.add_trip(TripDraft::named("   ")),
            Err(PlannerError::InvalidTrip(_))
        ));
        let id = planner.add_trip(TripDraft::named(" Bogotá ")).unwrap().id.clone();
        assert_eq!(planner.trips()[0].name, "Bogotá");
        assert_eq!(planner.trips()[0].days, 3);

        assert!(matches!(planner.remove_trip("nope"), Err(PlannerError::UnknownTrip(_))));
        planner.remove_trip(&id).unwrap();
        assert!(planner.trips().is_empty());
    }

    #[test]
    fn context_updates_are_partial_and_validated() {
        let mut planner = Planner::new(context(1000.0, 500.0));
        planner
            .update_context(ContextUpdate {
                currency: Some("€".to_string()),
                ..ContextUpdate::default()
            })
            .unwrap();
        assert_eq!(planner.context().currency, "€");
        assert!((planner.context().monthly_savings - 500.0).abs() < 1e-9);

        let rejected = planner.update_context(ContextUpdate {
            monthly_savings: Some(f64::NAN),
            origin_country: Some("Chile".to_string()),
            ..ContextUpdate::default()
        });
        assert!(matches!(rejected, Err(PlannerError::InvalidAmount(_))));
        assert_eq!(planner.context().origin_country, "México");
    }

    #[tokio::test]
    async fn empty_trip_list_never_reaches_the_model() {
        let mut planner = Planner::new(context(0.0, 100.0));
        let backend = EchoBackend::new();
        let err = planner.run_analysis(&backend).await.unwrap_err();
        assert!(matches!(err, PlannerError::EmptyTripList));
        assert_eq!(err.to_string(), "Danos una señal de tus sueños. Añade un destino.");
        assert_eq!(backend.text_calls(), 0);
    }

    #[tokio::test]
    async fn gateway_failure_collapses_to_generic_message() {
        let mut planner = Planner::new(context(0.0, 100.0));
        planner.add_trip(TripDraft::named("Cusco")).unwrap();
        let err = planner.run_analysis(&EchoBackend::failing()).await.unwrap_err();
        assert!(matches!(err, PlannerError::AnalysisFailed));
        assert_eq!(err.to_string(), "Estamos ajustando las estrellas. Intenta de nuevo.");
        assert!(planner.plan().is_empty());
    }

    #[tokio::test]
    async fn reanalysis_bumps_epoch_and_ignores_old_images() {
        let mut planner = Planner::new(context(0.0, 100.0));
        planner.add_trip(TripDraft::named("Cusco")).unwrap();
        planner.add_trip(TripDraft::named("Lima")).unwrap();
        let backend = EchoBackend::new();

        planner.run_analysis(&backend).await.unwrap();
        let first = planner.image_requests();
        assert_eq!(first.len(), 2);

        let outcome = planner.run_analysis(&backend).await.unwrap();
        assert!(outcome.omitted.is_empty());
        let second_epoch = planner.plan().epoch;
        assert!(second_epoch > first[0].epoch);

        let stale = ImageArrival {
            epoch: first[0].epoch,
            trip_id: first[0].trip_id.clone(),
            image_url: "data:image/png;base64,AAAA".to_string(),
        };
        assert_eq!(planner.apply_image(stale), ImageApply::Stale);
        assert_eq!(planner.image_requests().len(), 2);

        let projection = planner.projection();
        assert!((projection.summary.total_cost - 400.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_round_trip_restores_plan() {
        let mut planner = Planner::new(context(10.0, 10.0));
        let mut pictured = trip("a", 50.0, Some(3));
        pictured.image_url = Some("data:image/png;base64,AAAA".to_string());
        planner.install_plan(vec![pictured]);

        let snapshot = planner.snapshot();
        assert!(snapshot.plan[0].image_url.is_none());

        let restored = Planner::from_state(snapshot);
        assert_eq!(restored.plan().trips.len(), 1);
        assert_eq!(restored.image_requests().len(), 1);
        assert!(restored.plan().get("a").is_some());
    }
}
