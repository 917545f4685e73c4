pub mod intake;
pub mod schema;

pub use intake::{IntakeError, TripDraft};
pub use schema::{
    AnalyzedTrip, BreakdownComponent, Complexity, CostBreakdown, CostMagnitude, CostRange,
    Importance, Month, MonthParseError, ParseKindError, RecommendationStatus, SeasonalLevel,
    TravelMethod, TripRequest, UserContext,
};

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn request(id: &str, name: &str) -> TripRequest {
        TripRequest {
            id: id.to_string(),
            name: name.to_string(),
            days: 5,
            method: TravelMethod::Flight,
            importance: Importance::Medium,
            preferred_month: None,
        }
    }

    /// Analyzed trip whose effective cost is exactly `cost`.
    pub fn trip(id: &str, cost: f64, month: Option<u8>) -> AnalyzedTrip {
        AnalyzedTrip {
            request: request(id, &format!("Destino {id}")),
            is_international: false,
            cost_magnitude: CostMagnitude::Medium,
            estimated_cost_range: CostRange {
                min: cost,
                max: cost,
            },
            manual_cost: None,
            breakdown: None,
            tourist_places: vec!["Plaza".to_string()],
            complexity: Complexity::Simple,
            seasonality: "todo el año".to_string(),
            seasonal_level: SeasonalLevel::Medium,
            experience_description: format!("Experiencia en {id}"),
            recommendation: RecommendationStatus::Recommended,
            reasoning: String::new(),
            planned_month: month.and_then(Month::new),
            image_url: None,
        }
    }

    pub fn context(initial: f64, monthly: f64) -> UserContext {
        UserContext {
            origin_country: "México".to_string(),
            monthly_savings: monthly,
            initial_savings: initial,
            currency: "$".to_string(),
        }
    }
}
