pub mod monthly;
pub mod viability;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::trips::{AnalyzedTrip, Month, UserContext};

pub use monthly::project_months;
pub use viability::summarize;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthPoint {
    pub month: Month,
    pub name: String,
    pub cost: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripVerdict {
    pub month: Month,
    pub affordable: bool,
    pub shortfall: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub total_cost: f64,
    pub projected_funds: f64,
    pub final_balance: f64,
    pub viable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub months: Vec<MonthPoint>,
    pub verdicts: BTreeMap<String, TripVerdict>,
    pub summary: PlanSummary,
}

impl Projection {
    /// Monthly verdict for a trip. `None` for trips without an assigned month.
    pub fn verdict(&self, trip_id: &str) -> Option<&TripVerdict> {
        self.verdicts.get(trip_id)
    }

    pub fn ending_balance(&self) -> f64 {
        self.months.last().map(|point| point.balance).unwrap_or_default()
    }
}

pub fn project(context: &UserContext, trips: &[AnalyzedTrip]) -> Projection {
    let (months, verdicts) = project_months(context, trips);
    Projection {
        months,
        verdicts,
        summary: summarize(context, trips),
    }
}
