use crate::projector::PlanSummary;
use crate::trips::{AnalyzedTrip, UserContext};

/// Whole-year check, independent of which month each trip lands in.
pub fn summarize(context: &UserContext, trips: &[AnalyzedTrip]) -> PlanSummary {
    let total_cost = total_cost(trips);
    let projected_funds = context.projected_funds();
    PlanSummary {
        total_cost,
        projected_funds,
        final_balance: projected_funds - total_cost,
        viable: projected_funds >= total_cost,
    }
}

pub fn total_cost(trips: &[AnalyzedTrip]) -> f64 {
    trips.iter().map(AnalyzedTrip::effective_cost).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trips::fixtures::{context, trip};

    #[test]
    fn viability_does_not_depend_on_month_assignment() {
        let ctx = context(1000.0, 500.0);
        let january = vec![trip("a", 3000.0, Some(0)), trip("b", 4000.0, Some(0))];
        let spread = vec![trip("a", 3000.0, Some(5)), trip("b", 4000.0, None)];

        let first = summarize(&ctx, &january);
        let second = summarize(&ctx, &spread);
        assert_eq!(first, second);
        assert!(first.viable);
        assert!((first.final_balance - 0.0).abs() < 1e-9);
    }

    #[test]
    fn over_budget_plan_is_not_viable() {
        let ctx = context(0.0, 100.0);
        let summary = summarize(&ctx, &[trip("a", 1200.01, None)]);
        assert!(!summary.viable);
        assert!(summary.final_balance < 0.0);
    }
}
