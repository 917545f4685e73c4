use std::collections::BTreeMap;

use crate::projector::{MonthPoint, TripVerdict};
use crate::trips::{AnalyzedTrip, Month, UserContext};

/// Single left-to-right pass over the calendar. Savings land before the month's
/// trips are paid, and the post-trip balance carries into the next month.
pub fn project_months(
    context: &UserContext,
    trips: &[AnalyzedTrip],
) -> (Vec<MonthPoint>, BTreeMap<String, TripVerdict>) {
    let mut running = context.initial_savings;
    let mut points = Vec::with_capacity(Month::COUNT);
    let mut verdicts = BTreeMap::new();

    for month in Month::all() {
        let in_month = trips
            .iter()
            .filter(|trip| trip.planned_month == Some(month))
            .collect::<Vec<_>>();
        let cost = in_month.iter().map(|trip| trip.effective_cost()).sum::<f64>();

        running += context.monthly_savings;
        let balance = running - cost;
        for trip in &in_month {
            verdicts.insert(
                trip.id().to_string(),
                TripVerdict {
                    month,
                    affordable: balance >= 0.0,
                    shortfall: (-balance).max(0.0),
                },
            );
        }
        running = balance;

        points.push(MonthPoint {
            month,
            name: month.name().to_string(),
            cost,
            balance,
        });
    }

    (points, verdicts)
}
