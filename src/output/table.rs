use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::board::Theme;
use crate::plan::Plan;
use crate::projector::{PlanSummary, Projection};
use crate::trips::{TripRequest, UserContext};

const BAR_WIDTH: usize = 24;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn render_context_table(context: &UserContext) -> String {
    let mut table = new_table();
    table.set_header(vec!["Field", "Value"]);
    let origin = if context.origin_country.is_empty() {
        "-".to_string()
    } else {
        context.origin_country.clone()
    };
    table.add_row(vec!["Origin".to_string(), origin]);
    table.add_row(vec![
        "Monthly savings".to_string(),
        money(&context.currency, context.monthly_savings),
    ]);
    table.add_row(vec![
        "Initial savings".to_string(),
        money(&context.currency, context.initial_savings),
    ]);
    table.add_row(vec![
        "Projected funds (12 months)".to_string(),
        money(&context.currency, context.projected_funds()),
    ]);
    table.to_string()
}

pub fn render_trips_table(trips: &[TripRequest]) -> String {
    let mut table = new_table();
    table.set_header(vec!["ID", "Destination", "Days", "Method", "Importance", "Preferred"]);
    for trip in trips {
        table.add_row(vec![
            trip.id.clone(),
            trip.name.clone(),
            trip.days.to_string(),
            trip.method.to_string(),
            trip.importance.to_string(),
            trip.preferred_month
                .map(|month| month.name().to_string())
                .unwrap_or_else(|| "any".to_string()),
        ]);
    }
    table.to_string()
}

pub fn render_plan_table(plan: &Plan, projection: &Projection, currency: &str) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "#",
        "ID",
        "Destination",
        "Month",
        "Cost",
        "Flight",
        "Stay",
        "Food",
        "Other",
        "Recommendation",
        "Affordable",
    ]);
    for (idx, trip) in plan.by_display_month().into_iter().enumerate() {
        let breakdown = trip.breakdown.unwrap_or_default();
        let month = match trip.planned_month {
            Some(month) => month.name().to_string(),
            None => "sin asignar".to_string(),
        };
        let verdict_cell = match projection.verdict(trip.id()) {
            Some(verdict) if verdict.affordable => Cell::new("YES").fg(Color::Green),
            Some(verdict) => Cell::new(format!(
                "NO (-{})",
                money(currency, verdict.shortfall)
            ))
            .fg(Color::Red),
            None => Cell::new("-").fg(Color::DarkGrey),
        };
        let cost_cell = if trip.manual_cost.is_some() {
            Cell::new(format!("{}*", money(currency, trip.effective_cost())))
        } else {
            Cell::new(money(currency, trip.effective_cost()))
        };
        table.add_row(Row::from(vec![
            Cell::new(format!("{:02}", idx + 1)),
            Cell::new(trip.id()),
            Cell::new(trip.name()),
            Cell::new(month),
            cost_cell,
            Cell::new(format!("{:.0}", breakdown.flight)),
            Cell::new(format!("{:.0}", breakdown.stay)),
            Cell::new(format!("{:.0}", breakdown.food)),
            Cell::new(format!("{:.0}", breakdown.attractions)),
            Cell::new(format!("{:?}", trip.recommendation).to_lowercase()),
            verdict_cell,
        ]));
    }
    table.to_string()
}

/// Running balance per month with a proportional bar.
pub fn render_months_table(projection: &Projection, currency: &str) -> String {
    let mut table = new_table();
    table.set_header(vec!["Month", "Spent", "Balance", ""]);
    let scale = projection
        .months
        .iter()
        .map(|point| point.balance.abs())
        .fold(0.0_f64, f64::max);
    for point in &projection.months {
        let width = if scale > 0.0 {
            ((point.balance.abs() / scale) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let bar = "█".repeat(width);
        let (balance_cell, bar_cell) = if point.balance < 0.0 {
            (
                Cell::new(money(currency, point.balance)).fg(Color::Red),
                Cell::new(bar).fg(Color::Red),
            )
        } else {
            (
                Cell::new(money(currency, point.balance)),
                Cell::new(bar).fg(Color::Cyan),
            )
        };
        table.add_row(Row::from(vec![
            Cell::new(&point.name),
            Cell::new(if point.cost > 0.0 {
                money(currency, point.cost)
            } else {
                "-".to_string()
            }),
            balance_cell,
            bar_cell,
        ]));
    }
    table.to_string()
}

pub fn render_summary_table(summary: &PlanSummary, currency: &str) -> String {
    let mut table = new_table();
    table.set_header(vec!["Total cost", "Projected funds", "Final balance", "Status"]);
    let status = if summary.viable {
        Cell::new("PLAN VIABLE").fg(Color::Green)
    } else {
        Cell::new("REQUIERE AJUSTES").fg(Color::Red)
    };
    table.add_row(Row::from(vec![
        Cell::new(money(currency, summary.total_cost)),
        Cell::new(money(currency, summary.projected_funds)),
        Cell::new(money(currency, summary.final_balance)),
        status,
    ]));
    table.to_string()
}

pub fn render_themes_table() -> String {
    let mut table = new_table();
    table.set_header(vec!["Theme", "Name", "Emotion"]);
    for theme in Theme::ALL {
        table.add_row(vec![theme.as_slug(), theme.name(), theme.emotion()]);
    }
    table.to_string()
}

fn money(currency: &str, value: f64) -> String {
    if value < 0.0 {
        format!("-{currency}{:.0}", value.abs())
    } else {
        format!("{currency}{value:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::project;
    use crate::trips::fixtures::{context, trip};

    #[test]
    fn plan_table_marks_unscheduled_trips() {
        let ctx = context(1000.0, 500.0);
        let plan = Plan::new(1, vec![trip("a", 2000.0, Some(0)), trip("b", 10.0, None)]);
        let rendered = render_plan_table(&plan, &project(&ctx, &plan.trips), "$");
        assert!(rendered.contains("sin asignar"));
        assert!(rendered.contains("NO (-$500)"));
    }

    #[test]
    fn months_table_lists_all_twelve_months() {
        let ctx = context(0.0, 100.0);
        let rendered = render_months_table(&project(&ctx, &[trip("a", 250.0, Some(1))]), "€");
        assert!(rendered.contains("Enero"));
        assert!(rendered.contains("Diciembre"));
        assert!(rendered.contains("-€50"));
    }

    #[test]
    fn money_formats_sign_before_currency() {
        assert_eq!(money("$", -12.4), "-$12");
        assert_eq!(money("$", 1999.6), "$2000");
    }
}
