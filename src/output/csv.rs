use anyhow::Result;

use crate::plan::Plan;
use crate::projector::Projection;
use crate::trips::{TripRequest, UserContext};

const BOM: &str = "\u{feff}";

/// Spreadsheet manifest of the plan, in displayed-month order.
pub fn plan_to_csv(
    context: &UserContext,
    plan: &Plan,
    projection: &Projection,
    year: i32,
) -> Result<String> {
    let currency = &context.currency;
    let summary = &projection.summary;
    let status = if summary.viable {
        "PLAN VIABLE"
    } else {
        "REQUIERE AJUSTES"
    };

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(vec![]);
    writer.write_record([format!("VOTUM - MANIFIESTO DE VIAJES {year}")])?;
    writer.write_record(["Estado del Plan:", status])?;
    writer.write_record(["País de Origen:", context.origin_country.as_str()])?;
    writer.write_record(["Ahorro Inicial:".to_string(), number(context.initial_savings)])?;
    writer.write_record(["Ahorro Mensual:".to_string(), number(context.monthly_savings)])?;
    writer.write_record([""])?;
    writer.write_record([
        "ID".to_string(),
        "Destino".to_string(),
        "Mes Planificado".to_string(),
        "Importancia".to_string(),
        format!("Transporte ({currency})"),
        format!("Hospedaje ({currency})"),
        format!("Comida ({currency})"),
        format!("Otros ({currency})"),
        format!("Costo Total ({currency})"),
        "Descripción de la Experiencia".to_string(),
        "Viabilidad Individual".to_string(),
    ])?;
    for (idx, trip) in plan.by_display_month().into_iter().enumerate() {
        let breakdown = trip.breakdown.unwrap_or_default();
        let verdict = match projection.verdict(trip.id()) {
            Some(verdict) if verdict.affordable => "SI".to_string(),
            Some(verdict) => format!("NO (Faltan {})", number(verdict.shortfall)),
            None => "SIN MES ASIGNADO".to_string(),
        };
        writer.write_record([
            (idx + 1).to_string(),
            trip.name().to_string(),
            trip.display_month().name().to_string(),
            trip.request.importance.as_slug().to_uppercase(),
            number(breakdown.flight),
            number(breakdown.stay),
            number(breakdown.food),
            number(breakdown.attractions),
            number(trip.effective_cost()),
            trip.experience_description.clone(),
            verdict,
        ])?;
    }
    writer.write_record([""])?;
    writer.write_record(["RESUMEN FINANCIERO"])?;
    writer.write_record(["Total Inversión Sueños:".to_string(), number(summary.total_cost)])?;
    writer.write_record([
        "Total Fondos Proyectados:".to_string(),
        number(summary.projected_funds),
    ])?;
    writer.write_record(["Balance Final:".to_string(), number(summary.final_balance)])?;

    let data = writer.into_inner()?;
    Ok(format!("{BOM}{}", String::from_utf8_lossy(&data)))
}

/// Raw trip list, for the `trips` command.
pub fn trips_to_csv(trips: &[TripRequest]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["id", "name", "days", "method", "importance", "preferred_month"])?;
    for trip in trips {
        writer.write_record([
            trip.id.clone(),
            trip.name.clone(),
            trip.days.to_string(),
            trip.method.to_string(),
            trip.importance.to_string(),
            trip.preferred_month
                .map(|month| month.index().to_string())
                .unwrap_or_default(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

/// Monthly projection, for the `dashboard` command.
pub fn projection_to_csv(projection: &Projection) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["month", "name", "cost", "balance"])?;
    for point in &projection.months {
        writer.write_record([
            point.month.index().to_string(),
            point.name.clone(),
            number(point.cost),
            number(point.balance),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

fn number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::project;
    use crate::trips::fixtures::{context, trip};
    use crate::trips::{BreakdownComponent, CostBreakdown};

    fn sample() -> (UserContext, Plan) {
        let mut pricey = trip("b", 2000.0, Some(0));
        let mut breakdown = CostBreakdown::default();
        breakdown.set(BreakdownComponent::Flight, 1500.0);
        breakdown.set(BreakdownComponent::Stay, 500.0);
        pricey.breakdown = Some(breakdown);
        pricey.experience_description = "Un \"sueño\", por fin".to_string();
        let plan = Plan::new(
            1,
            vec![trip("a", 300.0, Some(6)), pricey, trip("c", 150.5, None)],
        );
        (context(1000.0, 500.0), plan)
    }

    fn render() -> String {
        let (ctx, plan) = sample();
        let projection = project(&ctx, &plan.trips);
        plan_to_csv(&ctx, &plan, &projection, 2026).unwrap()
    }

    fn records(csv_text: &str) -> Vec<csv::StringRecord> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(csv_text.trim_start_matches(BOM).as_bytes())
            .records()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn line_count_is_trips_plus_fixed_lines() {
        let rendered = render();
        assert!(rendered.starts_with(BOM));
        assert_eq!(rendered.lines().count(), 3 + 12);
        assert!(rendered.contains("VOTUM - MANIFIESTO DE VIAJES 2026"));
        assert!(rendered.contains("Estado del Plan:,PLAN VIABLE"));
    }

    #[test]
    fn summary_total_matches_row_totals() {
        let rows = records(&render());
        let trip_rows = &rows[7..10];
        let row_sum: f64 = trip_rows
            .iter()
            .map(|row| row[8].parse::<f64>().unwrap())
            .sum();
        let total_row = rows
            .iter()
            .find(|row| &row[0] == "Total Inversión Sueños:")
            .unwrap();
        assert!((total_row[1].parse::<f64>().unwrap() - row_sum).abs() < 1e-9);
    }

    #[test]
    fn rows_follow_display_month_with_verdicts() {
        let rows = records(&render());
        assert_eq!(&rows[6][4], "Transporte ($)");
        let trip_rows = &rows[7..10];

        // Unscheduled trips sort as January, ahead of the July trip.
        assert_eq!(&trip_rows[0][1], "Destino b");
        assert_eq!(&trip_rows[0][4], "1500");
        assert_eq!(&trip_rows[0][9], "Un \"sueño\", por fin");
        assert_eq!(&trip_rows[0][10], "NO (Faltan 500)");
        assert_eq!(&trip_rows[1][1], "Destino c");
        assert_eq!(&trip_rows[1][10], "SIN MES ASIGNADO");
        assert_eq!(&trip_rows[2][2], "Julio");
        assert_eq!(&trip_rows[2][10], "SI");
        assert_eq!(&trip_rows[2][0], "3");
    }
}
