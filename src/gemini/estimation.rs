use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::gemini::GenerativeBackend;
use crate::trips::{
    AnalyzedTrip, Complexity, CostBreakdown, CostMagnitude, CostRange, Month,
    RecommendationStatus, SeasonalLevel, TripRequest, UserContext,
};

#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("model response is not a valid trip array: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("model returned no usable trips")]
    NoTrips,
}

/// One element of the model's JSON array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripEnrichment {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub is_international: bool,
    pub cost_magnitude: CostMagnitude,
    pub estimated_cost_range: CostRange,
    #[serde(default)]
    pub breakdown: Option<CostBreakdown>,
    #[serde(default)]
    pub tourist_places: Vec<String>,
    pub seasonal_level: SeasonalLevel,
    pub complexity: Complexity,
    #[serde(default)]
    pub seasonality: String,
    #[serde(default)]
    pub experience_description: String,
    pub recommendation: RecommendationStatus,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub planned_month: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub trips: Vec<AnalyzedTrip>,
    /// Requested trips the model left out of its answer.
    pub omitted: Vec<String>,
    /// Ids in the answer that were never requested.
    pub unknown: Vec<String>,
}

pub async fn analyze_trips(
    backend: &dyn GenerativeBackend,
    context: &UserContext,
    trips: &[TripRequest],
) -> Result<AnalysisOutcome, EstimationError> {
    let prompt = build_prompt(context, trips)?;
    let text = backend
        .generate_json(&prompt, &response_schema())
        .await
        .map_err(|err| EstimationError::Transport(format!("{err:#}")))?
        .filter(|text| !text.trim().is_empty())
        .ok_or(EstimationError::EmptyResponse)?;

    let enrichments = parse_enrichments(&text)?;
    let outcome = merge_enrichments(trips, enrichments);
    if outcome.trips.is_empty() {
        return Err(EstimationError::NoTrips);
    }
    if !outcome.omitted.is_empty() {
        warn!("model omitted {} requested trip(s): {:?}", outcome.omitted.len(), outcome.omitted);
    }
    if !outcome.unknown.is_empty() {
        warn!("model returned unrequested trip id(s): {:?}", outcome.unknown);
    }
    info!("analysis produced {} trip(s)", outcome.trips.len());
    Ok(outcome)
}

pub fn build_prompt(context: &UserContext, trips: &[TripRequest]) -> Result<String, EstimationError> {
    let destinations = serde_json::to_string(trips)?;
    let origin = &context.origin_country;
    let currency = &context.currency;
    Ok(format!(
        r#"Actúa como MetaTourist, el Arquitecto de Realidades y Planificador Maestro.
Transforma estos deseos en un manifiesto detallado para un viajero en {origin}.

Contexto Financiero:
- Ahorro mensual: {monthly} {currency}
- Semilla inicial: {initial} {currency}

Destinos:
{destinations}

INSTRUCCIONES CRÍTICAS:
1. Organiza cronológicamente (0-11) según la factibilidad financiera basada en el ahorro acumulado mes a mes.
2. Calcula costos realistas para vuelos (desde {origin}), estadía, comida y extras.
3. Describe la experiencia de forma inspiradora y sensorial.
4. Proporciona exactamente 4 lugares turísticos icónicos por destino.
5. Devuelve EXCLUSIVAMENTE un array JSON que cumpla con el esquema."#,
        monthly = context.monthly_savings,
        initial = context.initial_savings,
    ))
}

pub fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING" },
                "name": { "type": "STRING" },
                "isInternational": { "type": "BOOLEAN" },
                "costMagnitude": { "type": "STRING", "enum": CostMagnitude::SLUGS },
                "estimatedCostRange": {
                    "type": "OBJECT",
                    "properties": {
                        "min": { "type": "NUMBER" },
                        "max": { "type": "NUMBER" }
                    },
                    "required": ["min", "max"]
                },
                "breakdown": {
                    "type": "OBJECT",
                    "properties": {
                        "flight": { "type": "NUMBER" },
                        "stay": { "type": "NUMBER" },
                        "food": { "type": "NUMBER" },
                        "attractions": { "type": "NUMBER" }
                    },
                    "required": ["flight", "stay", "food", "attractions"]
                },
                "touristPlaces": { "type": "ARRAY", "items": { "type": "STRING" } },
                "seasonalLevel": { "type": "STRING", "enum": SeasonalLevel::SLUGS },
                "complexity": { "type": "STRING", "enum": Complexity::SLUGS },
                "seasonality": { "type": "STRING" },
                "experienceDescription": { "type": "STRING" },
                "recommendation": { "type": "STRING", "enum": RecommendationStatus::SLUGS },
                "reasoning": { "type": "STRING" },
                "plannedMonth": { "type": "NUMBER" }
            },
            "required": [
                "id", "name", "isInternational", "costMagnitude", "estimatedCostRange",
                "breakdown", "touristPlaces", "seasonalLevel", "complexity", "seasonality",
                "experienceDescription", "recommendation", "reasoning", "plannedMonth"
            ]
        }
    })
}

/// Strips code fences and anything outside the outermost bracket pair.
pub fn clean_json_response(text: &str) -> String {
    if text.is_empty() {
        return "[]".to_string();
    }
    let unfenced = text
        .replace("```json\n", "")
        .replace("```json", "")
        .replace("```", "");
    let cleaned = unfenced.trim();
    match (cleaned.find('['), cleaned.rfind(']')) {
        (Some(first), Some(last)) if first < last => cleaned[first..=last].to_string(),
        _ => cleaned.to_string(),
    }
}

pub fn parse_enrichments(text: &str) -> Result<Vec<TripEnrichment>, EstimationError> {
    let cleaned = clean_json_response(text);
    Ok(serde_json::from_str(&cleaned)?)
}

/// Joins model output onto the requests by id. Request-side fields (days, method,
/// importance, preferred month) always come from the request.
pub fn merge_enrichments(
    requests: &[TripRequest],
    enrichments: Vec<TripEnrichment>,
) -> AnalysisOutcome {
    let by_id = requests
        .iter()
        .map(|request| (request.id.as_str(), request))
        .collect::<BTreeMap<_, _>>();
    let mut seen = BTreeSet::new();
    let mut outcome = AnalysisOutcome::default();

    for enrichment in enrichments {
        let Some(request) = by_id.get(enrichment.id.as_str()) else {
            outcome.unknown.push(enrichment.id);
            continue;
        };
        if !seen.insert(enrichment.id.clone()) {
            warn!("duplicate analysis for trip {}, keeping the first", enrichment.id);
            continue;
        }
        outcome.trips.push(enrich(request, enrichment));
    }

    outcome.omitted = requests
        .iter()
        .filter(|request| !seen.contains(&request.id))
        .map(|request| request.id.clone())
        .collect();
    outcome
}

fn enrich(request: &TripRequest, enrichment: TripEnrichment) -> AnalyzedTrip {
    let mut base = (*request).clone();
    let name = enrichment.name.trim();
    if !name.is_empty() {
        base.name = name.to_string();
    }
    let planned_month = enrichment.planned_month.and_then(|value| {
        let month = Month::from_number(value);
        if month.is_none() {
            warn!("trip {} has out-of-range month {value}, leaving it unscheduled", base.id);
        }
        month
    });

    AnalyzedTrip {
        request: base,
        is_international: enrichment.is_international,
        cost_magnitude: enrichment.cost_magnitude,
        estimated_cost_range: enrichment.estimated_cost_range,
        manual_cost: None,
        breakdown: enrichment.breakdown,
        tourist_places: enrichment.tourist_places,
        complexity: enrichment.complexity,
        seasonality: enrichment.seasonality,
        seasonal_level: enrichment.seasonal_level,
        experience_description: enrichment.experience_description,
        recommendation: enrichment.recommendation,
        reasoning: enrichment.reasoning,
        planned_month,
        image_url: None,
    }
}
