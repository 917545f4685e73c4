use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseKindError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseKindError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TravelMethod {
    Package,
    Flight,
    Bus,
    OwnCar,
    RentalCar,
}

impl TravelMethod {
    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Flight => "flight",
            Self::Bus => "bus",
            Self::OwnCar => "own_car",
            Self::RentalCar => "rental_car",
        }
    }
}

impl Display for TravelMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

impl FromStr for TravelMethod {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "package" | "paquete" => Ok(Self::Package),
            "flight" | "vuelo" => Ok(Self::Flight),
            "bus" => Ok(Self::Bus),
            "own_car" | "car" => Ok(Self::OwnCar),
            "rental_car" | "rental" => Ok(Self::RentalCar),
            _ => Err(ParseKindError::new("travel method", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    High,
    Medium,
    Low,
}

impl Importance {
    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl Display for Importance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

impl FromStr for Importance {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "alta" => Ok(Self::High),
            "medium" | "media" => Ok(Self::Medium),
            "low" | "baja" => Ok(Self::Low),
            _ => Err(ParseKindError::new("importance", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CostMagnitude {
    #[serde(rename = "bajo")]
    Low,
    #[serde(rename = "medio")]
    Medium,
    #[serde(rename = "alto")]
    High,
}

impl CostMagnitude {
    pub const SLUGS: [&'static str; 3] = ["bajo", "medio", "alto"];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Complexity {
    #[serde(rename = "simple")]
    Simple,
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "compleja")]
    Complex,
}

impl Complexity {
    pub const SLUGS: [&'static str; 3] = ["simple", "media", "compleja"];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SeasonalLevel {
    #[serde(rename = "alta")]
    High,
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "baja")]
    Low,
}

impl SeasonalLevel {
    pub const SLUGS: [&'static str; 3] = ["alta", "media", "baja"];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Recommended,
    Possible,
    NotRecommended,
}

impl RecommendationStatus {
    pub const SLUGS: [&'static str; 3] = ["recommended", "possible", "not_recommended"];
}

/// Calendar month, index 0 (January) through 11 (December).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub struct Month(u8);

const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

const MONTH_NAMES_EN: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

impl Month {
    pub const JANUARY: Month = Month(0);
    pub const COUNT: usize = 12;

    pub fn new(index: u8) -> Option<Self> {
        (usize::from(index) < Self::COUNT).then_some(Self(index))
    }

    /// Accepts whole numbers in range; the model reports months as JSON numbers.
    pub fn from_number(value: f64) -> Option<Self> {
        if !value.is_finite() || value.fract() != 0.0 || !(0.0..12.0).contains(&value) {
            return None;
        }
        Self::new(value as u8)
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn name(self) -> &'static str {
        MONTH_NAMES[self.index()]
    }

    pub fn all() -> impl Iterator<Item = Month> {
        (0..Self::COUNT as u8).map(Month)
    }
}

#[derive(Debug, Error)]
#[error("invalid month: {0} (expected 0-11 or a month name)")]
pub struct MonthParseError(pub String);

impl TryFrom<u8> for Month {
    type Error = MonthParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Month::new(value).ok_or_else(|| MonthParseError(value.to_string()))
    }
}

impl From<Month> for u8 {
    fn from(value: Month) -> Self {
        value.0
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Month {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if let Ok(index) = normalized.parse::<u8>() {
            return Month::new(index).ok_or_else(|| MonthParseError(s.to_string()));
        }
        MONTH_NAMES
            .iter()
            .position(|name| name.to_lowercase() == normalized)
            .or_else(|| MONTH_NAMES_EN.iter().position(|name| *name == normalized))
            .and_then(|idx| Month::new(idx as u8))
            .ok_or_else(|| MonthParseError(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    #[serde(default)]
    pub origin_country: String,
    #[serde(default)]
    pub monthly_savings: f64,
    #[serde(default)]
    pub initial_savings: f64,
    #[serde(default)]
    pub currency: String,
}

impl UserContext {
    /// Funds available over the twelve-month horizon.
    pub fn projected_funds(&self) -> f64 {
        self.initial_savings + self.monthly_savings * Month::COUNT as f64
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self {
            origin_country: String::new(),
            monthly_savings: 500.0,
            initial_savings: 1000.0,
            currency: "$".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripRequest {
    pub id: String,
    pub name: String,
    pub days: u32,
    pub method: TravelMethod,
    pub importance: Importance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_month: Option<Month>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct CostRange {
    pub min: f64,
    pub max: f64,
}

impl CostRange {
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct CostBreakdown {
    pub flight: f64,
    pub stay: f64,
    pub food: f64,
    pub attractions: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.flight + self.stay + self.food + self.attractions
    }

    pub fn set(&mut self, component: BreakdownComponent, value: f64) {
        match component {
            BreakdownComponent::Flight => self.flight = value,
            BreakdownComponent::Stay => self.stay = value,
            BreakdownComponent::Food => self.food = value,
            BreakdownComponent::Attractions => self.attractions = value,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownComponent {
    Flight,
    Stay,
    Food,
    Attractions,
}

impl Display for BreakdownComponent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Flight => "flight",
            Self::Stay => "stay",
            Self::Food => "food",
            Self::Attractions => "attractions",
        };
        write!(f, "{label}")
    }
}

impl FromStr for BreakdownComponent {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flight" | "transport" | "transporte" => Ok(Self::Flight),
            "stay" | "hospedaje" => Ok(Self::Stay),
            "food" | "comida" => Ok(Self::Food),
            "attractions" | "otros" | "extras" => Ok(Self::Attractions),
            _ => Err(ParseKindError::new("cost component", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedTrip {
    #[serde(flatten)]
    pub request: TripRequest,
    pub is_international: bool,
    pub cost_magnitude: CostMagnitude,
    pub estimated_cost_range: CostRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<CostBreakdown>,
    #[serde(default)]
    pub tourist_places: Vec<String>,
    pub complexity: Complexity,
    #[serde(default)]
    pub seasonality: String,
    pub seasonal_level: SeasonalLevel,
    #[serde(default)]
    pub experience_description: String,
    pub recommendation: RecommendationStatus,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_month: Option<Month>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl AnalyzedTrip {
    pub fn id(&self) -> &str {
        &self.request.id
    }

    pub fn name(&self) -> &str {
        &self.request.name
    }

    pub fn effective_cost(&self) -> f64 {
        self.manual_cost
            .unwrap_or_else(|| self.estimated_cost_range.midpoint())
    }

    /// Month used for ordering and labels. Unscheduled trips sort as January.
    pub fn display_month(&self) -> Month {
        self.planned_month.unwrap_or(Month::JANUARY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_parses_index_and_names() {
        assert_eq!("0".parse::<Month>().unwrap(), Month::JANUARY);
        assert_eq!("marzo".parse::<Month>().unwrap().index(), 2);
        assert_eq!("December".parse::<Month>().unwrap().index(), 11);
        assert!("12".parse::<Month>().is_err());
        assert!("smarch".parse::<Month>().is_err());
    }

    #[test]
    fn month_from_number_rejects_fractions_and_out_of_range() {
        assert_eq!(Month::from_number(4.0).map(Month::index), Some(4));
        assert!(Month::from_number(4.5).is_none());
        assert!(Month::from_number(-1.0).is_none());
        assert!(Month::from_number(12.0).is_none());
    }

    #[test]
    fn month_serializes_as_index() {
        let month = Month::new(6).unwrap();
        assert_eq!(serde_json::to_string(&month).unwrap(), "6");
        assert!(serde_json::from_str::<Month>("13").is_err());
    }

    #[test]
    fn analyzed_trip_round_trips_with_flattened_request() {
        let raw = r#"{
            "id": "abc",
            "name": "Kyoto",
            "days": 7,
            "method": "flight",
            "importance": "high",
            "isInternational": true,
            "costMagnitude": "alto",
            "estimatedCostRange": {"min": 2000, "max": 3000},
            "touristPlaces": ["Fushimi Inari"],
            "complexity": "media",
            "seasonality": "primavera",
            "seasonalLevel": "alta",
            "experienceDescription": "Templos",
            "recommendation": "possible",
            "reasoning": "ok",
            "plannedMonth": 3
        }"#;
        let trip: AnalyzedTrip = serde_json::from_str(raw).expect("parse analyzed trip");
        assert_eq!(trip.id(), "abc");
        assert_eq!(trip.request.method, TravelMethod::Flight);
        assert_eq!(trip.planned_month.map(Month::index), Some(3));
        assert!((trip.effective_cost() - 2500.0).abs() < 1e-9);

        let encoded = serde_json::to_value(&trip).unwrap();
        assert_eq!(encoded["name"], "Kyoto");
        assert!(encoded.get("imageUrl").is_none());
    }

    #[test]
    fn manual_cost_overrides_midpoint() {
        let mut trip = crate::trips::fixtures::trip("a", 1000.0, Some(0));
        trip.estimated_cost_range = CostRange { min: 800.0, max: 1200.0 };
        assert!((trip.effective_cost() - 1000.0).abs() < 1e-9);
        trip.manual_cost = Some(650.0);
        assert!((trip.effective_cost() - 650.0).abs() < 1e-9);
    }

    #[test]
    fn breakdown_total_and_component_aliases() {
        let mut breakdown = CostBreakdown::default();
        breakdown.set(BreakdownComponent::Stay, 400.0);
        breakdown.set(BreakdownComponent::Food, 100.0);
        assert!((breakdown.total() - 500.0).abs() < 1e-9);
        assert_eq!("hospedaje".parse::<BreakdownComponent>().unwrap(), BreakdownComponent::Stay);
    }
}
