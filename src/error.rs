use thiserror::Error;

use crate::trips::IntakeError;

/// User-facing failures. `AnalysisFailed` carries no cause; it is logged where
/// the gateway error is collapsed.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Danos una señal de tus sueños. Añade un destino.")]
    EmptyTripList,
    #[error("invalid trip: {0}")]
    InvalidTrip(#[from] IntakeError),
    #[error("unknown trip: {0}")]
    UnknownTrip(String),
    #[error("no plan has been generated yet")]
    NoPlan,
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),
    #[error("Estamos ajustando las estrellas. Intenta de nuevo.")]
    AnalysisFailed,
}
