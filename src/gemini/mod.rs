pub mod estimation;
#[cfg(test)]
pub(crate) mod fake;
pub mod http;
pub mod images;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use estimation::{analyze_trips, AnalysisOutcome, EstimationError};
pub use http::GeminiClient;
pub use images::{collect_arrivals, generate_destination_image, spawn_image_requests};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn data_url(&self) -> String {
        let mime = if self.mime_type.trim().is_empty() {
            "image/png"
        } else {
            self.mime_type.trim()
        };
        format!("data:{mime};base64,{}", self.data)
    }
}

/// Generative model endpoints the planner depends on.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Structured text generation constrained by a response schema. `None` when the
    /// model produced no text at all.
    async fn generate_json(&self, prompt: &str, schema: &Value) -> Result<Option<String>>;

    async fn generate_image(&self, prompt: &str) -> Result<Option<InlineImage>>;
}
