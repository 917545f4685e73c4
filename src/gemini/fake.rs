use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::gemini::{GenerativeBackend, InlineImage};
use crate::trips::TripRequest;

/// Test backend that answers every requested trip, scheduling the n-th trip
/// in month n and pricing each at 100-300 (effective 200).
pub struct EchoBackend {
    fail: bool,
    calls: AtomicUsize,
}

impl EchoBackend {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn text_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn requested_trips(prompt: &str) -> Vec<TripRequest> {
    let marker = "Destinos:\n";
    let Some(start) = prompt.find(marker).map(|idx| idx + marker.len()) else {
        return Vec::new();
    };
    let end = prompt[start..]
        .find('\n')
        .map(|idx| idx + start)
        .unwrap_or(prompt.len());
    serde_json::from_str(&prompt[start..end]).unwrap_or_default()
}

#[async_trait]
impl GenerativeBackend for EchoBackend {
    async fn generate_json(&self, prompt: &str, _schema: &Value) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("POST /models/test:generateContent returned 503"));
        }
        let items = requested_trips(prompt)
            .iter()
            .enumerate()
            .map(|(idx, request)| {
                json!({
                    "id": request.id,
                    "name": request.name,
                    "isInternational": false,
                    "costMagnitude": "bajo",
                    "estimatedCostRange": {"min": 100, "max": 300},
                    "breakdown": {"flight": 80, "stay": 70, "food": 30, "attractions": 20},
                    "touristPlaces": ["Centro", "Mercado", "Museo", "Mirador"],
                    "seasonalLevel": "media",
                    "complexity": "simple",
                    "seasonality": "todo el año",
                    "experienceDescription": format!("Caminar por {}", request.name),
                    "recommendation": "possible",
                    "reasoning": "cabe en el presupuesto",
                    "plannedMonth": idx % 12
                })
            })
            .collect::<Vec<_>>();
        Ok(Some(format!("```json\n{}\n```", Value::Array(items))))
    }

    async fn generate_image(&self, _prompt: &str) -> Result<Option<InlineImage>> {
        if self.fail {
            return Err(anyhow!("image model unavailable"));
        }
        Ok(Some(InlineImage {
            mime_type: "image/png".to_string(),
            data: "AAAA".to_string(),
        }))
    }
}
