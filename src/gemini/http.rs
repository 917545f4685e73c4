use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::AiConfig;
use crate::gemini::{GenerativeBackend, InlineImage};

const USER_AGENT: &str = concat!("votum/", env!("CARGO_PKG_VERSION"));

pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    text_model: String,
    image_model: String,
    aspect_ratio: String,
}

impl GeminiClient {
    pub fn from_config(config: &AiConfig) -> Result<Self> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            anyhow!(
                "no API key configured: set ai.api_key or the {} environment variable",
                config.api_key_env
            )
        })?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs.max(1)))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            aspect_ratio: config.image_aspect_ratio.clone(),
        })
    }

    async fn generate(&self, model: &str, body: &Value) -> Result<GenerateContentResponse> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("failed POST request: {url}"))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("failed reading response body: {url}"))?;
        if !status.is_success() {
            let preview: String = text.chars().take(180).collect();
            return Err(anyhow!("POST {url} returned {status}: {preview}"));
        }
        debug!("{model} responded with {} bytes", text.len());
        serde_json::from_str(&text).with_context(|| format!("invalid JSON response: {url}"))
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate_json(&self, prompt: &str, schema: &Value) -> Result<Option<String>> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
                "thinkingConfig": { "thinkingBudget": 0 }
            }
        });
        let response = self.generate(&self.text_model, &body).await?;
        Ok(response.text())
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<InlineImage>> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": { "aspectRatio": self.aspect_ratio }
            }
        });
        let response = self.generate(&self.image_model, &body).await?;
        Ok(response.first_inline_image())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub thought: Option<bool>,
    #[serde(default)]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or_default()
    }

    /// Concatenated non-thought text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let text = self
            .first_parts()
            .iter()
            .filter(|part| !part.thought.unwrap_or(false))
            .filter_map(|part| part.text.as_deref())
            .collect::<String>();
        (!text.trim().is_empty()).then_some(text)
    }

    pub fn first_inline_image(&self) -> Option<InlineImage> {
        self.first_parts()
            .iter()
            .filter_map(|part| part.inline_data.as_ref())
            .find(|data| !data.data.is_empty())
            .map(|data| InlineImage {
                mime_type: data.mime_type.clone(),
                data: data.data.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::GenerateContentResponse;

    #[test]
    fn extracts_text_skipping_thoughts() {
        let payload = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "thinking...", "thought": true },
                        { "text": "[{\"id\":" },
                        { "text": "\"a\"}]" }
                    ]
                }
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(payload).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("[{\"id\":\"a\"}]"));
    }

    #[test]
    fn empty_candidates_have_no_text_or_image() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.text().is_none());
        assert!(parsed.first_inline_image().is_none());
    }

    #[test]
    fn finds_first_inline_image() {
        let payload = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your picture" },
                        { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } }
                    ]
                }
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(payload).unwrap();
        let image = parsed.first_inline_image().expect("image part");
        assert_eq!(image.data_url(), "data:image/png;base64,iVBORw0KGgo=");
    }
}
