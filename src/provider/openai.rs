//! OpenAI-backed provider.
//!
//! Two REST surfaces are used:
//! - `POST /v1/responses` for text generation, optionally constrained
//!   to a JSON schema via `text.format`
//! - `POST /v1/audio/speech` for text-to-speech (MP3)
//!
//! Both are single-shot request/response calls with no retry beyond
//! what reqwest does by default.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::provider::{
    GenerationOutput, GenerationRequest, LanguageModel, ProviderError, SpeechRequest,
    SpeechSynthesizer,
};

/// Configuration for [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Base URL without trailing slash (override for testing/proxy).
    pub base_url: String,
    /// Model for generation calls.
    pub model: String,
    /// Model for synthesis calls.
    pub tts_model: String,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            tts_model: "gpt-4o-mini-tts".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Client implementing both [`LanguageModel`] and [`SpeechSynthesizer`].
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

/// Pull every `output_text` fragment out of a Responses API body.
fn collect_output_text(raw: &Value) -> String {
    let mut text = String::new();
    if let Some(items) = raw.get("output").and_then(Value::as_array) {
        for item in items {
            let Some(parts) = item.get("content").and_then(Value::as_array) else {
                continue;
            };
            for part in parts {
                if part.get("type").and_then(Value::as_str) == Some("output_text")
                    && let Some(t) = part.get("text").and_then(Value::as_str)
                {
                    text.push_str(t);
                }
            }
        }
    }
    text
}

/// Upstream completion marker: the incomplete reason when truncated,
/// otherwise the response status.
fn finish_reason(raw: &Value) -> Option<String> {
    raw.get("incomplete_details")
        .and_then(|d| d.get("reason"))
        .and_then(Value::as_str)
        .or_else(|| raw.get("status").and_then(Value::as_str))
        .map(str::to_owned)
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn generate(&self, req: GenerationRequest) -> Result<GenerationOutput, ProviderError> {
        let mut body = json!({
            "model": self.config.model,
            "input": [
                { "role": "system", "content": req.system },
                { "role": "user", "content": req.user },
            ],
        });
        if let Some(t) = req.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(n) = req.max_output_tokens {
            body["max_output_tokens"] = json!(n);
        }
        if let Some(schema) = &req.schema {
            body["text"] = json!({
                "format": {
                    "type": "json_schema",
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": true,
                }
            });
        }

        let response = self
            .client
            .post(self.endpoint("responses"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Value = response.json().await?;
        let text = collect_output_text(&raw);
        if text.is_empty() {
            return Err(ProviderError::EmptyOutput);
        }

        debug!(model = %self.config.model, chars = text.len(), "generation complete");

        Ok(GenerationOutput {
            text,
            finish_reason: finish_reason(&raw),
            raw,
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiClient {
    async fn synthesize(&self, req: &SpeechRequest) -> Result<Vec<u8>, ProviderError> {
        let body = json!({
            "model": self.config.tts_model,
            "voice": req.voice,
            "input": req.input,
            "instructions": req.instructions,
            "response_format": "mp3",
        });

        let response = self
            .client
            .post(self.endpoint("audio/speech"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let audio = response.bytes().await?.to_vec();
        debug!(
            model = %self.config.tts_model,
            voice = %req.voice,
            bytes = audio.len(),
            "synthesis complete"
        );
        Ok(audio)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
