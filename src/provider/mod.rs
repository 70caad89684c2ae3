//! Upstream model provider traits and implementations.
//!
//! The hosted language-model and speech-synthesis APIs are modeled as
//! capability traits so the concrete vendor is swappable and the rest
//! of the crate can be exercised against mocks.

pub mod mock;
pub mod openai;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

// ── Errors ───────────────────────────────────────────────────────

/// Failure modes of an upstream generation or synthesis call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("upstream response carried no output text")]
    EmptyOutput,
}

// ── Language model ───────────────────────────────────────────────

/// A JSON-schema constraint for structured output.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    /// Schema name reported to the upstream API.
    pub name: &'static str,
    /// Plain JSON-schema object.
    pub schema: Value,
}

/// One generation request: a system instruction, a user message, and
/// optional sampling / shape constraints.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub schema: Option<OutputSchema>,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: None,
            max_output_tokens: None,
            schema: None,
        }
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn with_max_output_tokens(mut self, n: u32) -> Self {
        self.max_output_tokens = Some(n);
        self
    }

    pub fn with_schema(mut self, schema: OutputSchema) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Result of one generation call.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    /// Concatenated output text. When a schema was requested this is
    /// the JSON string the model produced.
    pub text: String,
    /// Upstream finish/status marker, when one was reported.
    pub finish_reason: Option<String>,
    /// Full upstream response body, passed through for diagnostics.
    pub raw: Value,
}

/// Hosted language model capable of single-shot text generation,
/// optionally constrained to a structured output schema.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, req: GenerationRequest) -> Result<GenerationOutput, ProviderError>;

    /// Human-readable provider name.
    fn name(&self) -> &str;
}

// ── Speech synthesis ─────────────────────────────────────────────

/// One synthesis request. The (voice, instructions, input) triple is
/// also the audio cache key, so defaults are filled in before the
/// request reaches a synthesizer.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub input: String,
    pub voice: String,
    pub instructions: String,
}

/// Hosted text-to-speech provider returning encoded audio bytes (MP3).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, req: &SpeechRequest) -> Result<Vec<u8>, ProviderError>;

    /// Human-readable provider name.
    fn name(&self) -> &str;
}
