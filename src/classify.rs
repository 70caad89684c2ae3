//! Free-text classification gateway.
//!
//! Asks the language model to pick exactly one option from a closed
//! set, constrained to a `{choice, reasoning}` schema. A response
//! that doesn't match the schema degrades to a null choice with the
//! raw text attached; it is never a hard error.

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::provider::{GenerationRequest, LanguageModel, OutputSchema, ProviderError};
use crate::utils::truncate_for_log;

const SYSTEM_PROMPT: &str = "You classify a piece of text into exactly one of the provided options.\n\
- Only choose from the options the user sends.\n\
- Be concise in reasoning.";

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("missing or invalid 'text' field")]
    InvalidText,

    #[error("missing or invalid 'options' array")]
    InvalidOptions,

    #[error(transparent)]
    Upstream(#[from] ProviderError),
}

/// Structured result the model is asked to produce.
#[derive(Debug, Clone, Deserialize)]
struct ChoiceSchema {
    choice: String,
    #[serde(default)]
    reasoning: String,
}

/// Outcome of one classification call. `choice` is `None` when the
/// model output couldn't be read against the schema.
#[derive(Debug, Clone)]
pub struct Classification {
    pub choice: Option<String>,
    pub reasoning: String,
    pub finish_reason: Option<String>,
    pub raw_text: String,
    pub raw: Value,
}

fn result_schema() -> OutputSchema {
    OutputSchema {
        name: "ClassificationResult",
        schema: json!({
            "type": "object",
            "properties": {
                "choice": { "type": "string" },
                "reasoning": { "type": "string" },
            },
            "required": ["choice", "reasoning"],
            "additionalProperties": false,
        }),
    }
}

/// Validate inputs: non-empty text, non-empty list of non-empty options.
fn validate<'a>(text: &str, options: &'a [String]) -> Result<Vec<&'a str>, ClassifyError> {
    if text.trim().is_empty() {
        return Err(ClassifyError::InvalidText);
    }
    if options.is_empty() || options.iter().any(|o| o.trim().is_empty()) {
        return Err(ClassifyError::InvalidOptions);
    }
    Ok(options.iter().map(|o| o.trim()).collect())
}

/// Classify `text` into one of `options`.
pub async fn classify(
    model: &dyn LanguageModel,
    text: &str,
    options: &[String],
) -> Result<Classification, ClassifyError> {
    let trimmed = validate(text, options)?;

    let quoted: Vec<String> = trimmed.iter().map(|o| format!("\"{o}\"")).collect();
    let user = format!(
        "Pick the best matching option for the provided text.\nOptions: {}\nText: {}",
        quoted.join(", "),
        text
    );

    let req = GenerationRequest::new(SYSTEM_PROMPT, user)
        .with_temperature(0.0)
        .with_schema(result_schema());

    let output = model.generate(req).await?;

    let parsed: Option<ChoiceSchema> = serde_json::from_str(&output.text).ok();
    match &parsed {
        Some(p) => debug!(choice = %p.choice, "classification resolved"),
        None => warn!(
            raw = %truncate_for_log(&output.text, 200),
            "classifier output did not match schema; returning null choice"
        ),
    }

    Ok(Classification {
        choice: parsed.as_ref().map(|p| p.choice.clone()),
        reasoning: parsed.map(|p| p.reasoning).unwrap_or_default(),
        finish_reason: output.finish_reason,
        raw_text: output.text,
        raw: output.raw,
    })
}
