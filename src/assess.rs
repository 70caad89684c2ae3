//! Assessment scoring gateway.
//!
//! Sends the full interview transcript to the language model with a
//! burnout-assessment rubric and a `{score_percent,
//! evaluation_markdown}` output schema. Parsing is separate from the
//! call so the HTTP endpoint can pass the raw text through while the
//! session controller reads the structured result.

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::provider::{GenerationOutput, GenerationRequest, LanguageModel, OutputSchema, ProviderError};
use crate::utils::truncate_for_log;

/// Ceiling on generated tokens so the markdown narrative is never cut
/// off mid-sentence by the model's own default limit.
const MAX_OUTPUT_TOKENS: u32 = 1500;

const RUBRIC_PROMPT: &str = "\
You are a professor of psychology with lifelong experience in assessing occupational burnout. \
You have just conducted a brief structured interview; the full transcript of questions and \
answers follows in the user message.

Assess the interviewee across the three classic burnout dimensions:
1. Exhaustion — depleted physical and emotional energy, slow recovery after work.
2. Cynicism — detachment, loss of caring, wanting to check out of the work itself.
3. Professional efficacy — confidence in one's skills and ability to make a difference \
(scored inversely: low efficacy contributes to burnout).

Rate each dimension 1-5 from the evidence in the answers, then combine them into a single \
overall burnout score expressed as a percentage from 0 (no signs of burnout) to 100 \
(severe burnout across all three dimensions).

Write the evaluation as markdown: a short overall summary paragraph, then one brief \
section per dimension with its 1-5 rating and the specific answers that informed it, \
then two or three concrete, compassionate suggestions. Address the interviewee directly. \
Do not diagnose; this is a self-reflection aid, not a clinical instrument.";

#[derive(Debug, Error)]
pub enum AssessError {
    #[error("missing or invalid 'q' field")]
    InvalidTranscript,

    #[error(transparent)]
    Upstream(#[from] ProviderError),
}

/// Final assessment handed to the caller once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentResult {
    /// Overall burnout score in [0, 100].
    pub score_percent: u8,
    /// Markdown narrative.
    pub evaluation_markdown: String,
}

#[derive(Debug, Deserialize)]
struct ResultSchema {
    score_percent: i64,
    evaluation_markdown: String,
}

fn result_schema() -> OutputSchema {
    OutputSchema {
        name: "AssessmentResult",
        schema: json!({
            "type": "object",
            "properties": {
                "score_percent": { "type": "integer", "minimum": 0, "maximum": 100 },
                "evaluation_markdown": { "type": "string" },
            },
            "required": ["score_percent", "evaluation_markdown"],
            "additionalProperties": false,
        }),
    }
}

/// Score a full interview transcript. The returned output's `text` is
/// the JSON string of the result schema.
pub async fn score_transcript(
    model: &dyn LanguageModel,
    transcript: &str,
) -> Result<GenerationOutput, AssessError> {
    if transcript.trim().is_empty() {
        return Err(AssessError::InvalidTranscript);
    }

    let req = GenerationRequest::new(RUBRIC_PROMPT, transcript)
        .with_max_output_tokens(MAX_OUTPUT_TOKENS)
        .with_schema(result_schema());

    let output = model.generate(req).await?;
    debug!(
        finish_reason = ?output.finish_reason,
        raw = %truncate_for_log(&output.text, 200),
        "scoring call complete"
    );
    Ok(output)
}

/// Parse model output into an [`AssessmentResult`].
///
/// Out-of-range scores are clamped into [0, 100] rather than rejected;
/// an empty narrative or a shape mismatch yields `None`.
pub fn parse_result(text: &str) -> Option<AssessmentResult> {
    let parsed: ResultSchema = match serde_json::from_str(text) {
        Ok(p) => p,
        Err(e) => {
            warn!("assessment result did not match schema: {e}");
            return None;
        }
    };
    if parsed.evaluation_markdown.trim().is_empty() {
        warn!("assessment result carried an empty evaluation");
        return None;
    }
    Some(AssessmentResult {
        score_percent: parsed.score_percent.clamp(0, 100) as u8,
        evaluation_markdown: parsed.evaluation_markdown,
    })
}
