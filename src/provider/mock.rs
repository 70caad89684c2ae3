//! Mock providers for testing.
//!
//! [`ScriptedModel`] replays a fixed list of generation outputs and
//! counts calls; [`MockSynthesizer`] derives deterministic bytes from
//! the request so cache behavior can be asserted without a network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;

use crate::provider::{
    GenerationOutput, GenerationRequest, LanguageModel, ProviderError, SpeechRequest,
    SpeechSynthesizer,
};

// ── Language model ───────────────────────────────────────────────

/// Replays scripted responses in order; errors once the script runs out.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
    /// When set, every call fails with an API error instead.
    fail: bool,
}

impl ScriptedModel {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(str::to_owned).collect()),
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// A model whose every call fails upstream.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    /// Number of generate calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, _req: GenerationRequest) -> Result<GenerationOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::Api {
                status: 500,
                body: "scripted failure".to_string(),
            });
        }
        let next = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(text) => Ok(GenerationOutput {
                text: text.clone(),
                finish_reason: Some("completed".to_string()),
                raw: json!({ "status": "completed", "output_text": text }),
            }),
            None => Err(ProviderError::EmptyOutput),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ── Speech synthesis ─────────────────────────────────────────────

/// Deterministic fake synthesizer: bytes are a function of the full
/// (voice, instructions, input) triple, so identical requests produce
/// identical audio and different requests do not.
pub struct MockSynthesizer {
    calls: AtomicUsize,
    fail: bool,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    /// Number of synthesize calls made so far (cache misses only,
    /// when fronted by the speech gateway).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, req: &SpeechRequest) -> Result<Vec<u8>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::Api {
                status: 500,
                body: "scripted failure".to_string(),
            });
        }
        let mut audio = Vec::new();
        audio.extend_from_slice(req.voice.as_bytes());
        audio.push(0);
        audio.extend_from_slice(req.instructions.as_bytes());
        audio.push(0);
        audio.extend_from_slice(req.input.as_bytes());
        Ok(audio)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
