//! Speech synthesis gateway.
//!
//! Fronts the upstream TTS provider with the persistent audio cache:
//! lookup by (voice, instructions, input), write-through on miss.

pub mod cache;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use thiserror::Error;
use tracing::{info, warn};

use crate::provider::{ProviderError, SpeechRequest, SpeechSynthesizer};
use cache::{AudioCache, AudioKey};

/// Default voice when a request doesn't name one.
pub const DEFAULT_VOICE: &str = "coral";
/// Default delivery-style instruction.
pub const DEFAULT_INSTRUCTIONS: &str = "Speak in an empathetic caring voice.";

/// Whether a response was served from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
        }
    }
}

/// Synthesized audio plus its cache provenance.
#[derive(Debug, Clone)]
pub struct SpokenAudio {
    pub bytes: Vec<u8>,
    pub cache: CacheStatus,
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("synthesis failed: {0}")]
    Upstream(#[from] ProviderError),

    #[error("audio cache error: {0}")]
    Cache(#[from] anyhow::Error),
}

/// Cache-fronted synthesis gateway.
///
/// The cache is the one shared mutable resource in the process; the
/// mutex is held only around the SQLite calls, never across the
/// upstream request. A lookup/insert race for the same key costs at
/// most one redundant synthesis, never corruption.
pub struct SpeechGateway {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    cache: Mutex<AudioCache>,
}

impl SpeechGateway {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, cache: AudioCache) -> Self {
        Self {
            synthesizer,
            cache: Mutex::new(cache),
        }
    }

    /// Synthesize `input`, filling in the default voice and style
    /// instructions when absent.
    pub async fn speak(
        &self,
        input: &str,
        voice: Option<&str>,
        instructions: Option<&str>,
    ) -> Result<SpokenAudio, SpeechError> {
        let req = SpeechRequest {
            input: input.to_string(),
            voice: voice.unwrap_or(DEFAULT_VOICE).to_string(),
            instructions: instructions.unwrap_or(DEFAULT_INSTRUCTIONS).to_string(),
        };

        let key = AudioKey::from(&req);
        let cached = {
            let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            cache.lookup(&key)?
        };
        if let Some(bytes) = cached {
            return Ok(SpokenAudio {
                bytes,
                cache: CacheStatus::Hit,
            });
        }

        let bytes = self.synthesizer.synthesize(&req).await?;

        {
            let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            // A write failure still leaves us with playable audio.
            if let Err(e) = cache.insert(&AudioKey::from(&req), &bytes) {
                warn!("audio cache insert failed: {e:#}");
            }
        }

        info!(
            voice = %req.voice,
            chars = req.input.len(),
            bytes = bytes.len(),
            "synthesized uncached audio"
        );

        Ok(SpokenAudio {
            bytes,
            cache: CacheStatus::Miss,
        })
    }

    /// Current cache occupancy, for startup logging.
    pub fn cache_stats(&self) -> Result<(u64, u64)> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        Ok((cache.entry_count()?, cache.total_size_bytes()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockSynthesizer;

    fn gateway(synth: Arc<MockSynthesizer>) -> SpeechGateway {
        SpeechGateway::new(synth, AudioCache::in_memory(100).unwrap())
    }

    #[tokio::test]
    async fn miss_then_hit_skips_upstream() {
        let synth = Arc::new(MockSynthesizer::new());
        let gw = gateway(synth.clone());

        let first = gw.speak("hello", None, None).await.unwrap();
        assert_eq!(first.cache, CacheStatus::Miss);
        assert_eq!(synth.call_count(), 1);

        let second = gw.speak("hello", None, None).await.unwrap();
        assert_eq!(second.cache, CacheStatus::Hit);
        assert_eq!(second.bytes, first.bytes);
        // Still one upstream call.
        assert_eq!(synth.call_count(), 1);
    }

    #[tokio::test]
    async fn changed_instructions_is_a_new_key() {
        let synth = Arc::new(MockSynthesizer::new());
        let gw = gateway(synth.clone());

        gw.speak("hello", None, None).await.unwrap();
        let other = gw.speak("hello", None, Some("speak flatly")).await.unwrap();

        assert_eq!(other.cache, CacheStatus::Miss);
        assert_eq!(synth.call_count(), 2);
    }

    #[tokio::test]
    async fn defaults_applied_when_unspecified() {
        let synth = Arc::new(MockSynthesizer::new());
        let gw = gateway(synth.clone());

        // Explicit defaults and omitted arguments share a cache entry.
        gw.speak("hi", Some(DEFAULT_VOICE), Some(DEFAULT_INSTRUCTIONS))
            .await
            .unwrap();
        let second = gw.speak("hi", None, None).await.unwrap();
        assert_eq!(second.cache, CacheStatus::Hit);
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let synth = Arc::new(MockSynthesizer::failing());
        let gw = gateway(synth);
        let err = gw.speak("hello", None, None).await.unwrap_err();
        assert!(matches!(err, SpeechError::Upstream(_)));
    }
}
