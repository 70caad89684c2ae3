//! Interview session controller.
//!
//! An explicit state machine over one interview: it owns the question
//! sequence, the index-aligned answer slots, the per-question
//! classification memo, and the submission flow. Every mutation goes
//! through a transition method; speech recognition and playback live
//! with the caller, which reports their events back in.
//!
//! ```text
//! NotStarted → Asking(i) → Listening(i) → [Classifying(i)] → Asking(i+1)
//!            … → CollectingContact → Submitting → Scored
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::assess::{self, AssessError, AssessmentResult};
use crate::classify::{self, ClassifyError};
use crate::contacts::{ContactError, ContactRecord, ContactStore};
use crate::provider::LanguageModel;
use crate::speech::{SpeechError, SpeechGateway, SpokenAudio};

use super::questions::{Question, QuestionSequence};

/// Root ordinal whose answer is classified before advancing (the
/// "what drains fastest" question).
const CLASSIFIED_ROOT: usize = 2;

/// Closed option set for the drain-type classification.
pub const DRAIN_OPTIONS: [&str; 3] = ["patience", "energy", "thinking"];

/// Where the session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    /// Question audio is being fetched/played for the current item.
    Asking,
    /// Recognition is (or should be) running for the current item.
    Listening,
    /// A classification call is in flight for the current item.
    Classifying,
    CollectingContact,
    Submitting,
    Scored,
}

/// Why a listening attempt stopped abnormally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionError {
    /// Microphone permission denied: terminal for this attempt, the
    /// user must explicitly restart.
    PermissionDenied,
    /// Anything recoverable (network blip, no-speech timeout).
    Transient,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("operation not allowed in phase {0:?}")]
    Phase(Phase),

    #[error("could not fetch question audio: {0}")]
    Speech(#[from] SpeechError),

    #[error("answer the current question before advancing")]
    EmptyAnswer,

    #[error("classification did not resolve: {0}")]
    Classification(String),

    #[error("already at the last question")]
    AtEnd,

    #[error("not every question has been answered")]
    Unanswered,

    #[error(transparent)]
    Contact(#[from] ContactError),

    #[error("scoring failed: {0}")]
    Scoring(#[from] AssessError),
}

/// A question ready to play: its resolved text and synthesized audio.
#[derive(Debug, Clone)]
pub struct AskedQuestion {
    pub text: String,
    pub audio: SpokenAudio,
}

/// One interview with one user. Single-threaded and event-driven; no
/// interior mutability, the owner serializes all calls.
pub struct Session {
    sequence: QuestionSequence,
    answers: Vec<String>,
    classifications: HashMap<u32, String>,
    index: usize,
    phase: Phase,
    /// Recognition intent: restart recognition on natural end while set.
    listening: bool,
    /// One-time flag flipped by `begin` (browser autoplay gate).
    audio_unlocked: bool,
    status: String,
    result: Option<AssessmentResult>,

    speech: Arc<SpeechGateway>,
    model: Arc<dyn LanguageModel>,
    contacts: Arc<dyn ContactStore>,
}

impl Session {
    pub fn new(
        questions: Vec<Question>,
        speech: Arc<SpeechGateway>,
        model: Arc<dyn LanguageModel>,
        contacts: Arc<dyn ContactStore>,
    ) -> Self {
        let sequence = QuestionSequence::new(questions);
        let answers = vec![String::new(); sequence.len()];
        Self {
            sequence,
            answers,
            classifications: HashMap::new(),
            index: 0,
            phase: Phase::NotStarted,
            listening: false,
            audio_unlocked: false,
            status: "Idle".to_string(),
            result: None,
            speech,
            model,
            contacts,
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn audio_unlocked(&self) -> bool {
        self.audio_unlocked
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn current_answer(&self) -> &str {
        &self.answers[self.index]
    }

    pub fn result(&self) -> Option<&AssessmentResult> {
        self.result.as_ref()
    }

    pub fn classification_for(&self, question_id: u32) -> Option<&str> {
        self.classifications.get(&question_id).map(String::as_str)
    }

    pub fn at_last_question(&self) -> bool {
        self.index + 1 == self.sequence.len()
    }

    pub fn all_answered(&self) -> bool {
        self.answers.iter().all(|a| !a.trim().is_empty())
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Start the interview at the first question. Also unlocks audio
    /// playback; the browser only allows it after a user gesture.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::NotStarted {
            return Err(SessionError::Phase(self.phase));
        }
        self.audio_unlocked = true;
        self.index = 0;
        self.phase = Phase::Asking;
        self.status = "Starting interview".to_string();
        info!(questions = self.sequence.len(), "interview started");
        Ok(())
    }

    /// Fetch the current question's audio. Re-asking discards any
    /// partial answer in the slot. On failure the session stays in
    /// `Asking` with a status message; nothing retries automatically.
    pub async fn ask(&mut self) -> Result<AskedQuestion, SessionError> {
        match self.phase {
            Phase::Asking | Phase::Listening => {}
            other => return Err(SessionError::Phase(other)),
        }

        self.listening = false;
        self.phase = Phase::Asking;
        self.answers[self.index].clear();

        let text = self.sequence.resolve_text(self.index, &self.answers);
        self.status = "Asking question".to_string();

        match self.speech.speak(&text, None, None).await {
            Ok(audio) => {
                debug!(
                    position = self.index,
                    label = %self.sequence.item(self.index).label(),
                    cache = audio.cache.as_str(),
                    "question audio ready"
                );
                Ok(AskedQuestion { text, audio })
            }
            Err(e) => {
                warn!(position = self.index, "question audio failed: {e}");
                self.status = "Could not play the question. Try again.".to_string();
                Err(e.into())
            }
        }
    }

    /// Playback finished: start listening for the answer.
    pub fn playback_finished(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::Asking {
            return Err(SessionError::Phase(self.phase));
        }
        self.phase = Phase::Listening;
        self.listening = true;
        self.status = "Listening".to_string();
        Ok(())
    }

    /// One recognized phrase. Phrases accumulate space-joined into the
    /// current slot; nothing is cleared here.
    pub fn hear(&mut self, phrase: &str) {
        if self.phase != Phase::Listening {
            debug!(phase = ?self.phase, "dropping recognition result outside Listening");
            return;
        }
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return;
        }
        let slot = &mut self.answers[self.index];
        if slot.is_empty() {
            slot.push_str(phrase);
        } else {
            slot.push(' ');
            slot.push_str(phrase);
        }
        debug!(position = self.index, chars = slot.len(), "answer updated");
    }

    /// Recognition ended naturally (end of phrase in continuous mode).
    /// Returns whether the caller should restart it.
    pub fn recognition_ended(&self) -> bool {
        self.listening && self.phase == Phase::Listening
    }

    /// Recognition failed. Permission denial clears the listening
    /// intent; transient errors leave it set so the restart loop
    /// continues.
    pub fn recognition_error(&mut self, err: RecognitionError) {
        match err {
            RecognitionError::PermissionDenied => {
                self.listening = false;
                self.status = "Microphone access denied. Restart listening to continue.".to_string();
            }
            RecognitionError::Transient => {
                self.status = "Recognition hiccup, still listening".to_string();
            }
        }
    }

    /// Move to the next question. Requires a non-empty answer, and for
    /// the classification-gated root, a recorded classification —
    /// invoking the classifier at most once per question.
    pub async fn advance(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Asking | Phase::Listening => {}
            other => return Err(SessionError::Phase(other)),
        }
        if self.current_answer().trim().is_empty() {
            return Err(SessionError::EmptyAnswer);
        }
        if self.at_last_question() {
            return Err(SessionError::AtEnd);
        }

        if self.needs_classification() {
            let prior = self.phase;
            self.phase = Phase::Classifying;
            self.status = "Classifying answer".to_string();

            let options: Vec<String> = DRAIN_OPTIONS.iter().map(|s| s.to_string()).collect();
            let answer = self.current_answer().to_string();
            let outcome = classify::classify(self.model.as_ref(), &answer, &options).await;

            // Return to the pre-classification phase either way; on
            // success we immediately move on below.
            self.phase = prior;
            match outcome {
                Ok(c) => match c.choice {
                    Some(choice) => {
                        let id = self.sequence.item(self.index).question_id;
                        info!(question_id = id, choice = %choice, "answer classified");
                        self.classifications.insert(id, choice);
                    }
                    None => {
                        self.status = "Could not classify that answer. Try again.".to_string();
                        return Err(SessionError::Classification(
                            "no resolvable option".to_string(),
                        ));
                    }
                },
                Err(e @ (ClassifyError::InvalidText | ClassifyError::InvalidOptions)) => {
                    self.status = "Could not classify that answer. Try again.".to_string();
                    return Err(SessionError::Classification(e.to_string()));
                }
                Err(ClassifyError::Upstream(e)) => {
                    warn!("classification call failed: {e}");
                    self.status = "Could not classify that answer. Try again.".to_string();
                    return Err(SessionError::Classification(e.to_string()));
                }
            }
        }

        self.listening = false;
        self.index += 1;
        self.phase = Phase::Asking;
        self.status = "Next question".to_string();
        Ok(())
    }

    /// Step back one question without clearing its answer.
    pub fn previous(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Asking | Phase::Listening => {}
            other => return Err(SessionError::Phase(other)),
        }
        self.listening = false;
        self.index = self.index.saturating_sub(1);
        self.phase = Phase::Asking;
        Ok(())
    }

    /// Reveal the contact form. Only once every slot is answered and
    /// the session sits at the last question.
    pub fn begin_contact(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::Asking | Phase::Listening => {}
            other => return Err(SessionError::Phase(other)),
        }
        if !self.at_last_question() || !self.all_answered() {
            return Err(SessionError::Unanswered);
        }
        self.listening = false;
        self.phase = Phase::CollectingContact;
        self.status = "Almost done".to_string();
        Ok(())
    }

    /// Validate the contact, capture it (fire-and-forget), score the
    /// transcript, and parse the result. A malformed scoring response
    /// is logged and leaves the result unset; the session still ends
    /// in `Scored`.
    pub async fn submit(&mut self, contact: ContactRecord) -> Result<(), SessionError> {
        if self.phase != Phase::CollectingContact {
            return Err(SessionError::Phase(self.phase));
        }
        contact.validate()?;

        self.phase = Phase::Submitting;
        self.status = "Scoring your answers".to_string();

        // Contact capture must never block or fail the assessment.
        let contacts = self.contacts.clone();
        tokio::spawn(async move {
            if let Err(e) = contacts.insert(&contact).await {
                error!("contact capture failed (ignored): {e:#}");
            }
        });

        let transcript = self.transcript();
        match assess::score_transcript(self.model.as_ref(), &transcript).await {
            Ok(output) => {
                self.result = assess::parse_result(&output.text);
                if self.result.is_none() {
                    warn!("scoring response unusable; leaving result unset");
                }
            }
            Err(e) => {
                self.phase = Phase::CollectingContact;
                self.status = "Scoring failed. Try submitting again.".to_string();
                return Err(e.into());
            }
        }

        self.phase = Phase::Scored;
        self.status = "Done".to_string();
        info!(score = ?self.result.as_ref().map(|r| r.score_percent), "interview scored");
        Ok(())
    }

    /// Newline-delimited transcript of every question/answer pair in
    /// sequence order.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for item in self.sequence.items() {
            let label = item.label();
            let text = self.sequence.resolve_text(item.position, &self.answers);
            let answer = &self.answers[item.position];
            out.push_str(&format!("{label}: {text}\n"));
            out.push_str(&format!("A{}: {answer}\n\n", &label[1..]));
        }
        out
    }

    fn needs_classification(&self) -> bool {
        let item = self.sequence.item(self.index);
        !item.is_follow_up()
            && item.root_ordinal == CLASSIFIED_ROOT
            && !self.classifications.contains_key(&item.question_id)
    }
}
