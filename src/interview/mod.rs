//! Voice interview flow.
//!
//! The question sequence model and the session controller that walks
//! a user through it: ask aloud, listen, classify where required,
//! then collect contact details and score the full transcript.

pub mod questions;
pub mod session;

pub use questions::{DynamicGenerator, Question, QuestionSequence, standard_questions};
pub use session::{Phase, RecognitionError, Session, SessionError, DRAIN_OPTIONS};
