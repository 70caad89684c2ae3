//! Interview question model.
//!
//! A fixed, ordered set of root questions, some with static follow-up
//! prompts and one whose text is generated at ask time from earlier
//! answers. The flattened sequence view is derived once and is the
//! index space for answers.

/// How a dynamic question derives its text from prior answers. A
/// closed enum, so an unknown generator cannot exist at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicGenerator {
    /// Quote the most recent answer and ask what makes it draining.
    DeepDiveRecent,
    /// Quote the most recent answer and ask about its day-to-day ripple.
    WorkdayRipple,
}

impl DynamicGenerator {
    /// Resolve the question text given all answers strictly before
    /// `position`. Quotes the most recent non-empty answer, or falls
    /// back to a fixed generic prompt when no answer exists yet.
    pub fn resolve(&self, answers: &[String], position: usize) -> String {
        let upto = position.min(answers.len());
        let latest = answers[..upto]
            .iter()
            .rev()
            .find(|a| !a.trim().is_empty());

        match (self, latest) {
            (Self::DeepDiveRecent, Some(ans)) => format!(
                "You mentioned: \"{ans}\". Can you go one level deeper on what makes that so draining?"
            ),
            (Self::DeepDiveRecent, None) => {
                "Tell me more about the moment that feels most draining lately.".to_string()
            }
            (Self::WorkdayRipple, Some(ans)) => format!(
                "You mentioned earlier: \"{ans}\". What's the ripple effect of that on your day-to-day work?"
            ),
            (Self::WorkdayRipple, None) => {
                "Walk me through one draining moment from your recent workday—what happened, and how did it affect you?"
                    .to_string()
            }
        }
    }
}

/// One root question in the interview.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: u32,
    /// Static prompt; ignored when `generator` is set.
    pub prompt: String,
    /// Static supplementary prompts asked right after the root.
    pub follow_ups: Vec<String>,
    pub generator: Option<DynamicGenerator>,
}

impl Question {
    pub fn fixed(id: u32, prompt: &str, follow_ups: &[&str]) -> Self {
        Self {
            id,
            prompt: prompt.to_string(),
            follow_ups: follow_ups.iter().map(|s| s.to_string()).collect(),
            generator: None,
        }
    }

    pub fn dynamic(id: u32, generator: DynamicGenerator) -> Self {
        Self {
            id,
            prompt: String::new(),
            follow_ups: Vec::new(),
            generator: Some(generator),
        }
    }
}

/// Position of a follow-up among its root's follow-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowUpSlot {
    /// 0-based index among the root's follow-ups.
    pub index: usize,
    /// Number of follow-ups the root has.
    pub count: usize,
}

/// One slot in the flattened sequence: a root question or one of its
/// follow-ups, in definition order.
#[derive(Debug, Clone)]
pub struct SequenceItem {
    /// Index into the flattened sequence (the answer-slot index).
    pub position: usize,
    pub question_id: u32,
    /// 1-based position of the owning root among roots.
    pub root_ordinal: usize,
    /// `None` for a root item.
    pub follow_up: Option<FollowUpSlot>,
}

impl SequenceItem {
    pub fn is_follow_up(&self) -> bool {
        self.follow_up.is_some()
    }

    /// Short label for transcripts: `Q3` for a root, `Q3.1` for its
    /// first follow-up.
    pub fn label(&self) -> String {
        match self.follow_up {
            Some(slot) => format!("Q{}.{}", self.root_ordinal, slot.index + 1),
            None => format!("Q{}", self.root_ordinal),
        }
    }
}

/// The question set plus its derived flattened sequence. Immutable
/// after construction.
#[derive(Debug, Clone)]
pub struct QuestionSequence {
    questions: Vec<Question>,
    items: Vec<SequenceItem>,
}

impl QuestionSequence {
    pub fn new(questions: Vec<Question>) -> Self {
        let mut items = Vec::new();
        for (root_idx, q) in questions.iter().enumerate() {
            items.push(SequenceItem {
                position: items.len(),
                question_id: q.id,
                root_ordinal: root_idx + 1,
                follow_up: None,
            });
            let count = q.follow_ups.len();
            for index in 0..count {
                items.push(SequenceItem {
                    position: items.len(),
                    question_id: q.id,
                    root_ordinal: root_idx + 1,
                    follow_up: Some(FollowUpSlot { index, count }),
                });
            }
        }
        Self { questions, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[SequenceItem] {
        &self.items
    }

    pub fn item(&self, position: usize) -> &SequenceItem {
        &self.items[position]
    }

    pub fn question(&self, item: &SequenceItem) -> &Question {
        &self.questions[item.root_ordinal - 1]
    }

    /// Resolve the display text of the item at `position`. Dynamic
    /// roots consult the answers before their position.
    pub fn resolve_text(&self, position: usize, answers: &[String]) -> String {
        let item = self.item(position);
        let question = self.question(item);
        match item.follow_up {
            Some(slot) => question.follow_ups[slot.index].clone(),
            None => match question.generator {
                Some(generator) => generator.resolve(answers, position),
                None => question.prompt.clone(),
            },
        }
    }
}

/// The fixed burnout interview: six roots, three with one follow-up
/// each, the fifth generated from the most recent answer.
pub fn standard_questions() -> Vec<Question> {
    vec![
        Question::fixed(
            1,
            "Tell me about the last time you felt completely wiped out. What was happening that day?",
            &[],
        ),
        Question::fixed(
            2,
            "When you hit that wiped-out feeling, what drains fastest: your patience with people, your physical energy, or your ability to think clearly?",
            &["During a typical week, how many days do you feel that way?"],
        ),
        Question::fixed(
            3,
            "These days, what part of work makes you want to just check out or stop caring?",
            &["What's the story behind that? When did you start feeling this way?"],
        ),
        Question::fixed(
            4,
            "When you think about your actual skills and what you can do—not how you feel—how confident are you that you're still good at your work?",
            &["What's one thing you've done recently that reminded you how capable you are?"],
        ),
        Question::dynamic(5, DynamicGenerator::DeepDiveRecent),
        Question::fixed(
            6,
            "Looking back over the last few months, is this feeling getting better, staying the same, or getting worse?",
            &[],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_answers(n: usize) -> Vec<String> {
        vec![String::new(); n]
    }

    #[test]
    fn flattened_length_is_roots_plus_follow_ups() {
        let questions = standard_questions();
        let expected: usize = questions.iter().map(|q| 1 + q.follow_ups.len()).sum();
        let seq = QuestionSequence::new(questions);
        assert_eq!(seq.len(), expected);
        assert_eq!(seq.len(), 9);
    }

    #[test]
    fn roots_in_order_with_follow_ups_adjacent() {
        let seq = QuestionSequence::new(standard_questions());
        let mut expected_ordinal = 0;
        for item in seq.items() {
            match item.follow_up {
                None => {
                    expected_ordinal += 1;
                    assert_eq!(item.root_ordinal, expected_ordinal);
                }
                Some(slot) => {
                    // Follow-ups belong to the root just seen.
                    assert_eq!(item.root_ordinal, expected_ordinal);
                    assert!(slot.index < slot.count);
                }
            }
        }
        assert_eq!(expected_ordinal, 6);
    }

    #[test]
    fn positions_are_sequential() {
        let seq = QuestionSequence::new(standard_questions());
        for (i, item) in seq.items().iter().enumerate() {
            assert_eq!(item.position, i);
        }
    }

    #[test]
    fn labels_distinguish_follow_ups() {
        let seq = QuestionSequence::new(standard_questions());
        assert_eq!(seq.item(0).label(), "Q1");
        assert_eq!(seq.item(1).label(), "Q2");
        assert_eq!(seq.item(2).label(), "Q2.1");
    }

    #[test]
    fn static_text_resolution() {
        let seq = QuestionSequence::new(standard_questions());
        let answers = empty_answers(seq.len());
        assert!(seq.resolve_text(0, &answers).starts_with("Tell me about the last time"));
        assert_eq!(
            seq.resolve_text(2, &answers),
            "During a typical week, how many days do you feel that way?"
        );
    }

    #[test]
    fn dynamic_quotes_most_recent_nonempty_answer() {
        let seq = QuestionSequence::new(standard_questions());
        let mut answers = empty_answers(seq.len());
        answers[0] = "endless meetings".to_string();
        answers[3] = "I stopped caring about reviews".to_string();

        // Position 7 is the dynamic root (Q5).
        let text = seq.resolve_text(7, &answers);
        assert!(text.contains("\"I stopped caring about reviews\""));
        assert!(!text.contains("endless meetings"));
    }

    #[test]
    fn dynamic_falls_back_without_prior_answers() {
        let seq = QuestionSequence::new(standard_questions());
        let answers = empty_answers(seq.len());
        let text = seq.resolve_text(7, &answers);
        assert_eq!(text, "Tell me more about the moment that feels most draining lately.");
        assert!(!text.contains('"'));
    }

    #[test]
    fn dynamic_ignores_answers_at_or_after_position() {
        let generator = DynamicGenerator::DeepDiveRecent;
        let answers = vec![String::new(), "later answer".to_string()];
        // Only answers strictly before position 1 are considered.
        let text = generator.resolve(&answers, 1);
        assert!(!text.contains("later answer"));
    }

    #[test]
    fn workday_ripple_wording() {
        let generator = DynamicGenerator::WorkdayRipple;
        let answers = vec!["the on-call rotation".to_string()];
        let text = generator.resolve(&answers, 1);
        assert!(text.contains("\"the on-call rotation\""));
        assert!(text.contains("ripple effect"));

        let fallback = generator.resolve(&[], 0);
        assert!(fallback.starts_with("Walk me through"));
    }

    #[test]
    fn whitespace_answers_are_skipped() {
        let generator = DynamicGenerator::DeepDiveRecent;
        let answers = vec!["real answer".to_string(), "   ".to_string()];
        let text = generator.resolve(&answers, 2);
        assert!(text.contains("\"real answer\""));
    }
}
