//! Multi-step waitlist questionnaire.
//!
//! Linear step-through over a fixed question list. Answers live in a
//! fixed-length array written by index; an empty string marks a question
//! as unanswered. Completed answer sets are handed to a [`SubmissionSink`].

/// One questionnaire step.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: u32,
    pub prompt: String,
    pub options: Vec<String>,
}

/// Destination for completed answer sets.
///
/// There is no backend contract yet; this trait is the seam where one
/// would plug in. The shipped implementation only logs.
pub trait SubmissionSink {
    /// Receive one answer per question, in question order.
    fn submit(&mut self, answers: &[String]);
}

/// Terminal sink: answers go to the log and nowhere else.
pub struct LogSink;

impl SubmissionSink for LogSink {
    fn submit(&mut self, answers: &[String]) {
        tracing::info!("Answers submitted: {:?}", answers);
    }
}

/// Questionnaire state: a cursor over the question list plus the answer
/// array.
pub struct Questionnaire {
    questions: Vec<Question>,
    /// Fixed length, one slot per question, written by index.
    answers: Vec<String>,
    current: usize,
    submitted: bool,
}

impl Questionnaire {
    pub fn new(questions: Vec<Question>) -> Self {
        debug_assert!(!questions.is_empty(), "questionnaire needs questions");
        let answers = vec![String::new(); questions.len()];
        Self {
            questions,
            answers,
            current: 0,
            submitted: false,
        }
    }

    /// The compiled-in waitlist question set.
    pub fn builtin() -> Self {
        let q = |id: u32, prompt: &str, options: &[&str]| Question {
            id,
            prompt: prompt.into(),
            options: options.iter().map(|s| s.to_string()).collect(),
        };

        Self::new(vec![
            q(
                1,
                "What is your level of knowledge in Web3?",
                &["Beginner", "Amateur", "Expert"],
            ),
            q(
                2,
                "What do you want to learn in Web3?",
                &["Gaming", "DeFi", "NFTs", "DAOs", "Smart Contracts"],
            ),
            q(
                3,
                "Which blockchain are you most interested in?",
                &["Ethereum", "Solana", "Sui", "Polkadot", "Other"],
            ),
            q(
                4,
                "How often do you engage with Web3 applications?",
                &["Daily", "Weekly", "Monthly", "Rarely", "Never"],
            ),
            q(
                5,
                "What's your primary motivation for learning Web3?",
                &[
                    "Career opportunities",
                    "Investment",
                    "Curiosity",
                    "Building projects",
                    "Other",
                ],
            ),
            q(6, "Have you ever owned cryptocurrency?", &["Yes", "No"]),
            q(
                7,
                "Which area of Web3 do you find most challenging?",
                &[
                    "Technical concepts",
                    "User experience",
                    "Security",
                    "Regulatory aspects",
                    "None",
                ],
            ),
            q(
                8,
                "How do you prefer to learn?",
                &[
                    "Video tutorials",
                    "Interactive coding",
                    "Reading documentation",
                    "Hands-on projects",
                    "Community forums",
                ],
            ),
            q(
                9,
                "What's your background?",
                &["Developer", "Designer", "Business/Finance", "Student", "Other"],
            ),
            q(
                10,
                "How did you hear about us?",
                &[
                    "Social media",
                    "Friend/Colleague",
                    "Search engine",
                    "Advertisement",
                    "Other",
                ],
            ),
        ])
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    pub fn answer_current(&self) -> &str {
        &self.answers[self.current]
    }

    /// Record the option at `option_index` as the current answer.
    /// Out-of-range selections are ignored.
    pub fn select(&mut self, option_index: usize) -> bool {
        let Some(option) = self.current_question().options.get(option_index).cloned() else {
            return false;
        };
        self.answers[self.current] = option;
        true
    }

    /// Whether the current question has been answered.
    pub fn can_advance(&self) -> bool {
        !self.answers[self.current].is_empty()
    }

    /// Fractional progress through the questionnaire, for the progress bar.
    pub fn progress(&self) -> f32 {
        (self.current + 1) as f32 / self.questions.len() as f32
    }

    pub fn is_complete(&self) -> bool {
        self.submitted
    }

    /// Move to the next question, or deliver the answers on the last one.
    /// A no-op while the current question is unanswered. Returns true once
    /// the questionnaire has been submitted.
    pub fn advance(&mut self, sink: &mut dyn SubmissionSink) -> bool {
        if self.submitted || !self.can_advance() {
            return self.submitted;
        }

        if self.current + 1 < self.questions.len() {
            self.current += 1;
        } else {
            self.submitted = true;
            sink.submit(&self.answers);
        }
        self.submitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CaptureSink {
        received: Vec<Vec<String>>,
    }

    impl SubmissionSink for CaptureSink {
        fn submit(&mut self, answers: &[String]) {
            self.received.push(answers.to_vec());
        }
    }

    fn two_questions() -> Questionnaire {
        Questionnaire::new(vec![
            Question {
                id: 1,
                prompt: "first".into(),
                options: vec!["a".into(), "b".into()],
            },
            Question {
                id: 2,
                prompt: "second".into(),
                options: vec!["x".into(), "y".into(), "z".into()],
            },
        ])
    }

    #[test]
    fn test_select_writes_by_index_without_resizing() {
        let mut q = two_questions();
        assert!(q.select(1));
        assert_eq!(q.answer_current(), "b");
        assert_eq!(q.len(), 2);

        // Re-selecting overwrites in place.
        assert!(q.select(0));
        assert_eq!(q.answer_current(), "a");
    }

    #[test]
    fn test_out_of_range_selection_ignored() {
        let mut q = two_questions();
        assert!(!q.select(7));
        assert_eq!(q.answer_current(), "");
    }

    #[test]
    fn test_advance_blocked_until_answered() {
        let mut q = two_questions();
        let mut sink = CaptureSink::default();

        assert!(!q.advance(&mut sink));
        assert_eq!(q.current_index(), 0);

        q.select(0);
        assert!(!q.advance(&mut sink));
        assert_eq!(q.current_index(), 1);
        assert!(sink.received.is_empty());
    }

    #[test]
    fn test_completion_delivers_ordered_answers() {
        let mut q = two_questions();
        let mut sink = CaptureSink::default();

        q.select(1);
        q.advance(&mut sink);
        q.select(2);
        assert!(q.advance(&mut sink));
        assert!(q.is_complete());

        assert_eq!(sink.received.len(), 1);
        assert_eq!(sink.received[0], vec!["b".to_string(), "z".to_string()]);
    }

    #[test]
    fn test_advance_after_submit_is_inert() {
        let mut q = two_questions();
        let mut sink = CaptureSink::default();
        q.select(0);
        q.advance(&mut sink);
        q.select(0);
        q.advance(&mut sink);

        assert!(q.advance(&mut sink));
        assert_eq!(sink.received.len(), 1, "no duplicate submission");
    }

    #[test]
    fn test_builtin_set_shape() {
        let q = Questionnaire::builtin();
        assert_eq!(q.len(), 10);
        assert_eq!(q.current_index(), 0);
        assert!(!q.can_advance());
        assert!((q.progress() - 0.1).abs() < f32::EPSILON);
    }
}
