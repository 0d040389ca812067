use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizConfigError {
    #[error("question duration must be between 1 and 600 seconds")]
    InvalidQuestionSeconds,
}

/// Timing parameters for one quiz session.
///
/// The delays are presentation-tuned: the answer-reveal window must stay
/// long enough for the feedback animation that accompanies a locked answer,
/// the skip window stays short because no correctness feedback is shown.
/// None of the exact values are load-bearing, which is why they are
/// parameters rather than constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    question_secs: u32,
    answer_reveal_delay: Duration,
    skip_delay: Duration,
    timeout_delay: Duration,
}

impl QuizConfig {
    /// Create a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns `QuizConfigError::InvalidQuestionSeconds` if the per-question
    /// duration is zero or unreasonably long.
    pub fn new(
        question_secs: u32,
        answer_reveal_delay: Duration,
        skip_delay: Duration,
        timeout_delay: Duration,
    ) -> Result<Self, QuizConfigError> {
        if !(1..=600).contains(&question_secs) {
            return Err(QuizConfigError::InvalidQuestionSeconds);
        }
        Ok(Self {
            question_secs,
            answer_reveal_delay,
            skip_delay,
            timeout_delay,
        })
    }

    /// Seconds a student gets per question.
    #[must_use]
    pub fn question_secs(&self) -> u32 {
        self.question_secs
    }

    /// Pause between locking an answer and advancing.
    #[must_use]
    pub fn answer_reveal_delay(&self) -> Duration {
        self.answer_reveal_delay
    }

    /// Pause between confirming a skip and advancing.
    #[must_use]
    pub fn skip_delay(&self) -> Duration {
        self.skip_delay
    }

    /// Pause between a timeout and advancing.
    #[must_use]
    pub fn timeout_delay(&self) -> Duration {
        self.timeout_delay
    }
}

impl Default for QuizConfig {
    /// The portal's tuned values: 20 s per question, 2.6 s answer reveal,
    /// 0.4 s after a skip, 1.5 s after a timeout.
    fn default() -> Self {
        Self {
            question_secs: 20,
            answer_reveal_delay: Duration::from_millis(2_600),
            skip_delay: Duration::from_millis(400),
            timeout_delay: Duration::from_millis(1_500),
        }
    }
}
