use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// Raw authoring input for a question, exactly as typed in a form.
///
/// Options may contain blanks; they are trimmed and dropped during
/// validation, mirroring how the authoring form offers four slots of
/// which only the filled ones count.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuestionDraft {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl QuestionDraft {
    /// Validate the draft into a well-formed question body.
    ///
    /// Rules are checked in a fixed order so the author always sees the
    /// first violated one: empty text, then fewer than two usable options,
    /// then a missing correct answer, then a correct answer that matches
    /// none of the options.
    ///
    /// # Errors
    ///
    /// Returns the first violated `QuestionValidationError` rule.
    pub fn validate(self) -> Result<ValidatedQuestion, QuestionValidationError> {
        let text = self.text.trim().to_owned();
        if text.is_empty() {
            return Err(QuestionValidationError::EmptyText);
        }

        let options: Vec<String> = self
            .options
            .iter()
            .map(|option| option.trim().to_owned())
            .filter(|option| !option.is_empty())
            .collect();
        if options.len() < 2 {
            return Err(QuestionValidationError::NotEnoughOptions);
        }

        let correct_answer = self.correct_answer.trim().to_owned();
        if correct_answer.is_empty() {
            return Err(QuestionValidationError::MissingCorrectAnswer);
        }
        if !options.contains(&correct_answer) {
            return Err(QuestionValidationError::CorrectAnswerNotAnOption);
        }

        Ok(ValidatedQuestion {
            text,
            options,
            correct_answer,
        })
    }
}

/// A question body that passed validation but has no identity yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    text: String,
    options: Vec<String>,
    correct_answer: String,
}

impl ValidatedQuestion {
    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            text: self.text,
            options: self.options,
            correct_answer: self.correct_answer,
        }
    }
}

/// A multiple-choice question. Immutable once built.
///
/// Invariants (upheld by both construction paths): at least two options,
/// and `correct_answer` is byte-for-byte equal to one of them. Duplicate
/// options are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_answer: String,
}

impl Question {
    /// Rehydrate a question from persisted storage.
    ///
    /// Persisted values were validated before the write, so no trimming is
    /// applied here; the structural invariants are still re-checked so a
    /// tampered or corrupt store cannot smuggle in a malformed question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionValidationError` if the stored shape violates the
    /// invariants above.
    pub fn from_persisted(
        id: QuestionId,
        text: String,
        options: Vec<String>,
        correct_answer: String,
    ) -> Result<Self, QuestionValidationError> {
        if text.trim().is_empty() {
            return Err(QuestionValidationError::EmptyText);
        }
        if options.len() < 2 {
            return Err(QuestionValidationError::NotEnoughOptions);
        }
        if correct_answer.is_empty() {
            return Err(QuestionValidationError::MissingCorrectAnswer);
        }
        if !options.contains(&correct_answer) {
            return Err(QuestionValidationError::CorrectAnswerNotAnOption);
        }

        Ok(Self {
            id,
            text,
            options,
            correct_answer,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    /// True when `option` is one of this question's options.
    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|candidate| candidate == option)
    }

    /// True when `option` is the byte-exact correct answer.
    #[must_use]
    pub fn is_correct(&self, option: &str) -> bool {
        self.correct_answer == option
    }
}

//
// ─── QUESTION VALIDATION ERRORS ────────────────────────────────────────────────
//

/// One variant per authoring rule, in the order the rules are evaluated.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionValidationError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("at least two answer options are required")]
    NotEnoughOptions,

    #[error("a correct answer must be provided")]
    MissingCorrectAnswer,

    #[error("the correct answer must exactly match one of the options")]
    CorrectAnswerNotAnOption,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(text: &str, options: &[&str], correct: &str) -> QuestionDraft {
        QuestionDraft {
            text: text.to_owned(),
            options: options.iter().map(|s| (*s).to_owned()).collect(),
            correct_answer: correct.to_owned(),
        }
    }

    #[test]
    fn empty_text_is_rejected_first() {
        // Text is checked before option count: a draft violating both rules
        // must surface the text message.
        let err = draft("   ", &["only one"], "only one").validate().unwrap_err();
        assert_eq!(err, QuestionValidationError::EmptyText);
    }

    #[test]
    fn fewer_than_two_options_rejected() {
        let err = draft("Q?", &["alone", "  "], "alone").validate().unwrap_err();
        assert_eq!(err, QuestionValidationError::NotEnoughOptions);
    }

    #[test]
    fn missing_correct_answer_rejected() {
        let err = draft("Q?", &["A", "B"], "   ").validate().unwrap_err();
        assert_eq!(err, QuestionValidationError::MissingCorrectAnswer);
    }

    #[test]
    fn correct_answer_not_among_options_rejected() {
        let err = draft("Q?", &["A", "B"], "C").validate().unwrap_err();
        assert_eq!(err, QuestionValidationError::CorrectAnswerNotAnOption);
    }

    #[test]
    fn validate_trims_and_drops_blank_options() {
        let validated = draft("  Q?  ", &[" A ", "", "B", "   "], " A ")
            .validate()
            .unwrap();
        let question = validated.assign_id(QuestionId::new(7));

        assert_eq!(question.id(), QuestionId::new(7));
        assert_eq!(question.text(), "Q?");
        assert_eq!(question.options(), ["A", "B"]);
        assert_eq!(question.correct_answer(), "A");
    }

    #[test]
    fn duplicate_options_are_allowed() {
        let question = draft("Q?", &["A", "A", "B"], "A")
            .validate()
            .unwrap()
            .assign_id(QuestionId::new(1));
        assert_eq!(question.options().len(), 3);
    }

    #[test]
    fn from_persisted_rechecks_invariants() {
        let err = Question::from_persisted(
            QuestionId::new(1),
            "Q?".to_owned(),
            vec!["A".to_owned(), "B".to_owned()],
            "C".to_owned(),
        )
        .unwrap_err();
        assert_eq!(err, QuestionValidationError::CorrectAnswerNotAnOption);

        let question = Question::from_persisted(
            QuestionId::new(1),
            "Q?".to_owned(),
            vec!["A".to_owned(), "B".to_owned()],
            "B".to_owned(),
        )
        .unwrap();
        assert!(question.is_correct("B"));
        assert!(!question.is_correct("A"));
        assert!(question.has_option("A"));
        assert!(!question.has_option("C"));
    }
}
