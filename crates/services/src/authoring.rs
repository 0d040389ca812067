use std::sync::Arc;

use tracing::info;

use quiz_core::model::{Question, QuestionDraft, QuestionId};
use storage::repository::QuestionSetRepository;

use crate::error::AuthoringError;

/// Write side of the question store, used by the professor role.
///
/// The only writer: quiz-taking reads through `QuestionStoreService` and
/// never touches persistence.
#[derive(Clone)]
pub struct AuthoringService {
    sets: Arc<dyn QuestionSetRepository>,
}

impl AuthoringService {
    #[must_use]
    pub fn new(sets: Arc<dyn QuestionSetRepository>) -> Self {
        Self { sets }
    }

    /// Validate a draft and append it to the module's override set.
    ///
    /// Validation rules run in a fixed order so the author always sees the
    /// first violated one: missing target module, empty question text, fewer
    /// than two usable options, missing correct answer, correct answer not
    /// among the options. Nothing is written unless every rule passes.
    ///
    /// The new question gets the next id within the set. Note the override
    /// set starts empty: the first authored question shadows the module's
    /// built-in defaults entirely.
    ///
    /// # Errors
    ///
    /// Returns the violated `AuthoringError` rule, or a storage error when
    /// the set cannot be read or written back.
    pub async fn add_question(
        &self,
        module: Option<&str>,
        draft: QuestionDraft,
    ) -> Result<Question, AuthoringError> {
        let module = module
            .map(str::trim)
            .filter(|module| !module.is_empty())
            .ok_or(AuthoringError::MissingModule)?;

        let validated = draft.validate()?;

        let mut set = self.sets.get_questions(module).await?.unwrap_or_default();
        let next_id = set
            .iter()
            .map(|question| question.id().value())
            .max()
            .map_or(1, |max| max + 1);
        let question = validated.assign_id(QuestionId::new(next_id));

        set.push(question.clone());
        self.sets.put_questions(module, &set).await?;

        info!(module, id = %question.id(), "authored question saved");
        Ok(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionValidationError;
    use storage::repository::InMemoryRepository;

    fn service() -> (AuthoringService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        (AuthoringService::new(Arc::new(repo.clone())), repo)
    }

    fn draft(text: &str, options: &[&str], correct: &str) -> QuestionDraft {
        QuestionDraft {
            text: text.to_owned(),
            options: options.iter().map(|s| (*s).to_owned()).collect(),
            correct_answer: correct.to_owned(),
        }
    }

    #[tokio::test]
    async fn missing_module_is_checked_first() {
        let (service, _repo) = service();
        // The draft is also invalid, but the module rule must win.
        let err = service
            .add_question(None, draft("", &[], ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthoringError::MissingModule));

        let err = service
            .add_question(Some("   "), draft("", &[], ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthoringError::MissingModule));
    }

    #[tokio::test]
    async fn empty_text_beats_insufficient_options() {
        let (service, repo) = service();
        let err = service
            .add_question(Some("Python"), draft("", &["A"], "A"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthoringError::Question(QuestionValidationError::EmptyText)
        ));
        // No partial write.
        assert!(repo.get_questions("Python").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn correct_answer_outside_options_leaves_store_unchanged() {
        let (service, repo) = service();
        let err = service
            .add_question(Some("Python"), draft("Q?", &["A", "B"], "C"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthoringError::Question(QuestionValidationError::CorrectAnswerNotAnOption)
        ));
        assert!(repo.get_questions("Python").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn valid_question_is_appended_with_the_next_id() {
        let (service, repo) = service();

        let first = service
            .add_question(Some("Python"), draft("Q1 ?", &["A", "B"], "A"))
            .await
            .unwrap();
        assert_eq!(first.id(), QuestionId::new(1));

        let second = service
            .add_question(Some("Python"), draft("Q2 ?", &["X", "Y"], "Y"))
            .await
            .unwrap();
        assert_eq!(second.id(), QuestionId::new(2));

        let set = repo.get_questions("Python").await.unwrap().unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set[0].text(), "Q1 ?");
        assert_eq!(set[1].text(), "Q2 ?");
    }
}
