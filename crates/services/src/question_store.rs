use std::sync::Arc;

use tracing::{debug, warn};

use quiz_core::catalog;
use quiz_core::model::Question;
use storage::repository::QuestionSetRepository;

/// Read side of the question store.
///
/// Resolution order for a module: the persisted override set (written by
/// the authoring path) shadows the built-in default set, and a module with
/// neither falls back to the single-question placeholder. Every failure on
/// the way down (a missing row, a corrupt value, an invariant-violating
/// record) drops to the next rung, so loading never fails.
#[derive(Clone)]
pub struct QuestionStoreService {
    sets: Arc<dyn QuestionSetRepository>,
}

impl QuestionStoreService {
    #[must_use]
    pub fn new(sets: Arc<dyn QuestionSetRepository>) -> Self {
        Self { sets }
    }

    /// Load the question set to run for `module`.
    pub async fn load_questions(&self, module: &str) -> Vec<Question> {
        match self.sets.get_questions(module).await {
            Ok(Some(set)) if !set.is_empty() => return set,
            Ok(Some(_)) => {
                // An empty override cannot start a session; treat it as absent.
                debug!(module, "ignoring empty stored question set");
            }
            Ok(None) => {}
            Err(err) => {
                warn!(
                    module,
                    error = %err,
                    "failed to read stored question set, falling back to defaults"
                );
            }
        }

        catalog::builtin_questions(module).unwrap_or_else(catalog::placeholder_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionDraft, QuestionId};
    use storage::repository::InMemoryRepository;

    fn build_question(id: u64, text: &str) -> Question {
        QuestionDraft {
            text: text.to_owned(),
            options: vec!["A".to_owned(), "B".to_owned()],
            correct_answer: "A".to_owned(),
        }
        .validate()
        .unwrap()
        .assign_id(QuestionId::new(id))
    }

    #[tokio::test]
    async fn override_shadows_builtin_set() {
        let repo = InMemoryRepository::new();
        let custom = vec![build_question(10, "remplacement")];
        repo.put_questions("Python", &custom).await.unwrap();

        let store = QuestionStoreService::new(Arc::new(repo));
        let loaded = store.load_questions("Python").await;
        assert_eq!(loaded, custom);
    }

    #[tokio::test]
    async fn builtin_set_used_when_no_override() {
        let store = QuestionStoreService::new(Arc::new(InMemoryRepository::new()));
        let loaded = store.load_questions("Python").await;
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].id(), QuestionId::new(1));
    }

    #[tokio::test]
    async fn unknown_module_gets_the_placeholder() {
        let store = QuestionStoreService::new(Arc::new(InMemoryRepository::new()));
        let loaded = store.load_questions("React.js").await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id(), QuestionId::new(0));
    }

    #[tokio::test]
    async fn empty_override_falls_through() {
        let repo = InMemoryRepository::new();
        repo.put_questions("Python", &[]).await.unwrap();

        let store = QuestionStoreService::new(Arc::new(repo));
        let loaded = store.load_questions("Python").await;
        assert_eq!(loaded.len(), 3);
    }
}
