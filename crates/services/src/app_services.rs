use std::sync::Arc;

use quiz_core::catalog::Filiere;
use quiz_core::config::QuizConfig;
use quiz_core::time::Clock;
use storage::repository::Storage;

use crate::authoring::AuthoringService;
use crate::error::{AppServicesError, SessionError};
use crate::motivation::MotivationService;
use crate::question_store::QuestionStoreService;
use crate::sessions::{QuizSession, SessionRunner};

/// Assembles the quiz engine's services over a storage backend.
#[derive(Clone)]
pub struct AppServices {
    question_store: Arc<QuestionStoreService>,
    authoring: Arc<AuthoringService>,
    motivation: Arc<MotivationService>,
    quiz_config: QuizConfig,
    clock: Clock,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(storage, clock))
    }

    /// Build services over an existing storage backend.
    #[must_use]
    pub fn with_storage(storage: Storage, clock: Clock) -> Self {
        let question_store = Arc::new(QuestionStoreService::new(Arc::clone(
            &storage.question_sets,
        )));
        let authoring = Arc::new(AuthoringService::new(Arc::clone(&storage.question_sets)));
        let motivation = Arc::new(MotivationService::from_env());

        Self {
            question_store,
            authoring,
            motivation,
            quiz_config: QuizConfig::default(),
            clock,
        }
    }

    /// Override the timing parameters used for new sessions.
    #[must_use]
    pub fn with_quiz_config(mut self, quiz_config: QuizConfig) -> Self {
        self.quiz_config = quiz_config;
        self
    }

    #[must_use]
    pub fn question_store(&self) -> Arc<QuestionStoreService> {
        Arc::clone(&self.question_store)
    }

    #[must_use]
    pub fn authoring(&self) -> Arc<AuthoringService> {
        Arc::clone(&self.authoring)
    }

    #[must_use]
    pub fn motivation(&self) -> Arc<MotivationService> {
        Arc::clone(&self.motivation)
    }

    #[must_use]
    pub fn quiz_config(&self) -> &QuizConfig {
        &self.quiz_config
    }

    /// Resolve the module's question set and start a running session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if a session cannot be built from the resolved
    /// set; the store's fallback chain makes that unreachable in practice.
    pub async fn start_quiz(
        &self,
        filiere: Filiere,
        module: &str,
    ) -> Result<SessionRunner, SessionError> {
        let questions = self.question_store.load_questions(module).await;
        let session = QuizSession::new(
            filiere,
            module,
            questions,
            self.quiz_config.clone(),
            self.clock,
        )?;
        Ok(SessionRunner::start(session))
    }
}
