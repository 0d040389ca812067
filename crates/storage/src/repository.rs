use async_trait::async_trait;
use quiz_core::model::{Question, QuestionId, QuestionValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for a question.
///
/// This mirrors the domain `Question` so repositories can serialize and
/// deserialize without leaking storage concerns into the domain layer. The
/// field names keep the portal's historical wire format (camelCase JSON),
/// so sets written by earlier versions of the portal still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: u64,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: question.id().value(),
            text: question.text().to_owned(),
            options: question.options().to_vec(),
            correct_answer: question.correct_answer().to_owned(),
        }
    }

    /// Convert the record back into a domain `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionValidationError` if the stored shape violates the
    /// question invariants.
    pub fn into_question(self) -> Result<Question, QuestionValidationError> {
        Question::from_persisted(
            QuestionId::new(self.id),
            self.text,
            self.options,
            self.correct_answer,
        )
    }
}

/// Repository contract for per-module question sets.
///
/// The store is an opaque key-value mapping from module name to an ordered
/// question sequence. Quiz-taking only reads; the authoring path is the
/// single writer.
#[async_trait]
pub trait QuestionSetRepository: Send + Sync {
    /// Fetch the persisted override set for a module.
    ///
    /// Returns `Ok(None)` when no set was ever written for the module.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the stored value cannot be read or no
    /// longer decodes into valid questions.
    async fn get_questions(&self, module: &str) -> Result<Option<Vec<Question>>, StorageError>;

    /// Persist the full set for a module, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the set cannot be stored.
    async fn put_questions(&self, module: &str, questions: &[Question])
    -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sets: Arc<Mutex<HashMap<String, Vec<Question>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sets: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl QuestionSetRepository for InMemoryRepository {
    async fn get_questions(&self, module: &str) -> Result<Option<Vec<Question>>, StorageError> {
        let guard = self
            .sets
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(module).cloned())
    }

    async fn put_questions(
        &self,
        module: &str,
        questions: &[Question],
    ) -> Result<(), StorageError> {
        let mut guard = self
            .sets
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(module.to_owned(), questions.to_vec());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub question_sets: Arc<dyn QuestionSetRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let question_sets: Arc<dyn QuestionSetRepository> = Arc::new(repo);
        Self { question_sets }
    }
}
