//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::QuestionValidationError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by session construction.
///
/// Operations on a live session never error: calls that do not apply in the
/// current phase are deliberate no-ops (see `QuizSession`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,

    #[error("too many questions for a single session: {len}")]
    TooManyQuestions { len: usize },
}

/// Errors emitted by the authoring write path.
///
/// One variant per validation rule, evaluated in a fixed order: target
/// module first, then the question body rules in `QuestionValidationError`
/// order. Each renders as its own user-facing message.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthoringError {
    #[error("a target module must be selected before adding a question")]
    MissingModule,

    #[error(transparent)]
    Question(#[from] QuestionValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `MotivationService`.
///
/// These never reach the student; `encouragement` converts every one of
/// them into the fixed fallback message.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MotivationError {
    #[error("motivation service is not configured")]
    Disabled,

    #[error("motivation service returned an empty response")]
    EmptyResponse,

    #[error("motivation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
