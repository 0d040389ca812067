use thiserror::Error;

use crate::config::QuizConfigError;
use crate::model::QuestionValidationError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    QuestionValidation(#[from] QuestionValidationError),
    #[error(transparent)]
    Config(#[from] QuizConfigError),
}
