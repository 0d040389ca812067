#![forbid(unsafe_code)]

pub mod app_services;
pub mod authoring;
pub mod error;
pub mod motivation;
pub mod question_store;
pub mod sessions;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use authoring::AuthoringService;
pub use error::{AppServicesError, AuthoringError, MotivationError, SessionError};
pub use motivation::MotivationService;
pub use question_store::QuestionStoreService;

pub use sessions::{
    AdvanceOutcome, LockCause, PendingAdvance, QuestionReport, QuizSession, SessionPhase,
    SessionProgress, SessionRunner, SessionSnapshot,
};
