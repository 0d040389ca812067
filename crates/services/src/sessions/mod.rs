mod progress;
mod runner;
mod service;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use runner::{SessionRunner, SessionSnapshot};
pub use service::{
    AdvanceOutcome, LockCause, PendingAdvance, QuestionReport, QuizSession, SessionPhase,
};
