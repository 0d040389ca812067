use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use quiz_core::catalog::Filiere;
use quiz_core::config::QuizConfig;
use quiz_core::model::{Question, QuestionId, QuizOutcome};
use quiz_core::time::Clock;

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── PHASES ────────────────────────────────────────────────────────────────────
//

/// What resolved the current question and locked it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockCause {
    Answered { correct: bool },
    Skipped,
    TimedOut,
}

/// The session's single phase field.
///
/// Exactly one of answering, skipping, and timing out can move a question
/// into `Locked`; holding the phase in one tagged value (rather than a
/// handful of booleans) makes that mutual exclusion structural. It also
/// rules out "answered while a dialog is open" by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Awaiting input, countdown running.
    Active,
    /// Skip confirmation dialog open; countdown paused.
    SkipConfirm,
    /// Report dialog open; countdown paused.
    ReportDraft,
    /// Question resolved, awaiting the scheduled advancement.
    Locked(LockCause),
    /// Terminal.
    Completed,
}

//
// ─── DEFERRED ADVANCEMENT ──────────────────────────────────────────────────────
//

/// A one-shot token for the advancement the host must schedule.
///
/// Every transition out of `Active` yields one of these. The token captures
/// the generation it was issued under; `QuizSession::advance` refuses tokens
/// from a generation the session has already left, so a delayed callback can
/// never apply a stale mutation no matter how late it fires.
#[derive(Debug, PartialEq, Eq)]
pub struct PendingAdvance {
    generation: u64,
    delay: Duration,
}

impl PendingAdvance {
    /// How long the host should wait before calling `advance`.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Result of consuming a `PendingAdvance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Moved to the next question; the session is `Active` again.
    NextQuestion,
    /// The last question was resolved; the session is `Completed`.
    Completed(QuizOutcome),
    /// The token no longer matches the session state; nothing changed.
    Stale,
}

//
// ─── REPORTS ───────────────────────────────────────────────────────────────────
//

/// A problem report filed against one question during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReport {
    pub question_id: QuestionId,
    pub question_text: String,
    pub reason: String,
}

type FinishCallback = Box<dyn FnOnce(&QuizOutcome) + Send>;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State machine for one run through a question set.
///
/// Owns all per-session state and mutates it only through the operations
/// below. Operations invoked in the wrong phase are no-ops, logged for
/// diagnostics and never surfaced to the student; the same goes for a
/// selected option that is not part of the current question, which is a
/// presentation-layer contract violation rather than a user error.
///
/// The machine is synchronous and deterministic. Real time enters only
/// through the host: a ticker calling [`tick`](Self::tick) once per second
/// and a scheduler honoring the [`PendingAdvance`] tokens.
pub struct QuizSession {
    filiere: Filiere,
    module: String,
    questions: Vec<Question>,
    config: QuizConfig,
    current: usize,
    score: u32,
    selected: Option<String>,
    time_remaining: u32,
    phase: SessionPhase,
    generation: u64,
    reports: Vec<QuestionReport>,
    outcome: Option<QuizOutcome>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    clock: Clock,
    on_finish: Option<FinishCallback>,
}

impl QuizSession {
    /// Create a session over a fixed question set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are provided and
    /// `SessionError::TooManyQuestions` if the set cannot be counted in the
    /// final score's `u32`.
    pub fn new(
        filiere: Filiere,
        module: impl Into<String>,
        questions: Vec<Question>,
        config: QuizConfig,
        clock: Clock,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        if u32::try_from(questions.len()).is_err() {
            return Err(SessionError::TooManyQuestions {
                len: questions.len(),
            });
        }

        let time_remaining = config.question_secs();
        Ok(Self {
            filiere,
            module: module.into(),
            questions,
            config,
            current: 0,
            score: 0,
            selected: None,
            time_remaining,
            phase: SessionPhase::Active,
            generation: 0,
            reports: Vec::new(),
            outcome: None,
            started_at: clock.now(),
            completed_at: None,
            clock,
            on_finish: None,
        })
    }

    /// Register a callback fired exactly once when the session completes.
    #[must_use]
    pub fn with_on_finish(mut self, on_finish: impl FnOnce(&QuizOutcome) + Send + 'static) -> Self {
        self.on_finish = Some(Box::new(on_finish));
        self
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn filiere(&self) -> Filiere {
        self.filiere
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Zero-based index of the question currently on screen.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.is_complete() {
            None
        } else {
            self.questions.get(self.current)
        }
    }

    /// True once the current question is resolved (answer, skip, or timeout).
    #[must_use]
    pub fn is_answered(&self) -> bool {
        matches!(self.phase, SessionPhase::Locked(_))
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.phase, SessionPhase::Completed)
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&QuizOutcome> {
        self.outcome.as_ref()
    }

    #[must_use]
    pub fn reports(&self) -> &[QuestionReport] {
        &self.reports
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions.len();
        let answered = match self.phase {
            SessionPhase::Completed => total,
            SessionPhase::Locked(_) => self.current + 1,
            _ => self.current,
        };
        SessionProgress {
            total,
            answered,
            remaining: total - answered,
            is_complete: self.is_complete(),
        }
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────
    //

    /// Record the student's selection for the current question.
    ///
    /// Valid only in `Active`; the score increases by exactly 1 when the
    /// option matches the correct answer byte for byte. Returns the
    /// advancement token to schedule, or `None` when the call was ignored.
    pub fn select_option(&mut self, option: &str) -> Option<PendingAdvance> {
        if self.phase != SessionPhase::Active {
            debug!(phase = ?self.phase, "selection ignored outside the active phase");
            return None;
        }
        let Some(question) = self.questions.get(self.current) else {
            return None;
        };
        if !question.has_option(option) {
            debug!(
                question_id = %question.id(),
                option,
                "selected option is not part of the current question"
            );
            return None;
        }

        let correct = question.is_correct(option);
        self.selected = Some(option.to_owned());
        if correct {
            self.score += 1;
        }
        self.phase = SessionPhase::Locked(LockCause::Answered { correct });
        Some(self.pending(self.config.answer_reveal_delay()))
    }

    /// Open the skip confirmation dialog. Pauses the countdown.
    pub fn request_skip(&mut self) -> bool {
        if self.phase != SessionPhase::Active {
            debug!(phase = ?self.phase, "skip request ignored");
            return false;
        }
        self.phase = SessionPhase::SkipConfirm;
        true
    }

    /// Confirm the pending skip: the question resolves without score change.
    pub fn confirm_skip(&mut self) -> Option<PendingAdvance> {
        if self.phase != SessionPhase::SkipConfirm {
            debug!(phase = ?self.phase, "skip confirmation ignored");
            return None;
        }
        self.phase = SessionPhase::Locked(LockCause::Skipped);
        Some(self.pending(self.config.skip_delay()))
    }

    /// Close the skip dialog and resume the question unchanged.
    pub fn cancel_skip(&mut self) -> bool {
        if self.phase != SessionPhase::SkipConfirm {
            debug!(phase = ?self.phase, "skip cancellation ignored");
            return false;
        }
        self.phase = SessionPhase::Active;
        true
    }

    /// Open the report dialog. Pauses the countdown.
    pub fn request_report(&mut self) -> bool {
        if self.phase != SessionPhase::Active {
            debug!(phase = ?self.phase, "report request ignored");
            return false;
        }
        self.phase = SessionPhase::ReportDraft;
        true
    }

    /// File a report against the current question and resume it.
    ///
    /// Requires a non-empty trimmed reason; reports never touch the score,
    /// the countdown, or question progression.
    pub fn submit_report(&mut self, reason: &str) -> bool {
        if self.phase != SessionPhase::ReportDraft {
            debug!(phase = ?self.phase, "report submission ignored");
            return false;
        }
        let reason = reason.trim();
        if reason.is_empty() {
            debug!("empty report reason rejected");
            return false;
        }
        let Some(question) = self.questions.get(self.current) else {
            return false;
        };

        info!(
            question_id = %question.id(),
            reason,
            "question reported"
        );
        self.reports.push(QuestionReport {
            question_id: question.id(),
            question_text: question.text().to_owned(),
            reason: reason.to_owned(),
        });
        self.phase = SessionPhase::Active;
        true
    }

    /// Discard the report draft and resume the question unchanged.
    pub fn cancel_report(&mut self) -> bool {
        if self.phase != SessionPhase::ReportDraft {
            debug!(phase = ?self.phase, "report cancellation ignored");
            return false;
        }
        self.phase = SessionPhase::Active;
        true
    }

    /// Count down one whole second.
    ///
    /// Only the `Active` phase consumes ticks; dialogs and locked questions
    /// leave the countdown untouched. When the countdown reaches zero the
    /// question resolves as timed out, without score change.
    pub fn tick(&mut self) -> Option<PendingAdvance> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining > 0 {
            return None;
        }
        self.phase = SessionPhase::Locked(LockCause::TimedOut);
        Some(self.pending(self.config.timeout_delay()))
    }

    /// Consume an advancement token issued by one of the locking transitions.
    ///
    /// Stale tokens are no-ops. From the last index this completes the
    /// session exactly once, emitting the final [`QuizOutcome`] and firing
    /// the completion callback; otherwise the next question starts fresh.
    pub fn advance(&mut self, pending: PendingAdvance) -> AdvanceOutcome {
        if pending.generation != self.generation
            || !matches!(self.phase, SessionPhase::Locked(_))
        {
            debug!(
                token_generation = pending.generation,
                generation = self.generation,
                phase = ?self.phase,
                "stale advancement token ignored"
            );
            return AdvanceOutcome::Stale;
        }

        self.generation += 1;
        if self.current + 1 >= self.questions.len() {
            self.phase = SessionPhase::Completed;
            self.completed_at = Some(self.clock.now());

            // Checked at construction.
            let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
            let outcome =
                QuizOutcome::new(self.score, total, self.filiere, self.module.clone());
            self.outcome = Some(outcome.clone());
            if let Some(on_finish) = self.on_finish.take() {
                on_finish(&outcome);
            }
            AdvanceOutcome::Completed(outcome)
        } else {
            self.current += 1;
            self.selected = None;
            self.time_remaining = self.config.question_secs();
            self.phase = SessionPhase::Active;
            AdvanceOutcome::NextQuestion
        }
    }

    fn pending(&self, delay: Duration) -> PendingAdvance {
        PendingAdvance {
            generation: self.generation,
            delay,
        }
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("module", &self.module)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("score", &self.score)
            .field("phase", &self.phase)
            .field("time_remaining", &self.time_remaining)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionDraft;
    use quiz_core::time::fixed_clock;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn build_question(id: u64) -> Question {
        QuestionDraft {
            text: format!("Q{id}"),
            options: vec!["A".to_owned(), "B".to_owned(), "C".to_owned()],
            correct_answer: "A".to_owned(),
        }
        .validate()
        .unwrap()
        .assign_id(QuestionId::new(id))
    }

    fn short_config() -> QuizConfig {
        QuizConfig::new(
            3,
            Duration::from_millis(26),
            Duration::from_millis(4),
            Duration::from_millis(15),
        )
        .unwrap()
    }

    fn build_session(count: u64) -> QuizSession {
        let questions = (1..=count).map(build_question).collect();
        QuizSession::new(
            Filiere::DeveloppementDigital,
            "Python",
            questions,
            short_config(),
            fixed_clock(),
        )
        .unwrap()
    }

    #[test]
    fn empty_set_is_rejected() {
        let err = QuizSession::new(
            Filiere::DeveloppementDigital,
            "Python",
            Vec::new(),
            short_config(),
            fixed_clock(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[test]
    fn correct_answer_scores_once_and_locks() {
        let mut session = build_session(2);

        let pending = session.select_option("A").unwrap();
        assert_eq!(pending.delay(), Duration::from_millis(26));
        assert_eq!(session.score(), 1);
        assert_eq!(
            session.phase(),
            SessionPhase::Locked(LockCause::Answered { correct: true })
        );
        assert!(session.is_answered());

        // Mutual exclusion: a rapid second input cannot change anything.
        assert!(session.select_option("B").is_none());
        assert_eq!(session.score(), 1);
        assert_eq!(session.selected_option(), Some("A"));
    }

    #[test]
    fn wrong_answer_locks_without_score() {
        let mut session = build_session(1);
        session.select_option("B").unwrap();
        assert_eq!(session.score(), 0);
        assert_eq!(
            session.phase(),
            SessionPhase::Locked(LockCause::Answered { correct: false })
        );
    }

    #[test]
    fn unknown_option_is_a_silent_no_op() {
        let mut session = build_session(1);
        assert!(session.select_option("Z").is_none());
        assert_eq!(session.phase(), SessionPhase::Active);
        assert_eq!(session.score(), 0);
        assert!(session.selected_option().is_none());

        // The question is still answerable afterwards.
        assert!(session.select_option("A").is_some());
    }

    #[test]
    fn skip_flow_resolves_without_score() {
        let mut session = build_session(2);

        assert!(session.request_skip());
        assert_eq!(session.phase(), SessionPhase::SkipConfirm);
        // Selection is not valid while the dialog is open.
        assert!(session.select_option("A").is_none());

        let pending = session.confirm_skip().unwrap();
        assert_eq!(pending.delay(), Duration::from_millis(4));
        assert_eq!(session.phase(), SessionPhase::Locked(LockCause::Skipped));
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn cancelled_skip_returns_to_active_unchanged() {
        let mut session = build_session(1);
        let before_time = session.time_remaining();

        session.request_skip();
        assert!(session.cancel_skip());
        assert_eq!(session.phase(), SessionPhase::Active);
        assert_eq!(session.time_remaining(), before_time);
        assert!(session.select_option("A").is_some());
    }

    #[test]
    fn report_flow_captures_reason_and_resumes() {
        let mut session = build_session(1);

        assert!(session.request_report());
        assert_eq!(session.phase(), SessionPhase::ReportDraft);

        // A blank reason keeps the dialog open.
        assert!(!session.submit_report("   "));
        assert_eq!(session.phase(), SessionPhase::ReportDraft);

        assert!(session.submit_report("  énoncé ambigu  "));
        assert_eq!(session.phase(), SessionPhase::Active);
        assert_eq!(session.reports().len(), 1);
        assert_eq!(session.reports()[0].question_id, QuestionId::new(1));
        assert_eq!(session.reports()[0].reason, "énoncé ambigu");
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn cancelled_report_leaves_no_trace() {
        let mut session = build_session(1);
        session.request_report();
        assert!(session.cancel_report());
        assert_eq!(session.phase(), SessionPhase::Active);
        assert!(session.reports().is_empty());
    }

    #[test]
    fn countdown_locks_after_duration_ticks() {
        let mut session = build_session(1);

        assert!(session.tick().is_none());
        assert!(session.tick().is_none());
        assert_eq!(session.time_remaining(), 1);

        let pending = session.tick().unwrap();
        assert_eq!(pending.delay(), Duration::from_millis(15));
        assert_eq!(session.phase(), SessionPhase::Locked(LockCause::TimedOut));
        assert_eq!(session.time_remaining(), 0);
        assert_eq!(session.score(), 0);

        // No further decrement once locked.
        assert!(session.tick().is_none());
        assert_eq!(session.time_remaining(), 0);
    }

    #[test]
    fn dialogs_pause_the_countdown() {
        let mut session = build_session(1);
        session.tick();
        let frozen = session.time_remaining();

        session.request_skip();
        assert!(session.tick().is_none());
        assert_eq!(session.time_remaining(), frozen);
        session.cancel_skip();

        session.request_report();
        assert!(session.tick().is_none());
        assert_eq!(session.time_remaining(), frozen);
    }

    #[test]
    fn selection_beats_a_simultaneous_timeout() {
        let mut session = build_session(1);
        session.tick();
        session.tick();
        let pending = session.select_option("A").unwrap();

        // The tick that would have expired the question is now a no-op.
        assert!(session.tick().is_none());
        assert_eq!(
            session.phase(),
            SessionPhase::Locked(LockCause::Answered { correct: true })
        );
        assert!(matches!(
            session.advance(pending),
            AdvanceOutcome::Completed(_)
        ));
    }

    #[test]
    fn advance_moves_to_a_fresh_question() {
        let mut session = build_session(2);
        let pending = session.select_option("B").unwrap();

        assert_eq!(session.advance(pending), AdvanceOutcome::NextQuestion);
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.phase(), SessionPhase::Active);
        assert!(session.selected_option().is_none());
        assert_eq!(session.time_remaining(), 3);
        assert_eq!(session.current_question().unwrap().id(), QuestionId::new(2));
    }

    #[test]
    fn stale_token_does_not_advance_twice() {
        let mut session = build_session(3);
        let pending = session.select_option("A").unwrap();
        assert_eq!(session.advance(pending), AdvanceOutcome::NextQuestion);

        // Re-using a token for the already-left generation is harmless.
        let stale = PendingAdvance {
            generation: 0,
            delay: Duration::ZERO,
        };
        assert_eq!(session.advance(stale), AdvanceOutcome::Stale);
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn token_is_void_before_locking() {
        let mut session = build_session(1);
        let premature = PendingAdvance {
            generation: 0,
            delay: Duration::ZERO,
        };
        assert_eq!(session.advance(premature), AdvanceOutcome::Stale);
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[test]
    fn completion_fires_the_callback_exactly_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&calls);
        let mut session = build_session(1).with_on_finish(move |outcome| {
            assert_eq!(outcome.total_questions(), 1);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let pending = session.select_option("A").unwrap();
        let AdvanceOutcome::Completed(outcome) = session.advance(pending) else {
            panic!("expected completion");
        };
        assert_eq!(outcome.score(), 1);
        assert!(session.is_complete());
        assert!(session.completed_at().is_some());
        assert!(session.current_question().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A replayed token cannot complete the session a second time.
        let replay = PendingAdvance {
            generation: 1,
            delay: Duration::ZERO,
        };
        assert_eq!(session.advance(replay), AdvanceOutcome::Stale);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn answer_skip_timeout_scenario_scores_one_of_three() {
        let mut session = build_session(3);

        // Q1: answered correctly.
        let pending = session.select_option("A").unwrap();
        assert_eq!(session.advance(pending), AdvanceOutcome::NextQuestion);

        // Q2: skipped.
        session.request_skip();
        let pending = session.confirm_skip().unwrap();
        assert_eq!(session.advance(pending), AdvanceOutcome::NextQuestion);

        // Q3: times out.
        let pending = loop {
            if let Some(pending) = session.tick() {
                break pending;
            }
        };
        let AdvanceOutcome::Completed(outcome) = session.advance(pending) else {
            panic!("expected completion");
        };

        assert_eq!(outcome.score(), 1);
        assert_eq!(outcome.total_questions(), 3);
        assert_eq!(outcome.module(), "Python");
    }

    #[test]
    fn progress_tracks_resolution() {
        let mut session = build_session(2);
        assert_eq!(session.progress().answered, 0);
        assert_eq!(session.progress().remaining, 2);

        let pending = session.select_option("A").unwrap();
        assert_eq!(session.progress().answered, 1);

        session.advance(pending);
        assert_eq!(session.progress().answered, 1);

        let pending = session.select_option("B").unwrap();
        session.advance(pending);
        let progress = session.progress();
        assert_eq!(progress.answered, 2);
        assert_eq!(progress.remaining, 0);
        assert!(progress.is_complete);
    }
}
