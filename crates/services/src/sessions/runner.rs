use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::warn;

use quiz_core::model::{Question, QuizOutcome};

use super::service::{AdvanceOutcome, PendingAdvance, QuizSession, SessionPhase};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Read-only view of the running session for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub question: Option<Question>,
    /// One-based position of the current question.
    pub question_number: usize,
    pub total_questions: usize,
    pub time_remaining: u32,
    pub score: u32,
    pub phase: SessionPhase,
    pub selected_option: Option<String>,
}

/// Drives a [`QuizSession`] with real time.
///
/// Two background tasks own the temporal side of a session: a ticker that
/// feeds `tick()` once per elapsed second, and a scheduler that sleeps out
/// each [`PendingAdvance`] before handing it back to the machine. Ticks,
/// scheduled advancements, and the user operations below all go through one
/// mutex, so exactly one mutation applies at a time.
///
/// Dropping the runner aborts both tasks; a tick can never fire against a
/// torn-down session, and a sleeping advancement that outlives its state is
/// already voided by the machine's generation check.
pub struct SessionRunner {
    session: Arc<Mutex<QuizSession>>,
    advances: mpsc::UnboundedSender<PendingAdvance>,
    outcome_rx: watch::Receiver<Option<QuizOutcome>>,
    ticker: JoinHandle<()>,
    scheduler: JoinHandle<()>,
}

impl SessionRunner {
    /// Start driving the session. Must be called within a tokio runtime.
    #[must_use]
    pub fn start(session: QuizSession) -> Self {
        let session = Arc::new(Mutex::new(session));
        let (advances, advances_rx) = mpsc::unbounded_channel::<PendingAdvance>();
        let (outcome_tx, outcome_rx) = watch::channel(None);

        let ticker = Self::spawn_ticker(Arc::clone(&session), advances.clone());
        let scheduler = Self::spawn_scheduler(Arc::clone(&session), advances_rx, outcome_tx);

        Self {
            session,
            advances,
            outcome_rx,
            ticker,
            scheduler,
        }
    }

    fn spawn_ticker(
        session: Arc<Mutex<QuizSession>>,
        advances: mpsc::UnboundedSender<PendingAdvance>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            // Delayed start: the first whole second must elapse before the
            // first decrement. Missed ticks are skipped, never replayed, so
            // a stalled runtime cannot burn several seconds at once.
            let mut interval = time::interval_at(time::Instant::now() + TICK_PERIOD, TICK_PERIOD);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let pending = {
                    let Ok(mut session) = session.lock() else {
                        return;
                    };
                    if session.is_complete() {
                        return;
                    }
                    session.tick()
                };
                if let Some(pending) = pending {
                    if advances.send(pending).is_err() {
                        return;
                    }
                }
            }
        })
    }

    fn spawn_scheduler(
        session: Arc<Mutex<QuizSession>>,
        mut advances_rx: mpsc::UnboundedReceiver<PendingAdvance>,
        outcome_tx: watch::Sender<Option<QuizOutcome>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            // At most one token is in flight per question, so draining the
            // channel sequentially keeps advancements ordered.
            while let Some(pending) = advances_rx.recv().await {
                time::sleep(pending.delay()).await;
                let outcome = {
                    let Ok(mut session) = session.lock() else {
                        return;
                    };
                    session.advance(pending)
                };
                if let AdvanceOutcome::Completed(outcome) = outcome {
                    let _ = outcome_tx.send(Some(outcome));
                    return;
                }
            }
        })
    }

    /// Select an option for the current question.
    ///
    /// Returns false when the machine ignored the call.
    pub fn select_option(&self, option: &str) -> bool {
        self.forward(|session| session.select_option(option))
    }

    pub fn request_skip(&self) -> bool {
        self.with_session(QuizSession::request_skip).unwrap_or(false)
    }

    pub fn confirm_skip(&self) -> bool {
        self.forward(QuizSession::confirm_skip)
    }

    pub fn cancel_skip(&self) -> bool {
        self.with_session(QuizSession::cancel_skip).unwrap_or(false)
    }

    pub fn request_report(&self) -> bool {
        self.with_session(QuizSession::request_report)
            .unwrap_or(false)
    }

    pub fn submit_report(&self, reason: &str) -> bool {
        self.with_session(|session| session.submit_report(reason))
            .unwrap_or(false)
    }

    pub fn cancel_report(&self) -> bool {
        self.with_session(QuizSession::cancel_report)
            .unwrap_or(false)
    }

    /// Current state of the session for rendering.
    #[must_use]
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.with_session(|session| SessionSnapshot {
            question: session.current_question().cloned(),
            question_number: session.current_index() + 1,
            total_questions: session.total_questions(),
            time_remaining: session.time_remaining(),
            score: session.score(),
            phase: session.phase(),
            selected_option: session.selected_option().map(str::to_owned),
        })
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.with_session(|session| session.is_complete())
            .unwrap_or(true)
    }

    /// Wait for the session to complete and return the final outcome.
    ///
    /// Returns `None` only if the runner was torn down before completion.
    pub async fn finished(&self) -> Option<QuizOutcome> {
        let mut outcome_rx = self.outcome_rx.clone();
        let value = outcome_rx.wait_for(Option::is_some).await.ok()?;
        value.clone()
    }

    fn forward(
        &self,
        op: impl FnOnce(&mut QuizSession) -> Option<PendingAdvance>,
    ) -> bool {
        let Some(pending) = self.with_session(op).flatten() else {
            return false;
        };
        if self.advances.send(pending).is_err() {
            warn!("advancement scheduler is gone; session cannot progress");
            return false;
        }
        true
    }

    fn with_session<T>(&self, f: impl FnOnce(&mut QuizSession) -> T) -> Option<T> {
        match self.session.lock() {
            Ok(mut guard) => Some(f(&mut guard)),
            Err(poisoned) => {
                warn!(error = %poisoned, "session mutex poisoned");
                None
            }
        }
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        self.ticker.abort();
        self.scheduler.abort();
    }
}
