use crate::catalog::Filiere;

/// Percentage at or above which a run counts as passing. Drives the
/// choice between the two fixed encouragement fallback messages.
pub const PASSING_PERCENTAGE: u32 = 70;

//
// ─── SCORE TIER ────────────────────────────────────────────────────────────────
//

/// Coarse classification of a final percentage, used by presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTier {
    High,
    Mid,
    Low,
}

impl ScoreTier {
    /// Classify a percentage: High at 80 and above, Mid at 50 and above,
    /// Low otherwise.
    #[must_use]
    pub fn from_percentage(percentage: u32) -> Self {
        if percentage >= 80 {
            ScoreTier::High
        } else if percentage >= 50 {
            ScoreTier::Mid
        } else {
            ScoreTier::Low
        }
    }
}

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Final result of one quiz session, created exactly once at completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOutcome {
    score: u32,
    total_questions: u32,
    filiere: Filiere,
    module: String,
}

impl QuizOutcome {
    #[must_use]
    pub fn new(score: u32, total_questions: u32, filiere: Filiere, module: String) -> Self {
        Self {
            score,
            total_questions,
            filiere,
            module,
        }
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn filiere(&self) -> Filiere {
        self.filiere
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Score as a rounded percentage of the question count.
    ///
    /// The session lifecycle guarantees `total_questions > 0`; a zero total
    /// can only be constructed by hand and yields 0 rather than a panic.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.total_questions == 0 {
            return 0;
        }
        let ratio = f64::from(self.score) / f64::from(self.total_questions);

        // Scores are bounded by the question count, so the rounded value
        // always fits a u32.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            (ratio * 100.0).round() as u32
        }
    }

    #[must_use]
    pub fn tier(&self) -> ScoreTier {
        ScoreTier::from_percentage(self.percentage())
    }

    #[must_use]
    pub fn is_passing(&self) -> bool {
        self.percentage() >= PASSING_PERCENTAGE
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
