use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Level, ProblemKind};

/// One graded answer inside a practice run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub index: usize,
    pub kind: ProblemKind,
    pub correct: bool,
    pub xp_awarded: u32,
}

/// How a practice run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    /// Every problem was answered.
    Completed,
    /// Hearts ran out; the remaining problems were forfeited.
    OutOfHearts,
}

/// Aggregate summary for a finished practice run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    level: Level,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_problems: usize,
    answered: usize,
    correct: usize,
    xp: u32,
    percent: u8,
    end: SessionEnd,
}

impl SessionSummary {
    /// Build a summary from the answers given during a run.
    ///
    /// Never fails: a `completed_at` earlier than `started_at` (a clock that
    /// stepped backwards) is raised to `started_at`, `percent` is capped at 100 and
    /// `total_problems` is raised to the number of answers.
    #[must_use]
    pub fn from_answers(
        level: Level,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        total_problems: usize,
        answers: &[AnswerRecord],
        percent: u8,
        end: SessionEnd,
    ) -> Self {
        let correct = answers.iter().filter(|a| a.correct).count();
        let xp = answers
            .iter()
            .fold(0_u32, |acc, a| acc.saturating_add(a.xp_awarded));

        Self {
            level,
            started_at,
            completed_at: completed_at.max(started_at),
            total_problems: total_problems.max(answers.len()),
            answered: answers.len(),
            correct,
            xp,
            percent: percent.min(100),
            end,
        }
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total_problems(&self) -> usize {
        self.total_problems
    }

    #[must_use]
    pub fn answered(&self) -> usize {
        self.answered
    }

    #[must_use]
    pub fn correct(&self) -> usize {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> usize {
        self.answered - self.correct
    }

    /// Problems never shown because the run ended early.
    #[must_use]
    pub fn forfeited(&self) -> usize {
        self.total_problems - self.answered
    }

    #[must_use]
    pub fn xp(&self) -> u32 {
        self.xp
    }

    /// Percentage handed to the learner's level progress.
    #[must_use]
    pub fn percent(&self) -> u8 {
        self.percent
    }

    #[must_use]
    pub fn end(&self) -> SessionEnd {
        self.end
    }

    #[must_use]
    pub fn ran_out_of_hearts(&self) -> bool {
        self.end == SessionEnd::OutOfHearts
    }
}
