use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use lingo_core::entitlement::{ProgressUpdate, record_level_progress};
use lingo_core::model::{
    AnswerRecord, LearnerProgress, Level, LevelCorpus, Problem, Response, SessionEnd,
    SessionSummary,
};

use super::config::PracticeConfig;
use super::progress::SessionProgress;
use crate::error::SessionError;
use crate::speech::{CORRECT_PHRASE, INCORRECT_PHRASE, Speaker};

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Before anything is shown.
    Intro,
    /// Browsing the level's words and dialogues, unscored.
    Reviewing,
    /// Scored quiz.
    Active,
    /// Terminal. Start a new session to play again.
    Finished,
}

impl SessionPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Intro => "intro",
            SessionPhase::Reviewing => "reviewing",
            SessionPhase::Active => "active",
            SessionPhase::Finished => "finished",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── TRANSITION RESULTS ────────────────────────────────────────────────────────
//

/// Result of grading the current problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub correct_answer: String,
    pub xp_awarded: u32,
    pub hearts: u8,
    pub xp: u32,
    pub streak: u32,
}

/// A finished run and what it changed in the learner's progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub summary: SessionSummary,
    pub update: ProgressUpdate,
}

/// Result of [`PracticeSession::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved on to the problem at this index.
    Next(usize),
    Finished(SessionOutcome),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One practice run over a fixed problem set.
///
/// The run moves `Intro -> Reviewing -> Active -> Finished`, or straight from
/// `Intro` to `Active`. Answers update hearts, XP and streak. Running out of
/// hearts or answering the last problem ends the run and records its
/// percentage into the learner's progress.
pub struct PracticeSession {
    level: Level,
    config: PracticeConfig,
    review: LevelCorpus,
    problems: Vec<Problem>,
    phase: SessionPhase,
    index: usize,
    hearts: u8,
    xp: u32,
    streak: u32,
    /// Answer to the current problem, cleared when moving on.
    pending: Option<Response>,
    answers: Vec<AnswerRecord>,
    speaker: Arc<dyn Speaker>,
    started_at: DateTime<Utc>,
    outcome: Option<SessionOutcome>,
}

impl PracticeSession {
    /// Create a session over an already generated problem set.
    ///
    /// `review` is the content shown during the review phase; it is normally the
    /// corpus the problems were generated from.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if `problems` is empty.
    pub fn new(
        review: LevelCorpus,
        problems: Vec<Problem>,
        config: PracticeConfig,
        speaker: Arc<dyn Speaker>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if problems.is_empty() {
            return Err(SessionError::Empty);
        }
        Ok(Self {
            level: review.level,
            hearts: config.max_hearts,
            config,
            review,
            problems,
            phase: SessionPhase::Intro,
            index: 0,
            xp: 0,
            streak: 0,
            pending: None,
            answers: Vec::new(),
            speaker,
            started_at,
            outcome: None,
        })
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn config(&self) -> &PracticeConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn hearts(&self) -> u8 {
        self.hearts
    }

    #[must_use]
    pub fn xp(&self) -> u32 {
        self.xp
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Words and dialogues for the review phase.
    #[must_use]
    pub fn review_material(&self) -> &LevelCorpus {
        &self.review
    }

    /// Problem on screen while the quiz is active.
    #[must_use]
    pub fn current_problem(&self) -> Option<&Problem> {
        match self.phase {
            SessionPhase::Active => self.problems.get(self.index),
            _ => None,
        }
    }

    /// The response given to the current problem, if any.
    #[must_use]
    pub fn current_response(&self) -> Option<&Response> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == SessionPhase::Finished
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            phase: self.phase,
            total: self.problems.len(),
            index: self.index,
            answered: self.answers.len(),
            remaining: self.problems.len() - self.answers.len(),
            hearts: self.hearts,
            xp: self.xp,
            streak: self.streak,
        }
    }

    /// `Intro -> Reviewing`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` from any other phase.
    pub fn begin_review(&mut self) -> Result<(), SessionError> {
        self.require(&[SessionPhase::Intro], "begin review")?;
        self.phase = SessionPhase::Reviewing;
        Ok(())
    }

    /// `Intro | Reviewing -> Active`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` once the quiz has started or finished.
    pub fn begin_quiz(&mut self) -> Result<(), SessionError> {
        self.require(&[SessionPhase::Intro, SessionPhase::Reviewing], "begin quiz")?;
        self.phase = SessionPhase::Active;
        info!(
            target: "session",
            level = %self.level,
            problems = self.problems.len(),
            hearts = self.hearts,
            "Practice quiz started"
        );
        Ok(())
    }

    /// Ask the speech service to read out the current problem's audio, if it has any.
    pub fn play_prompt_audio(&self) {
        if let Some(text) = self.current_problem().and_then(Problem::audio_text) {
            self.speaker.speak(text);
        }
    }

    /// Answer a choice problem with one of its options.
    ///
    /// # Errors
    ///
    /// Rejects answers outside the active quiz, a second answer to the same problem,
    /// and a `chosen` value that was not among the presented options.
    pub fn submit_answer(&mut self, chosen: &str) -> Result<AnswerFeedback, SessionError> {
        self.submit(Response::Choice(chosen.to_string()))
    }

    /// Answer a reorder problem with the tokens in the learner's order.
    ///
    /// # Errors
    ///
    /// As [`PracticeSession::submit_answer`]; the tokens must be a permutation of the
    /// presented ones.
    pub fn submit_order(&mut self, tokens: Vec<String>) -> Result<AnswerFeedback, SessionError> {
        self.submit(Response::Order(tokens))
    }

    fn submit(&mut self, response: Response) -> Result<AnswerFeedback, SessionError> {
        self.require(&[SessionPhase::Active], "answer")?;
        if self.pending.is_some() {
            return Err(SessionError::AlreadyAnswered);
        }
        let problem = &self.problems[self.index];
        let correct = problem.grade(&response)?;
        let kind = problem.kind();
        let correct_answer = problem.correct_answer().to_string();

        let xp_awarded = if correct {
            self.streak += 1;
            let award = self.config.award(self.streak);
            self.xp = self.xp.saturating_add(award);
            award
        } else {
            self.streak = 0;
            self.hearts = self.hearts.saturating_sub(1);
            0
        };

        self.speaker
            .speak(if correct { CORRECT_PHRASE } else { INCORRECT_PHRASE });

        self.answers.push(AnswerRecord {
            index: self.index,
            kind,
            correct,
            xp_awarded,
        });
        self.pending = Some(response);

        debug!(
            target: "session",
            index = self.index,
            %kind,
            correct,
            xp = self.xp,
            hearts = self.hearts,
            streak = self.streak,
            "Answer graded"
        );

        Ok(AnswerFeedback {
            correct,
            correct_answer,
            xp_awarded,
            hearts: self.hearts,
            xp: self.xp,
            streak: self.streak,
        })
    }

    /// Move past the answered problem.
    ///
    /// With no hearts left the run ends immediately and the rest of the set is
    /// forfeited. After the last problem the run ends normally. Either way the
    /// final percentage is recorded into `progress`. Finishing never fails: a
    /// `now` before the session start is recorded as the start time.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAnswered` if the current problem has no answer yet,
    /// `SessionError::InvalidPhase`/`SessionError::Finished` outside the active quiz.
    pub fn advance(
        &mut self,
        progress: &mut LearnerProgress,
        now: DateTime<Utc>,
    ) -> Result<Advance, SessionError> {
        self.require(&[SessionPhase::Active], "advance")?;
        if self.pending.is_none() {
            return Err(SessionError::NotAnswered);
        }

        if self.hearts == 0 {
            return Ok(self.finish(progress, now, SessionEnd::OutOfHearts));
        }
        if self.is_last_problem() {
            return Ok(self.finish(progress, now, SessionEnd::Completed));
        }

        self.index += 1;
        self.pending = None;
        Ok(Advance::Next(self.index))
    }

    /// True when the current problem is answered and the next [`advance`] ends the run.
    ///
    /// [`advance`]: PracticeSession::advance
    #[must_use]
    pub fn finishes_on_advance(&self) -> bool {
        self.phase == SessionPhase::Active
            && self.pending.is_some()
            && (self.hearts == 0 || self.is_last_problem())
    }

    fn is_last_problem(&self) -> bool {
        self.index + 1 >= self.problems.len()
    }

    fn finish(
        &mut self,
        progress: &mut LearnerProgress,
        now: DateTime<Utc>,
        end: SessionEnd,
    ) -> Advance {
        let percent = self.config.completion_percent(self.xp, self.problems.len());
        let summary = SessionSummary::from_answers(
            self.level,
            self.started_at,
            now,
            self.problems.len(),
            &self.answers,
            percent,
            end,
        );
        let update = record_level_progress(progress, self.level, i32::from(percent));

        self.phase = SessionPhase::Finished;
        self.pending = None;

        info!(
            target: "session",
            level = %self.level,
            ?end,
            xp = self.xp,
            percent,
            stored = update.stored,
            newly_completed = update.newly_completed,
            unlocked = ?update.unlocked,
            "Practice session finished"
        );

        let outcome = SessionOutcome { summary, update };
        self.outcome = Some(outcome.clone());
        Advance::Finished(outcome)
    }

    fn require(&self, allowed: &[SessionPhase], action: &'static str) -> Result<(), SessionError> {
        if allowed.contains(&self.phase) {
            return Ok(());
        }
        if self.phase == SessionPhase::Finished {
            return Err(SessionError::Finished);
        }
        Err(SessionError::InvalidPhase {
            action,
            phase: self.phase,
        })
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("level", &self.level)
            .field("phase", &self.phase)
            .field("problems_len", &self.problems.len())
            .field("index", &self.index)
            .field("hearts", &self.hearts)
            .field("xp", &self.xp)
            .field("streak", &self.streak)
            .field("answered", &self.answers.len())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
