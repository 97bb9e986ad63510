use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info};

use lingo_core::entitlement::{can_access_level, record_level_progress};
use lingo_core::model::{LearnerId, LearnerProgress, Level};
use storage::{CorpusRepository, ProgressRepository};

use super::config::PracticeConfig;
use super::practice::{Advance, AnswerFeedback, PracticeSession};
use crate::Clock;
use crate::error::PracticeError;
use crate::speech::Speaker;

/// Result of answering through the loop service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeStep {
    pub feedback: AnswerFeedback,
    pub advance: Advance,
}

/// Orchestrates gated session start and persisted completion.
///
/// The session itself never touches storage. Progress is loaded and written back
/// only when a run finishes, so a session dropped halfway commits nothing.
#[derive(Clone)]
pub struct PracticeLoopService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    corpora: Arc<dyn CorpusRepository>,
    speaker: Arc<dyn Speaker>,
}

impl PracticeLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        corpora: Arc<dyn CorpusRepository>,
        speaker: Arc<dyn Speaker>,
    ) -> Self {
        Self {
            clock,
            progress,
            corpora,
            speaker,
        }
    }

    /// Start a run at `level` for `learner`.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Locked` when the learner may not open the level,
    /// `PracticeError::Corpus` for invalid content, `PracticeError::Session` when the
    /// content produced no problems and `PracticeError::Storage` for repository
    /// failures.
    pub async fn start<R: Rng + ?Sized>(
        &self,
        learner: LearnerId,
        level: Level,
        config: PracticeConfig,
        rng: &mut R,
    ) -> Result<PracticeSession, PracticeError> {
        let progress = self.progress.get_or_default(learner).await?;
        if !can_access_level(&progress, level) {
            info!(target: "entitlement", %learner, %level, "Level locked");
            return Err(PracticeError::Locked(level));
        }

        let corpus = self.corpora.get_corpus(level).await?;
        corpus.validate()?;

        let problems = config.generator().generate(&corpus, config.target_count, rng);
        debug!(
            target: "session",
            %learner,
            %level,
            problems = problems.len(),
            "Practice set generated"
        );

        let session = PracticeSession::new(
            corpus,
            problems,
            config,
            Arc::clone(&self.speaker),
            self.clock.now(),
        )?;
        Ok(session)
    }

    /// Advance past the answered problem; a finished run is committed to storage.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Session` for invalid transitions and
    /// `PracticeError::Storage` if progress cannot be loaded or saved. Storage is
    /// only touched by the step that finishes the run.
    pub async fn advance(
        &self,
        learner: LearnerId,
        session: &mut PracticeSession,
    ) -> Result<Advance, PracticeError> {
        if !session.finishes_on_advance() {
            // Only the finishing step records progress.
            return Ok(session.advance(&mut LearnerProgress::new(), self.clock.now())?);
        }

        let mut progress = self.progress.get_or_default(learner).await?;
        let step = session.advance(&mut progress, self.clock.now())?;
        if let Advance::Finished(outcome) = &step {
            self.progress.upsert_progress(learner, &progress).await?;
            info!(
                target: "session",
                %learner,
                level = %outcome.update.level,
                stored = outcome.update.stored,
                current_level = %progress.current_level(),
                "Progress committed"
            );
        }
        Ok(step)
    }

    /// Answer a choice problem and advance in one step.
    ///
    /// # Errors
    ///
    /// As [`PracticeSession::submit_answer`] and [`PracticeLoopService::advance`].
    pub async fn answer_current(
        &self,
        learner: LearnerId,
        session: &mut PracticeSession,
        chosen: &str,
    ) -> Result<PracticeStep, PracticeError> {
        let feedback = session.submit_answer(chosen)?;
        let advance = self.advance(learner, session).await?;
        Ok(PracticeStep { feedback, advance })
    }

    /// Answer a reorder problem and advance in one step.
    ///
    /// # Errors
    ///
    /// As [`PracticeSession::submit_order`] and [`PracticeLoopService::advance`].
    pub async fn order_current(
        &self,
        learner: LearnerId,
        session: &mut PracticeSession,
        tokens: Vec<String>,
    ) -> Result<PracticeStep, PracticeError> {
        let feedback = session.submit_order(tokens)?;
        let advance = self.advance(learner, session).await?;
        Ok(PracticeStep { feedback, advance })
    }

    /// Persist the outcome of a session that was finished without this service.
    ///
    /// Recording is a ratchet, so committing the same outcome twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::NotFinished` for a session still in play and
    /// `PracticeError::Storage` for repository failures.
    pub async fn commit(
        &self,
        learner: LearnerId,
        session: &PracticeSession,
    ) -> Result<(), PracticeError> {
        let outcome = session.outcome().ok_or(PracticeError::NotFinished)?;
        let mut progress = self.progress.get_or_default(learner).await?;
        record_level_progress(
            &mut progress,
            outcome.update.level,
            i32::from(outcome.summary.percent()),
        );
        self.progress.upsert_progress(learner, &progress).await?;
        Ok(())
    }
}
