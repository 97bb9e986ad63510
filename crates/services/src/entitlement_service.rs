use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use lingo_core::entitlement::{self, can_access_level, is_active};
use lingo_core::model::{LearnerId, LearnerProgress, Level, TimedEntitlement};
use storage::ProgressRepository;

use crate::Clock;
use crate::error::EntitlementServiceError;

/// Access checks and purchases for one learner at a time, evaluated at the
/// service clock's `now`.
#[derive(Clone)]
pub struct EntitlementService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
}

impl EntitlementService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, progress }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// # Errors
    ///
    /// Returns `EntitlementServiceError::Storage` if progress cannot be loaded.
    pub async fn progress(
        &self,
        learner: LearnerId,
    ) -> Result<LearnerProgress, EntitlementServiceError> {
        Ok(self.progress.get_or_default(learner).await?)
    }

    /// # Errors
    ///
    /// Returns `EntitlementServiceError::Storage` if progress cannot be loaded.
    pub async fn can_access(
        &self,
        learner: LearnerId,
        level: Level,
    ) -> Result<bool, EntitlementServiceError> {
        let progress = self.progress(learner).await?;
        Ok(can_access_level(&progress, level))
    }

    /// Whether `kind` is unexpired right now.
    ///
    /// # Errors
    ///
    /// Returns `EntitlementServiceError::Storage` if progress cannot be loaded.
    pub async fn has_active(
        &self,
        learner: LearnerId,
        kind: TimedEntitlement,
    ) -> Result<bool, EntitlementServiceError> {
        let progress = self.progress(learner).await?;
        Ok(is_active(&progress, kind, self.clock.now()))
    }

    /// Unlock a paid level. Returns `true` if it was not owned before.
    ///
    /// # Errors
    ///
    /// Returns `EntitlementServiceError::Entitlement` for a level outside the paid
    /// range and `EntitlementServiceError::Storage` for repository failures.
    pub async fn purchase_level(
        &self,
        learner: LearnerId,
        level: Level,
    ) -> Result<bool, EntitlementServiceError> {
        let mut progress = self.progress(learner).await?;
        let added = entitlement::purchase_level(&mut progress, level)?;
        if added {
            self.progress.upsert_progress(learner, &progress).await?;
        }
        info!(target: "entitlement", %learner, %level, added, "Level purchased");
        Ok(added)
    }

    /// Buy `days` of a timed entitlement and return the new expiry.
    ///
    /// # Errors
    ///
    /// Returns `EntitlementServiceError::Entitlement` for a zero-day purchase or an
    /// unrepresentable expiry, `EntitlementServiceError::Storage` for repository
    /// failures.
    pub async fn purchase_timed(
        &self,
        learner: LearnerId,
        kind: TimedEntitlement,
        days: u32,
    ) -> Result<DateTime<Utc>, EntitlementServiceError> {
        let mut progress = self.progress(learner).await?;
        let expiry = entitlement::purchase_timed(&mut progress, kind, self.clock.now(), days)?;
        self.progress.upsert_progress(learner, &progress).await?;
        info!(target: "entitlement", %learner, %kind, days, %expiry, "Timed entitlement purchased");
        Ok(expiry)
    }
}
