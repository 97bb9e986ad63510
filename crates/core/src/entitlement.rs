//! Access decisions and the three mutators of [`LearnerProgress`].
//!
//! Every function takes the learner's progress and, where time matters, the
//! current instant explicitly. Nothing here reads the system clock.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{Level, LearnerProgress, TimedEntitlement};

/// Highest level that exists in the content catalog.
pub const MAX_LEVEL: Level = Level::new(5);

/// Lowest level that has to be purchased. Everything below is free.
pub const FIRST_PAID_LEVEL: Level = Level::new(2);

/// Percentage at which a level counts as completed.
pub const COMPLETION_THRESHOLD: u8 = 70;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EntitlementError {
    #[error("level {level} cannot be purchased (paid levels are {min}..={max})")]
    LevelNotPurchasable { level: Level, min: Level, max: Level },

    #[error("entitlement duration must be at least one day")]
    EmptyDuration,

    #[error("entitlement expiry overflows the supported time range")]
    ExpiryOverflow,
}

//
// ─── EVALUATOR ─────────────────────────────────────────────────────────────────
//

/// Whether the learner may open `level` right now.
///
/// Free levels and anything at or below `current_level` are always reachable.
/// A paid level above that needs both a purchase and a completed previous level.
#[must_use]
pub fn can_access_level(progress: &LearnerProgress, level: Level) -> bool {
    if level < FIRST_PAID_LEVEL || level <= progress.current_level() {
        return true;
    }
    let previous_completed = level
        .previous()
        .is_some_and(|previous| progress.is_completed(previous));
    progress.is_purchased(level) && previous_completed
}

/// True iff `expiry` is set and strictly after `now`.
#[must_use]
pub fn has_active_entitlement(expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expiry.is_some_and(|at| at > now)
}

/// Convenience over [`has_active_entitlement`] for one of the learner's entitlements.
#[must_use]
pub fn is_active(progress: &LearnerProgress, kind: TimedEntitlement, now: DateTime<Utc>) -> bool {
    has_active_entitlement(progress.expiry(kind), now)
}

/// New expiry after buying `duration_days` more of a timed entitlement.
///
/// Unused time is kept: if `current_expiry` is still in the future the duration is
/// appended to it, otherwise it starts from `now`.
///
/// # Errors
///
/// Returns `EntitlementError::EmptyDuration` for a zero-day purchase and
/// `EntitlementError::ExpiryOverflow` if the result is not representable.
pub fn purchase_timed_entitlement(
    current_expiry: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    duration_days: u32,
) -> Result<DateTime<Utc>, EntitlementError> {
    if duration_days == 0 {
        return Err(EntitlementError::EmptyDuration);
    }
    let start = match current_expiry {
        Some(expiry) if expiry > now => expiry,
        _ => now,
    };
    let duration =
        Duration::try_days(i64::from(duration_days)).ok_or(EntitlementError::ExpiryOverflow)?;
    start
        .checked_add_signed(duration)
        .ok_or(EntitlementError::ExpiryOverflow)
}

//
// ─── MUTATORS ──────────────────────────────────────────────────────────────────
//

/// Buy `duration_days` of `kind` for this learner and return the new expiry.
///
/// # Errors
///
/// See [`purchase_timed_entitlement`].
pub fn purchase_timed(
    progress: &mut LearnerProgress,
    kind: TimedEntitlement,
    now: DateTime<Utc>,
    duration_days: u32,
) -> Result<DateTime<Utc>, EntitlementError> {
    let expiry = purchase_timed_entitlement(progress.expiry(kind), now, duration_days)?;
    progress.set_expiry(kind, expiry);
    Ok(expiry)
}

/// Unlock a paid level. Buying the same level twice is a no-op.
///
/// Returns `true` when the level was newly added.
///
/// # Errors
///
/// Returns `EntitlementError::LevelNotPurchasable` for free levels and levels past
/// [`MAX_LEVEL`].
pub fn purchase_level(
    progress: &mut LearnerProgress,
    level: Level,
) -> Result<bool, EntitlementError> {
    if level < FIRST_PAID_LEVEL || level > MAX_LEVEL {
        return Err(EntitlementError::LevelNotPurchasable {
            level,
            min: FIRST_PAID_LEVEL,
            max: MAX_LEVEL,
        });
    }
    Ok(progress.purchased_levels.insert(level))
}

/// What a call to [`record_level_progress`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub level: Level,
    /// Percentage after clamping.
    pub submitted: u8,
    /// Percentage now stored for the level.
    pub stored: u8,
    pub newly_completed: bool,
    /// Set when `current_level` moved forward.
    pub unlocked: Option<Level>,
}

/// Record a session result for `level`.
///
/// `percent` is clamped to `0..=100`. The stored value only ratchets upward, so a
/// weaker retry never erases a better run. Crossing [`COMPLETION_THRESHOLD`] for
/// the first time marks the level completed and, if the level is at or above
/// `current_level`, advances `current_level` to the next level.
pub fn record_level_progress(
    progress: &mut LearnerProgress,
    level: Level,
    percent: i32,
) -> ProgressUpdate {
    let submitted = u8::try_from(percent.clamp(0, 100)).unwrap_or(100);

    let stored = progress
        .level_progress
        .entry(level)
        .and_modify(|best| *best = (*best).max(submitted))
        .or_insert(submitted);
    let stored = *stored;

    let mut newly_completed = false;
    let mut unlocked = None;
    if submitted >= COMPLETION_THRESHOLD && !progress.completed_levels.contains(&level) {
        progress.completed_levels.insert(level);
        newly_completed = true;
        if level >= progress.current_level {
            progress.current_level = level.next();
            unlocked = Some(progress.current_level);
        }
    }

    ProgressUpdate {
        level,
        submitted,
        stored,
        newly_completed,
        unlocked,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use proptest::prelude::*;

    fn learner_at(level: u8) -> LearnerProgress {
        let mut progress = LearnerProgress::new();
        progress.current_level = Level::new(level);
        progress
    }

    #[test]
    fn free_levels_open_for_fresh_learner() {
        let progress = LearnerProgress::new();
        assert!(can_access_level(&progress, Level::new(0)));
        assert!(can_access_level(&progress, Level::new(1)));
        assert!(!can_access_level(&progress, Level::new(2)));
    }

    #[test]
    fn paid_level_needs_purchase_and_previous_completion() {
        for (purchased, completed) in [(false, false), (true, false), (false, true), (true, true)] {
            let mut progress = LearnerProgress::new();
            if purchased {
                purchase_level(&mut progress, Level::new(3)).unwrap();
            }
            if completed {
                progress.completed_levels.insert(Level::new(2));
            }
            assert_eq!(
                can_access_level(&progress, Level::new(3)),
                purchased && completed,
                "purchased={purchased} completed={completed}"
            );
        }
    }

    #[test]
    fn unlocked_levels_stay_reachable() {
        // current_level granted access even without a purchase record.
        let progress = learner_at(4);
        assert!(can_access_level(&progress, Level::new(4)));
        assert!(can_access_level(&progress, Level::new(3)));
        assert!(!can_access_level(&progress, Level::new(5)));
    }

    #[test]
    fn expiry_must_be_strictly_in_future() {
        let now = fixed_now();
        assert!(!has_active_entitlement(None, now));
        assert!(!has_active_entitlement(Some(now), now));
        assert!(has_active_entitlement(Some(now + Duration::seconds(1)), now));
        assert!(!has_active_entitlement(Some(now - Duration::days(1)), now));
    }

    #[test]
    fn renewal_extends_unused_time() {
        let now = fixed_now();
        let current = now + Duration::days(10);
        let expiry = purchase_timed_entitlement(Some(current), now, 30).unwrap();
        assert_eq!(expiry, now + Duration::days(40));
    }

    #[test]
    fn expired_entitlement_restarts_from_now() {
        let now = fixed_now();
        let expiry = purchase_timed_entitlement(Some(now - Duration::days(3)), now, 7).unwrap();
        assert_eq!(expiry, now + Duration::days(7));
        assert_eq!(
            purchase_timed_entitlement(None, now, 7).unwrap(),
            now + Duration::days(7)
        );
    }

    #[test]
    fn zero_day_purchase_rejected() {
        let err = purchase_timed_entitlement(None, fixed_now(), 0).unwrap_err();
        assert_eq!(err, EntitlementError::EmptyDuration);
    }

    #[test]
    fn timed_entitlements_are_independent() {
        let now = fixed_now();
        let mut progress = LearnerProgress::new();
        purchase_timed(&mut progress, TimedEntitlement::Tutoring, now, 30).unwrap();
        assert!(is_active(&progress, TimedEntitlement::Tutoring, now));
        assert!(!is_active(&progress, TimedEntitlement::Assessment, now));
        assert!(!is_active(
            &progress,
            TimedEntitlement::Tutoring,
            now + Duration::days(31)
        ));
    }

    #[test]
    fn purchase_level_is_idempotent() {
        let mut progress = LearnerProgress::new();
        assert!(purchase_level(&mut progress, Level::new(2)).unwrap());
        assert!(!purchase_level(&mut progress, Level::new(2)).unwrap());
        assert_eq!(progress.purchased_levels().len(), 1);
        assert!(progress.is_purchased(Level::new(2)));
    }

    #[test]
    fn purchase_level_rejects_free_and_unknown_levels() {
        let mut progress = LearnerProgress::new();
        for level in [0, 1, 6, 200] {
            let err = purchase_level(&mut progress, Level::new(level)).unwrap_err();
            assert!(matches!(err, EntitlementError::LevelNotPurchasable { .. }));
        }
        assert!(progress.purchased_levels().is_empty());
    }

    #[test]
    fn completion_at_threshold_unlocks_next_level() {
        let mut progress = learner_at(2);
        let update = record_level_progress(&mut progress, Level::new(2), 70);
        assert!(update.newly_completed);
        assert_eq!(update.unlocked, Some(Level::new(3)));
        assert!(progress.is_completed(Level::new(2)));
        assert_eq!(progress.current_level(), Level::new(3));
    }

    #[test]
    fn just_below_threshold_changes_nothing() {
        let mut progress = learner_at(2);
        let update = record_level_progress(&mut progress, Level::new(2), 69);
        assert!(!update.newly_completed);
        assert_eq!(update.unlocked, None);
        assert!(!progress.is_completed(Level::new(2)));
        assert_eq!(progress.current_level(), Level::new(2));
        assert_eq!(progress.progress_for(Level::new(2)), Some(69));
    }

    #[test]
    fn completing_lower_level_does_not_move_current_level() {
        let mut progress = learner_at(4);
        let update = record_level_progress(&mut progress, Level::new(1), 90);
        assert!(update.newly_completed);
        assert_eq!(update.unlocked, None);
        assert_eq!(progress.current_level(), Level::new(4));
    }

    #[test]
    fn percent_is_clamped() {
        let mut progress = LearnerProgress::new();
        let update = record_level_progress(&mut progress, Level::new(0), 140);
        assert_eq!(update.submitted, 100);
        let update = record_level_progress(&mut progress, Level::new(1), -20);
        assert_eq!(update.submitted, 0);
        assert_eq!(progress.progress_for(Level::new(1)), Some(0));
    }

    #[test]
    fn weaker_retry_keeps_best_score() {
        let mut progress = learner_at(1);
        record_level_progress(&mut progress, Level::new(1), 85);
        let update = record_level_progress(&mut progress, Level::new(1), 40);
        assert_eq!(update.submitted, 40);
        assert_eq!(update.stored, 85);
        assert_eq!(progress.progress_for(Level::new(1)), Some(85));
        assert_eq!(progress.current_level(), Level::new(2));
    }

    #[test]
    fn sequential_unlock_gates_on_recorded_completion() {
        let mut progress = learner_at(2);
        purchase_level(&mut progress, Level::new(3)).unwrap();
        assert!(!can_access_level(&progress, Level::new(3)));
        record_level_progress(&mut progress, Level::new(2), 75);
        assert!(can_access_level(&progress, Level::new(3)));
    }

    proptest! {
        #[test]
        fn levels_up_to_one_always_open(current in 0u8..=10, level in 0u8..=1) {
            let progress = learner_at(current);
            prop_assert!(can_access_level(&progress, Level::new(level)));
        }

        #[test]
        fn paid_level_above_current_needs_both(
            level in 2u8..=5,
            purchased in any::<bool>(),
            completed in any::<bool>(),
        ) {
            let mut progress = learner_at(level - 1);
            if purchased {
                purchase_level(&mut progress, Level::new(level)).unwrap();
            }
            if completed {
                progress.completed_levels.insert(Level::new(level - 1));
            }
            prop_assert_eq!(
                can_access_level(&progress, Level::new(level)),
                purchased && completed
            );
        }

        #[test]
        fn timed_purchase_never_loses_time(
            offset_days in -60i64..60,
            first in 1u32..400,
            second in 1u32..400,
        ) {
            let now = fixed_now();
            let current = Some(now + Duration::days(offset_days));

            let once = purchase_timed_entitlement(current, now, first).unwrap();
            let floor = current.unwrap().max(now) + Duration::days(i64::from(first) - 1);
            prop_assert!(once >= floor);

            let twice = purchase_timed_entitlement(Some(once), now, second).unwrap();
            let summed = purchase_timed_entitlement(current, now, first + second).unwrap();
            prop_assert!(twice >= summed);
        }

        #[test]
        fn current_level_never_regresses(
            start in 0u8..=5,
            results in proptest::collection::vec((0u8..=5, -10i32..=120), 0..20),
        ) {
            let mut progress = learner_at(start);
            let mut last = progress.current_level();
            for (level, pct) in results {
                record_level_progress(&mut progress, Level::new(level), pct);
                prop_assert!(progress.current_level() >= last);
                last = progress.current_level();
            }
        }
    }
}
