use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::ids::Level;

//
// ─── TIMED ENTITLEMENTS ────────────────────────────────────────────────────────
//

/// The two independent time-boxed entitlements a learner can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimedEntitlement {
    /// Extended tutoring with the conversation partner.
    Tutoring,
    /// Timed assessment runs.
    Assessment,
}

impl TimedEntitlement {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TimedEntitlement::Tutoring => "tutoring",
            TimedEntitlement::Assessment => "assessment",
        }
    }
}

impl std::fmt::Display for TimedEntitlement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── LEARNER PROGRESS ──────────────────────────────────────────────────────────
//

/// Per-learner entitlement store.
///
/// This is the persisted layout: only the fields below are serialized. Whether a
/// timed entitlement is active, or whether a level is reachable, is always
/// recomputed from these fields and the caller-supplied `now`.
///
/// Mutation goes through [`crate::entitlement`]: `purchase_level`,
/// `purchase_timed` and `record_level_progress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerProgress {
    pub(crate) current_level: Level,
    #[serde(default)]
    pub(crate) level_progress: BTreeMap<Level, u8>,
    #[serde(default)]
    pub(crate) completed_levels: BTreeSet<Level>,
    #[serde(default)]
    pub(crate) purchased_levels: BTreeSet<Level>,
    #[serde(default)]
    pub(crate) tutoring_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) assessment_expiry: Option<DateTime<Utc>>,
}

impl Default for LearnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl LearnerProgress {
    /// A freshly created learner: level 0, nothing purchased, nothing completed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current_level: Level::new(0),
            level_progress: BTreeMap::new(),
            completed_levels: BTreeSet::new(),
            purchased_levels: BTreeSet::new(),
            tutoring_expiry: None,
            assessment_expiry: None,
        }
    }

    #[must_use]
    pub fn current_level(&self) -> Level {
        self.current_level
    }

    /// Best recorded completion percentage for `level`, if any.
    #[must_use]
    pub fn progress_for(&self, level: Level) -> Option<u8> {
        self.level_progress.get(&level).copied()
    }

    #[must_use]
    pub fn level_progress(&self) -> &BTreeMap<Level, u8> {
        &self.level_progress
    }

    #[must_use]
    pub fn completed_levels(&self) -> &BTreeSet<Level> {
        &self.completed_levels
    }

    #[must_use]
    pub fn is_completed(&self, level: Level) -> bool {
        self.completed_levels.contains(&level)
    }

    #[must_use]
    pub fn purchased_levels(&self) -> &BTreeSet<Level> {
        &self.purchased_levels
    }

    #[must_use]
    pub fn is_purchased(&self, level: Level) -> bool {
        self.purchased_levels.contains(&level)
    }

    #[must_use]
    pub fn tutoring_expiry(&self) -> Option<DateTime<Utc>> {
        self.tutoring_expiry
    }

    #[must_use]
    pub fn assessment_expiry(&self) -> Option<DateTime<Utc>> {
        self.assessment_expiry
    }

    /// Stored expiry for the given timed entitlement.
    #[must_use]
    pub fn expiry(&self, kind: TimedEntitlement) -> Option<DateTime<Utc>> {
        match kind {
            TimedEntitlement::Tutoring => self.tutoring_expiry,
            TimedEntitlement::Assessment => self.assessment_expiry,
        }
    }

    pub(crate) fn set_expiry(&mut self, kind: TimedEntitlement, expiry: DateTime<Utc>) {
        match kind {
            TimedEntitlement::Tutoring => self.tutoring_expiry = Some(expiry),
            TimedEntitlement::Assessment => self.assessment_expiry = Some(expiry),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
