use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use lingo_core::model::ProblemKind;

use crate::error::ConfigError;
use crate::generator::{DEFAULT_TARGET_COUNT, ProblemGenerator};

/// Scoring scale and problem mix for one flavor of practice run.
///
/// Level quizzes and free practice share the same engine and differ only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PracticeConfig {
    /// XP for every correct answer.
    pub base_xp: u32,
    /// Extra XP once the streak is past `streak_threshold`.
    pub streak_bonus: u32,
    pub streak_threshold: u32,
    pub max_hearts: u8,
    pub target_count: usize,
    pub kinds: BTreeSet<ProblemKind>,
    /// Any non-zero result is raised to at least this percentage.
    pub completion_floor: Option<u8>,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self::level_quiz()
    }
}

impl PracticeConfig {
    /// The quiz at the end of a level: 10 XP, +5 on a streak, no reorder problems.
    #[must_use]
    pub fn level_quiz() -> Self {
        Self {
            base_xp: 10,
            streak_bonus: 5,
            streak_threshold: 2,
            max_hearts: 5,
            target_count: DEFAULT_TARGET_COUNT,
            kinds: [
                ProblemKind::WordFromAudio,
                ProblemKind::ClozeFill,
                ProblemKind::DialogueTurn,
            ]
            .into_iter()
            .collect(),
            completion_floor: Some(50),
        }
    }

    /// Free practice: 15 XP (20 on a streak) over every problem kind.
    #[must_use]
    pub fn practice() -> Self {
        Self {
            base_xp: 15,
            streak_bonus: 5,
            kinds: ProblemKind::ALL.into_iter().collect(),
            ..Self::level_quiz()
        }
    }

    /// Parse a TOML document; missing keys fall back to the level quiz values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and `ConfigError::Invalid` if
    /// the values fail [`PracticeConfig::validate`].
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`PracticeConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_xp == 0 {
            return Err(ConfigError::Invalid("base_xp must be > 0"));
        }
        if self.max_hearts == 0 {
            return Err(ConfigError::Invalid("max_hearts must be > 0"));
        }
        if self.target_count == 0 {
            return Err(ConfigError::Invalid("target_count must be > 0"));
        }
        if self.kinds.is_empty() {
            return Err(ConfigError::Invalid("kinds must name at least one problem kind"));
        }
        if self.completion_floor.is_some_and(|floor| floor > 100) {
            return Err(ConfigError::Invalid("completion_floor must be <= 100"));
        }
        Ok(())
    }

    #[must_use]
    pub fn generator(&self) -> ProblemGenerator {
        ProblemGenerator::new(self.kinds.iter().copied())
    }

    /// XP for a correct answer that brought the streak to `streak`.
    #[must_use]
    pub fn award(&self, streak: u32) -> u32 {
        if streak > self.streak_threshold {
            self.base_xp + self.streak_bonus
        } else {
            self.base_xp
        }
    }

    /// Final percentage for a run: XP against the all-correct-without-bonus total,
    /// rounded, clamped to 100 and raised to `completion_floor` when above zero.
    #[must_use]
    pub fn completion_percent(&self, xp: u32, problem_count: usize) -> u8 {
        let max = u64::from(self.base_xp) * problem_count as u64;
        if max == 0 {
            return 0;
        }
        let scaled = (200 * u64::from(xp) + max) / (2 * max);
        let percent = u8::try_from(scaled.min(100)).unwrap_or(100);
        match self.completion_floor {
            Some(floor) if percent > 0 => percent.max(floor),
            _ => percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_differ_only_in_scale_and_kinds() {
        let quiz = PracticeConfig::level_quiz();
        let practice = PracticeConfig::practice();
        assert_eq!(quiz.base_xp, 10);
        assert_eq!(practice.base_xp, 15);
        assert_eq!(practice.award(3), 20);
        assert!(!quiz.kinds.contains(&ProblemKind::SentenceReorder));
        assert_eq!(practice.kinds.len(), 4);
        assert_eq!(quiz.max_hearts, practice.max_hearts);
    }

    #[test]
    fn streak_bonus_starts_after_threshold() {
        let config = PracticeConfig::level_quiz();
        assert_eq!(config.award(1), 10);
        assert_eq!(config.award(2), 10);
        assert_eq!(config.award(3), 15);
    }

    #[test]
    fn completion_percent_rounds_clamps_and_floors() {
        let config = PracticeConfig::level_quiz();
        assert_eq!(config.completion_percent(140, 10), 100);
        assert_eq!(config.completion_percent(75, 10), 75);
        // 5 / 100 -> 5%, floored to 50
        assert_eq!(config.completion_percent(5, 10), 50);
        assert_eq!(config.completion_percent(0, 10), 0);
        assert_eq!(config.completion_percent(0, 0), 0);
        // 2/3 rounds up
        assert_eq!(config.completion_percent(20, 3), 67);

        let no_floor = PracticeConfig {
            completion_floor: None,
            ..PracticeConfig::level_quiz()
        };
        assert_eq!(no_floor.completion_percent(10, 10), 10);
    }

    #[test]
    fn parses_partial_toml_over_defaults() {
        let config = PracticeConfig::from_toml_str(
            r#"
            base_xp = 15
            kinds = ["cloze_fill", "sentence_reorder"]
            completion_floor = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.base_xp, 15);
        assert_eq!(config.streak_bonus, 5);
        assert_eq!(config.kinds.len(), 2);
        assert_eq!(config.completion_floor, Some(0));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            PracticeConfig::from_toml_str("base_xp = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PracticeConfig::from_toml_str("kinds = []"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PracticeConfig::from_toml_str("hearts = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
