use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use lingo_core::model::{CorpusError, Level, LevelCorpus};
use storage::{InMemoryRepository, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CorpusFileError {
    #[error("cannot read corpus file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed corpus file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("level {level}: {source}")]
    Invalid {
        level: Level,
        #[source]
        source: CorpusError,
    },
    #[error("level {0} appears more than once")]
    DuplicateLevel(Level),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Content for every level, as written in a TOML corpus file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorpusFile {
    #[serde(default)]
    pub levels: Vec<LevelCorpus>,
}

impl CorpusFile {
    /// # Errors
    ///
    /// Returns `CorpusFileError::Parse` for malformed TOML, `Invalid` for content
    /// that fails validation and `DuplicateLevel` if a level is listed twice.
    pub fn from_toml_str(raw: &str) -> Result<Self, CorpusFileError> {
        let file: Self = toml::from_str(raw)?;
        let mut seen = BTreeSet::new();
        for corpus in &file.levels {
            if !seen.insert(corpus.level) {
                return Err(CorpusFileError::DuplicateLevel(corpus.level));
            }
            corpus
                .validate()
                .map_err(|source| CorpusFileError::Invalid {
                    level: corpus.level,
                    source,
                })?;
        }
        Ok(file)
    }

    /// # Errors
    ///
    /// Returns `CorpusFileError::Io` if the file cannot be read, otherwise as
    /// [`CorpusFile::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CorpusFileError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Register every level with the repository.
    ///
    /// # Errors
    ///
    /// Returns `CorpusFileError::Storage` if the repository rejects a level.
    pub fn seed(self, repo: &InMemoryRepository) -> Result<usize, CorpusFileError> {
        let count = self.levels.len();
        for corpus in self.levels {
            repo.insert_corpus(corpus)?;
        }
        Ok(count)
    }
}
