use async_trait::async_trait;
use lingo_core::model::{LearnerId, LearnerProgress, Level, LevelCorpus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Repository contract for learner progress.
///
/// Implementations store exactly the serialized `LearnerProgress` layout; nothing
/// derived from it is persisted.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch progress for a learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the learner has no record, or other storage errors.
    async fn get_progress(&self, learner: LearnerId) -> Result<LearnerProgress, StorageError>;

    /// Persist or replace a learner's progress.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the progress cannot be stored.
    async fn upsert_progress(
        &self,
        learner: LearnerId,
        progress: &LearnerProgress,
    ) -> Result<(), StorageError>;

    /// Fetch progress, treating a missing record as a brand-new learner.
    ///
    /// # Errors
    ///
    /// Propagates any storage error other than `NotFound`.
    async fn get_or_default(&self, learner: LearnerId) -> Result<LearnerProgress, StorageError> {
        match self.get_progress(learner).await {
            Ok(progress) => Ok(progress),
            Err(StorageError::NotFound) => Ok(LearnerProgress::new()),
            Err(err) => Err(err),
        }
    }
}

/// Read-only access to level content.
#[async_trait]
pub trait CorpusRepository: Send + Sync {
    /// Fetch the content for a level.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the level has no content.
    async fn get_corpus(&self, level: Level) -> Result<LevelCorpus, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Progress is kept as serialized JSON so the stored shape is the same one a real
/// backend would persist.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<LearnerId, String>>>,
    corpora: Arc<Mutex<HashMap<Level, LevelCorpus>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the content for a level.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_corpus(&self, corpus: LevelCorpus) -> Result<(), StorageError> {
        let mut guard = self
            .corpora
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(corpus.level, corpus);
        Ok(())
    }

    /// Raw stored document for a learner, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn raw_progress(&self, learner: LearnerId) -> Result<Option<String>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&learner).cloned())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(&self, learner: LearnerId) -> Result<LearnerProgress, StorageError> {
        let raw = {
            let guard = self
                .progress
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            guard.get(&learner).cloned().ok_or(StorageError::NotFound)?
        };
        Ok(serde_json::from_str(&raw)?)
    }

    async fn upsert_progress(
        &self,
        learner: LearnerId,
        progress: &LearnerProgress,
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string(progress)?;
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(learner, raw);
        Ok(())
    }
}

#[async_trait]
impl CorpusRepository for InMemoryRepository {
    async fn get_corpus(&self, level: Level) -> Result<LevelCorpus, StorageError> {
        let guard = self
            .corpora
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&level).cloned().ok_or(StorageError::NotFound)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub corpora: Arc<dyn CorpusRepository>,
}

impl Storage {
    /// Wrap an existing in-memory repository, keeping a handle for seeding content.
    #[must_use]
    pub fn from_in_memory(repo: InMemoryRepository) -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let corpora: Arc<dyn CorpusRepository> = Arc::new(repo);
        Self { progress, corpora }
    }
}
