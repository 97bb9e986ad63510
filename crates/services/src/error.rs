//! Shared error types for the services crate.

use thiserror::Error;

use lingo_core::entitlement::EntitlementError;
use lingo_core::model::{CorpusError, Level, ProblemError};
use storage::StorageError;

use crate::sessions::SessionPhase;

/// Errors raised by the practice session state machine.
///
/// All of these are caller mistakes: answering outside the quiz, answering twice,
/// or submitting something that was never on screen.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no problems available for session")]
    Empty,
    #[error("session already finished")]
    Finished,
    #[error("cannot {action} while the session is {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: SessionPhase,
    },
    #[error("current problem was already answered")]
    AlreadyAnswered,
    #[error("current problem has not been answered")]
    NotAnswered,
    #[error(transparent)]
    InvalidAnswer(#[from] ProblemError),
}

/// Errors emitted by `PracticeLoopService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error("level {0} is locked for this learner")]
    Locked(Level),
    #[error("session has not finished; nothing to commit")]
    NotFinished,
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `EntitlementService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EntitlementServiceError {
    #[error(transparent)]
    Entitlement(#[from] EntitlementError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the HTTP speech adapter. Never reach the session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpeechError {
    #[error("speech request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors loading practice configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid practice config: {0}")]
    Invalid(&'static str),
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
