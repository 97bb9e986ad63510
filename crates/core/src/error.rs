use thiserror::Error;

use crate::entitlement::EntitlementError;
use crate::model::{CorpusError, ProblemError};

/// Any domain error raised by this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Entitlement(#[from] EntitlementError),
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Problem(#[from] ProblemError),
}
