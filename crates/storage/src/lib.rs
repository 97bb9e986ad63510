#![forbid(unsafe_code)]

pub mod repository;

pub use repository::{
    CorpusRepository, InMemoryRepository, ProgressRepository, Storage, StorageError,
};
