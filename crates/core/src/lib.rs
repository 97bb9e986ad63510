#![forbid(unsafe_code)]
//! Domain model for the language practice engine: learner entitlements, level
//! content, practice problems and session summaries.
//!
//! Nothing in this crate performs I/O or reads the system clock on its own;
//! time arrives through [`time::Clock`] or an explicit `now` argument.

pub mod entitlement;
pub mod error;
pub mod model;
pub mod time;

pub use error::Error;
pub use time::Clock;
