mod config;
mod practice;
mod progress;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use config::PracticeConfig;
pub use practice::{Advance, AnswerFeedback, PracticeSession, SessionOutcome, SessionPhase};
pub use progress::SessionProgress;
pub use workflow::{PracticeLoopService, PracticeStep};
