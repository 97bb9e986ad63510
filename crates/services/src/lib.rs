#![forbid(unsafe_code)]

pub mod entitlement_service;
pub mod error;
pub mod generator;
pub mod sessions;
pub mod speech;

pub use lingo_core::Clock;
pub use sessions as session;

pub use entitlement_service::EntitlementService;
pub use error::{ConfigError, EntitlementServiceError, PracticeError, SessionError, SpeechError};
pub use generator::{ProblemGenerator, generate_session};
pub use speech::{HttpSpeaker, NoopSpeaker, RecordingSpeaker, Speaker, SpeechConfig, speaker_from_env};

pub use sessions::{
    Advance, AnswerFeedback, PracticeConfig, PracticeLoopService, PracticeSession, PracticeStep,
    SessionOutcome, SessionPhase, SessionProgress,
};
