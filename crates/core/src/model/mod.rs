pub mod corpus;
mod ids;
pub mod problem;
mod progress;
mod session;

pub use corpus::{CorpusError, Dialogue, DialogueTurn, LevelCorpus, VocabEntry};
pub use ids::{LearnerId, Level, ParseIdError};
pub use problem::{
    BLANK, ChoiceProblem, DialogueContext, Problem, ProblemError, ProblemKind, ReorderProblem,
    Response,
};
pub use progress::{LearnerProgress, TimedEntitlement};
pub use session::{AnswerRecord, SessionEnd, SessionSummary};
