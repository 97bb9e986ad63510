use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::corpus::DialogueTurn;

/// Placeholder shown where the missing word or turn goes.
pub const BLANK: &str = "____";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProblemError {
    #[error("correct answer must appear exactly once in the options")]
    AnswerNotInOptions,

    #[error("options contain duplicate value '{0}'")]
    DuplicateOption(String),

    #[error("blank index {index} is outside a dialogue of {len} turns")]
    BlankOutOfRange { index: usize, len: usize },

    #[error("scrambled tokens do not match the sentence")]
    TokenMismatch,

    #[error("'{0}' is not one of the presented options")]
    NotAnOption(String),

    #[error("submitted order is not a permutation of the presented tokens")]
    NotAPermutation,

    #[error("{expected} problems cannot be answered with a {got} response")]
    WrongResponseKind {
        expected: ProblemKind,
        got: &'static str,
    },
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    WordFromAudio,
    ClozeFill,
    DialogueTurn,
    SentenceReorder,
}

impl ProblemKind {
    pub const ALL: [ProblemKind; 4] = [
        ProblemKind::WordFromAudio,
        ProblemKind::ClozeFill,
        ProblemKind::DialogueTurn,
        ProblemKind::SentenceReorder,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProblemKind::WordFromAudio => "word_from_audio",
            ProblemKind::ClozeFill => "cloze_fill",
            ProblemKind::DialogueTurn => "dialogue_turn",
            ProblemKind::SentenceReorder => "sentence_reorder",
        }
    }

    /// Choice kinds are answered by picking one option; reorder by ordering tokens.
    #[must_use]
    pub fn is_choice(self) -> bool {
        !matches!(self, ProblemKind::SentenceReorder)
    }
}

impl std::fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── PAYLOADS ──────────────────────────────────────────────────────────────────
//

/// Prompt plus an option list holding the correct answer exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceProblem {
    prompt: String,
    answer: String,
    options: Vec<String>,
}

impl ChoiceProblem {
    /// Build from an already ordered option list.
    ///
    /// # Errors
    ///
    /// Returns `ProblemError::DuplicateOption` if any option repeats and
    /// `ProblemError::AnswerNotInOptions` if `answer` is missing.
    pub fn new(
        prompt: impl Into<String>,
        answer: impl Into<String>,
        options: Vec<String>,
    ) -> Result<Self, ProblemError> {
        let answer = answer.into();
        for (i, option) in options.iter().enumerate() {
            if options[..i].contains(option) {
                return Err(ProblemError::DuplicateOption(option.clone()));
            }
        }
        if !options.contains(&answer) {
            return Err(ProblemError::AnswerNotInOptions);
        }
        Ok(Self {
            prompt: prompt.into(),
            answer,
            options,
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    fn grade(&self, chosen: &str) -> Result<bool, ProblemError> {
        if !self.options.iter().any(|o| o == chosen) {
            return Err(ProblemError::NotAnOption(chosen.to_string()));
        }
        Ok(chosen == self.answer)
    }
}

/// A whole dialogue with one turn hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueContext {
    turns: Vec<DialogueTurn>,
    blank: usize,
}

impl DialogueContext {
    /// # Errors
    ///
    /// Returns `ProblemError::BlankOutOfRange` if `blank` does not index a turn.
    pub fn new(turns: Vec<DialogueTurn>, blank: usize) -> Result<Self, ProblemError> {
        if blank >= turns.len() {
            return Err(ProblemError::BlankOutOfRange {
                index: blank,
                len: turns.len(),
            });
        }
        Ok(Self { turns, blank })
    }

    #[must_use]
    pub fn turns(&self) -> &[DialogueTurn] {
        &self.turns
    }

    #[must_use]
    pub fn blank_index(&self) -> usize {
        self.blank
    }

    /// The turn the learner has to supply.
    #[must_use]
    pub fn blank_turn(&self) -> &DialogueTurn {
        &self.turns[self.blank]
    }

    /// Lines as they are shown to the learner, with the hidden turn replaced by [`BLANK`].
    pub fn display_lines(&self) -> impl Iterator<Item = (&str, &str)> {
        self.turns.iter().enumerate().map(move |(i, turn)| {
            let text = if i == self.blank { BLANK } else { turn.text.as_str() };
            (turn.speaker.as_str(), text)
        })
    }
}

/// Put scrambled words back in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderProblem {
    prompt: String,
    answer: String,
    tokens: Vec<String>,
}

impl ReorderProblem {
    /// `sentence` is split on whitespace; `scrambled` must hold exactly those words.
    ///
    /// # Errors
    ///
    /// Returns `ProblemError::TokenMismatch` if the multisets differ.
    pub fn new(
        prompt: impl Into<String>,
        sentence: &str,
        scrambled: Vec<String>,
    ) -> Result<Self, ProblemError> {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        if !same_multiset(&words, &scrambled) {
            return Err(ProblemError::TokenMismatch);
        }
        Ok(Self {
            prompt: prompt.into(),
            answer: words.join(" "),
            tokens: scrambled,
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The sentence with single spaces between words.
    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    fn grade(&self, order: &[String]) -> Result<bool, ProblemError> {
        if !same_multiset(order, &self.tokens) {
            return Err(ProblemError::NotAPermutation);
        }
        Ok(order.join(" ") == self.answer)
    }
}

fn same_multiset<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&str> = a.iter().map(AsRef::as_ref).collect();
    let mut b: Vec<&str> = b.iter().map(AsRef::as_ref).collect();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

//
// ─── PROBLEM ───────────────────────────────────────────────────────────────────
//

/// One practice item. Each kind carries only the fields it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// Hear a word, pick it. `audio_text` is handed to the speech service as-is.
    WordFromAudio {
        audio_text: String,
        choice: ChoiceProblem,
    },
    /// Example sentence with the headword blanked out.
    ClozeFill {
        meaning: String,
        choice: ChoiceProblem,
    },
    DialogueTurn {
        context: DialogueContext,
        choice: ChoiceProblem,
    },
    SentenceReorder(ReorderProblem),
}

/// What the learner submitted for a problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Choice(String),
    Order(Vec<String>),
}

impl Response {
    fn label(&self) -> &'static str {
        match self {
            Response::Choice(_) => "choice",
            Response::Order(_) => "order",
        }
    }
}

impl Problem {
    #[must_use]
    pub fn kind(&self) -> ProblemKind {
        match self {
            Problem::WordFromAudio { .. } => ProblemKind::WordFromAudio,
            Problem::ClozeFill { .. } => ProblemKind::ClozeFill,
            Problem::DialogueTurn { .. } => ProblemKind::DialogueTurn,
            Problem::SentenceReorder(_) => ProblemKind::SentenceReorder,
        }
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        match self {
            Problem::WordFromAudio { choice, .. }
            | Problem::ClozeFill { choice, .. }
            | Problem::DialogueTurn { choice, .. } => choice.prompt(),
            Problem::SentenceReorder(reorder) => reorder.prompt(),
        }
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        match self {
            Problem::WordFromAudio { choice, .. }
            | Problem::ClozeFill { choice, .. }
            | Problem::DialogueTurn { choice, .. } => choice.answer(),
            Problem::SentenceReorder(reorder) => reorder.answer(),
        }
    }

    /// Options for choice kinds, `None` for reorder.
    #[must_use]
    pub fn options(&self) -> Option<&[String]> {
        self.choice().map(ChoiceProblem::options)
    }

    #[must_use]
    pub fn choice(&self) -> Option<&ChoiceProblem> {
        match self {
            Problem::WordFromAudio { choice, .. }
            | Problem::ClozeFill { choice, .. }
            | Problem::DialogueTurn { choice, .. } => Some(choice),
            Problem::SentenceReorder(_) => None,
        }
    }

    #[must_use]
    pub fn audio_text(&self) -> Option<&str> {
        match self {
            Problem::WordFromAudio { audio_text, .. } => Some(audio_text),
            _ => None,
        }
    }

    #[must_use]
    pub fn dialogue_context(&self) -> Option<&DialogueContext> {
        match self {
            Problem::DialogueTurn { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Check a response against this problem.
    ///
    /// # Errors
    ///
    /// A choice that was never presented, an order that is not a permutation of the
    /// presented tokens, or a response of the wrong shape is rejected rather than
    /// graded as wrong.
    pub fn grade(&self, response: &Response) -> Result<bool, ProblemError> {
        match (self, response) {
            (Problem::SentenceReorder(reorder), Response::Order(order)) => reorder.grade(order),
            (Problem::SentenceReorder(_), Response::Choice(_)) | (_, Response::Order(_)) => {
                Err(ProblemError::WrongResponseKind {
                    expected: self.kind(),
                    got: response.label(),
                })
            }
            (_, Response::Choice(chosen)) => match self.choice() {
                Some(choice) => choice.grade(chosen),
                None => Err(ProblemError::WrongResponseKind {
                    expected: self.kind(),
                    got: response.label(),
                }),
            },
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
