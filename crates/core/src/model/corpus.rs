use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::Level;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CorpusError {
    #[error("vocabulary entry {index} has an empty headword")]
    EmptyWord { index: usize },

    #[error("vocabulary entry '{word}' has no example sentence")]
    MissingExample { word: String },

    #[error("dialogue {index} has no turns")]
    EmptyDialogue { index: usize },

    #[error("dialogue {dialogue} turn {turn} has no text")]
    EmptyTurn { dialogue: usize, turn: usize },
}

//
// ─── VOCABULARY ────────────────────────────────────────────────────────────────
//

/// A single headword with its gloss and usage examples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabEntry {
    pub word: String,
    pub meaning: String,
    pub examples: Vec<String>,
    #[serde(default)]
    pub topic: String,
}

impl VocabEntry {
    #[must_use]
    pub fn new(
        word: impl Into<String>,
        meaning: impl Into<String>,
        examples: Vec<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            word: word.into(),
            meaning: meaning.into(),
            examples,
            topic: topic.into(),
        }
    }

    #[must_use]
    pub fn first_example(&self) -> Option<&str> {
        self.examples.first().map(String::as_str)
    }
}

//
// ─── DIALOGUES ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub speaker: String,
    pub text: String,
}

impl DialogueTurn {
    #[must_use]
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

/// Scripted multi-turn conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialogue {
    #[serde(default)]
    pub title: String,
    pub turns: Vec<DialogueTurn>,
}

impl Dialogue {
    #[must_use]
    pub fn new(title: impl Into<String>, turns: Vec<DialogueTurn>) -> Self {
        Self {
            title: title.into(),
            turns,
        }
    }
}

//
// ─── LEVEL CORPUS ──────────────────────────────────────────────────────────────
//

/// Read-only content for one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCorpus {
    pub level: Level,
    #[serde(default)]
    pub vocabulary: Vec<VocabEntry>,
    #[serde(default)]
    pub dialogues: Vec<Dialogue>,
}

impl LevelCorpus {
    #[must_use]
    pub fn new(level: Level, vocabulary: Vec<VocabEntry>, dialogues: Vec<Dialogue>) -> Self {
        Self {
            level,
            vocabulary,
            dialogues,
        }
    }

    /// A level with no content at all.
    #[must_use]
    pub fn empty(level: Level) -> Self {
        Self::new(level, Vec::new(), Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty() && self.dialogues.is_empty()
    }

    /// Every turn of every dialogue, in corpus order.
    pub fn turns(&self) -> impl Iterator<Item = &DialogueTurn> {
        self.dialogues.iter().flat_map(|d| d.turns.iter())
    }

    /// Check that the corpus is usable for generation.
    ///
    /// # Errors
    ///
    /// Returns the first `CorpusError` found: blank headwords, entries without an
    /// example sentence, dialogues without turns, or turns without text.
    pub fn validate(&self) -> Result<(), CorpusError> {
        for (index, entry) in self.vocabulary.iter().enumerate() {
            if entry.word.trim().is_empty() {
                return Err(CorpusError::EmptyWord { index });
            }
            if entry.examples.iter().all(|e| e.trim().is_empty()) {
                return Err(CorpusError::MissingExample {
                    word: entry.word.clone(),
                });
            }
        }
        for (index, dialogue) in self.dialogues.iter().enumerate() {
            if dialogue.turns.is_empty() {
                return Err(CorpusError::EmptyDialogue { index });
            }
            if let Some(turn) = dialogue.turns.iter().position(|t| t.text.trim().is_empty()) {
                return Err(CorpusError::EmptyTurn {
                    dialogue: index,
                    turn,
                });
            }
        }
        Ok(())
    }
}
