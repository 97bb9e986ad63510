//! Builds the practice set for a session from a level's content.
//!
//! The shape is fixed (which problems a corpus can produce), the content is not:
//! distractors, option order, token order and the final selection are all drawn
//! from the random source passed in.

mod sample;

use std::collections::BTreeSet;

use rand::Rng;
use tracing::{debug, warn};

use lingo_core::model::{
    BLANK, ChoiceProblem, DialogueContext, LevelCorpus, Problem, ProblemKind, ReorderProblem,
    VocabEntry,
};

pub use sample::{sample_distinct, shuffle, shuffled_options};

/// Distractors shown next to the correct answer when the pool allows it.
pub const DISTRACTOR_COUNT: usize = 3;

/// Dialogue distractors must be within this many characters of the answer's length.
pub const TURN_LENGTH_WINDOW: usize = 15;

/// Turns with at least this many words also become a reorder problem.
pub const MIN_REORDER_WORDS: usize = 3;

/// Practice set size used when the caller does not choose one.
pub const DEFAULT_TARGET_COUNT: usize = 10;

/// Generates practice problems for the enabled problem kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemGenerator {
    kinds: BTreeSet<ProblemKind>,
}

impl Default for ProblemGenerator {
    fn default() -> Self {
        Self::new(ProblemKind::ALL)
    }
}

impl ProblemGenerator {
    #[must_use]
    pub fn new(kinds: impl IntoIterator<Item = ProblemKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    fn enabled(&self, kind: ProblemKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Every problem the corpus can produce, unshuffled, in corpus order.
    pub fn candidates<R: Rng + ?Sized>(&self, corpus: &LevelCorpus, rng: &mut R) -> Vec<Problem> {
        let mut problems = Vec::new();
        let headwords: Vec<&str> = corpus
            .vocabulary
            .iter()
            .map(|e| e.word.as_str())
            .filter(|w| !w.trim().is_empty())
            .collect();

        for entry in &corpus.vocabulary {
            if entry.word.trim().is_empty() {
                continue;
            }
            if self.enabled(ProblemKind::ClozeFill) {
                problems.extend(cloze_problem(entry, &headwords, rng));
            }
            if self.enabled(ProblemKind::WordFromAudio) {
                problems.extend(audio_problem(entry, &headwords, rng));
            }
        }

        let want_turns = self.enabled(ProblemKind::DialogueTurn);
        let want_reorder = self.enabled(ProblemKind::SentenceReorder);
        if want_turns || want_reorder {
            for dialogue in &corpus.dialogues {
                for (index, turn) in dialogue.turns.iter().enumerate() {
                    if want_turns {
                        let context = match DialogueContext::new(dialogue.turns.clone(), index) {
                            Ok(context) => context,
                            Err(err) => {
                                warn!(target: "generator", error = %err, "Skipping dialogue turn");
                                continue;
                            }
                        };
                        problems.extend(turn_problem(corpus, context, rng));
                    }
                    if want_reorder && turn.text.split_whitespace().count() >= MIN_REORDER_WORDS {
                        problems.extend(reorder_problem(&turn.text, rng));
                    }
                }
            }
        }

        problems
    }

    /// Shuffled practice set of at most `target_count` problems.
    ///
    /// A thin corpus yields a shorter set; nothing is repeated to pad it.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        corpus: &LevelCorpus,
        target_count: usize,
        rng: &mut R,
    ) -> Vec<Problem> {
        let mut problems = self.candidates(corpus, rng);
        let available = problems.len();
        shuffle(problems.as_mut_slice(), rng);
        problems.truncate(target_count);
        debug!(
            target: "generator",
            level = %corpus.level,
            available,
            selected = problems.len(),
            target_count,
            "Generated practice set"
        );
        problems
    }
}

/// Practice set over every problem kind, using the thread-local random source.
#[must_use]
pub fn generate_session(corpus: &LevelCorpus, target_count: usize) -> Vec<Problem> {
    ProblemGenerator::default().generate(corpus, target_count, &mut rand::rng())
}

fn word_choice<R: Rng + ?Sized>(
    prompt: String,
    word: &str,
    headwords: &[&str],
    rng: &mut R,
) -> Option<ChoiceProblem> {
    let distractors = sample_distinct(headwords.iter().copied(), word, DISTRACTOR_COUNT, rng);
    let options = shuffled_options(word, distractors, rng);
    ChoiceProblem::new(prompt, word, options)
        .map_err(|err| warn!(target: "generator", %word, error = %err, "Invalid word choice"))
        .ok()
}

fn cloze_problem<R: Rng + ?Sized>(
    entry: &VocabEntry,
    headwords: &[&str],
    rng: &mut R,
) -> Option<Problem> {
    let example = entry.first_example()?;
    if !example.contains(entry.word.as_str()) {
        return None;
    }
    let sentence = example.replacen(entry.word.as_str(), BLANK, 1);
    let choice = word_choice(sentence, &entry.word, headwords, rng)?;
    Some(Problem::ClozeFill {
        meaning: entry.meaning.clone(),
        choice,
    })
}

fn audio_problem<R: Rng + ?Sized>(
    entry: &VocabEntry,
    headwords: &[&str],
    rng: &mut R,
) -> Option<Problem> {
    let prompt = "Listen and pick the word you hear".to_string();
    let choice = word_choice(prompt, &entry.word, headwords, rng)?;
    Some(Problem::WordFromAudio {
        audio_text: entry.word.clone(),
        choice,
    })
}

fn turn_problem<R: Rng + ?Sized>(
    corpus: &LevelCorpus,
    context: DialogueContext,
    rng: &mut R,
) -> Option<Problem> {
    let blank = context.blank_turn();
    let answer = blank.text.clone();
    let answer_len = answer.chars().count();
    let pool = corpus
        .turns()
        .map(|t| t.text.as_str())
        .filter(|text| text.chars().count().abs_diff(answer_len) < TURN_LENGTH_WINDOW);
    let distractors = sample_distinct(pool, &answer, DISTRACTOR_COUNT, rng);
    let options = shuffled_options(&answer, distractors, rng);
    let prompt = format!("What does {} say?", blank.speaker);
    let choice = ChoiceProblem::new(prompt, answer, options)
        .map_err(|err| warn!(target: "generator", error = %err, "Invalid dialogue choice"))
        .ok()?;
    Some(Problem::DialogueTurn { context, choice })
}

fn reorder_problem<R: Rng + ?Sized>(sentence: &str, rng: &mut R) -> Option<Problem> {
    let mut tokens: Vec<String> = sentence.split_whitespace().map(str::to_string).collect();
    shuffle(tokens.as_mut_slice(), rng);
    ReorderProblem::new("Put the words in order", sentence, tokens)
        .map(Problem::SentenceReorder)
        .map_err(|err| warn!(target: "generator", error = %err, "Invalid reorder problem"))
        .ok()
}
