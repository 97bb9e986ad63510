//! Shuffling and sampling used by problem generation.
//!
//! Every helper takes the random source explicitly so tests can pass a seeded
//! `StdRng` and get the same practice set every time.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

/// Shuffle `items` in place.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}

/// Pick up to `count` distinct values from `pool`, never returning `exclude`.
///
/// Duplicates in the pool are collapsed first, so a small or repetitive pool
/// simply yields fewer values.
pub fn sample_distinct<'a, I, R>(pool: I, exclude: &str, count: usize, rng: &mut R) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
    R: Rng + ?Sized,
{
    let mut seen = HashSet::new();
    let mut candidates: Vec<&str> = pool
        .into_iter()
        .filter(|value| *value != exclude && seen.insert(*value))
        .collect();
    candidates.shuffle(rng);
    candidates.truncate(count);
    candidates.into_iter().map(str::to_string).collect()
}

/// Distractors plus the correct answer, shuffled together.
pub fn shuffled_options<R: Rng + ?Sized>(
    answer: &str,
    distractors: Vec<String>,
    rng: &mut R,
) -> Vec<String> {
    let mut options = distractors;
    options.push(answer.to_string());
    options.shuffle(rng);
    options
}
