//! Terminal front end for a practice run.
//!
//! Reads one line per answer. Choice problems take an option number or the option
//! text; reorder problems take token numbers or the words themselves. `q` or end
//! of input abandons the run, which leaves stored progress untouched.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use lingo_core::model::{LearnerId, LevelCorpus, Problem};
use services::{
    Advance, AnswerFeedback, PracticeError, PracticeLoopService, PracticeSession, SessionError,
    SessionOutcome,
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlayError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Practice(#[from] PracticeError),
}

#[derive(Debug)]
pub enum PlayOutcome {
    Finished(SessionOutcome),
    Abandoned,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayOptions {
    /// Show the review material before the quiz.
    pub review: bool,
    /// Print the listening text; used when no speech service is configured.
    pub show_audio_text: bool,
}

pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Next trimmed line, `None` on end of input or `q`.
    fn read_answer(&mut self) -> io::Result<Option<String>> {
        write!(self.output, "> ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        Ok(Some(line.to_string()))
    }

    /// Play `session` to the end or until the learner quits.
    ///
    /// # Errors
    ///
    /// Returns `PlayError::Io` on terminal failures and `PlayError::Practice` for
    /// storage failures or invalid session transitions.
    pub async fn play(
        &mut self,
        service: &PracticeLoopService,
        learner: LearnerId,
        session: &mut PracticeSession,
        options: PlayOptions,
    ) -> Result<PlayOutcome, PlayError> {
        if options.review {
            session.begin_review().map_err(PracticeError::from)?;
            self.render_review(session.review_material())?;
            writeln!(self.output, "Press Enter to start the quiz.")?;
            if self.read_answer()?.is_none() {
                return Ok(PlayOutcome::Abandoned);
            }
        }
        session.begin_quiz().map_err(PracticeError::from)?;

        loop {
            let Some(problem) = session.current_problem().cloned() else {
                return Ok(PlayOutcome::Abandoned);
            };
            let progress = session.progress();
            writeln!(
                self.output,
                "\n[{}/{}]  hearts {}  xp {}",
                progress.index + 1,
                progress.total,
                progress.hearts,
                progress.xp
            )?;
            session.play_prompt_audio();
            self.render_problem(&problem, options)?;

            let step = loop {
                let Some(line) = self.read_answer()? else {
                    return Ok(PlayOutcome::Abandoned);
                };
                let result = match &problem {
                    Problem::SentenceReorder(reorder) => {
                        let order = parse_order(&line, reorder.tokens());
                        service.order_current(learner, session, order).await
                    }
                    _ => {
                        let chosen = parse_choice(&line, problem.options().unwrap_or_default());
                        service.answer_current(learner, session, &chosen).await
                    }
                };
                match result {
                    Ok(step) => break step,
                    Err(PracticeError::Session(SessionError::InvalidAnswer(_))) => {
                        writeln!(self.output, "That was not one of the choices, try again.")?;
                    }
                    Err(err) => return Err(err.into()),
                }
            };

            self.render_feedback(&step.feedback)?;
            if let Advance::Finished(outcome) = step.advance {
                self.render_outcome(&outcome)?;
                return Ok(PlayOutcome::Finished(outcome));
            }
        }
    }

    fn render_review(&mut self, corpus: &LevelCorpus) -> io::Result<()> {
        writeln!(self.output, "Level {} review", corpus.level)?;
        for entry in &corpus.vocabulary {
            writeln!(self.output, "  {} - {}", entry.word, entry.meaning)?;
            if let Some(example) = entry.first_example() {
                writeln!(self.output, "      {example}")?;
            }
        }
        for dialogue in &corpus.dialogues {
            writeln!(self.output, "\n  {}", dialogue.title)?;
            for turn in &dialogue.turns {
                writeln!(self.output, "    {}: {}", turn.speaker, turn.text)?;
            }
        }
        Ok(())
    }

    fn render_problem(&mut self, problem: &Problem, options: PlayOptions) -> io::Result<()> {
        match problem {
            Problem::WordFromAudio { audio_text, .. } => {
                writeln!(self.output, "{}", problem.prompt())?;
                if options.show_audio_text {
                    writeln!(self.output, "  (audio) {audio_text}")?;
                }
            }
            Problem::ClozeFill { meaning, .. } => {
                writeln!(self.output, "{}", problem.prompt())?;
                writeln!(self.output, "  ({meaning})")?;
            }
            Problem::DialogueTurn { context, .. } => {
                for (speaker, text) in context.display_lines() {
                    writeln!(self.output, "  {speaker}: {text}")?;
                }
                writeln!(self.output, "{}", problem.prompt())?;
            }
            Problem::SentenceReorder(reorder) => {
                writeln!(self.output, "{}", reorder.prompt())?;
                for (i, token) in reorder.tokens().iter().enumerate() {
                    write!(self.output, "  {}) {token}", i + 1)?;
                }
                writeln!(self.output)?;
            }
        }
        for (i, option) in problem.options().unwrap_or_default().iter().enumerate() {
            writeln!(self.output, "  {}) {option}", i + 1)?;
        }
        Ok(())
    }

    fn render_feedback(&mut self, feedback: &AnswerFeedback) -> io::Result<()> {
        if feedback.correct {
            writeln!(
                self.output,
                "Correct! +{} xp (streak {})",
                feedback.xp_awarded, feedback.streak
            )
        } else {
            writeln!(
                self.output,
                "Not quite. Answer: {}  ({} hearts left)",
                feedback.correct_answer, feedback.hearts
            )
        }
    }

    fn render_outcome(&mut self, outcome: &SessionOutcome) -> io::Result<()> {
        let summary = &outcome.summary;
        writeln!(self.output)?;
        if summary.ran_out_of_hearts() {
            writeln!(self.output, "Out of hearts.")?;
        }
        writeln!(
            self.output,
            "Level {}: {} / {} correct, {} xp, {}%",
            summary.level(),
            summary.correct(),
            summary.total_problems(),
            summary.xp(),
            summary.percent()
        )?;
        if outcome.update.newly_completed {
            writeln!(self.output, "Level {} completed!", summary.level())?;
        }
        if let Some(level) = outcome.update.unlocked {
            writeln!(self.output, "Level {level} is now open.")?;
        }
        Ok(())
    }
}

/// Option text for `line`: a 1-based option number, or the text itself.
fn parse_choice(line: &str, options: &[String]) -> String {
    line.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i))
        .cloned()
        .unwrap_or_else(|| line.to_string())
}

/// Token order for `line`: 1-based token numbers, or the words themselves.
fn parse_order(line: &str, tokens: &[String]) -> Vec<String> {
    let picked: Option<Vec<String>> = line
        .split_whitespace()
        .map(|part| {
            part.parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| tokens.get(i))
                .cloned()
        })
        .collect();
    match picked {
        Some(order) if !order.is_empty() => order,
        _ => line.split_whitespace().map(str::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use lingo_core::model::{Level, VocabEntry};
    use lingo_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use services::{Clock, NoopSpeaker, PracticeConfig};
    use storage::{InMemoryRepository, ProgressRepository};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn choice_accepts_number_or_text() {
        let options = strings(&["gato", "perro"]);
        assert_eq!(parse_choice("2", &options), "perro");
        assert_eq!(parse_choice("gato", &options), "gato");
        assert_eq!(parse_choice("0", &options), "0");
        assert_eq!(parse_choice("9", &options), "9");
    }

    #[test]
    fn order_accepts_numbers_or_words() {
        let tokens = strings(&["hambre", "yo", "tengo"]);
        assert_eq!(parse_order("2 3 1", &tokens), strings(&["yo", "tengo", "hambre"]));
        assert_eq!(
            parse_order("yo tengo hambre", &tokens),
            strings(&["yo", "tengo", "hambre"])
        );
    }

    fn service_with_level(words: &[&str]) -> (InMemoryRepository, PracticeLoopService) {
        let repo = InMemoryRepository::new();
        let vocabulary = words
            .iter()
            .map(|w| VocabEntry::new(*w, "m", vec![format!("veo {w} aquí")], ""))
            .collect();
        repo.insert_corpus(LevelCorpus::new(Level::new(0), vocabulary, Vec::new()))
            .unwrap();
        let service = PracticeLoopService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(NoopSpeaker),
        );
        (repo, service)
    }

    #[tokio::test]
    async fn quitting_abandons_without_saving() {
        let (repo, service) = service_with_level(&["uno", "dos", "tres"]);
        let learner = LearnerId::new(1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut session = service
            .start(learner, Level::new(0), PracticeConfig::level_quiz(), &mut rng)
            .await
            .unwrap();

        let mut terminal = Terminal::new(&b"q\n"[..], Vec::new());
        let outcome = terminal
            .play(&service, learner, &mut session, PlayOptions::default())
            .await
            .unwrap();
        assert!(matches!(outcome, PlayOutcome::Abandoned));
        assert!(repo.raw_progress(learner).unwrap().is_none());
    }

    #[tokio::test]
    async fn typed_answers_finish_the_run() {
        let (repo, service) = service_with_level(&["uno", "dos"]);
        let learner = LearnerId::new(2);
        let mut rng = StdRng::seed_from_u64(2);
        let config = PracticeConfig {
            kinds: [lingo_core::model::ProblemKind::WordFromAudio].into_iter().collect(),
            ..PracticeConfig::level_quiz()
        };
        let mut session = service
            .start(learner, Level::new(0), config, &mut rng)
            .await
            .unwrap();
        let script: String = session
            .problems()
            .iter()
            .map(|p| format!("{}\n", p.correct_answer()))
            .collect();

        let mut terminal = Terminal::new(script.as_bytes(), Vec::new());
        let outcome = terminal
            .play(
                &service,
                learner,
                &mut session,
                PlayOptions {
                    review: false,
                    show_audio_text: true,
                },
            )
            .await
            .unwrap();
        let PlayOutcome::Finished(outcome) = outcome else {
            panic!("expected a finished run");
        };
        assert_eq!(outcome.summary.percent(), 100);

        let transcript = String::from_utf8(terminal.into_output()).unwrap();
        assert!(transcript.contains("(audio)"));
        assert!(transcript.contains("Level 0: 2 / 2 correct"));
        let stored = repo.get_progress(learner).await.unwrap();
        assert!(stored.is_completed(Level::new(0)));
    }

    #[tokio::test]
    async fn unknown_option_is_asked_again() {
        let (_repo, service) = service_with_level(&["uno", "dos"]);
        let learner = LearnerId::new(3);
        let mut rng = StdRng::seed_from_u64(3);
        let config = PracticeConfig {
            kinds: [lingo_core::model::ProblemKind::WordFromAudio].into_iter().collect(),
            ..PracticeConfig::level_quiz()
        };
        let mut session = service
            .start(learner, Level::new(0), config, &mut rng)
            .await
            .unwrap();
        let first = session.problems()[0].correct_answer().to_string();

        let script = format!("tres\n{first}\nq\n");
        let mut terminal = Terminal::new(script.as_bytes(), Vec::new());
        let outcome = terminal
            .play(&service, learner, &mut session, PlayOptions::default())
            .await
            .unwrap();
        assert!(matches!(outcome, PlayOutcome::Abandoned));
        assert_eq!(session.answers().len(), 1);
        assert_eq!(session.hearts(), 5);

        let transcript = String::from_utf8(terminal.into_output()).unwrap();
        assert!(transcript.contains("not one of the choices"));
    }
}
