mod corpus_file;
mod play;
mod telemetry;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use lingo_core::entitlement::record_level_progress;
use lingo_core::model::{LearnerId, Level, Problem};
use services::{
    Clock, ConfigError, EntitlementService, PracticeConfig, PracticeLoopService,
    Speaker, SpeechConfig, speaker_from_env,
};
use storage::{CorpusRepository, InMemoryRepository, ProgressRepository, Storage};

use crate::corpus_file::CorpusFile;
use crate::play::{PlayOptions, PlayOutcome, Terminal};

/// Vocabulary and dialogue practice in the terminal.
#[derive(Parser, Debug)]
#[command(name = "lingo", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a level quiz or a free practice run
    Play(PlayArgs),
    /// Print the problems a seed generates for a level, with answers
    Inspect(SetArgs),
}

#[derive(clap::Args, Debug)]
struct SetArgs {
    /// TOML file with the content for every level
    #[arg(long, default_value = "crates/app/data/sample_corpus.toml")]
    corpus: PathBuf,

    /// Level to practice
    #[arg(long, default_value_t = Level::new(0))]
    level: Level,

    #[arg(long, value_enum, default_value_t = Mode::Quiz)]
    mode: Mode,

    /// Practice config TOML; overrides the mode's preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for a reproducible problem set
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(clap::Args, Debug)]
struct PlayArgs {
    #[command(flatten)]
    set: SetArgs,

    #[arg(long, default_value_t = LearnerId::new(1))]
    learner: LearnerId,

    /// Browse the level's words and dialogues before the quiz
    #[arg(long)]
    review: bool,

    /// Paid levels to unlock before playing
    #[arg(long = "purchase", value_name = "LEVEL")]
    purchases: Vec<Level>,

    /// Levels to mark as already completed before playing
    #[arg(long = "completed", value_name = "LEVEL")]
    completed: Vec<Level>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// End-of-level quiz: 10 XP per answer, no reorder problems
    Quiz,
    /// Free practice: 15 XP per answer, every problem kind
    Practice,
}

impl SetArgs {
    fn practice_config(&self) -> Result<PracticeConfig, ConfigError> {
        match &self.config {
            Some(path) => PracticeConfig::load(path),
            None => Ok(match self.mode {
                Mode::Quiz => PracticeConfig::level_quiz(),
                Mode::Practice => PracticeConfig::practice(),
            }),
        }
    }

    fn rng(&self) -> StdRng {
        let seed = self.seed.unwrap_or_else(rand::random);
        info!(target: "session", seed, "Problem set seed");
        StdRng::seed_from_u64(seed)
    }
}

fn load_storage(path: &Path) -> Result<Storage, Box<dyn std::error::Error>> {
    let repo = InMemoryRepository::new();
    let levels = CorpusFile::load(path)?.seed(&repo)?;
    info!(target: "session", levels, path = %path.display(), "Corpus loaded");
    Ok(Storage::from_in_memory(repo))
}

async fn run_play(args: PlayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let storage = load_storage(&args.set.corpus)?;
    let config = args.set.practice_config()?;
    let clock = Clock::default();

    let entitlements = EntitlementService::new(clock, Arc::clone(&storage.progress));
    for level in &args.purchases {
        entitlements.purchase_level(args.learner, *level).await?;
    }
    if !args.completed.is_empty() {
        let mut progress = storage.progress.get_or_default(args.learner).await?;
        for level in &args.completed {
            record_level_progress(&mut progress, *level, 100);
        }
        storage.progress.upsert_progress(args.learner, &progress).await?;
    }

    // Without a speech service the listening text has to be printed instead.
    let show_audio_text = SpeechConfig::from_env().is_none();
    let speaker: Arc<dyn Speaker> = speaker_from_env();

    let service = PracticeLoopService::new(
        clock,
        Arc::clone(&storage.progress),
        Arc::clone(&storage.corpora),
        speaker,
    );
    let mut rng = args.set.rng();
    let mut session = service
        .start(args.learner, args.set.level, config, &mut rng)
        .await?;

    let stdin = io::stdin();
    let mut terminal = Terminal::new(stdin.lock(), io::stdout());
    let options = PlayOptions {
        review: args.review,
        show_audio_text,
    };
    match terminal
        .play(&service, args.learner, &mut session, options)
        .await?
    {
        PlayOutcome::Finished(_) => {
            let progress = storage.progress.get_progress(args.learner).await?;
            println!("Current level: {}", progress.current_level());
        }
        PlayOutcome::Abandoned => println!("\nSession abandoned; nothing was saved."),
    }
    Ok(())
}

async fn run_inspect(args: SetArgs) -> Result<(), Box<dyn std::error::Error>> {
    let storage = load_storage(&args.corpus)?;
    let config = args.practice_config()?;
    let corpus = storage.corpora.get_corpus(args.level).await?;
    let mut rng = args.rng();
    let problems = config
        .generator()
        .generate(&corpus, config.target_count, &mut rng);

    for (i, problem) in problems.iter().enumerate() {
        println!("{:>2}. [{}] {}", i + 1, problem.kind(), problem.prompt());
        match problem {
            Problem::SentenceReorder(reorder) => println!("    tokens: {}", reorder.tokens().join(" | ")),
            _ => println!("    options: {}", problem.options().unwrap_or_default().join(" | ")),
        }
        println!("    answer: {}", problem.correct_answer());
    }
    if problems.is_empty() {
        println!("Level {} has no content to practice.", args.level);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Play(args) => run_play(args).await,
        Command::Inspect(args) => run_inspect(args).await,
    }
}
