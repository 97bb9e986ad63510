use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use lingo_core::model::{
    Dialogue, DialogueTurn, LearnerId, LearnerProgress, Level, LevelCorpus, ProblemKind, SessionEnd, VocabEntry,
};
use lingo_core::time::fixed_now;
use rand::SeedableRng;
use rand::rngs::StdRng;
use services::{
    Advance, Clock, EntitlementService, PracticeConfig, PracticeError, PracticeLoopService,
    PracticeSession, RecordingSpeaker, SessionPhase,
};
use storage::{InMemoryRepository, ProgressRepository, StorageError};

const WORDS: [(&str, &str); 10] = [
    ("gato", "El gato duerme"),
    ("perro", "Mi perro corre"),
    ("casa", "La casa es azul"),
    ("libro", "Leo un libro"),
    ("agua", "Bebo agua fría"),
    ("pan", "Compro pan fresco"),
    ("sol", "Hace sol hoy"),
    ("mesa", "La mesa es grande"),
    ("silla", "Una silla vieja"),
    ("tren", "El tren llega tarde"),
];

fn corpus(level: u8) -> LevelCorpus {
    let vocabulary = WORDS
        .iter()
        .map(|(word, example)| {
            VocabEntry::new(*word, format!("{word}?"), vec![(*example).to_string()], "basics")
        })
        .collect();
    let dialogues = vec![Dialogue::new(
        "saludo",
        vec![
            DialogueTurn::new("Ana", "Buenos días, ¿cómo estás?"),
            DialogueTurn::new("Luis", "Muy bien, gracias"),
        ],
    )];
    LevelCorpus::new(Level::new(level), vocabulary, dialogues)
}

struct Harness {
    repo: InMemoryRepository,
    speaker: RecordingSpeaker,
    practice: PracticeLoopService,
}

fn harness() -> Harness {
    let repo = InMemoryRepository::new();
    for level in 0..=3 {
        repo.insert_corpus(corpus(level)).unwrap();
    }
    let speaker = RecordingSpeaker::new();
    let practice = PracticeLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(speaker.clone()),
    );
    Harness {
        repo,
        speaker,
        practice,
    }
}

fn right_answer(session: &PracticeSession) -> String {
    session.current_problem().unwrap().correct_answer().to_string()
}

fn wrong_answer(session: &PracticeSession) -> String {
    let problem = session.current_problem().unwrap();
    problem
        .options()
        .unwrap()
        .iter()
        .find(|o| o.as_str() != problem.correct_answer())
        .unwrap()
        .clone()
}

#[tokio::test]
async fn perfect_quiz_completes_level_and_unlocks_next() {
    let h = harness();
    let learner = LearnerId::new(1);
    let mut rng = StdRng::seed_from_u64(42);

    let mut session = h
        .practice
        .start(learner, Level::new(1), PracticeConfig::level_quiz(), &mut rng)
        .await
        .unwrap();
    assert_eq!(session.problems().len(), 10);
    assert!(session
        .problems()
        .iter()
        .all(|p| p.kind() != ProblemKind::SentenceReorder));

    session.begin_review().unwrap();
    assert_eq!(session.review_material().vocabulary.len(), 10);
    session.begin_quiz().unwrap();

    let mut finished = None;
    while finished.is_none() {
        let chosen = right_answer(&session);
        let step = h
            .practice
            .answer_current(learner, &mut session, &chosen)
            .await
            .unwrap();
        assert!(step.feedback.correct);
        if let Advance::Finished(outcome) = step.advance {
            finished = Some(outcome);
        }
    }

    let outcome = finished.unwrap();
    assert_eq!(outcome.summary.xp(), 140);
    assert_eq!(outcome.summary.percent(), 100);
    assert_eq!(outcome.summary.end(), SessionEnd::Completed);
    assert_eq!(session.phase(), SessionPhase::Finished);

    let stored = h.repo.get_progress(learner).await.unwrap();
    assert_eq!(stored.progress_for(Level::new(1)), Some(100));
    assert!(stored.is_completed(Level::new(1)));
    assert_eq!(stored.current_level(), Level::new(2));
    assert_eq!(h.speaker.spoken().len(), 10);
}

#[tokio::test]
async fn running_out_of_hearts_stops_before_sixth_problem() {
    let h = harness();
    let learner = LearnerId::new(2);
    let mut rng = StdRng::seed_from_u64(7);

    let mut session = h
        .practice
        .start(learner, Level::new(0), PracticeConfig::level_quiz(), &mut rng)
        .await
        .unwrap();
    session.begin_quiz().unwrap();

    let mut answered = 0;
    loop {
        let chosen = wrong_answer(&session);
        let step = h
            .practice
            .answer_current(learner, &mut session, &chosen)
            .await
            .unwrap();
        answered += 1;
        if let Advance::Finished(outcome) = step.advance {
            assert_eq!(outcome.summary.end(), SessionEnd::OutOfHearts);
            assert_eq!(outcome.summary.forfeited(), 5);
            break;
        }
    }
    assert_eq!(answered, 5);
    assert_eq!(session.hearts(), 0);

    let stored = h.repo.get_progress(learner).await.unwrap();
    assert_eq!(stored.progress_for(Level::new(0)), Some(0));
    assert!(!stored.is_completed(Level::new(0)));
}

#[tokio::test]
async fn abandoned_session_commits_nothing() {
    let h = harness();
    let learner = LearnerId::new(3);
    let mut rng = StdRng::seed_from_u64(3);

    let mut session = h
        .practice
        .start(learner, Level::new(1), PracticeConfig::practice(), &mut rng)
        .await
        .unwrap();
    session.begin_quiz().unwrap();
    let chosen = session
        .current_problem()
        .unwrap()
        .correct_answer()
        .to_string();
    if session.current_problem().unwrap().kind() == ProblemKind::SentenceReorder {
        let tokens = chosen.split(' ').map(str::to_string).collect();
        h.practice
            .order_current(learner, &mut session, tokens)
            .await
            .unwrap();
    } else {
        h.practice
            .answer_current(learner, &mut session, &chosen)
            .await
            .unwrap();
    }

    assert!(matches!(
        h.practice.commit(learner, &session).await,
        Err(PracticeError::NotFinished)
    ));
    drop(session);
    assert!(h.repo.raw_progress(learner).unwrap().is_none());
}

#[tokio::test]
async fn paid_level_needs_purchase_and_previous_completion() {
    let h = harness();
    let learner = LearnerId::new(4);
    let entitlements = EntitlementService::new(Clock::fixed(fixed_now()), Arc::new(h.repo.clone()));
    let mut rng = StdRng::seed_from_u64(9);

    let locked = h
        .practice
        .start(learner, Level::new(3), PracticeConfig::level_quiz(), &mut rng)
        .await
        .unwrap_err();
    assert!(matches!(locked, PracticeError::Locked(level) if level == Level::new(3)));

    entitlements.purchase_level(learner, Level::new(3)).await.unwrap();
    assert!(!entitlements.can_access(learner, Level::new(3)).await.unwrap());

    let mut progress = h.repo.get_or_default(learner).await.unwrap();
    lingo_core::entitlement::record_level_progress(&mut progress, Level::new(2), 70);
    h.repo.upsert_progress(learner, &progress).await.unwrap();

    assert!(entitlements.can_access(learner, Level::new(3)).await.unwrap());
    let session = h
        .practice
        .start(learner, Level::new(3), PracticeConfig::level_quiz(), &mut rng)
        .await
        .unwrap();
    assert_eq!(session.level(), Level::new(3));
}

#[tokio::test]
async fn missing_content_is_a_storage_error() {
    let repo = InMemoryRepository::new();
    let practice = PracticeLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo),
        Arc::new(RecordingSpeaker::new()),
    );
    let mut rng = StdRng::seed_from_u64(1);
    let err = practice
        .start(LearnerId::new(5), Level::new(0), PracticeConfig::level_quiz(), &mut rng)
        .await
        .unwrap_err();
    assert!(matches!(err, PracticeError::Storage(_)));
}

#[tokio::test]
async fn content_without_problems_cannot_start() {
    let repo = InMemoryRepository::new();
    repo.insert_corpus(LevelCorpus::empty(Level::new(0))).unwrap();
    let practice = PracticeLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo),
        Arc::new(RecordingSpeaker::new()),
    );
    let mut rng = StdRng::seed_from_u64(1);
    let err = practice
        .start(LearnerId::new(6), Level::new(0), PracticeConfig::level_quiz(), &mut rng)
        .await
        .unwrap_err();
    assert!(matches!(err, PracticeError::Session(services::SessionError::Empty)));
}

/// Progress store that counts reads and can be switched offline.
#[derive(Default)]
struct FlakyProgress {
    inner: InMemoryRepository,
    offline: AtomicBool,
    reads: AtomicUsize,
}

#[async_trait]
impl ProgressRepository for FlakyProgress {
    async fn get_progress(&self, learner: LearnerId) -> Result<LearnerProgress, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("offline".into()));
        }
        self.inner.get_progress(learner).await
    }

    async fn upsert_progress(
        &self,
        learner: LearnerId,
        progress: &LearnerProgress,
    ) -> Result<(), StorageError> {
        self.inner.upsert_progress(learner, progress).await
    }
}

#[tokio::test]
async fn progress_is_read_only_when_the_run_finishes() {
    let corpora = InMemoryRepository::new();
    corpora.insert_corpus(corpus(1)).unwrap();
    let store = Arc::new(FlakyProgress::default());
    let practice = PracticeLoopService::new(
        Clock::fixed(fixed_now()),
        store.clone(),
        Arc::new(corpora),
        Arc::new(RecordingSpeaker::new()),
    );
    let learner = LearnerId::new(8);
    let mut rng = StdRng::seed_from_u64(11);

    let mut session = practice
        .start(learner, Level::new(1), PracticeConfig::level_quiz(), &mut rng)
        .await
        .unwrap();
    session.begin_quiz().unwrap();
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);

    // Middle steps keep working while the store is unreachable.
    store.offline.store(true, Ordering::SeqCst);
    for expected in 1..10 {
        let chosen = right_answer(&session);
        let step = practice
            .answer_current(learner, &mut session, &chosen)
            .await
            .unwrap();
        assert_eq!(step.advance, Advance::Next(expected));
    }
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);

    let chosen = right_answer(&session);
    let err = practice
        .answer_current(learner, &mut session, &chosen)
        .await
        .unwrap_err();
    assert!(matches!(err, PracticeError::Storage(StorageError::Connection(_))));
    assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    assert_eq!(session.phase(), SessionPhase::Active);

    store.offline.store(false, Ordering::SeqCst);
    let step = practice.advance(learner, &mut session).await.unwrap();
    assert!(matches!(step, Advance::Finished(_)));
    let stored = store.inner.get_progress(learner).await.unwrap();
    assert_eq!(stored.progress_for(Level::new(1)), Some(100));
}
