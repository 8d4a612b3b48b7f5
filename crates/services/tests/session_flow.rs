use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{EngineSettings, Question, QuestionId, SessionConfig, TopicId};
use quiz_core::time::manual_clock;
use services::sessions::{
    MemorySink, NavigationAttempt, NavigationDecision, Navigator, SessionView, SkipLabel,
};
use services::{
    ExitMethod, ExitOutcome, NavigationRegistry, SessionLoopService, SessionPhase, SkipKind,
    Telemetry, TelemetryEvent,
};
use storage::repository::{InMemoryRepository, QuestionBank, StorageError};

fn question(id: u64, topic: &str) -> Question {
    Question::new(
        QuestionId::new(id),
        TopicId::new(topic).unwrap(),
        format!("Question {id}"),
        vec![format!("answer {id}"), "distractor".into(), "other".into()],
        0,
    )
    .unwrap()
}

/// 100 questions per domain, spread over three topics each.
fn exam_bank() -> Arc<dyn QuestionBank> {
    let mut questions = Vec::new();
    for domain in 1..=3u64 {
        for n in 0..100u64 {
            let id = domain * 1000 + n;
            questions.push(question(id, &format!("{domain}.{}", n % 3 + 1)));
        }
    }
    Arc::new(InMemoryRepository::from_questions(questions).unwrap())
}

fn small_bank() -> Arc<dyn QuestionBank> {
    Arc::new(
        InMemoryRepository::from_questions(vec![
            question(1, "1.1"),
            question(2, "1.1"),
            question(3, "1.1"),
            question(4, "2.1"),
        ])
        .unwrap(),
    )
}

fn correct(view: &SessionView<'_>) -> usize {
    view.question.unwrap().correct_answer()
}

#[derive(Default)]
struct Browser {
    location: RefCell<String>,
    visited: RefCell<Vec<String>>,
}

impl Navigator for Browser {
    fn current_location(&self) -> String {
        self.location.borrow().clone()
    }

    fn replace_location(&self, location: &str) {
        *self.location.borrow_mut() = location.to_string();
    }

    fn navigate(&self, destination: &str) {
        *self.location.borrow_mut() = destination.to_string();
        self.visited.borrow_mut().push(destination.to_string());
    }
}

struct OfflineBank;

#[async_trait::async_trait]
impl QuestionBank for OfflineBank {
    async fn upsert_question(&self, _question: &Question) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn all_questions(&self) -> Result<Vec<Question>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

#[tokio::test]
async fn bank_failure_surfaces_as_storage_error() {
    let service = SessionLoopService::new(manual_clock(), Arc::new(OfflineBank));
    let err = service
        .start_session(SessionConfig::parse("domain-quick", Some("1")).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        services::SessionError::Storage(StorageError::Connection(_))
    ));
}

#[tokio::test]
async fn topic_quick_uses_whole_small_pool() {
    let service = SessionLoopService::new(manual_clock(), small_bank());
    let session = service
        .start_session(SessionConfig::parse("topic-quick", Some("1.1")).unwrap())
        .await
        .unwrap();

    let mut ids: Vec<u64> = session.questions().iter().map(|q| q.id().value()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn full_exam_follows_blueprint() {
    let service = SessionLoopService::new(manual_clock(), exam_bank()).with_seed(42);
    let session = service
        .start_session(SessionConfig::parse("full-exam", None).unwrap())
        .await
        .unwrap();

    let mut per_domain = [0usize; 3];
    for q in session.questions() {
        let domain: usize = q.domain_id().as_str().parse().unwrap();
        per_domain[domain - 1] += 1;
    }
    assert_eq!(session.total(), 80);
    assert_eq!(per_domain, [32, 32, 16]);
}

#[tokio::test(start_paused = true)]
async fn answering_everything_reaches_results() {
    let sink = Arc::new(MemorySink::new());
    let service = SessionLoopService::new(manual_clock(), exam_bank())
        .with_seed(3)
        .with_telemetry(Telemetry::new(sink.clone()));
    let session = RefCell::new(
        service
            .start_session(SessionConfig::parse("super-quick-exam", None).unwrap())
            .await
            .unwrap(),
    );

    // all right but the last
    while session.borrow().queue_len() > 1 {
        let option = correct(&session.borrow().view());
        service.submit_and_advance(&session, Some(option)).await.unwrap();
    }
    let wrong = (correct(&session.borrow().view()) + 1) % 3;
    let record = service.submit_and_advance(&session, Some(wrong)).await.unwrap();

    assert!(!record.is_correct);
    let session = session.into_inner();
    assert_eq!(session.phase(), SessionPhase::Results);
    let results = session.results().unwrap();
    assert_eq!(results.score, 9);
    assert_eq!(results.total, 10);
    assert_eq!(results.percentage, 90);
    assert!(matches!(
        sink.events().last(),
        Some(TelemetryEvent::SessionFinished { score: 9, percentage: 90, .. })
    ));
}

#[tokio::test]
async fn defer_then_forfeit_keeps_queue_order() {
    let service = SessionLoopService::new(manual_clock(), small_bank())
        .with_settings(EngineSettings::default().without_delays());
    let session = RefCell::new(
        service
            .start_session(SessionConfig::parse("topic", Some("1.1")).unwrap())
            .await
            .unwrap(),
    );
    let [x, y, z] = [0, 1, 2];
    assert_eq!(session.borrow().view().skip_label, SkipLabel::ComeBackLater);

    assert_eq!(session.borrow_mut().skip(), Some(SkipKind::Defer));
    assert_eq!(session.borrow().queue(), vec![y, z, x]);
    assert_eq!(session.borrow_mut().skip(), Some(SkipKind::Defer));
    assert_eq!(session.borrow().queue(), vec![z, x, y]);

    service.submit_and_advance(&session, Some(0)).await.unwrap();
    let mut session = session.into_inner();
    assert_eq!(session.view().skip_label, SkipLabel::SkipQuestion);
    assert_eq!(session.skip(), Some(SkipKind::Forfeit));

    assert_eq!(session.queue(), vec![y]);
    assert_eq!(session.answered_count(), 2);
    let forfeit = session.records().last().copied().unwrap();
    assert_eq!(forfeit.question_index, x);
    assert!(!forfeit.is_correct);
}

#[tokio::test(start_paused = true)]
async fn browser_back_exit_runs_navigation_after_delay() {
    let browser = Rc::new(Browser::default());
    *browser.location.borrow_mut() = "/test/1.1".to_string();
    let mut registry = NavigationRegistry::new(browser.clone());

    let service = SessionLoopService::new(manual_clock(), small_bank());
    let session = service
        .start_session(SessionConfig::parse("topic", Some("1.1")).unwrap())
        .await
        .unwrap();
    let session = Rc::new(RefCell::new(session));
    registry.register(&session);

    *browser.location.borrow_mut() = "/topics".to_string();
    let decision = registry.attempt(NavigationAttempt::new(ExitMethod::BrowserBack, "/topics"));
    assert_eq!(decision, NavigationDecision::Intercepted);
    assert_eq!(browser.current_location(), "/test/1.1");
    assert!(session.borrow().view().exit_modal.is_some());

    let started = tokio::time::Instant::now();
    let outcome = service.confirm_exit_and_wait(&session).await;
    assert_eq!(outcome, Some(ExitOutcome::Deferred));
    assert_eq!(started.elapsed(), Duration::from_millis(300));
    assert!(session.borrow().is_terminated());

    assert_eq!(*browser.visited.borrow(), vec!["/topics".to_string()]);
    registry.teardown(&session);
    assert_eq!(registry.registered(), None);
}

#[tokio::test]
async fn exit_button_without_navigation_runs_default_leave() {
    let left = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&left);
    let service = SessionLoopService::new(manual_clock(), small_bank());
    let session = RefCell::new(
        service
            .start_session(SessionConfig::parse("domain", Some("2")).unwrap())
            .await
            .unwrap()
            .with_default_leave(move || *flag.borrow_mut() = true),
    );

    assert!(session.borrow_mut().request_exit(ExitMethod::UiButton, None));
    let outcome = service.confirm_exit_and_wait(&session).await;

    assert_eq!(outcome, Some(ExitOutcome::Left));
    assert!(*left.borrow());
    assert!(session.borrow().is_terminated());
}

#[tokio::test]
async fn restart_replays_same_questions() {
    let service = SessionLoopService::new(manual_clock(), exam_bank())
        .with_settings(EngineSettings::default().without_delays());
    let session = RefCell::new(
        service
            .start_session(SessionConfig::parse("quick-exam", None).unwrap())
            .await
            .unwrap(),
    );
    let questions = session.borrow().questions().to_vec();

    session.borrow_mut().skip();
    service.submit_and_advance(&session, Some(1)).await;
    let mut session = session.into_inner();
    assert!(session.restart());

    assert_eq!(session.questions(), questions.as_slice());
    assert_eq!(session.queue(), (0..questions.len()).collect::<Vec<_>>());
    assert_eq!(session.score(), 0);
}

#[tokio::test(start_paused = true)]
async fn navigation_during_transition_is_intercepted() {
    let browser = Rc::new(Browser::default());
    *browser.location.borrow_mut() = "/test/1.1".to_string();
    let mut registry = NavigationRegistry::new(browser.clone());

    let service = SessionLoopService::new(manual_clock(), small_bank());
    let session = service
        .start_session(SessionConfig::parse("topic", Some("1.1")).unwrap())
        .await
        .unwrap();
    let session = Rc::new(RefCell::new(session));
    registry.register(&session);

    let leave = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let phase = session.borrow().phase();
        let decision =
            registry.attempt(NavigationAttempt::new(ExitMethod::ExternalNavigation, "/topics"));
        (phase, decision)
    };
    let (record, (phase, decision)) =
        tokio::join!(service.submit_and_advance(&session, Some(0)), leave);

    assert!(record.is_some());
    assert_eq!(phase, SessionPhase::Transitioning);
    assert_eq!(decision, NavigationDecision::Intercepted);
    assert!(browser.visited.borrow().is_empty());
    // the completed transition waits behind the modal
    assert_eq!(session.borrow().phase(), SessionPhase::ExitPending);
    assert_eq!(session.borrow().queue_len(), 3);

    assert!(session.borrow_mut().cancel_exit());
    assert_eq!(session.borrow().phase(), SessionPhase::Active);
    assert_eq!(session.borrow().queue_len(), 2);
    assert!(browser.visited.borrow().is_empty());
}
