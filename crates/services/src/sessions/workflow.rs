use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use rand::rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use quiz_core::model::{EngineSettings, Question, SessionConfig, TestMode};
use storage::repository::QuestionBank;

use crate::Clock;
use crate::error::SessionError;
use crate::selection::Sampler;
use super::exit::ExitOutcome;
use super::machine::TestSession;
use super::results::AnsweredRecord;
use super::telemetry::Telemetry;

/// Orchestrates session start and the timed parts of the session loop.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    bank: Arc<dyn QuestionBank>,
    settings: EngineSettings,
    telemetry: Telemetry,
    seed: Option<u64>,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(clock: Clock, bank: Arc<dyn QuestionBank>) -> Self {
        Self {
            clock,
            bank,
            settings: EngineSettings::default(),
            telemetry: Telemetry::disabled(),
            seed: None,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Fix the selection RNG seed. Every session started afterwards gets the
    /// same questions in the same order.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Start a new session for `config`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the bank cannot be read and
    /// `SessionError::NoQuestionsAvailable` if selection comes back empty.
    pub async fn start_session(&self, config: SessionConfig) -> Result<TestSession, SessionError> {
        let corpus = self.load_corpus(config.mode()).await?;
        let sampler = Sampler::new(&self.settings);
        let plan = match self.seed {
            Some(seed) => sampler.sample(&corpus, &config, &mut StdRng::seed_from_u64(seed)),
            None => sampler.sample(&corpus, &config, &mut rng()),
        };

        if plan.is_empty() {
            tracing::info!(mode = %config.mode(), corpus = corpus.len(), "no questions selected");
            return Err(SessionError::NoQuestionsAvailable {
                mode: config.mode().to_string(),
            });
        }

        TestSession::new(config, plan.questions, self.clock.clone(), self.telemetry.clone())
    }

    /// Submit and, once the transition delay has passed, move past the
    /// answered question.
    ///
    /// The session is only borrowed around each step, so the host can still
    /// route navigation into it while the delay runs.
    pub async fn submit_and_advance(
        &self,
        session: &RefCell<TestSession>,
        selected: Option<usize>,
    ) -> Option<AnsweredRecord> {
        let record = session.borrow_mut().submit(selected)?;
        pause(self.settings.transition_delay()).await;
        session.borrow_mut().complete_transition();
        Some(record)
    }

    /// Confirm the pending exit and, for a deferred navigation, run it after
    /// the exit delay.
    pub async fn confirm_exit_and_wait(
        &self,
        session: &RefCell<TestSession>,
    ) -> Option<ExitOutcome> {
        let outcome = session.borrow_mut().confirm_exit()?;
        if outcome == ExitOutcome::Deferred {
            pause(self.settings.exit_delay()).await;
            session.borrow_mut().complete_exit();
        }
        Some(outcome)
    }

    async fn load_corpus(&self, mode: &TestMode) -> Result<Vec<Question>, SessionError> {
        let corpus = if let Some(topic) = mode.topic() {
            self.bank.questions_for_topic(topic).await?
        } else if let Some(domain) = mode.domain() {
            self.bank.questions_for_domain(domain).await?
        } else {
            self.bank.all_questions().await?
        };
        Ok(corpus)
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::machine::SessionPhase;
    use quiz_core::model::{QuestionId, TopicId};
    use quiz_core::time::manual_clock;
    use storage::repository::InMemoryRepository;

    fn bank() -> Arc<dyn QuestionBank> {
        let questions: Vec<Question> = (1..=30u64)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    TopicId::new(format!("{}.1", id % 3 + 1)).unwrap(),
                    format!("Q{id}"),
                    vec!["yes".into(), "no".into()],
                    0,
                )
                .unwrap()
            })
            .collect();
        Arc::new(InMemoryRepository::from_questions(questions).unwrap())
    }

    #[tokio::test]
    async fn seeded_service_repeats_selection() {
        let service = SessionLoopService::new(manual_clock(), bank()).with_seed(7);
        let config = SessionConfig::parse("domain-quick", Some("2")).unwrap();

        let first = service.start_session(config.clone()).await.unwrap();
        let second = service.start_session(config).await.unwrap();

        assert_eq!(first.total(), 10);
        assert_eq!(first.questions(), second.questions());
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn unknown_topic_has_no_questions() {
        let service = SessionLoopService::new(manual_clock(), bank());
        let config = SessionConfig::parse("topic", Some("9.1")).unwrap();

        let err = service.start_session(config).await.unwrap_err();
        assert!(matches!(err, SessionError::NoQuestionsAvailable { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn submit_waits_out_transition() {
        let service = SessionLoopService::new(manual_clock(), bank());
        let config = SessionConfig::parse("topic", Some("1.1")).unwrap();
        let session = RefCell::new(service.start_session(config).await.unwrap());
        let total = session.borrow().total();

        let started = tokio::time::Instant::now();
        let record = service.submit_and_advance(&session, Some(0)).await;

        assert!(record.is_some());
        assert_eq!(started.elapsed(), Duration::from_millis(300));
        assert_eq!(session.borrow().phase(), SessionPhase::Active);
        assert_eq!(session.borrow().queue_len(), total - 1);
    }
}
