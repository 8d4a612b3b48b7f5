use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};
use std::fmt;

use quiz_core::Clock;
use quiz_core::model::{Question, SessionConfig, SessionInstanceId};

use crate::error::SessionError;
use super::exit::{ExitCallback, ExitMethod, ExitOutcome, PendingExit};
use super::progress::SessionProgress;
use super::results::{AnsweredRecord, SessionResults, percentage};
use super::telemetry::{SkipKind, Telemetry, TelemetryEvent};

//
// ─── PHASES ────────────────────────────────────────────────────────────────────
//

/// Lifecycle phase of a test session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Waiting for a submit or skip on the queue head.
    Active,
    /// A submitted answer is animating out; input is rejected until
    /// `complete_transition` runs.
    Transitioning,
    /// The exit confirmation modal is up; progress is frozen.
    ExitPending,
    /// Exit confirmed; a deferred navigation runs after `complete_exit`.
    Exiting,
    /// Every question has left the queue.
    Results,
    /// Exited or torn down. Nothing is accepted anymore.
    Terminated,
}

/// Why a transition was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    WrongPhase(SessionPhase),
    EmptyQueue,
    NoSelection,
    OptionOutOfRange { index: usize, count: usize },
    ExitAlreadyPending,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at a test.
///
/// Owns the delivery queue, score, skip marks and answered log. The question
/// list is fixed at construction and reused verbatim by [`TestSession::restart`].
///
/// Every transition that does not apply in the current state is a silent
/// no-op: it returns `None`/`false` and logs the reason at debug level.
pub struct TestSession {
    id: SessionInstanceId,
    config: SessionConfig,
    questions: Vec<Question>,
    queue: VecDeque<usize>,
    score: usize,
    skip_marks: HashSet<usize>,
    records: Vec<AnsweredRecord>,
    phase: SessionPhase,
    resume_phase: SessionPhase,
    pending_exit: Option<PendingExit>,
    exiting: Option<ExitCallback>,
    transition_due: bool,
    default_leave: Option<ExitCallback>,
    selected: Option<usize>,
    selection_changes: u32,
    shown_at: DateTime<Utc>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    clock: Clock,
    telemetry: Telemetry,
}

impl TestSession {
    /// Start a session over an already selected and shuffled question list.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestionsAvailable` if `questions` is empty.
    pub fn new(
        config: SessionConfig,
        questions: Vec<Question>,
        clock: Clock,
        telemetry: Telemetry,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestionsAvailable {
                mode: config.mode().to_string(),
            });
        }

        let now = clock.now();
        let session = Self {
            id: SessionInstanceId::generate(),
            queue: (0..questions.len()).collect(),
            config,
            questions,
            score: 0,
            skip_marks: HashSet::new(),
            records: Vec::new(),
            phase: SessionPhase::Active,
            resume_phase: SessionPhase::Active,
            pending_exit: None,
            exiting: None,
            transition_due: false,
            default_leave: None,
            selected: None,
            selection_changes: 0,
            shown_at: now,
            started_at: now,
            completed_at: None,
            clock,
            telemetry,
        };

        tracing::info!(
            session = %session.id,
            mode = %session.config.mode(),
            total = session.total(),
            "test session started"
        );
        session.telemetry.emit(TelemetryEvent::SessionStarted {
            session: session.id,
            mode: session.config.mode().to_string(),
            total: session.total(),
        });
        Ok(session)
    }

    /// Action run by `confirm_exit` when the exit has no deferred navigation.
    #[must_use]
    pub fn with_default_leave(mut self, leave: impl FnOnce() + 'static) -> Self {
        self.default_leave = Some(Box::new(leave));
        self
    }

    #[must_use]
    pub fn id(&self) -> SessionInstanceId {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Number of questions that have left the queue.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn records(&self) -> &[AnsweredRecord] {
        &self.records
    }

    /// Question indices still waiting, head first.
    #[must_use]
    pub fn queue(&self) -> Vec<usize> {
        self.queue.iter().copied().collect()
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.queue.front().copied()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().and_then(|i| self.questions.get(i))
    }

    #[must_use]
    pub fn is_skip_marked(&self, index: usize) -> bool {
        self.skip_marks.contains(&index)
    }

    /// True when the next skip would forfeit the queue head.
    #[must_use]
    pub fn head_is_skip_marked(&self) -> bool {
        self.current_index().is_some_and(|i| self.is_skip_marked(i))
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<usize> {
        self.selected
    }

    /// Method of the exit awaiting confirmation, if any.
    #[must_use]
    pub fn pending_exit_method(&self) -> Option<ExitMethod> {
        self.pending_exit.as_ref().map(|exit| exit.method)
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Results
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.phase == SessionPhase::Terminated
    }

    /// Navigation away must go through the exit protocol in these phases.
    #[must_use]
    pub fn should_intercept_navigation(&self) -> bool {
        matches!(
            self.phase,
            SessionPhase::Active | SessionPhase::Transitioning | SessionPhase::ExitPending
        )
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.total(),
            answered: self.answered_count(),
            remaining: self.queue.len(),
            is_complete: self.is_complete(),
        }
    }

    /// Final results, available once the session reaches `Results`.
    #[must_use]
    pub fn results(&self) -> Option<SessionResults> {
        self.is_complete()
            .then(|| SessionResults::aggregate(self.score, &self.questions, &self.records))
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Highlight an option on the current question without submitting it.
    pub fn select_option(&mut self, option: usize) -> bool {
        if let Err(reason) = self.check_input() {
            return self.reject("select_option", reason);
        }
        if let Err(reason) = self.check_option(option) {
            return self.reject("select_option", reason);
        }
        if self.selected != Some(option) {
            self.selected = Some(option);
            self.selection_changes = self.selection_changes.saturating_add(1);
        }
        true
    }

    /// Submit `selected` for the queue head and enter `Transitioning`.
    ///
    /// Score and the answered log are updated immediately; the head leaves
    /// the queue when `complete_transition` runs.
    pub fn submit(&mut self, selected: Option<usize>) -> Option<AnsweredRecord> {
        if let Err(reason) = self.check_input() {
            self.reject("submit", reason);
            return None;
        }
        let Some(option) = selected else {
            self.reject("submit", RejectReason::NoSelection);
            return None;
        };
        if let Err(reason) = self.check_option(option) {
            self.reject("submit", reason);
            return None;
        }
        let (index, question) = self.head()?;

        let record = AnsweredRecord {
            question_index: index,
            question_id: question.id(),
            selected_option: Some(option),
            is_correct: question.is_correct(option),
        };
        if record.is_correct {
            self.score += 1;
        }
        self.records.push(record);

        let elapsed = self.clock.elapsed_since(self.shown_at);
        self.telemetry.emit(TelemetryEvent::AnswerSubmitted {
            session: self.id,
            question_id: record.question_id,
            is_correct: record.is_correct,
            elapsed_ms: elapsed.num_milliseconds(),
            selection_changes: self.selection_changes,
        });

        self.selected = Some(option);
        self.phase = SessionPhase::Transitioning;
        self.transition_due = false;
        Some(record)
    }

    /// Submit whatever `select_option` last highlighted.
    pub fn submit_selection(&mut self) -> Option<AnsweredRecord> {
        self.submit(self.selected)
    }

    /// Finish the post-submit animation window: drop the queue head and move
    /// on to the next question or to `Results`.
    ///
    /// While the exit modal is up the completion is held back and applied
    /// when the exit is cancelled.
    pub fn complete_transition(&mut self) -> bool {
        match self.phase {
            SessionPhase::Transitioning => {
                self.queue.pop_front();
                self.after_removal();
                true
            }
            SessionPhase::ExitPending if self.resume_phase == SessionPhase::Transitioning => {
                self.transition_due = true;
                false
            }
            phase => self.reject("complete_transition", RejectReason::WrongPhase(phase)),
        }
    }

    /// Skip the queue head.
    ///
    /// The first skip of a question defers it to the back of the queue. A
    /// second skip forfeits it: it leaves the queue scored incorrect.
    pub fn skip(&mut self) -> Option<SkipKind> {
        if let Err(reason) = self.check_input() {
            self.reject("skip", reason);
            return None;
        }
        let (index, question) = self.head()?;
        let question_id = question.id();

        let kind = if self.skip_marks.insert(index) {
            self.queue.rotate_left(1);
            self.clear_selection();
            SkipKind::Defer
        } else {
            self.records.push(AnsweredRecord {
                question_index: index,
                question_id,
                selected_option: None,
                is_correct: false,
            });
            self.queue.pop_front();
            SkipKind::Forfeit
        };

        self.telemetry.emit(TelemetryEvent::QuestionSkipped {
            session: self.id,
            question_id,
            kind,
        });
        if kind == SkipKind::Forfeit {
            self.after_removal();
        }
        Some(kind)
    }

    /// Start over with the same question list, option order included.
    pub fn restart(&mut self) -> bool {
        match self.phase {
            SessionPhase::Active | SessionPhase::Results => {}
            phase => return self.reject("restart", RejectReason::WrongPhase(phase)),
        }

        self.queue = (0..self.questions.len()).collect();
        self.score = 0;
        self.skip_marks.clear();
        self.records.clear();
        self.completed_at = None;
        self.phase = SessionPhase::Active;
        self.clear_selection();

        tracing::info!(session = %self.id, "test session restarted");
        self.telemetry
            .emit(TelemetryEvent::SessionRestarted { session: self.id });
        true
    }

    //
    // ─── EXIT PROTOCOL ─────────────────────────────────────────────────────────
    //

    /// Put up the exit confirmation. `callback` is the navigation to perform
    /// if the user confirms.
    pub fn request_exit(&mut self, method: ExitMethod, callback: Option<ExitCallback>) -> bool {
        match self.phase {
            SessionPhase::Active | SessionPhase::Transitioning => {}
            SessionPhase::ExitPending => {
                return self.reject("request_exit", RejectReason::ExitAlreadyPending);
            }
            phase => return self.reject("request_exit", RejectReason::WrongPhase(phase)),
        }

        self.resume_phase = self.phase;
        self.phase = SessionPhase::ExitPending;
        self.pending_exit = Some(PendingExit { method, callback });

        tracing::debug!(session = %self.id, %method, "exit requested");
        self.telemetry.emit(TelemetryEvent::ExitRequested {
            session: self.id,
            method,
        });
        true
    }

    /// Dismiss the exit confirmation and resume where the session was.
    pub fn cancel_exit(&mut self) -> bool {
        if self.phase != SessionPhase::ExitPending {
            return self.reject("cancel_exit", RejectReason::WrongPhase(self.phase));
        }
        let Some(exit) = self.pending_exit.take() else {
            return false;
        };

        self.phase = self.resume_phase;
        self.telemetry.emit(TelemetryEvent::ExitCancelled {
            session: self.id,
            method: exit.method,
        });

        if self.phase == SessionPhase::Transitioning && self.transition_due {
            self.transition_due = false;
            self.complete_transition();
        }
        true
    }

    /// Accept the exit.
    ///
    /// With a deferred navigation the session enters `Exiting` and the
    /// navigation runs from `complete_exit`; otherwise the default leave
    /// action runs now and the session terminates.
    pub fn confirm_exit(&mut self) -> Option<ExitOutcome> {
        if self.phase != SessionPhase::ExitPending {
            self.reject("confirm_exit", RejectReason::WrongPhase(self.phase));
            return None;
        }
        let exit = self.pending_exit.take()?;

        tracing::info!(session = %self.id, method = %exit.method, "exit confirmed");
        self.telemetry.emit(TelemetryEvent::ExitConfirmed {
            session: self.id,
            method: exit.method,
        });

        match exit.callback {
            Some(callback) => {
                self.exiting = Some(callback);
                self.phase = SessionPhase::Exiting;
                Some(ExitOutcome::Deferred)
            }
            None => {
                let leave = self.default_leave.take();
                self.terminate();
                if let Some(leave) = leave {
                    leave();
                }
                Some(ExitOutcome::Left)
            }
        }
    }

    /// Run the deferred navigation once the exit animation has played.
    pub fn complete_exit(&mut self) -> bool {
        if self.phase != SessionPhase::Exiting {
            return self.reject("complete_exit", RejectReason::WrongPhase(self.phase));
        }
        let callback = self.exiting.take();
        self.terminate();
        if let Some(callback) = callback {
            callback();
        }
        true
    }

    /// Tear the session down. Pending callbacks are dropped without running.
    pub fn terminate(&mut self) {
        if self.phase == SessionPhase::Terminated {
            return;
        }
        self.phase = SessionPhase::Terminated;
        self.pending_exit = None;
        self.exiting = None;
        self.default_leave = None;
        self.transition_due = false;
        tracing::debug!(session = %self.id, "test session terminated");
    }

    /// Tab visibility change. Only reported to telemetry.
    pub fn visibility_changed(&self, visible: bool) {
        self.telemetry.emit(TelemetryEvent::VisibilityChanged {
            session: self.id,
            visible,
        });
    }

    //
    // ─── HELPERS ───────────────────────────────────────────────────────────────
    //

    fn head(&self) -> Option<(usize, &Question)> {
        let index = self.current_index()?;
        self.questions.get(index).map(|q| (index, q))
    }

    fn check_input(&self) -> Result<(), RejectReason> {
        if self.phase != SessionPhase::Active {
            return Err(RejectReason::WrongPhase(self.phase));
        }
        if self.queue.is_empty() {
            return Err(RejectReason::EmptyQueue);
        }
        Ok(())
    }

    fn check_option(&self, option: usize) -> Result<(), RejectReason> {
        let count = self.current_question().map_or(0, |q| q.options().len());
        if option >= count {
            return Err(RejectReason::OptionOutOfRange {
                index: option,
                count,
            });
        }
        Ok(())
    }

    fn clear_selection(&mut self) {
        self.selected = None;
        self.selection_changes = 0;
        self.shown_at = self.clock.now();
    }

    fn after_removal(&mut self) {
        self.clear_selection();
        if !self.queue.is_empty() {
            self.phase = SessionPhase::Active;
            return;
        }

        self.phase = SessionPhase::Results;
        self.completed_at = Some(self.clock.now());
        let percentage = percentage(self.score, self.total());
        tracing::info!(
            session = %self.id,
            score = self.score,
            total = self.total(),
            percentage,
            "test session finished"
        );
        self.telemetry.emit(TelemetryEvent::SessionFinished {
            session: self.id,
            score: self.score,
            total: self.total(),
            percentage,
        });
    }

    fn reject(&self, op: &'static str, reason: RejectReason) -> bool {
        tracing::debug!(session = %self.id, op, ?reason, "ignored session transition");
        if cfg!(all(debug_assertions, feature = "strict-transitions")) {
            panic!("rejected session transition {op}: {reason:?}");
        }
        false
    }
}

impl fmt::Debug for TestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSession")
            .field("id", &self.id)
            .field("mode", self.config.mode())
            .field("questions_len", &self.questions.len())
            .field("queue", &self.queue)
            .field("score", &self.score)
            .field("records_len", &self.records.len())
            .field("phase", &self.phase)
            .field("pending_exit", &self.pending_exit)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
