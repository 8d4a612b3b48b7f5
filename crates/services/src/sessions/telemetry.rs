//! Fire-and-forget session telemetry.
//!
//! The engine emits events into a [`Telemetry`] handle; whether anything is
//! recorded depends only on the handle's enabled flag, which the host flips
//! when consent changes. Nothing in the engine reads that flag back.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use quiz_core::model::{QuestionId, SessionInstanceId};

use super::exit::ExitMethod;

/// Whether a skip deferred the question or forfeited it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKind {
    /// First skip: the question moves to the back of the queue.
    Defer,
    /// Second skip: the question leaves the queue scored incorrect.
    Forfeit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    SessionStarted {
        session: SessionInstanceId,
        mode: String,
        total: usize,
    },
    AnswerSubmitted {
        session: SessionInstanceId,
        question_id: QuestionId,
        is_correct: bool,
        elapsed_ms: i64,
        selection_changes: u32,
    },
    QuestionSkipped {
        session: SessionInstanceId,
        question_id: QuestionId,
        kind: SkipKind,
    },
    ExitRequested {
        session: SessionInstanceId,
        method: ExitMethod,
    },
    ExitCancelled {
        session: SessionInstanceId,
        method: ExitMethod,
    },
    ExitConfirmed {
        session: SessionInstanceId,
        method: ExitMethod,
    },
    SessionRestarted {
        session: SessionInstanceId,
    },
    SessionFinished {
        session: SessionInstanceId,
        score: usize,
        total: usize,
        percentage: u32,
    },
    VisibilityChanged {
        session: SessionInstanceId,
        visible: bool,
    },
}

impl TelemetryEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::AnswerSubmitted { .. } => "answer_submitted",
            Self::QuestionSkipped { .. } => "question_skipped",
            Self::ExitRequested { .. } => "exit_requested",
            Self::ExitCancelled { .. } => "exit_cancelled",
            Self::ExitConfirmed { .. } => "exit_confirmed",
            Self::SessionRestarted { .. } => "session_restarted",
            Self::SessionFinished { .. } => "session_finished",
            Self::VisibilityChanged { .. } => "visibility_changed",
        }
    }
}

/// Destination for telemetry events.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: &TelemetryEvent);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn record(&self, _event: &TelemetryEvent) {}
}

/// Forwards events to `tracing` as JSON under the `telemetry` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&self, event: &TelemetryEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => tracing::info!(target: "telemetry", event = event.name(), %payload),
            Err(err) => tracing::warn!(target: "telemetry", event = event.name(), %err, "unserializable event"),
        }
    }
}

/// Keeps events in memory, for tests and hosts that batch uploads.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Removes and returns all recorded events.
    pub fn drain(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }
}

impl TelemetrySink for MemorySink {
    fn record(&self, event: &TelemetryEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }
}

/// Handle the engine emits through. Clones share the sink and enabled flag.
#[derive(Clone)]
pub struct Telemetry {
    sink: Arc<dyn TelemetrySink>,
    enabled: Arc<AtomicBool>,
}

impl Telemetry {
    /// Enabled handle over `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            sink,
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Disabled handle with nowhere to send events.
    #[must_use]
    pub fn disabled() -> Self {
        let telemetry = Self::new(Arc::new(NoopSink));
        telemetry.disable();
        telemetry
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub(crate) fn emit(&self, event: TelemetryEvent) {
        if self.is_enabled() {
            self.sink.record(&event);
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}
