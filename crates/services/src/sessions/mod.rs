mod exit;
mod machine;
mod navigation;
mod progress;
mod results;
mod telemetry;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use exit::{ExitCallback, ExitMethod, ExitModalCopy, ExitOutcome};
pub use machine::{RejectReason, SessionPhase, TestSession};
pub use navigation::{
    NavigationAttempt, NavigationDecision, NavigationRegistry, Navigator,
};
pub use progress::SessionProgress;
pub use results::{AnswerStatus, AnsweredRecord, BreakdownEntry, SessionResults, percentage};
pub use telemetry::{
    MemorySink, NoopSink, SkipKind, Telemetry, TelemetryEvent, TelemetrySink, TracingSink,
};
pub use view::{SessionView, SkipLabel};
pub use workflow::SessionLoopService;
