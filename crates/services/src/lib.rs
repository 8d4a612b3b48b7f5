#![forbid(unsafe_code)]

pub mod error;
pub mod selection;
pub mod sessions;

pub use quiz_core::Clock;

pub use error::SessionError;
pub use selection::{Sampler, SelectionPlan};

pub use sessions::{
    AnsweredRecord, ExitMethod, ExitOutcome, NavigationRegistry, SessionLoopService,
    SessionPhase, SessionResults, SkipKind, Telemetry, TelemetryEvent, TelemetrySink,
    TestSession,
};
