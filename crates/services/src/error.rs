//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;

/// Errors emitted by session services.
///
/// Rejected session transitions are not errors; they are ignored and traced.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for {mode}")]
    NoQuestionsAvailable { mode: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
