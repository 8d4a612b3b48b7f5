//! JSON question bank files.
//!
//! A bank file is either a bare array of question records or an object with a
//! `questions` array:
//!
//! ```json
//! { "questions": [
//!   { "id": 1, "topic_id": "1.1", "question": "...",
//!     "options": ["a", "b"], "correct_answer": 0 }
//! ] }
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::repository::{InMemoryRepository, QuestionRecord, StorageError};

#[derive(Deserialize)]
#[serde(untagged)]
enum BankFile {
    Wrapped { questions: Vec<QuestionRecord> },
    Bare(Vec<QuestionRecord>),
}

impl BankFile {
    fn into_records(self) -> Vec<QuestionRecord> {
        match self {
            BankFile::Wrapped { questions } | BankFile::Bare(questions) => questions,
        }
    }
}

/// Parse a bank from JSON text.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed JSON,
/// `StorageError::InvalidQuestion` for a record that fails validation and
/// `StorageError::Conflict` for duplicate ids.
pub fn parse_bank(json: &str) -> Result<InMemoryRepository, StorageError> {
    let file: BankFile =
        serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))?;
    let questions = file
        .into_records()
        .into_iter()
        .map(QuestionRecord::into_question)
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(count = questions.len(), "parsed question bank");
    InMemoryRepository::from_questions(questions)
}

/// Load a bank from a JSON file on disk.
///
/// # Errors
///
/// Returns `StorageError::Connection` if the file cannot be read, otherwise
/// the same errors as [`parse_bank`].
pub fn load_bank(path: impl AsRef<Path>) -> Result<InMemoryRepository, StorageError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| StorageError::Connection(format!("{}: {e}", path.display())))?;
    parse_bank(&raw)
}
