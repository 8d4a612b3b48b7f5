use async_trait::async_trait;
use quiz_core::model::{DomainId, Question, QuestionError, QuestionId, TopicId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by question bank adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("duplicate question id {0}")]
    Conflict(QuestionId),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid question {id}: {source}")]
    InvalidQuestion {
        id: QuestionId,
        #[source]
        source: QuestionError,
    },
}

/// Persisted shape for a question.
///
/// This mirrors the domain `Question` so adapters can serialize/deserialize
/// without leaking storage concerns into the domain layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub topic_id: TopicId,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: question.id(),
            topic_id: question.topic_id().clone(),
            question: question.prompt().to_owned(),
            options: question.options().to_vec(),
            correct_answer: question.correct_answer(),
            explanation: question.explanation().map(str::to_owned),
            subject: question.subject().map(str::to_owned),
        }
    }

    /// Convert the record back into a domain `Question`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidQuestion` if the record fails validation.
    pub fn into_question(self) -> Result<Question, StorageError> {
        let id = self.id;
        let question = Question::new(
            id,
            self.topic_id,
            self.question,
            self.options,
            self.correct_answer,
        )
        .map_err(|source| StorageError::InvalidQuestion { id, source })?;

        Ok(question
            .with_explanation(self.explanation)
            .with_subject(self.subject))
    }
}

/// Read access to the question corpus.
///
/// Every listing preserves bank order, which is the order topic-comprehensive
/// sessions deliver questions in.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Persist or replace a question, keeping its bank position on replace.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// All questions in bank order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be read.
    async fn all_questions(&self) -> Result<Vec<Question>, StorageError>;

    /// Questions tagged with exactly `topic`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be read.
    async fn questions_for_topic(&self, topic: &TopicId) -> Result<Vec<Question>, StorageError> {
        Ok(self
            .all_questions()
            .await?
            .into_iter()
            .filter(|q| q.topic_id() == topic)
            .collect())
    }

    /// Questions from every topic of `domain`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be read.
    async fn questions_for_domain(
        &self,
        domain: &DomainId,
    ) -> Result<Vec<Question>, StorageError> {
        Ok(self
            .all_questions()
            .await?
            .into_iter()
            .filter(|q| domain.contains(q.topic_id()))
            .collect())
    }

    /// Distinct topics in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be read.
    async fn topics(&self) -> Result<Vec<TopicId>, StorageError> {
        let mut topics: Vec<TopicId> = Vec::new();
        for question in self.all_questions().await? {
            if !topics.contains(question.topic_id()) {
                topics.push(question.topic_id().clone());
            }
        }
        Ok(topics)
    }

    /// Question count per domain, ordered by domain id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be read.
    async fn domain_counts(&self) -> Result<BTreeMap<DomainId, usize>, StorageError> {
        let mut counts = BTreeMap::new();
        for question in self.all_questions().await? {
            *counts.entry(question.domain_id()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

/// Simple in-memory question bank for tests and bundled corpora.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<Vec<Question>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            questions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Build a bank from questions in order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if two questions share an id.
    pub fn from_questions(
        questions: impl IntoIterator<Item = Question>,
    ) -> Result<Self, StorageError> {
        let mut ordered: Vec<Question> = Vec::new();
        for question in questions {
            if ordered.iter().any(|q| q.id() == question.id()) {
                return Err(StorageError::Conflict(question.id()));
            }
            ordered.push(question);
        }
        Ok(Self {
            questions: Arc::new(Mutex::new(ordered)),
        })
    }

    /// Number of questions currently held.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }
}

#[async_trait]
impl QuestionBank for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.iter_mut().find(|q| q.id() == question.id()) {
            Some(existing) => *existing = question.clone(),
            None => guard.push(question.clone()),
        }
        Ok(())
    }

    async fn all_questions(&self) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}

/// Question bank behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionBank>,
}

impl Storage {
    #[must_use]
    pub fn from_bank(bank: impl QuestionBank + 'static) -> Self {
        Self {
            questions: Arc::new(bank),
        }
    }
}
