use thiserror::Error;

use crate::model::ids::{DomainId, QuestionId, TopicId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question needs at least two options, got {count}")]
    TooFewOptions { count: usize },

    #[error("correct option {index} is out of range for {count} options")]
    CorrectAnswerOutOfRange { index: usize, count: usize },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question from the bank.
///
/// The correct-option index always points into `options`. Reordering the
/// options goes through [`Question::reorder_options`], which re-derives the
/// index so it keeps naming the same option text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    topic_id: TopicId,
    prompt: String,
    options: Vec<String>,
    correct_answer: usize,
    explanation: Option<String>,
    subject: Option<String>,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyPrompt` for a blank prompt,
    /// `QuestionError::TooFewOptions` with fewer than two options, and
    /// `QuestionError::CorrectAnswerOutOfRange` if `correct_answer` is not a
    /// valid option index.
    pub fn new(
        id: QuestionId,
        topic_id: TopicId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_answer: usize,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                count: options.len(),
            });
        }
        if correct_answer >= options.len() {
            return Err(QuestionError::CorrectAnswerOutOfRange {
                index: correct_answer,
                count: options.len(),
            });
        }

        Ok(Self {
            id,
            topic_id,
            prompt,
            options,
            correct_answer,
            explanation: None,
            subject: None,
        })
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: Option<String>) -> Self {
        self.explanation = explanation.filter(|text| !text.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_subject(mut self, subject: Option<String>) -> Self {
        self.subject = subject.filter(|text| !text.trim().is_empty());
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn topic_id(&self) -> &TopicId {
        &self.topic_id
    }

    #[must_use]
    pub fn domain_id(&self) -> DomainId {
        self.topic_id.domain()
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> usize {
        self.correct_answer
    }

    /// Text of the correct option.
    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_answer]
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    #[must_use]
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct_answer
    }

    /// Returns a copy whose options are laid out as `order`, where
    /// `order[new_position] = old_position`.
    ///
    /// Returns `None` when `order` is not a permutation of the option indices.
    #[must_use]
    pub fn reorder_options(&self, order: &[usize]) -> Option<Self> {
        if order.len() != self.options.len() {
            return None;
        }
        let mut seen = vec![false; order.len()];
        for &old in order {
            if old >= seen.len() || seen[old] {
                return None;
            }
            seen[old] = true;
        }

        let options = order.iter().map(|&old| self.options[old].clone()).collect();
        let correct_answer = order.iter().position(|&old| old == self.correct_answer)?;

        Some(Self {
            options,
            correct_answer,
            ..self.clone()
        })
    }
}
