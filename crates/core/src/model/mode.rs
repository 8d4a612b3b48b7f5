use std::fmt;

use thiserror::Error;

use crate::model::ids::{DomainId, IdError, TopicId};
use crate::model::settings::ExamSize;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("unknown test mode: {0}")]
    UnknownMode(String),

    #[error("test mode {mode} requires a target")]
    MissingTarget { mode: &'static str },

    #[error("invalid target: {0}")]
    InvalidTarget(#[from] IdError),
}

/// How questions are selected for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TestMode {
    /// Every question of one topic, in bank order.
    TopicComprehensive(TopicId),
    /// Up to a quick-session's worth of random questions from one topic.
    TopicQuick(TopicId),
    /// Up to a quick-session's worth of random questions across a domain.
    DomainQuick(DomainId),
    /// Every question of a domain, shuffled.
    DomainComprehensive(DomainId),
    FullExam,
    QuickExam,
    SuperQuickExam,
}

impl TestMode {
    /// Parses a routing-layer mode name plus its optional target.
    ///
    /// Mode names: `topic`, `topic-quick`, `domain`, `domain-quick`,
    /// `full-exam`, `quick-exam`, `super-quick-exam`. Exam modes ignore the
    /// target.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownMode` for an unrecognised name,
    /// `ConfigError::MissingTarget` when a topic/domain mode has no target and
    /// `ConfigError::InvalidTarget` when the target is blank.
    pub fn parse(mode: &str, target: Option<&str>) -> Result<Self, ConfigError> {
        let require = |mode: &'static str| target.ok_or(ConfigError::MissingTarget { mode });
        match mode.trim() {
            "topic" => Ok(Self::TopicComprehensive(TopicId::new(require("topic")?)?)),
            "topic-quick" => Ok(Self::TopicQuick(TopicId::new(require("topic-quick")?)?)),
            "domain" => Ok(Self::DomainComprehensive(DomainId::new(require("domain")?)?)),
            "domain-quick" => Ok(Self::DomainQuick(DomainId::new(require("domain-quick")?)?)),
            "full-exam" => Ok(Self::FullExam),
            "quick-exam" => Ok(Self::QuickExam),
            "super-quick-exam" => Ok(Self::SuperQuickExam),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopicComprehensive(_) => "topic",
            Self::TopicQuick(_) => "topic-quick",
            Self::DomainQuick(_) => "domain-quick",
            Self::DomainComprehensive(_) => "domain",
            Self::FullExam => "full-exam",
            Self::QuickExam => "quick-exam",
            Self::SuperQuickExam => "super-quick-exam",
        }
    }

    /// Exam preset for the stratified modes, `None` otherwise.
    #[must_use]
    pub fn exam_size(&self) -> Option<ExamSize> {
        match self {
            Self::FullExam => Some(ExamSize::Full),
            Self::QuickExam => Some(ExamSize::Quick),
            Self::SuperQuickExam => Some(ExamSize::SuperQuick),
            _ => None,
        }
    }

    #[must_use]
    pub fn topic(&self) -> Option<&TopicId> {
        match self {
            Self::TopicComprehensive(topic) | Self::TopicQuick(topic) => Some(topic),
            _ => None,
        }
    }

    #[must_use]
    pub fn domain(&self) -> Option<&DomainId> {
        match self {
            Self::DomainQuick(domain) | Self::DomainComprehensive(domain) => Some(domain),
            _ => None,
        }
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.topic(), self.domain()) {
            (Some(topic), _) => write!(f, "{} {topic}", self.as_str()),
            (_, Some(domain)) => write!(f, "{} {domain}", self.as_str()),
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Selection request for one session instance. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    mode: TestMode,
}

impl SessionConfig {
    #[must_use]
    pub fn new(mode: TestMode) -> Self {
        Self { mode }
    }

    /// # Errors
    ///
    /// See [`TestMode::parse`].
    pub fn parse(mode: &str, target: Option<&str>) -> Result<Self, ConfigError> {
        TestMode::parse(mode, target).map(Self::new)
    }

    #[must_use]
    pub fn mode(&self) -> &TestMode {
        &self.mode
    }
}
