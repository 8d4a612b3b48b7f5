mod ids;
mod mode;
mod question;
mod settings;

pub use ids::{DomainId, IdError, QuestionId, SessionInstanceId, TopicId};

pub use mode::{ConfigError, SessionConfig, TestMode};
pub use question::{Question, QuestionError};
pub use settings::{DomainWeight, EngineSettings, ExamBlueprint, ExamSize, SettingsError};
