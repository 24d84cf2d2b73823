use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcademyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown module tab: {0}")]
    UnknownTab(String),

    #[error("Unknown extract source: {0}")]
    UnknownSource(String),

    #[error("Unknown transformation rule: {0}")]
    UnknownRule(String),

    #[error("Unknown load strategy: {0}")]
    UnknownStrategy(String),

    #[error("Option {index} out of range for question with {len} options")]
    OptionOutOfRange { index: usize, len: usize },

    #[error("Invalid question bank: {0}")]
    InvalidQuestionBank(String),

    #[error("Server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, AcademyError>;
