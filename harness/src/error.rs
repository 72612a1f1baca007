use api::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown suite: {name}")]
    UnknownSuite { name: String },

    #[error("Suite {suite} has no check named {check}")]
    UnknownCheck { suite: String, check: String },

    #[error("Precondition not met: {message}")]
    Precondition { message: String },
}

pub type HarnessResult<T> = Result<T, HarnessError>;

impl HarnessError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }
}
