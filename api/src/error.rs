use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Cannot connect to {url}")]
    Unreachable { url: String },

    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Response is missing field `{field}`")]
    MissingField { field: String },

    #[error("Not authenticated")]
    NotAuthenticated,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn unexpected_status(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        // Error pages can be whole HTML documents.
        if body.len() > 300 {
            let mut cut = 300;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push_str("...");
        }
        Self::UnexpectedStatus { status, body }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}
