use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("{message}")]
    Statement {
        message: String,
        code: Option<String>,
    },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unexpected response: {0}")]
    UnexpectedShape(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}
