use thiserror::Error;

pub type Result<T> = std::result::Result<T, BskyError>;

#[derive(Debug, Error)]
pub enum BskyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Actor not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl BskyError {
    /// Whether a retry could plausibly succeed. Rate limiting and server-side
    /// failures qualify; a missing actor or a malformed body never will.
    pub fn is_transient(&self) -> bool {
        match self {
            BskyError::Network(_) => true,
            BskyError::Api { status, .. } => *status == 429 || *status >= 500,
            BskyError::NotFound(_) | BskyError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for BskyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return BskyError::Parse(err.to_string());
        }
        BskyError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for BskyError {
    fn from(err: serde_json::Error) -> Self {
        BskyError::Parse(err.to_string())
    }
}
