use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embed: http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embed: transport error: {0}")]
    Transport(String),

    #[error("embed: HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("embed: invalid response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("embed: response has {actual} embeddings for batch of {expected}")]
    BatchSizeMismatch { expected: usize, actual: usize },
}

impl EmbedError {
    /// Returns the HTTP status code if the endpoint rejected the request.
    pub fn status(&self) -> Option<u16> {
        match self {
            EmbedError::Status { status, .. } => Some(*status),
            EmbedError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if the endpoint rejected the credential.
    pub fn is_auth(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

impl From<ureq::Error> for EmbedError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::StatusCode(status) => EmbedError::Status {
                status,
                body: String::new(),
            },
            other => EmbedError::Transport(other.to_string()),
        }
    }
}
