use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not signed in: no access token is available")]
    MissingCredential,
    #[error("enter a valid email address")]
    InvalidRecipient,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with HTTP {status}")]
    Status { status: u16, message: Option<String> },
    #[error("unexpected response from server: {0}")]
    Decode(String),
}

impl SyncError {
    /// Errors raised before any request was sent.
    pub fn is_precondition(&self) -> bool {
        matches!(self, SyncError::MissingCredential | SyncError::InvalidRecipient)
    }

    /// The `error` text the server put in its response body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            SyncError::Status {
                message: Some(message),
                ..
            } => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Status { status, .. } => Some(*status),
            SyncError::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
