use std::sync::Arc;

/// Error type returned by this crate.
///
/// The type is `Clone` so that every caller awaiting a coalesced operation
/// receives the same error value; `reqwest::Error` is not `Clone`, hence the
/// `Arc` in [`ExecError::Transport`].
#[derive(Clone, Debug, thiserror::Error)]
pub enum ExecError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(Arc<reqwest::Error>),
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// OAuth token exchange failure or malformed token response.
    #[error("auth error: {0}")]
    Auth(String),
    /// Request body could not be serialized.
    #[error("body error: {0}")]
    Body(String),
}

impl ExecError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Whether a retry is worth attempting.
    ///
    /// HTTP 5xx and connection-level transport failures are considered
    /// transient; everything else (4xx included) is terminal and propagates
    /// without consuming a retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::Http { status, .. } => (500..600).contains(status),
            Self::Auth(_) | Self::Body(_) => false,
        }
    }
}
