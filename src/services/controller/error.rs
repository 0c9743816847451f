use thiserror::Error;

use crate::services::auth::CredentialError;

/// Errors from a ControllerApp call.
///
/// Status errors keep the downstream status code and body text so they can be relayed.
#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("ControllerApp error: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("ControllerApp request timed out")]
    Timeout,

    #[error("ControllerApp transport error: {0}")]
    Transport(String),

    #[error("ControllerApp response could not be decoded: {0}")]
    Decode(String),

    #[error("invalid ControllerApp url")]
    InvalidUrl,

    #[error("scan id cannot be sent as a path segment")]
    InvalidScanId,
}

impl DownstreamError {
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e.to_string())
        }
    }
}
