//! Client error type
//!
//! One error enum for the whole crate. Authentication failures carry the
//! redirect target the embedding shell must execute; everything else is
//! surfaced to the caller with the server's own wording where available.

use thiserror::Error;

use crate::config::RedirectTarget;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The session is no longer valid. The gateway has already cleared the
    /// local credential; the embedder navigates to `redirect`.
    #[error("Authentication required")]
    Unauthorized { redirect: RedirectTarget },

    /// Business or validation error reported by the backend. `message` is
    /// the server-provided text, verbatim.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    /// Response body did not match the expected shape for the endpoint.
    #[error("Unexpected response from {endpoint}: {detail}")]
    Decode { endpoint: String, detail: String },

    /// Operation not offered under the configured authentication scheme.
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Whether this error ends the session (global redirect policy applies).
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Whether this is a transport-level failure, as opposed to a response
    /// the server actually produced. Transport failures never force a
    /// logout under the token scheme.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Timeout)
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedirectTarget;

    #[test]
    fn test_error_classification() {
        let auth = ApiError::Unauthorized {
            redirect: RedirectTarget::LocalLogin("/login".to_string()),
        };
        assert!(auth.is_auth());
        assert!(!auth.is_transport());

        assert!(ApiError::Timeout.is_transport());
        assert!(ApiError::Network("connection refused".to_string()).is_transport());
        assert!(!ApiError::Api { status: 409, message: "folder not empty".to_string() }.is_transport());
    }
}
