//! Error taxonomy shared by every component of the client.
//!
//! Each variant carries the final human-readable message: the server's
//! `detail` when one was provided, a per-operation fallback otherwise.
//! Gateway failures are translated here exactly once, so nothing above the
//! gateway ever handles a raw transport error.

use thiserror::Error;

use crate::gateway::GatewayError;

/// Everything that can go wrong on behalf of a caller.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A local pre-flight check or a server-side 400 rejected the input.
    #[error("{0}")]
    Validation(String),

    /// The operation needs a signed-in session and none exists. No request
    /// is sent in this case.
    #[error("Authentication required: no active session")]
    AuthRequired,

    /// The server rejected the credentials attached to the request (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Signed in, but not allowed to touch this resource (403).
    #[error("{0}")]
    Forbidden(String),

    /// The resource does not exist, or is not visible to this user (404).
    #[error("{0}")]
    NotFound(String),

    /// The booking state machine refused the requested move.
    #[error("{0}")]
    InvalidTransition(String),

    /// Server fault or unreachable server: 5xx, a network failure, or a
    /// success response whose body could not be read.
    #[error("{0}")]
    Server(String),
}

impl ClientError {
    /// Default translation of a gateway failure.
    ///
    /// `fallback` is the operation's own message, used whenever the server
    /// did not provide a `detail`. Operations with status-specific semantics
    /// (a cancel PATCH answering 400, for instance) match on the
    /// [`GatewayError`] themselves before falling back to this mapping.
    pub(crate) fn from_gateway(err: GatewayError, fallback: &str) -> Self {
        match err {
            GatewayError::Status { status, detail } => {
                let message = detail.unwrap_or_else(|| fallback.to_string());
                match status {
                    401 => ClientError::Unauthorized(message),
                    403 => ClientError::Forbidden(message),
                    404 => ClientError::NotFound(message),
                    400..=499 => ClientError::Validation(message),
                    _ => ClientError::Server(message),
                }
            }
            GatewayError::Transport(_) | GatewayError::Decode(_) => {
                ClientError::Server(fallback.to_string())
            }
        }
    }

    /// Stable lowercase name of the kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Validation(_) => "validation",
            ClientError::AuthRequired => "auth_required",
            ClientError::Unauthorized(_) => "unauthorized",
            ClientError::Forbidden(_) => "forbidden",
            ClientError::NotFound(_) => "not_found",
            ClientError::InvalidTransition(_) => "invalid_transition",
            ClientError::Server(_) => "server",
        }
    }
}
