use thiserror::Error;

use crate::protocol::framing::FrameError;
use crate::protocol::response::StatusCode;

/// Command-level failures, each mapping to a status code and a
/// client-visible body. Underlying I/O details are logged, not leaked.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("{0}")]
    MalformedCommand(String),

    #[error("Access denied: Invalid path")]
    PathEscape,

    #[error("{0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotSupported,

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Too Many Requests")]
    RateLimited,

    #[error("{0}")]
    IoFailure(String),
}

impl ProtocolError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProtocolError::MalformedCommand(_) => StatusCode::BadRequest,
            ProtocolError::PathEscape => StatusCode::Forbidden,
            ProtocolError::NotFound(_) => StatusCode::NotFound,
            ProtocolError::MethodNotSupported => StatusCode::MethodNotAllowed,
            ProtocolError::RequestTimeout => StatusCode::RequestTimeout,
            ProtocolError::RateLimited => StatusCode::TooManyRequests,
            ProtocolError::IoFailure(_) => StatusCode::InternalServerError,
        }
    }
}

impl From<FrameError> for ProtocolError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::UnknownCommand(_) => ProtocolError::MethodNotSupported,
            FrameError::MissingContentLength => {
                ProtocolError::MalformedCommand("Content-Length header is required".to_string())
            }
            FrameError::InvalidContentLength => {
                ProtocolError::MalformedCommand("Invalid Content-Length header".to_string())
            }
            FrameError::LineTooLong | FrameError::HeadersTooLarge => {
                ProtocolError::MalformedCommand("Request too large".to_string())
            }
            FrameError::InvalidUtf8 => {
                ProtocolError::MalformedCommand("Invalid request format".to_string())
            }
        }
    }
}
