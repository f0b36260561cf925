//! Error types for recon

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No response was received from the remote endpoint
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status
    #[error("{context} failed: {status} {body}")]
    HttpStatus {
        context: &'static str,
        status: u16,
        body: String,
    },

    /// A valid response that carried no usable items
    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Aborted by the caller, the timeout ceiling, or the transport
    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classified result kind, for callers that branch on the failure class
/// rather than the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    HttpStatus,
    EmptyResult,
    Parse,
    Cancelled,
    Validation,
    Config,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::EmptyResult(_) => ErrorKind::EmptyResult,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // A transport-level timeout is an abort, not a failure
        if err.is_timeout() {
            Error::Cancelled(format!("request aborted by transport: {}", err))
        } else if err.is_decode() {
            Error::Parse(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_message() {
        let err = Error::HttpStatus {
            context: "Upload",
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Upload failed: 502 bad gateway");
        assert_eq!(err.kind(), ErrorKind::HttpStatus);
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            Error::EmptyResult("no items".into()).kind(),
            ErrorKind::EmptyResult
        );
        assert_eq!(
            Error::Validation("no files".into()).kind(),
            ErrorKind::Validation
        );
        assert!(Error::Cancelled("timeout".into()).is_cancelled());
        assert!(!Error::Transport("refused".into()).is_cancelled());
    }

    #[test]
    fn test_json_error_is_parse() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
