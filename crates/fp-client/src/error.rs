//! Error types for forcepack-client.

use crate::transport::SoapFault;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Login failed: {0}")]
    LoginFailed(String),
    /// The server answered an operation with a SOAP fault other than an
    /// invalid-session signal.
    #[error("{operation} failed: {fault}")]
    OperationFault {
        operation: String,
        fault: SoapFault,
    },
    /// The retried call after a session renewal was rejected again.
    #[error("{operation} failed after session renewal: {fault}")]
    SessionRetryExhausted {
        operation: String,
        fault: SoapFault,
    },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// The SOAP fault attached to this error, if the server produced one.
    pub fn fault(&self) -> Option<&SoapFault> {
        match &self.kind {
            ErrorKind::OperationFault { fault, .. }
            | ErrorKind::SessionRetryExhausted { fault, .. } => Some(fault),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error {
            kind: ErrorKind::Http(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}
