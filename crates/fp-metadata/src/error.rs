//! Error types for forcepack-metadata.

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
    #[error("Gateway error: {0}")]
    Gateway(String),
    #[error("Manifest error: {0}")]
    Manifest(String),
    /// The job reported a status outside the recognized vocabulary, or a
    /// known-fatal one. Carries the raw server status so new failure modes
    /// are diagnosable without re-running.
    #[error("Unexpected job status {status:?}: {}", .detail.as_deref().unwrap_or("no detail"))]
    UnexpectedStatus {
        status: String,
        detail: Option<String>,
    },
    /// The poll loop hit its configured time or attempt bound.
    #[error("Timed out polling job; last status {last_status:?}")]
    Timeout { last_status: String },
    #[error("Polling cancelled")]
    Cancelled,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Archive error: {0}")]
    Archive(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl From<forcepack_client::Error> for Error {
    fn from(err: forcepack_client::Error) -> Self {
        Error {
            kind: ErrorKind::Gateway(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<forcepack_manifest::Error> for Error {
    fn from(err: forcepack_manifest::Error) -> Self {
        Error {
            kind: ErrorKind::Manifest(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error {
            kind: ErrorKind::Archive(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error {
            kind: ErrorKind::Archive(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}
