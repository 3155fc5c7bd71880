//! Error types for forcepack-manifest.

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
    /// The path has no type segment to work with.
    #[error("Malformed metadata path: {0:?}")]
    MalformedPath(String),
    /// A type was identified but no artifact name could be extracted.
    #[error("No artifact name in path: {0:?}")]
    MissingName(String),
    /// The registry has no entry for this disk folder or API type name.
    #[error("Unknown artifact type: {0:?}")]
    UnknownType(String),
    #[error("Manifest parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}
