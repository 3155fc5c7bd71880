//! Error types for forcepack-partner.

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
    /// A field or sObject name that cannot be placed in an XML element name.
    #[error("Unsafe field name: {0:?}")]
    UnsafeFieldName(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<forcepack_client::Error> for Error {
    fn from(err: forcepack_client::Error) -> Self {
        Error {
            kind: ErrorKind::Gateway(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}
