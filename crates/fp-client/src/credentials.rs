//! Login credentials.
//!
//! Sensitive fields are redacted in Debug output to prevent accidental
//! exposure in logs.

use crate::error::{Error, ErrorKind, Result};

/// Username/password credentials for the SOAP `login` operation.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
    security_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field(
                "security_token",
                &self.security_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Credentials {
    /// Create credentials from username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            security_token: None,
        }
    }

    /// Attach the API security token required outside trusted IP ranges.
    pub fn with_security_token(mut self, token: impl Into<String>) -> Self {
        self.security_token = Some(token.into());
        self
    }

    /// Read credentials from `FORCEPACK_USERNAME`, `FORCEPACK_PASSWORD` and
    /// optional `FORCEPACK_SECURITY_TOKEN` environment variables.
    pub fn from_env() -> Result<Self> {
        let username = std::env::var("FORCEPACK_USERNAME").map_err(|_| {
            Error::new(ErrorKind::Config("FORCEPACK_USERNAME not set".to_string()))
        })?;
        let password = std::env::var("FORCEPACK_PASSWORD").map_err(|_| {
            Error::new(ErrorKind::Config("FORCEPACK_PASSWORD not set".to_string()))
        })?;
        let mut credentials = Self::new(username, password);
        if let Ok(token) = std::env::var("FORCEPACK_SECURITY_TOKEN") {
            credentials = credentials.with_security_token(token);
        }
        Ok(credentials)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password as sent to `login`: the security token, when present,
    /// is appended to the password.
    pub(crate) fn login_password(&self) -> String {
        match &self.security_token {
            Some(token) => format!("{}{}", self.password, token),
            None => self.password.clone(),
        }
    }
}
