//! Credential Guard
//!
//! Fails fast, before any network I/O, when the process has no access key
//! or secret key to sign storage requests with.

use std::env;
use std::fmt;

use crate::types::ConfigurationError;

pub const ACCESS_KEY_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";

/// Access credentials for the storage service. Read-only once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Read both credentials from the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| env::var_os(name).map(|v| v.to_string_lossy().into_owned()))
    }

    /// Resolve both credentials through `lookup`.
    ///
    /// Only an absent value fails; an empty string counts as present. The
    /// access key is checked first, so it is the one reported when both are
    /// missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_key =
            lookup(ACCESS_KEY_VAR).ok_or(ConfigurationError::MissingVariable(ACCESS_KEY_VAR))?;
        let secret_key =
            lookup(SECRET_KEY_VAR).ok_or(ConfigurationError::MissingVariable(SECRET_KEY_VAR))?;

        Ok(Self {
            access_key,
            secret_key,
        })
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Validate that both credential variables are set, discarding the values.
pub fn validate() -> Result<(), ConfigurationError> {
    Credentials::from_env().map(|_| ())
}
