//! Access control: a credential provider and the session value handed to
//! every command handler.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No credentials supplied; pass --user/--password or set CONGREGA_USER/CONGREGA_PASSWORD")]
    MissingCredentials,
    #[error("Invalid username or password")]
    InvalidCredentials,
}

/// Anything that can vouch for a username/password pair
pub trait CredentialProvider {
    fn authenticate(&self, username: &str, password: &str) -> bool;
}

/// Fixed username -> password table, read from the `[users]` config section
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    users: BTreeMap<String, String>,
}

impl StaticCredentials {
    pub fn new(users: BTreeMap<String, String>) -> Self {
        Self { users }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.users.clone())
    }
}

impl CredentialProvider for StaticCredentials {
    fn authenticate(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|expected| expected == password)
    }
}

/// An authenticated user interaction. Created by [`Session::login`] and
/// ended by [`Session::logout`] or by dropping it.
#[derive(Debug)]
pub struct Session {
    user: String,
}

impl Session {
    pub fn login(
        provider: &dyn CredentialProvider,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self, AuthError> {
        let (Some(username), Some(password)) = (username, password) else {
            return Err(AuthError::MissingCredentials);
        };
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        if !provider.authenticate(username, password) {
            tracing::warn!(user = username, "Rejected login");
            return Err(AuthError::InvalidCredentials);
        }
        tracing::info!(user = username, "Logged in");
        Ok(Self {
            user: username.to_string(),
        })
    }

    /// Name recorded on movements created during this session
    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn logout(self) {
        tracing::info!(user = %self.user, "Logged out");
    }
}
