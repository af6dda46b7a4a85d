//! Account lookup, registration, and highscore storage.
//!
//! The game only depends on the [`IdentityProvider`] trait. [`MemoryIdentity`]
//! keeps accounts in process for offline play and tests; networked clients
//! plug in a REST-backed provider.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::player::AccountLink;

/// Shortest password accepted on registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Account details returned by a successful login or registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub account_id: String,
    pub email: String,
    pub display_name: String,
    pub id_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    EmailExists,
    InvalidCredentials,
    WeakPassword,
    Transport(String),
    Unexpected(String),
}

impl AuthError {
    /// Map an identity-toolkit style error code (`EMAIL_EXISTS`,
    /// `INVALID_PASSWORD`, `WEAK_PASSWORD : ...`) to an error.
    pub fn from_code(code: &str) -> Self {
        let head = code.split(':').next().unwrap_or(code).trim();
        match head {
            "EMAIL_EXISTS" => Self::EmailExists,
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS"
            | "INVALID_EMAIL" | "USER_DISABLED" => Self::InvalidCredentials,
            "WEAK_PASSWORD" => Self::WeakPassword,
            other => Self::Unexpected(other.to_string()),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmailExists => write!(f, "an account with this email already exists"),
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::WeakPassword => {
                write!(f, "password must be at least {MIN_PASSWORD_LEN} characters")
            },
            Self::Transport(e) => write!(f, "identity service unreachable: {e}"),
            Self::Unexpected(e) => write!(f, "identity service error: {e}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// External account service.
pub trait IdentityProvider: Send + Sync {
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Profile, AuthError>> + Send;

    fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> impl Future<Output = Result<Profile, AuthError>> + Send;

    /// Record `score` for the linked account.
    fn submit_highscore(
        &self,
        account: &AccountLink,
        score: u64,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;
}

#[derive(Debug)]
struct StoredAccount {
    password: String,
    profile: Profile,
    highscore: u64,
}

/// In-process identity provider.
#[derive(Debug, Default)]
pub struct MemoryIdentity {
    accounts: Mutex<HashMap<String, StoredAccount>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Best score recorded for an account.
    pub fn highscore(&self, account_id: &str) -> Option<u64> {
        let accounts = self.accounts.lock().ok()?;
        accounts
            .values()
            .find(|a| a.profile.account_id == account_id)
            .map(|a| a.highscore)
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredAccount>>, AuthError> {
        self.accounts
            .lock()
            .map_err(|e| AuthError::Unexpected(e.to_string()))
    }
}

impl IdentityProvider for MemoryIdentity {
    async fn login(&self, email: &str, password: &str) -> Result<Profile, AuthError> {
        let accounts = self.lock()?;
        match accounts.get(email) {
            Some(account) if account.password == password => Ok(account.profile.clone()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Profile, AuthError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        let mut accounts = self.lock()?;
        if accounts.contains_key(email) {
            return Err(AuthError::EmailExists);
        }
        let profile = Profile {
            account_id: format!("local-{}", accounts.len() + 1),
            email: email.to_string(),
            display_name: display_name.to_string(),
            id_token: format!("token-{}", accounts.len() + 1),
        };
        accounts.insert(
            email.to_string(),
            StoredAccount {
                password: password.to_string(),
                profile: profile.clone(),
                highscore: 0,
            },
        );
        Ok(profile)
    }

    async fn submit_highscore(&self, account: &AccountLink, score: u64) -> Result<(), AuthError> {
        let mut accounts = self.lock()?;
        let stored = accounts
            .values_mut()
            .find(|a| a.profile.account_id == account.account_id)
            .ok_or(AuthError::InvalidCredentials)?;
        stored.highscore = stored.highscore.max(score);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map() {
        assert_eq!(AuthError::from_code("EMAIL_EXISTS"), AuthError::EmailExists);
        assert_eq!(
            AuthError::from_code("INVALID_PASSWORD"),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            AuthError::from_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            AuthError::WeakPassword
        );
        assert_eq!(
            AuthError::from_code("QUOTA_EXCEEDED"),
            AuthError::Unexpected("QUOTA_EXCEEDED".into())
        );
    }

    #[tokio::test]
    async fn register_then_login() {
        let id = MemoryIdentity::new();
        let created = id.register("a@b.c", "secret1", "Ann").await.unwrap();
        let logged_in = id.login("a@b.c", "secret1").await.unwrap();
        assert_eq!(created, logged_in);
        assert_eq!(logged_in.display_name, "Ann");
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let id = MemoryIdentity::new();
        id.register("a@b.c", "secret1", "Ann").await.unwrap();
        let err = id.register("a@b.c", "secret2", "Other").await.unwrap_err();
        assert_eq!(err, AuthError::EmailExists);
    }

    #[tokio::test]
    async fn weak_password_rejected() {
        let id = MemoryIdentity::new();
        let err = id.register("a@b.c", "123", "Ann").await.unwrap_err();
        assert_eq!(err, AuthError::WeakPassword);
    }

    #[tokio::test]
    async fn wrong_password_rejected() {
        let id = MemoryIdentity::new();
        id.register("a@b.c", "secret1", "Ann").await.unwrap();
        let err = id.login("a@b.c", "nope-nope").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn highscore_keeps_best() {
        let id = MemoryIdentity::new();
        let profile = id.register("a@b.c", "secret1", "Ann").await.unwrap();
        let link = AccountLink {
            account_id: profile.account_id.clone(),
            id_token: profile.id_token.clone(),
        };
        id.submit_highscore(&link, 30).await.unwrap();
        id.submit_highscore(&link, 12).await.unwrap();
        assert_eq!(id.highscore(&profile.account_id), Some(30));
    }
}
