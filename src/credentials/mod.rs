//! Access token storage
//!
//! The token is resolved from the environment first and the OS keychain
//! second:
//! - macOS: Keychain
//! - Linux: kernel keyutils
//! - Windows: Credential Manager
//!
//! Only the HTTP transport ever reads the secret.

use std::fmt;

use zeroize::Zeroizing;

/// Environment variable consulted before the keychain
pub const ACCESS_TOKEN_ENV: &str = "GRAPHPOST_ACCESS_TOKEN";

/// Keychain service name
pub const KEYCHAIN_SERVICE: &str = "graphpost";

/// Credential errors
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("no access token found: set GRAPHPOST_ACCESS_TOKEN or run `graphpost credentials store`")]
    NotFound,

    #[error("access token must not be empty")]
    Empty,

    #[error("keychain error: {0}")]
    Keychain(String),
}

impl From<keyring::Error> for CredentialError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoEntry => CredentialError::NotFound,
            other => CredentialError::Keychain(other.to_string()),
        }
    }
}

/// Bearer token for the Graph API. Wiped from memory on drop.
#[derive(Clone)]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***REDACTED***)")
    }
}

/// Resolve the token for `account`: environment first, then keychain.
pub fn resolve_access_token(account: &str) -> Result<AccessToken, CredentialError> {
    if let Some(token) = token_from_env(std::env::var(ACCESS_TOKEN_ENV).ok()) {
        tracing::debug!("using access token from environment");
        return Ok(token);
    }

    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, account)?;
    let secret = Zeroizing::new(entry.get_password()?);
    if secret.trim().is_empty() {
        return Err(CredentialError::NotFound);
    }
    tracing::debug!(account = %account, "using access token from keychain");
    Ok(AccessToken::new(secret.trim()))
}

/// Store a token in the keychain under `account`.
pub fn store_access_token(account: &str, token: &str) -> Result<(), CredentialError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(CredentialError::Empty);
    }
    keyring::Entry::new(KEYCHAIN_SERVICE, account)?.set_password(token)?;
    Ok(())
}

/// Remove the keychain entry for `account`. Missing entries are not an error.
pub fn clear_access_token(account: &str) -> Result<(), CredentialError> {
    match keyring::Entry::new(KEYCHAIN_SERVICE, account)?.delete_password() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn token_from_env(value: Option<String>) -> Option<AccessToken> {
    let value = Zeroizing::new(value?);
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(AccessToken::new(trimmed))
    }
}
