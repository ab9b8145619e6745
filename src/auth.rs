use std::fmt;
use std::sync::{Arc, RwLock};

use serde::Deserialize;

use crate::{ExecError, Result};

/// Default OAuth token endpoint for the hosted service.
pub const DEFAULT_TOKEN_URL: &str = "https://services.sathub.net/oauth/token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Process-wide holder of the current bearer token.
///
/// One store is shared by the executor and every collaborator that branches
/// on auth state (e.g. tile search choosing catalog vs. legacy search-index).
/// Lifecycle: starts as `None`, mutated only through [`set_auth_token`]
/// (which [`request_auth_token`] calls on success), read freely elsewhere.
/// There is no expiry tracking beyond what the caller enforces.
///
/// Cloning is cheap and every clone shares the same token slot.
///
/// [`set_auth_token`]: AuthTokenStore::set_auth_token
/// [`request_auth_token`]: AuthTokenStore::request_auth_token
#[derive(Clone)]
pub struct AuthTokenStore {
    token: Arc<RwLock<Option<String>>>,
    http: reqwest::Client,
    token_url: String,
}

impl fmt::Debug for AuthTokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokenStore")
            .field("token", &self.current().map(|_| "<redacted>"))
            .field("token_url", &self.token_url)
            .finish()
    }
}

impl Default for AuthTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthTokenStore {
    /// Creates an empty store pointed at [`DEFAULT_TOKEN_URL`].
    pub fn new() -> Self {
        Self {
            token: Arc::new(RwLock::new(None)),
            http: reqwest::Client::new(),
            token_url: DEFAULT_TOKEN_URL.to_owned(),
        }
    }

    /// Overrides the OAuth token endpoint (deployment-specific stacks, tests).
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Sets or clears the bearer token.
    ///
    /// Clearing (`None`) returns subsequent requests to the anonymous auth
    /// bucket; cache entries and in-flight operations keyed under the old
    /// bucket are simply never matched again.
    pub fn set_auth_token(&self, token: Option<String>) {
        *self.write() = token;
    }

    /// Whether a token is currently set.
    ///
    /// Collaborators use this to pick their backend protocol before building
    /// a descriptor; this store does not care what they decide.
    pub fn is_auth_token_set(&self) -> bool {
        self.read().is_some()
    }

    /// Returns a copy of the current token.
    pub fn current(&self) -> Option<String> {
        self.read().clone()
    }

    /// Performs an OAuth client-credentials exchange and stores the result.
    ///
    /// Returns the fresh token; the store is updated before returning so the
    /// next `execute` already lands in the new auth bucket.
    pub async fn request_auth_token(&self, client_id: &str, client_secret: &str) -> Result<String> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(ExecError::transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ExecError::transport)?;
        if !status.is_success() {
            return Err(ExecError::Auth(format!(
                "token exchange failed with status {}: {body}",
                status.as_u16()
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|err| ExecError::Auth(format!("invalid token response JSON: {err}")))?;

        self.set_auth_token(Some(parsed.access_token.clone()));
        Ok(parsed.access_token)
    }

    /// Reads client credentials from `SATHUB_CLIENT_ID` / `SATHUB_CLIENT_SECRET`.
    ///
    /// Returns an error if either variable is missing or empty.
    pub fn env_credentials() -> std::result::Result<(String, String), String> {
        let client_id = std::env::var("SATHUB_CLIENT_ID")
            .map_err(|_| "missing SATHUB_CLIENT_ID environment variable".to_owned())?;
        let client_secret = std::env::var("SATHUB_CLIENT_SECRET")
            .map_err(|_| "missing SATHUB_CLIENT_SECRET environment variable".to_owned())?;
        if client_id.trim().is_empty() {
            return Err("SATHUB_CLIENT_ID is set but empty".to_owned());
        }
        if client_secret.trim().is_empty() {
            return Err("SATHUB_CLIENT_SECRET is set but empty".to_owned());
        }
        Ok((client_id, client_secret))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<String>> {
        self.token.read().unwrap_or_else(|err| err.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<String>> {
        self.token.write().unwrap_or_else(|err| err.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::AuthTokenStore;

    #[test]
    fn starts_unset_and_tracks_setter() {
        let store = AuthTokenStore::new();
        assert!(!store.is_auth_token_set());

        store.set_auth_token(Some("token-value".to_owned()));
        assert!(store.is_auth_token_set());
        assert_eq!(store.current().as_deref(), Some("token-value"));

        store.set_auth_token(None);
        assert!(!store.is_auth_token_set());
        assert_eq!(store.current(), None);
    }

    #[test]
    fn clones_share_one_slot() {
        let store = AuthTokenStore::new();
        let clone = store.clone();
        clone.set_auth_token(Some("shared".to_owned()));
        assert!(store.is_auth_token_set());
    }

    #[test]
    fn env_credentials_requires_both_variables_non_empty() {
        // Single test so the set/unset sequence is not interleaved with
        // another test touching the same variables.
        std::env::remove_var("SATHUB_CLIENT_ID");
        std::env::remove_var("SATHUB_CLIENT_SECRET");
        let err = AuthTokenStore::env_credentials().expect_err("both missing must fail");
        assert!(err.contains("SATHUB_CLIENT_ID"));

        std::env::set_var("SATHUB_CLIENT_ID", "env-client-id");
        let err = AuthTokenStore::env_credentials().expect_err("missing secret must fail");
        assert!(err.contains("SATHUB_CLIENT_SECRET"));

        std::env::set_var("SATHUB_CLIENT_SECRET", "   ");
        let err = AuthTokenStore::env_credentials().expect_err("blank secret must fail");
        assert!(err.contains("SATHUB_CLIENT_SECRET"));

        std::env::set_var("SATHUB_CLIENT_SECRET", "env-client-secret");
        assert_eq!(
            AuthTokenStore::env_credentials().expect("both set must succeed"),
            ("env-client-id".to_owned(), "env-client-secret".to_owned())
        );

        std::env::remove_var("SATHUB_CLIENT_ID");
        std::env::remove_var("SATHUB_CLIENT_SECRET");
    }

    #[test]
    fn debug_redacts_token() {
        let store = AuthTokenStore::new();
        store.set_auth_token(Some("secret-token".to_owned()));
        let debug = format!("{store:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }
}
