//! OAuth session for the Google provider.
//!
//! A [`CalendarSession`] owns the token set for one token file. Callers
//! create it explicitly, hand it to [`GoogleProvider`](super::GoogleProvider),
//! and the provider refreshes and persists it as needed:
//!
//! ```text
//! load(path) ──▶ access_token() ──expired──▶ refresh(oauth) ──▶ persist()
//!                     │                                          │
//!                     └──────────────── valid ◀──────────────────┘
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::oauth::OAuthClient;

/// Seconds shaved off the advertised lifetime so refresh happens early.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A persisted OAuth token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Scopes granted when the token set was issued.
    pub scopes: Vec<String>,
    pub last_refresh: DateTime<Utc>,
}

fn expiry_from(expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs - EXPIRY_MARGIN_SECS))
}

impl TokenInfo {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry_from(expires_in_secs),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Tokens without an expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    fn apply_refresh(&mut self, access_token: String, expires_in_secs: Option<i64>) {
        self.access_token = access_token;
        self.expires_at = expiry_from(expires_in_secs);
        self.last_refresh = Utc::now();
    }
}

/// Token session backed by a JSON file.
#[derive(Debug)]
pub struct CalendarSession {
    path: PathBuf,
    tokens: RwLock<Option<TokenInfo>>,
}

impl CalendarSession {
    /// Creates a session with no tokens. Nothing is read or written.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    /// Loads the session stored at `path`. A missing file yields an empty
    /// session.
    pub fn load(path: impl Into<PathBuf>) -> ProviderResult<Self> {
        let session = Self::empty(path);
        if !session.path.exists() {
            debug!("no token file at {:?}", session.path);
            return Ok(session);
        }

        let content = fs::read_to_string(&session.path).map_err(|e| {
            ProviderError::configuration(format!("failed to read token file: {}", e))
        })?;
        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to parse token file {}: {}",
                session.path.display(),
                e
            ))
        })?;

        info!("loaded Google session from {:?}", session.path);
        *session.write() = Some(tokens);
        Ok(session)
    }

    /// Writes the current tokens to disk, readable by the owner only.
    pub fn persist(&self) -> ProviderResult<()> {
        let content = {
            let tokens = self.read();
            let tokens = tokens
                .as_ref()
                .ok_or_else(|| ProviderError::internal("no tokens to persist"))?;
            serde_json::to_string_pretty(tokens).map_err(|e| {
                ProviderError::internal(format!("failed to serialize tokens: {}", e))
            })?
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {}", e))
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                ProviderError::configuration(format!("failed to restrict token file: {}", e))
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to move token file into place: {}", e))
        })?;

        debug!("persisted Google session to {:?}", self.path);
        Ok(())
    }

    /// Replaces the token set (after a fresh authorization) and persists it.
    pub fn replace(&self, tokens: TokenInfo) -> ProviderResult<()> {
        *self.write() = Some(tokens);
        self.persist()
    }

    /// Exchanges the refresh token for a new access token, persists the
    /// session and returns the new access token.
    pub async fn refresh(&self, oauth: &OAuthClient) -> ProviderResult<String> {
        let refresh_token = self
            .read()
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
            .ok_or_else(|| {
                ProviderError::authentication(
                    "no refresh token, run 'announcecal auth google' again",
                )
            })?;

        debug!("refreshing expired access token");
        let (access_token, expires_in) = oauth.refresh_token(&refresh_token).await?;

        {
            let mut tokens = self.write();
            let tokens = tokens
                .as_mut()
                .ok_or_else(|| ProviderError::internal("session cleared during refresh"))?;
            tokens.apply_refresh(access_token.clone(), expires_in);
        }
        self.persist()?;
        Ok(access_token)
    }

    /// Forgets the tokens, in memory and on disk.
    pub fn clear(&self) -> ProviderResult<()> {
        *self.write() = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::configuration(format!("failed to remove token file: {}", e))
            })?;
            info!("cleared Google session at {:?}", self.path);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tokens(&self) -> Option<TokenInfo> {
        self.read().clone()
    }

    /// Returns the access token if it has not expired.
    pub fn access_token(&self) -> Option<String> {
        self.read()
            .as_ref()
            .filter(|t| !t.is_expired())
            .map(|t| t.access_token.clone())
    }

    /// True when the session holds a live access token or can obtain one.
    pub fn is_usable(&self) -> bool {
        self.read()
            .as_ref()
            .is_some_and(|t| !t.is_expired() || t.refresh_token.is_some())
    }

    /// True when there are no tokens or they lack one of `required_scopes`.
    pub fn needs_reauth(&self, required_scopes: &[String]) -> bool {
        self.read()
            .as_ref()
            .is_none_or(|t| !t.has_scopes(required_scopes))
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<TokenInfo>> {
        self.tokens.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<TokenInfo>> {
        self.tokens.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

    fn tokens(expires_in: Option<i64>, refresh: Option<&str>) -> TokenInfo {
        TokenInfo::new(
            "access-token",
            refresh.map(str::to_string),
            expires_in,
            vec![SCOPE.to_string()],
        )
    }

    mod token_info {
        use super::*;

        #[test]
        fn fresh_token_is_not_expired() {
            let token = tokens(Some(3600), Some("refresh"));
            assert!(!token.is_expired());
            assert!(token.expires_at.is_some());
        }

        #[test]
        fn expiry_includes_margin() {
            let token = tokens(Some(EXPIRY_MARGIN_SECS), None);
            assert!(token.is_expired());
        }

        #[test]
        fn token_without_expiry_never_expires() {
            assert!(!tokens(None, None).is_expired());
        }

        #[test]
        fn scope_check() {
            let token = tokens(None, None);
            assert!(token.has_scopes(&[SCOPE.to_string()]));
            assert!(!token.has_scopes(&["calendar.readonly".to_string()]));
        }
    }

    mod lifecycle {
        use super::*;

        #[test]
        fn load_missing_file_is_empty() {
            let dir = tempfile::tempdir().unwrap();
            let session = CalendarSession::load(dir.path().join("token.json")).unwrap();
            assert!(session.tokens().is_none());
            assert!(!session.is_usable());
            assert!(session.needs_reauth(&[SCOPE.to_string()]));
        }

        #[test]
        fn replace_persists_and_reloads() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("token.json");

            let session = CalendarSession::empty(&path);
            session.replace(tokens(Some(3600), Some("refresh"))).unwrap();
            assert!(path.exists());
            assert!(!path.with_extension("json.tmp").exists());

            let reloaded = CalendarSession::load(&path).unwrap();
            assert_eq!(reloaded.tokens(), session.tokens());
            assert_eq!(reloaded.access_token().as_deref(), Some("access-token"));
        }

        #[cfg(unix)]
        #[test]
        fn persisted_file_is_owner_only() {
            use std::os::unix::fs::PermissionsExt;
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("token.json");
            CalendarSession::empty(&path)
                .replace(tokens(None, None))
                .unwrap();
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        #[test]
        fn expired_token_with_refresh_is_usable() {
            let dir = tempfile::tempdir().unwrap();
            let mut expired = tokens(Some(3600), Some("refresh"));
            expired.expires_at = Some(Utc::now() - Duration::hours(1));

            let session = CalendarSession::empty(dir.path().join("token.json"));
            session.replace(expired).unwrap();
            assert!(session.access_token().is_none());
            assert!(session.is_usable());
        }

        #[test]
        fn clear_removes_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("token.json");
            let session = CalendarSession::empty(&path);
            session.replace(tokens(None, None)).unwrap();

            session.clear().unwrap();
            assert!(!path.exists());
            assert!(session.tokens().is_none());
        }

        #[test]
        fn corrupt_file_is_configuration_error() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("token.json");
            fs::write(&path, "{ not json").unwrap();
            let err = CalendarSession::load(&path).unwrap_err();
            assert_eq!(
                err.code(),
                crate::error::ProviderErrorCode::ConfigurationError
            );
        }

        #[test]
        fn persist_without_tokens_fails() {
            let dir = tempfile::tempdir().unwrap();
            let session = CalendarSession::empty(dir.path().join("token.json"));
            assert!(session.persist().is_err());
        }
    }
}
