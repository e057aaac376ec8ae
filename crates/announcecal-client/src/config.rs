//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/announcecal/config.toml` by default.
//!
//! Credential values (`client_id`, `client_secret`) support secret references:
//! - `pass::path/in/store`: resolved via `pass show`
//! - `env::VAR_NAME`: resolved from the environment
//! - plain text: used as-is

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ClientConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for the announcecal client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google Calendar settings.
    #[cfg(feature = "google")]
    pub google: Option<GoogleSettings>,

    /// How announcement times map onto the calendar.
    pub calendar: CalendarSettings,

    /// Import behaviour.
    pub import: ImportSettings,
}

/// Calendar settings shared by every provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// IANA zone the announcement times are written in.
    pub timezone: String,

    /// Half-width, in minutes, of the duplicate lookup window.
    pub duplicate_window_minutes: i64,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            timezone: "America/Toronto".to_string(),
            duplicate_window_minutes: 1,
        }
    }
}

impl CalendarSettings {
    /// Parses the configured timezone name.
    pub fn tz(&self) -> Result<Tz, String> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| format!("invalid timezone '{}': {}", self.timezone, e))
    }

    pub fn validate(&self) -> Result<(), String> {
        self.tz()?;
        if self.duplicate_window_minutes < 0 {
            return Err(format!(
                "duplicate_window_minutes must not be negative (got {})",
                self.duplicate_window_minutes
            ));
        }
        Ok(())
    }
}

/// Import settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Delete a message once its event is on the calendar.
    pub delete_processed: bool,

    /// Add events without asking.
    pub assume_yes: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            delete_processed: true,
            assume_yes: false,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))
    }

    /// Checks every section without touching the network.
    pub fn validate(&self) -> Result<(), String> {
        self.calendar.validate()?;

        #[cfg(feature = "google")]
        if let Some(ref google) = self.google {
            if google.calendar_id.trim().is_empty() {
                return Err("Google calendar_id must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("announcecal")
    }
}

// ---------------------------------------------------------------------------
// GoogleSettings (in config.toml, including credentials)
// ---------------------------------------------------------------------------

/// Google Calendar provider settings.
///
/// Credentials (`client_id`, `client_secret`) are stored inline and support
/// secret references (`pass::…`, `env::…`).
#[cfg(feature = "google")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Calendar to check and write.
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,

    /// Path to token storage.
    pub token_path: Option<PathBuf>,
}

#[cfg(feature = "google")]
impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            calendar_id: default_calendar_id(),
            token_path: None,
        }
    }
}

#[cfg(feature = "google")]
fn default_calendar_id() -> String {
    "primary".to_string()
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Converts to provider configuration.
    ///
    /// Resolves credentials (expanding `pass::` / `env::` references) and
    /// applies the calendar timezone.
    pub fn to_provider_config(
        &self,
        calendar: &CalendarSettings,
    ) -> Result<announcecal_providers::google::GoogleConfig, String> {
        use announcecal_providers::google::GoogleConfig;

        let credentials = self.resolve_credentials()?;
        credentials.validate().map_err(|e| e.to_string())?;

        let mut config = GoogleConfig::new(credentials)
            .with_calendar_id(&self.calendar_id)
            .with_timezone(calendar.tz()?);

        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Resolves Google OAuth credentials from inline fields.
    ///
    /// Both `client_id` and `client_secret` must be set. Each value is passed
    /// through `secret::resolve()` to expand `pass::` and `env::` references.
    pub(crate) fn resolve_credentials(
        &self,
    ) -> Result<announcecal_providers::google::OAuthCredentials, String> {
        use announcecal_providers::google::OAuthCredentials;

        let raw_id = self.client_id.as_deref().ok_or_else(|| {
            format!(
                "Google credentials not found. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"YOUR_SECRET\"\n\n  \
                 Or run: announcecal auth google --credentials-file <path>",
                ClientConfig::default_path().display()
            )
        })?;

        let raw_secret = self.client_secret.as_deref().ok_or_else(|| {
            "client_secret is missing from [google] section in config.toml".to_string()
        })?;

        let resolved_id = crate::secret::resolve(raw_id)
            .map_err(|e| format!("failed to resolve client_id: {}", e))?;
        let resolved_secret = crate::secret::resolve(raw_secret)
            .map_err(|e| format!("failed to resolve client_secret: {}", e))?;

        Ok(OAuthCredentials::new(resolved_id, resolved_secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod sections {
        use super::*;

        #[test]
        fn empty_file_uses_defaults() {
            let config: ClientConfig = toml::from_str("").unwrap();
            assert_eq!(config.calendar, CalendarSettings::default());
            assert_eq!(config.import, ImportSettings::default());
            assert_eq!(config.calendar.tz().unwrap(), chrono_tz::America::Toronto);
            assert!(config.import.delete_processed);
            assert!(!config.import.assume_yes);
        }

        #[test]
        fn partial_sections_keep_other_defaults() {
            let config: ClientConfig = toml::from_str(
                r#"
[calendar]
timezone = "Europe/Paris"

[import]
assume_yes = true
"#,
            )
            .unwrap();
            assert_eq!(config.calendar.tz().unwrap(), chrono_tz::Europe::Paris);
            assert_eq!(config.calendar.duplicate_window_minutes, 1);
            assert!(config.import.assume_yes);
            assert!(config.import.delete_processed);
        }

        #[test]
        fn invalid_timezone_fails_validation() {
            let config: ClientConfig =
                toml::from_str("[calendar]\ntimezone = \"Mars/Olympus\"\n").unwrap();
            let err = config.validate().unwrap_err();
            assert!(err.contains("Mars/Olympus"));
        }

        #[test]
        fn negative_window_fails_validation() {
            let config: ClientConfig =
                toml::from_str("[calendar]\nduplicate_window_minutes = -5\n").unwrap();
            assert!(config.validate().unwrap_err().contains("negative"));
        }

        #[test]
        fn load_from_reports_path() {
            let dir = tempfile::tempdir().unwrap();
            let missing = dir.path().join("nope.toml");
            let err = ClientConfig::load_from(&missing).unwrap_err();
            assert!(err.contains("nope.toml"));

            let bad = dir.path().join("bad.toml");
            std::fs::write(&bad, "[calendar\n").unwrap();
            assert!(ClientConfig::load_from(&bad).unwrap_err().contains("parse"));
        }
    }

    #[cfg(feature = "google")]
    mod google {
        use super::*;

        #[test]
        fn resolve_credentials_plain_text() {
            let settings = GoogleSettings {
                client_id: Some("test-id.apps.googleusercontent.com".to_string()),
                client_secret: Some("test-secret".to_string()),
                ..Default::default()
            };
            let creds = settings.resolve_credentials().unwrap();
            assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
            assert_eq!(creds.client_secret, "test-secret");
        }

        #[test]
        fn resolve_credentials_env_prefix() {
            unsafe {
                std::env::set_var("_AC_TEST_CLIENT_ID", "env-id.apps.googleusercontent.com");
                std::env::set_var("_AC_TEST_CLIENT_SECRET", "env-secret");
            }

            let settings = GoogleSettings {
                client_id: Some("env::_AC_TEST_CLIENT_ID".to_string()),
                client_secret: Some("env::_AC_TEST_CLIENT_SECRET".to_string()),
                ..Default::default()
            };
            let creds = settings.resolve_credentials().unwrap();
            assert_eq!(creds.client_id, "env-id.apps.googleusercontent.com");
            assert_eq!(creds.client_secret, "env-secret");

            unsafe {
                std::env::remove_var("_AC_TEST_CLIENT_ID");
                std::env::remove_var("_AC_TEST_CLIENT_SECRET");
            }
        }

        #[test]
        fn resolve_credentials_missing_values_error() {
            let only_secret = GoogleSettings {
                client_secret: Some("secret".to_string()),
                ..Default::default()
            };
            assert!(
                only_secret
                    .resolve_credentials()
                    .unwrap_err()
                    .contains("credentials not found")
            );

            let only_id = GoogleSettings {
                client_id: Some("id.apps.googleusercontent.com".to_string()),
                ..Default::default()
            };
            assert!(only_id.resolve_credentials().unwrap_err().contains("client_secret"));

            assert!(GoogleSettings::default().resolve_credentials().is_err());
        }

        #[test]
        fn to_provider_config_applies_calendar_and_zone() {
            let config: ClientConfig = toml::from_str(
                r#"
[google]
client_id = "toml-id.apps.googleusercontent.com"
client_secret = "toml-secret"
calendar_id = "grads@example.edu"
token_path = "/tmp/announcecal-token.json"

[calendar]
timezone = "America/Vancouver"
"#,
            )
            .unwrap();
            let google = config.google.clone().unwrap();
            let provider_config = google.to_provider_config(&config.calendar).unwrap();

            assert_eq!(
                provider_config.credentials.client_id,
                "toml-id.apps.googleusercontent.com"
            );
            assert_eq!(provider_config.calendar_id, "grads@example.edu");
            assert_eq!(provider_config.timezone, chrono_tz::America::Vancouver);
            assert_eq!(
                provider_config.token_path,
                PathBuf::from("/tmp/announcecal-token.json")
            );
        }

        #[test]
        fn bare_google_section_defaults_to_primary() {
            let config: ClientConfig = toml::from_str("[google]\n").unwrap();
            let google = config.google.unwrap();
            assert_eq!(google.calendar_id, "primary");
            assert!(google.resolve_credentials().is_err());
        }

        #[test]
        fn empty_calendar_id_fails_validation() {
            let config: ClientConfig =
                toml::from_str("[google]\ncalendar_id = \"  \"\n").unwrap();
            assert!(config.validate().unwrap_err().contains("calendar_id"));
        }
    }
}
