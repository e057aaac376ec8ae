//! Authentication commands.

use std::path::{Path, PathBuf};

use announcecal_providers::google::{CalendarSession, GoogleProvider, OAuthCredentials};
use tracing::{info, warn};

use crate::config::{ClientConfig, GoogleSettings};
use crate::error::{ClientError, ClientResult};

/// Run the Google authentication flow.
///
/// Resolves credentials from CLI flags, a `--credentials-file`, or
/// `config.toml`, then runs the OAuth 2.0 PKCE flow and persists the
/// session.
///
/// Credentials that came from the command line are written back to
/// `config_path` so later imports find them.
pub async fn google(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    force: bool,
    config: &ClientConfig,
    config_path: &Path,
) -> ClientResult<()> {
    let (credentials, source) = resolve_google_credentials(
        client_id,
        client_secret,
        credentials_file,
        config.google.as_ref(),
        config_path,
    )?;

    // Same settings as the import path, with the resolved credentials.
    let settings = GoogleSettings {
        client_id: Some(credentials.client_id.clone()),
        client_secret: Some(credentials.client_secret.clone()),
        ..config.google.clone().unwrap_or_default()
    };
    let google_config = settings
        .to_provider_config(&config.calendar)
        .map_err(|e| ClientError::Config(format!("invalid Google settings: {}", e)))?;

    let session = CalendarSession::load(&google_config.token_path)?;
    let provider = GoogleProvider::new(google_config, session)?;

    if !provider.needs_reauth() && !force {
        save_credentials(config_path, &credentials, source);
        println!("Already authenticated with Google Calendar.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("Starting Google Calendar authentication...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    provider.authenticate().await?;
    save_credentials(config_path, &credentials, source);

    info!(token_path = %provider.session().path().display(), "Google authentication successful");
    println!();
    println!("Authentication successful!");
    println!(
        "Your Google Calendar session was saved to {}.",
        provider.session().path().display()
    );
    println!();
    println!("You can now run: announcecal import <FILES>...");

    Ok(())
}

/// Where the credentials were resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CredentialSource {
    /// `--client-id`/`--client-secret` or `--credentials-file`
    Cli,
    /// Already in config.toml
    Config,
}

/// Persists command-line credentials; failures are only reported since the
/// session itself is already usable.
fn save_credentials(path: &Path, credentials: &OAuthCredentials, source: CredentialSource) {
    if source == CredentialSource::Config {
        return;
    }
    match write_credentials(path, credentials) {
        Ok(()) => {
            info!(path = %path.display(), "credentials saved");
            println!("Credentials saved to {}", path.display());
        }
        Err(e) => warn!(path = %path.display(), error = %e, "could not save credentials"),
    }
}

/// Writes credentials under `[google]`, keeping the rest of the file
/// (comments and formatting included).
fn write_credentials(path: &Path, credentials: &OAuthCredentials) -> ClientResult<()> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let updated = upsert_google_credentials(&content, credentials).map_err(|e| {
        ClientError::Config(format!("could not parse {}: {}", path.display(), e))
    })?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, updated)?;
    Ok(())
}

fn upsert_google_credentials(
    content: &str,
    credentials: &OAuthCredentials,
) -> Result<String, toml_edit::TomlError> {
    let mut doc = content.parse::<toml_edit::DocumentMut>()?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    if let Some(google) = doc["google"].as_table_mut() {
        google["client_id"] = toml_edit::value(credentials.client_id.as_str());
        google["client_secret"] = toml_edit::value(credentials.client_secret.as_str());
        if !google.contains_key("calendar_id") {
            google["calendar_id"] = toml_edit::value("primary");
        }
    }

    Ok(doc.to_string())
}

/// Resolves Google credentials from multiple sources.
///
/// Priority (highest to lowest):
/// 1. CLI `--client-id` + `--client-secret`
/// 2. CLI `--credentials-file` (Google Cloud Console JSON)
/// 3. `config.toml` `[google]` section (with secret resolution)
fn resolve_google_credentials(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    config_google: Option<&GoogleSettings>,
    config_path: &Path,
) -> ClientResult<(OAuthCredentials, CredentialSource)> {
    if let (Some(id), Some(secret)) = (&cli_client_id, &cli_client_secret) {
        return Ok((OAuthCredentials::new(id, secret), CredentialSource::Cli));
    }

    if let Some(ref path) = cli_credentials_file {
        let creds = OAuthCredentials::from_file(path).map_err(|e| {
            ClientError::Config(format!(
                "failed to load credentials from {}: {}",
                path.display(),
                e
            ))
        })?;
        return Ok((creds, CredentialSource::Cli));
    }

    if let Some(google) = config_google
        && google.client_id.is_some()
        && google.client_secret.is_some()
    {
        let creds = google.resolve_credentials().map_err(|e| {
            ClientError::Config(format!(
                "failed to resolve Google credentials from config: {}",
                e
            ))
        })?;
        return Ok((creds, CredentialSource::Config));
    }

    if cli_client_id.is_some() || cli_client_secret.is_some() {
        return Err(ClientError::Config(
            "both --client-id and --client-secret are required when providing credentials directly"
                .to_string(),
        ));
    }

    Err(ClientError::Config(format!(
        "Google credentials are required. Provide via:\n  \
         - client_id + client_secret in {}\n  \
         - --client-id and --client-secret flags\n  \
         - --credentials-file flag (path to Google Cloud Console JSON)\n  \
         - GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET env vars",
        config_path.display()
    )))
}
