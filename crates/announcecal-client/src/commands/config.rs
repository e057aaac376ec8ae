//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate().map_err(ClientError::Config)?;

    #[cfg(feature = "google")]
    if let Some(ref google) = config.google {
        if google.client_id.is_some() || google.client_secret.is_some() {
            google.to_provider_config(&config.calendar).map_err(|e| {
                ClientError::Config(format!("invalid Google settings: {}", e))
            })?;
            println!("Google credentials are valid.");
        }
    }

    println!(
        "Timezone {}, duplicate window ±{} min.",
        config.calendar.timezone, config.calendar.duplicate_window_minutes
    );
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    let marker = if path.exists() { "" } else { " (not created yet)" };
    println!("config: {}{}", path.display(), marker);
    Ok(())
}
