//! announcecal CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use announcecal_core::{TracingConfig, init_tracing};
use clap::Parser;

use announcecal_client::cli::{AuthProvider, Cli, Command, ConfigAction};
use announcecal_client::commands;
use announcecal_client::commands::import::ImportArgs;
use announcecal_client::config::ClientConfig;
use announcecal_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: could not initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    // An explicit --config must exist; the default location is optional.
    let (config, config_path) = match cli.config {
        Some(path) => (ClientConfig::load_from(&path).map_err(ClientError::Config)?, path),
        None => (
            ClientConfig::load().map_err(ClientError::Config)?,
            ClientConfig::default_path(),
        ),
    };

    match cli.command {
        Command::Import {
            files,
            yes,
            keep,
            dry_run,
        } => {
            let args = ImportArgs {
                files,
                yes,
                keep,
                dry_run,
            };
            commands::import::run(args, &config).await
        }
        Command::Parse { files, json } => commands::parse::run(&files, json),
        Command::Auth { provider } => auth(provider, &config, config_path).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}

async fn auth(provider: AuthProvider, config: &ClientConfig, config_path: PathBuf) -> ClientResult<()> {
    match provider {
        #[cfg(feature = "google")]
        AuthProvider::Google {
            client_id,
            client_secret,
            credentials_file,
            force,
        } => {
            commands::auth::google(
                client_id,
                client_secret,
                credentials_file,
                force,
                config,
                &config_path,
            )
            .await
        }
    }
}
