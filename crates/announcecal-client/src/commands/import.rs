//! `announcecal import`.

use std::path::PathBuf;

use announcecal_providers::{CalendarProvider, MemoryCalendar};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::import::{AssumeYes, Confirm, ImportOptions, Importer, Prompt};

/// Flags of the import subcommand.
#[derive(Debug, Clone, Default)]
pub struct ImportArgs {
    pub files: Vec<PathBuf>,
    pub yes: bool,
    pub keep: bool,
    pub dry_run: bool,
}

impl ImportArgs {
    fn options(&self, config: &ClientConfig) -> ImportOptions {
        ImportOptions {
            window_minutes: config.calendar.duplicate_window_minutes,
            delete_processed: config.import.delete_processed && !self.keep && !self.dry_run,
        }
    }

    fn assume_yes(&self, config: &ClientConfig) -> bool {
        self.yes || config.import.assume_yes
    }
}

/// Imports every file and prints one line per file plus a summary.
///
/// Returns [`ClientError::Incomplete`] when any file failed, after the
/// whole batch has been processed.
pub async fn run(args: ImportArgs, config: &ClientConfig) -> ClientResult<()> {
    config.validate().map_err(ClientError::Config)?;

    let provider: Box<dyn CalendarProvider> = if args.dry_run {
        println!("Dry run: using an empty in-memory calendar, no files will be deleted.");
        Box::new(MemoryCalendar::new())
    } else {
        open_calendar(config)?
    };
    debug!(provider = provider.name(), files = args.files.len(), "starting import");

    let mut confirm: Box<dyn Confirm> = if args.assume_yes(config) {
        Box::new(AssumeYes)
    } else {
        Box::new(Prompt::stdio())
    };

    let importer = Importer::new(provider.as_ref(), args.options(config));
    let report = importer
        .run(&args.files, confirm.as_mut(), |entry| {
            println!("{}: {}", entry.path.display(), entry.outcome);
        })
        .await;

    println!();
    println!("{}", report.summary());

    match report.failed() {
        0 => Ok(()),
        failed => Err(ClientError::Incomplete {
            failed,
            total: report.len(),
        }),
    }
}

#[cfg(feature = "google")]
fn open_calendar(config: &ClientConfig) -> ClientResult<Box<dyn CalendarProvider>> {
    use announcecal_providers::ErrorProvider;
    use announcecal_providers::google::{CalendarSession, GoogleProvider};

    let settings = config.google.as_ref().ok_or_else(|| {
        ClientError::Config(
            "no [google] section in config.toml; run 'announcecal auth google' first".to_string(),
        )
    })?;
    let google_config = settings
        .to_provider_config(&config.calendar)
        .map_err(ClientError::Config)?;

    let provider = CalendarSession::load(&google_config.token_path)
        .and_then(|session| GoogleProvider::new(google_config, session));

    match provider {
        Ok(provider) if provider.needs_reauth() => Err(ClientError::AuthRequired(
            "no usable Google session, run 'announcecal auth google'".to_string(),
        )),
        Ok(provider) => Ok(Box::new(provider)),
        Err(e) => {
            // Keep going so every file still gets parsed and reported.
            warn!(error = %e, "Google Calendar unavailable");
            Ok(Box::new(ErrorProvider::new("google", e)))
        }
    }
}

#[cfg(not(feature = "google"))]
fn open_calendar(_config: &ClientConfig) -> ClientResult<Box<dyn CalendarProvider>> {
    Err(ClientError::Config(
        "built without a calendar provider; use --dry-run".to_string(),
    ))
}
