//! The import pipeline: message file in, calendar event out.
//!
//! Each path goes through the same steps:
//!
//! 1. ignore anything that is not an `.eml` file
//! 2. decode the message and parse the announcement in its body
//! 3. ask the calendar for an existing event with the same summary near the
//!    same start; if there is one the message is already handled
//! 4. confirm, add the event, and remove the message
//!
//! A failure on one path is recorded in the [`ImportReport`] and the batch
//! moves on.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use announcecal_core::{EventRecord, parse_announcement};
use announcecal_providers::{CalendarProvider, CreatedEvent};
use tracing::{debug, info, warn};

use crate::message::{is_eml, read_message};

/// Decides whether a parsed event should be added.
pub trait Confirm {
    fn confirm(&mut self, record: &EventRecord) -> bool;
}

/// Adds every event without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _record: &EventRecord) -> bool {
        true
    }
}

/// Asks on a terminal-like stream and accepts `y` or `yes`.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl Prompt<io::StdinLock<'static>, io::Stderr> {
    /// Prompts on stderr and reads answers from stdin.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, record: &EventRecord) -> io::Result<bool> {
        writeln!(self.output, "Add this event to the calendar?")?;
        writeln!(self.output, "  Type:     {}", record.event_type())?;
        writeln!(self.output, "  Location: {}", record.location())?;
        writeln!(self.output, "  Start:    {}", record.start().format("%Y-%m-%d %H:%M"))?;
        writeln!(self.output, "  End:      {}", record.end().format("%Y-%m-%d %H:%M"))?;
        write!(self.output, "[y/N] ")?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        let answer = answer.trim();
        Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
    }
}

impl<R: BufRead, W: Write> Confirm for Prompt<R, W> {
    fn confirm(&mut self, record: &EventRecord) -> bool {
        self.ask(record).unwrap_or_else(|e| {
            warn!(error = %e, "could not read confirmation, treating as no");
            false
        })
    }
}

/// Knobs for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Half-width of the duplicate lookup window, in minutes.
    pub window_minutes: i64,
    /// Remove a message once its event is on the calendar.
    pub delete_processed: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            window_minutes: 1,
            delete_processed: true,
        }
    }
}

/// What happened to one input path.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// Not an `.eml` file.
    Ignored,
    /// No announcement could be extracted.
    Skipped { reason: String },
    /// The calendar already holds the event.
    Duplicate { record: EventRecord, removed: bool },
    /// The event was created.
    Added {
        record: EventRecord,
        event: CreatedEvent,
        removed: bool,
    },
    /// The user said no; the file is kept.
    Declined { record: EventRecord },
    /// Reading the message or talking to the calendar failed.
    Failed { reason: String },
}

impl ImportOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Ignored => OutcomeKind::Ignored,
            Self::Skipped { .. } => OutcomeKind::Skipped,
            Self::Duplicate { .. } => OutcomeKind::Duplicate,
            Self::Added { .. } => OutcomeKind::Added,
            Self::Declined { .. } => OutcomeKind::Declined,
            Self::Failed { .. } => OutcomeKind::Failed,
        }
    }

    pub fn record(&self) -> Option<&EventRecord> {
        match self {
            Self::Duplicate { record, .. }
            | Self::Added { record, .. }
            | Self::Declined { record } => Some(record),
            _ => None,
        }
    }
}

fn removed_suffix(removed: bool) -> &'static str {
    if removed { ", file deleted" } else { "" }
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignored => write!(f, "ignored (not an .eml file)"),
            Self::Skipped { reason } => write!(f, "skipped: could not extract data ({})", reason),
            Self::Duplicate { record, removed } => write!(
                f,
                "duplicate: {} already on the calendar{}",
                record,
                removed_suffix(*removed)
            ),
            Self::Added {
                record,
                event,
                removed,
            } => {
                write!(f, "added: {}", record)?;
                if let Some(ref id) = event.id {
                    write!(f, " [{}]", id)?;
                }
                f.write_str(removed_suffix(*removed))
            }
            Self::Declined { record } => write!(f, "declined: {}", record),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Outcome categories, in summary order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Added,
    Duplicate,
    Declined,
    Skipped,
    Ignored,
    Failed,
}

impl OutcomeKind {
    pub const ALL: [OutcomeKind; 6] = [
        Self::Added,
        Self::Duplicate,
        Self::Declined,
        Self::Skipped,
        Self::Ignored,
        Self::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Duplicate => "duplicate",
            Self::Declined => "declined",
            Self::Skipped => "skipped",
            Self::Ignored => "ignored",
            Self::Failed => "failed",
        }
    }
}

/// One processed path.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportEntry {
    pub path: PathBuf,
    pub outcome: ImportOutcome,
}

/// The outcome of every path in a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub entries: Vec<ImportEntry>,
}

impl ImportReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.kind() == kind)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeKind::Failed)
    }

    /// One line, e.g. `3 file(s): 1 added, 2 duplicate`.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = OutcomeKind::ALL
            .iter()
            .filter_map(|&kind| match self.count(kind) {
                0 => None,
                n => Some(format!("{} {}", n, kind.as_str())),
            })
            .collect();

        if parts.is_empty() {
            format!("{} file(s)", self.len())
        } else {
            format!("{} file(s): {}", self.len(), parts.join(", "))
        }
    }
}

/// Runs paths through the pipeline against one calendar.
pub struct Importer<'a> {
    provider: &'a dyn CalendarProvider,
    options: ImportOptions,
}

impl<'a> Importer<'a> {
    pub fn new(provider: &'a dyn CalendarProvider, options: ImportOptions) -> Self {
        Self { provider, options }
    }

    /// Processes every path in order, calling `observe` as each one
    /// finishes.
    pub async fn run<F>(
        &self,
        paths: &[PathBuf],
        confirm: &mut dyn Confirm,
        mut observe: F,
    ) -> ImportReport
    where
        F: FnMut(&ImportEntry),
    {
        let mut report = ImportReport::default();
        for path in paths {
            let entry = ImportEntry {
                path: path.clone(),
                outcome: self.import_file(path, confirm).await,
            };
            observe(&entry);
            report.entries.push(entry);
        }

        info!(provider = self.provider.name(), summary = %report.summary(), "import finished");
        report
    }

    /// Processes a single path.
    pub async fn import_file(&self, path: &Path, confirm: &mut dyn Confirm) -> ImportOutcome {
        if !is_eml(path) {
            debug!(path = %path.display(), "not an .eml file, ignoring");
            return ImportOutcome::Ignored;
        }

        let body = match read_message(path) {
            Ok(body) => body,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read message");
                return ImportOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let record = match parse_announcement(&body.text) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    subject = body.subject.as_deref().unwrap_or(""),
                    error = %e,
                    "could not extract data"
                );
                return ImportOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        match self
            .provider
            .is_duplicate(&record, self.options.window_minutes)
            .await
        {
            Ok(true) => {
                info!(path = %path.display(), summary = record.summary(), "duplicate event found");
                let removed = self.remove_processed(path);
                return ImportOutcome::Duplicate { record, removed };
            }
            Ok(false) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "duplicate lookup failed");
                return ImportOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        }

        if !confirm.confirm(&record) {
            debug!(path = %path.display(), "declined");
            return ImportOutcome::Declined { record };
        }

        match self.provider.create_event(&record).await {
            Ok(event) => {
                let removed = self.remove_processed(path);
                ImportOutcome::Added {
                    record,
                    event,
                    removed,
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not create event");
                ImportOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Removes a handled message. A failure leaves the file in place and is
    /// only logged: the calendar side already succeeded.
    fn remove_processed(&self, path: &Path) -> bool {
        if !self.options.delete_processed {
            return false;
        }
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed processed message");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not remove processed message");
                false
            }
        }
    }
}
