//! `announcecal parse`: show what would be imported.

use std::path::{Path, PathBuf};

use announcecal_core::{AnnouncementError, EventRecord, parse_announcement};
use serde::Serialize;

use crate::error::{ClientError, ClientResult};
use crate::message::{is_eml, read_message};

/// Why a file produced no event.
#[derive(Debug, Serialize)]
struct Problem {
    kind: &'static str,
    message: String,
}

impl From<&AnnouncementError> for Problem {
    fn from(err: &AnnouncementError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<&ClientError> for Problem {
    fn from(err: &ClientError) -> Self {
        Self {
            kind: "unreadable",
            message: err.to_string(),
        }
    }
}

/// One output line.
#[derive(Debug, Serialize)]
struct Parsed<'a> {
    path: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<EventRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Problem>,
}

impl<'a> Parsed<'a> {
    fn from_file(path: &'a Path) -> Self {
        let (event, error) = match extract_from_file(path) {
            Ok(Ok(record)) => (Some(record), None),
            Ok(Err(e)) => (None, Some(Problem::from(&e))),
            Err(e) => (None, Some(Problem::from(&e))),
        };
        Self { path, event, error }
    }

    fn render_text(&self) -> String {
        match (&self.event, &self.error) {
            (Some(record), _) => format!("{}: {}", self.path.display(), record),
            (None, Some(problem)) => format!("{}: no event ({})", self.path.display(), problem.message),
            (None, None) => format!("{}: no event", self.path.display()),
        }
    }
}

/// `.eml` files are decoded; anything else is read as a plain-text body.
fn extract_from_file(path: &Path) -> ClientResult<Result<EventRecord, AnnouncementError>> {
    let text = if is_eml(path) {
        read_message(path)?.text
    } else {
        let bytes = std::fs::read(path)
            .map_err(|e| ClientError::message(path, format!("failed to read file: {}", e)))?;
        String::from_utf8_lossy(&bytes).into_owned()
    };
    Ok(parse_announcement(&text))
}

/// Prints the event found in each file.
pub fn run(files: &[PathBuf], json: bool) -> ClientResult<()> {
    let mut failed = 0;
    for path in files {
        let parsed = Parsed::from_file(path);
        if parsed.event.is_none() {
            failed += 1;
        }

        if json {
            let line = serde_json::to_string(&parsed)
                .map_err(|e| ClientError::Config(format!("failed to serialize output: {}", e)))?;
            println!("{}", line);
        } else {
            println!("{}", parsed.render_text());
        }
    }

    match failed {
        0 => Ok(()),
        failed => Err(ClientError::Incomplete {
            failed,
            total: files.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::fixtures;

    #[test]
    fn eml_record_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixtures::write(dir.path(), "a.eml", &fixtures::proposal());
        let parsed = Parsed::from_file(&path);

        insta::assert_json_snapshot!(parsed, {".path" => "[path]"}, @r#"
        {
          "path": "[path]",
          "event": {
            "event_type": "msc_thesis_proposal",
            "location": "Essex Hall, Room 101",
            "start": "2025-01-16T10:00:00",
            "end": "2025-01-16T11:00:00"
          }
        }
        "#);
    }

    #[test]
    fn plain_text_body_with_missing_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixtures::write(
            dir.path(),
            "seminar.txt",
            "PhD. Seminar\nDate: Thursday, January 16th, 2025\nTime: 2:30 PM\n",
        );
        let parsed = Parsed::from_file(&path);

        assert!(parsed.event.is_none());
        let problem = parsed.error.as_ref().unwrap();
        assert_eq!(problem.kind, "field_missing");
        assert!(parsed.render_text().ends_with("no event (missing or malformed 'Location:' line)"));
    }

    #[test]
    fn unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.eml");
        let parsed = Parsed::from_file(&path);
        assert_eq!(parsed.error.as_ref().unwrap().kind, "unreadable");
    }

    #[test]
    fn run_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = fixtures::write(dir.path(), "a.eml", &fixtures::proposal());
        let bad = fixtures::write(dir.path(), "b.eml", "Subject: lunch\r\n\r\npizza\r\n");

        assert!(run(std::slice::from_ref(&good), true).is_ok());
        assert!(matches!(
            run(&[good, bad], false),
            Err(ClientError::Incomplete { failed: 1, total: 2 })
        ));
    }
}
