//! Stored `.eml` messages.
//!
//! Announcements arrive as RFC 5322 messages saved to disk. Only the
//! plain-text body matters for extraction; HTML-only messages are converted
//! to text by the parser.

use std::path::Path;

use mail_parser::MessageParser;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

const EML_EXTENSION: &str = "eml";

/// The parts of a stored message the importer looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBody {
    pub subject: Option<String>,
    pub text: String,
}

/// Returns true when the path has an `.eml` extension, in any case.
pub fn is_eml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EML_EXTENSION))
}

/// Decodes raw message bytes into their plain-text body.
pub fn parse_message(path: &Path, content: &[u8]) -> ClientResult<MessageBody> {
    let message = MessageParser::default()
        .parse(content)
        .ok_or_else(|| ClientError::message(path, "not a MIME message"))?;

    let text = message
        .body_text(0)
        .map(|body| body.to_string())
        .ok_or_else(|| ClientError::message(path, "message has no text body"))?;

    debug!(path = %path.display(), bytes = content.len(), "decoded message body");
    Ok(MessageBody {
        subject: message.subject().map(str::to_string),
        text,
    })
}

/// Reads a stored message from disk.
pub fn read_message(path: &Path) -> ClientResult<MessageBody> {
    let content = std::fs::read(path)
        .map_err(|e| ClientError::message(path, format!("failed to read file: {}", e)))?;
    parse_message(path, &content)
}


#[cfg(test)]
mod tests {
    use super::*;

    mod extension {
        use super::*;

        #[test]
        fn matches_any_case() {
            assert!(is_eml(Path::new("inbox/test_event_1.eml")));
            assert!(is_eml(Path::new("SEMINAR.EML")));
            assert!(is_eml(Path::new("a.Eml")));
        }

        #[test]
        fn rejects_other_files() {
            assert!(!is_eml(Path::new("notes.txt")));
            assert!(!is_eml(Path::new("eml")));
            assert!(!is_eml(Path::new("archive.eml.gz")));
            assert!(!is_eml(Path::new("inbox/")));
        }
    }

    mod decode {
        use super::*;

        #[test]
        fn plain_text_body_excludes_headers() {
            let raw = fixtures::proposal();
            let body = parse_message(Path::new("a.eml"), raw.as_bytes()).unwrap();

            assert_eq!(
                body.subject.as_deref(),
                Some("MSc Thesis Proposal by: Alice Johnson")
            );
            assert!(body.text.contains("Location: Essex Hall, Room 101"));
            assert!(!body.text.contains("From: school@uwindsor.ca"));
            assert!(!body.text.contains("09:00:00 -0400"));
        }

        #[test]
        fn quoted_printable_is_decoded() {
            let raw = "From: school@uwindsor.ca\r\n\
                       Subject: Seminar\r\n\
                       Content-Type: text/plain; charset=utf-8\r\n\
                       Content-Transfer-Encoding: quoted-printable\r\n\
                       \r\n\
                       PhD. Seminar\r\n\
                       Location: Lambton Tower=2C Room 3105\r\n";
            let body = parse_message(Path::new("b.eml"), raw.as_bytes()).unwrap();
            assert!(body.text.contains("Location: Lambton Tower, Room 3105"));
        }

        #[test]
        fn multipart_prefers_plain_part() {
            let raw = "From: school@uwindsor.ca\r\n\
                       Subject: Defense\r\n\
                       MIME-Version: 1.0\r\n\
                       Content-Type: multipart/alternative; boundary=\"XYZ\"\r\n\
                       \r\n\
                       --XYZ\r\n\
                       Content-Type: text/plain; charset=utf-8\r\n\
                       \r\n\
                       MSc Thesis Defense plain\r\n\
                       --XYZ\r\n\
                       Content-Type: text/html; charset=utf-8\r\n\
                       \r\n\
                       <p>MSc Thesis Defense html</p>\r\n\
                       --XYZ--\r\n";
            let body = parse_message(Path::new("c.eml"), raw.as_bytes()).unwrap();
            assert!(body.text.contains("MSc Thesis Defense plain"));
            assert!(!body.text.contains("<p>"));
        }

        #[test]
        fn missing_file_is_message_error() {
            let dir = tempfile::tempdir().unwrap();
            let err = read_message(&dir.path().join("gone.eml")).unwrap_err();
            assert!(matches!(err, ClientError::Message { .. }));
            assert!(err.to_string().contains("gone.eml"));
        }

        #[test]
        fn reads_from_disk() {
            let dir = tempfile::tempdir().unwrap();
            let path = fixtures::write(dir.path(), "test_event_1.eml", &fixtures::proposal());
            let body = read_message(&path).unwrap();
            assert!(body.text.contains("Time: 10:00 AM"));
        }
    }
}
