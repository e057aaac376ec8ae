//! Client error types.

use std::fmt;
use std::path::PathBuf;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that stop a command.
///
/// Per-file problems during an import are not errors: they are reported as
/// outcomes and the batch continues.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Calendar provider error.
    Provider(String),
    /// IO error.
    Io(std::io::Error),
    /// A stored message could not be decoded.
    Message { path: PathBuf, reason: String },
    /// Authentication required.
    AuthRequired(String),
    /// Some inputs of a batch failed.
    Incomplete { failed: usize, total: usize },
}

impl ClientError {
    pub(crate) fn message(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Message {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Provider(msg) => write!(f, "provider error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Message { path, reason } => {
                write!(f, "could not read message {}: {}", path.display(), reason)
            }
            Self::AuthRequired(msg) => write!(f, "authentication required: {}", msg),
            Self::Incomplete { failed, total } => {
                write!(f, "{} of {} file(s) failed", failed, total)
            }
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<announcecal_providers::ProviderError> for ClientError {
    fn from(err: announcecal_providers::ProviderError) -> Self {
        if err.needs_reauth() {
            Self::AuthRequired(err.to_string())
        } else {
            Self::Provider(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use announcecal_providers::ProviderError;

    #[test]
    fn display_messages() {
        assert_eq!(
            ClientError::Config("bad timezone".into()).to_string(),
            "configuration error: bad timezone"
        );
        assert_eq!(
            ClientError::message("/tmp/a.eml", "not a MIME message").to_string(),
            "could not read message /tmp/a.eml: not a MIME message"
        );
        assert_eq!(
            ClientError::Incomplete { failed: 2, total: 5 }.to_string(),
            "2 of 5 file(s) failed"
        );
    }

    #[test]
    fn provider_auth_errors_become_auth_required() {
        let err: ClientError = ProviderError::authentication("token revoked").into();
        assert!(matches!(err, ClientError::AuthRequired(_)));

        let err: ClientError = ProviderError::server("boom").into();
        assert!(matches!(err, ClientError::Provider(_)));
    }
}
