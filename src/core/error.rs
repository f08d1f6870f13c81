/*
 * Defines the error type for the diagnostics session. Only session startup can
 * fail outward: resolving the per-user data directory and creating the session
 * folder. Ordinary logging calls never return these errors; sink failures are
 * reported to the console fallback instead.
 */
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum DiagnosticsError {
    Io(io::Error),
    NoUserDataDirectory,
    InvalidRoot(PathBuf),
}

impl From<io::Error> for DiagnosticsError {
    fn from(err: io::Error) -> Self {
        DiagnosticsError::Io(err)
    }
}

impl std::fmt::Display for DiagnosticsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticsError::Io(e) => write!(f, "Diagnostics I/O error: {e}"),
            DiagnosticsError::NoUserDataDirectory => {
                write!(f, "Could not determine the user data directory for diagnostics")
            }
            DiagnosticsError::InvalidRoot(p) => {
                write!(f, "Diagnostics root is not a directory: {p:?}")
            }
        }
    }
}

impl std::error::Error for DiagnosticsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiagnosticsError::Io(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiagnosticsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_io_error_converts_and_keeps_source() {
        // Arrange
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");

        // Act
        let err: DiagnosticsError = io_err.into();

        // Assert
        assert!(matches!(err, DiagnosticsError::Io(_)));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_invalid_root_display_names_path() {
        let err = DiagnosticsError::InvalidRoot(PathBuf::from("/no/such/root"));
        assert!(err.to_string().contains("/no/such/root"));
        assert!(err.source().is_none());
    }
}
