use thiserror::Error;

/// Errori prodotti durante la gestione di una richiesta.
///
/// Il testo `Display` di ogni variante è ciò che il client riceve nel campo
/// `Data` di una risposta `error`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FtpError {
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Bad argument: {0}")]
    BadArgument(String),

    #[error("User is not authenticated")]
    NotAuthenticated,

    #[error("Invalid login or password")]
    InvalidCredentials,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Path escapes the user root: {0}")]
    PathEscape(String),

    #[error("Write failed: {0}")]
    WriteFailure(String),

    #[error("I/O error: {0}")]
    IoFault(String),
}

impl FtpError {
    /// Converte un errore di I/O avvenuto leggendo `path`.
    pub fn from_io(e: std::io::Error, path: &str) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => FtpError::NotFound(path.to_string()),
            _ => FtpError::IoFault(format!("{}: {}", path, e)),
        }
    }

    /// Converte un errore di I/O avvenuto scrivendo `path`.
    pub fn from_write(e: std::io::Error, path: &str) -> Self {
        FtpError::WriteFailure(format!("{}: {}", path, e))
    }
}

pub type FtpResult<T> = Result<T, FtpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = FtpError::from_io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "docs/a.txt",
        );
        assert_eq!(err, FtpError::NotFound("docs/a.txt".to_string()));
    }

    #[test]
    fn io_permission_denied_maps_to_io_fault() {
        let err = FtpError::from_io(
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
            "a.txt",
        );
        assert!(matches!(err, FtpError::IoFault(ref msg) if msg.contains("a.txt")));
    }

    #[test]
    fn display_carries_offending_verb() {
        let err = FtpError::UnknownCommand("delete".to_string());
        assert_eq!(err.to_string(), "Unknown command: delete");
    }
}
