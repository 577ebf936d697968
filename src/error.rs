//! Error taxonomy and filesystem error classification.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Semantic outcome of a stat or directory-listing failure.
///
/// `NotFound` and `PermissionDenied` are recoverable at some scope
/// (skip a file, abandon a subtree); `Other` is always fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOutcome {
    NotFound,
    PermissionDenied,
    Other,
}

/// Classify a low-level I/O error into its semantic outcome.
pub fn classify(err: &io::Error) -> FsOutcome {
    match err.kind() {
        io::ErrorKind::NotFound => FsOutcome::NotFound,
        io::ErrorKind::PermissionDenied => FsOutcome::PermissionDenied,
        _ => FsOutcome::Other,
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// A template referenced a token with no current value.
    #[error("unknown template token '%{0}'")]
    UnknownToken(char),

    /// A template ended in the middle of a `%` escape.
    #[error("template ends in an unfinished '%' escape")]
    UnterminatedEscape,

    /// `%u`/`%l` applied to a token outside the case-transform set.
    #[error("cannot change case of '%{0}'")]
    CaseNotSupported(char),

    /// A pad-width directive applied to a non-counter token.
    #[error("cannot pad '%{0}'")]
    PadNotSupported(char),

    /// Both an inclusive and an exclusive extension list were configured.
    #[error("only one of the include and exclude extension filters may be used")]
    ConflictingFilters,

    /// Malformed configuration file or params block.
    #[error("config: {0}")]
    Config(String),

    /// A filesystem operation failed in a way that aborts the run.
    #[error("{path}: {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing to the output stream failed.
    #[error("write error: {0}")]
    Write(#[from] io::Error),
}

impl Error {
    /// Attach a path to a raw I/O error.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_kinds() {
        let nf = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(classify(&nf), FsOutcome::NotFound);

        let pd = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(classify(&pd), FsOutcome::PermissionDenied);

        let other = io::Error::new(io::ErrorKind::InvalidData, "bad");
        assert_eq!(classify(&other), FsOutcome::Other);
    }

    #[test]
    fn test_io_error_keeps_cause() {
        let err = Error::io("/some/dir", io::Error::new(io::ErrorKind::InvalidData, "bad"));
        let msg = err.to_string();
        assert!(msg.contains("/some/dir"), "message should name the path: {}", msg);
        assert!(std::error::Error::source(&err).is_some());
    }
}
