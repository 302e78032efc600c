//! Primary error type for sqlbook operations.
//!
//! Structured variants for the cases the kernel actually distinguishes,
//! with user-facing display strings. Everything that crosses the
//! orchestrator boundary collapses into a uniform error envelope there;
//! the taxonomy below is what decides which operations fail and how.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, SqlbookError>;

#[derive(Error, Debug)]
pub enum SqlbookError {
    // === I/O errors ===
    /// A LOAD target that does not exist on disk (and is not `:memory:`).
    #[error("The path doesn't exist.")]
    PathNotFound { path: PathBuf },

    /// Removing the backing file failed during DELETE.
    #[error("Error deleting file.")]
    DeleteFailed { path: PathBuf },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is too small to carry a complete database header.
    #[error("short header read: expected {expected} bytes, got {actual}")]
    ShortHeader { expected: usize, actual: usize },

    // === Preconditions ===
    /// A magic command that needs an open database was issued while closed.
    #[error("Load a database to run this command.")]
    DatabaseNotLoaded,

    /// An operation that needs a known backing path was issued before any
    /// LOAD/CREATE established one.
    #[error("no database path is known for this session")]
    PathNotKnown,

    // === Arguments ===
    /// Malformed BACKUP type code.
    #[error("This is not a valid backup type.")]
    InvalidBackupType { value: String },

    /// A magic command was missing a required positional argument.
    #[error("{command} requires {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    /// LOAD received extra tokens but none of them named a known open mode.
    #[error("Wasn't able to load the database correctly.")]
    InvalidOpenMode,

    // === Engine ===
    /// Error reported by the embedded SQL engine, propagated unmodified.
    #[error("{message}")]
    Query { message: String },

    // === Environment ===
    /// A sandbox-only operation was requested on a host without the hooks.
    #[error("{operation} is not supported in this environment")]
    Unsupported { operation: &'static str },
}

/// Coarse classification of [`SqlbookError`] variants.
///
/// Matches the four error kinds the dispatch core distinguishes, plus the
/// environment-specific escape hatch for sandbox hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing/uncreatable/undeleteable file.
    Io,
    /// Command requires an open database (or a known path) and has none.
    Precondition,
    /// Malformed magic-command argument.
    InvalidArgument,
    /// Engine-reported SQL failure.
    Query,
    /// Operation is only defined in a sandboxed execution environment.
    Unsupported,
}

impl SqlbookError {
    /// Classify this error into one of the coarse kinds.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PathNotFound { .. }
            | Self::DeleteFailed { .. }
            | Self::Io(_)
            | Self::ShortHeader { .. } => ErrorKind::Io,
            Self::DatabaseNotLoaded | Self::PathNotKnown => ErrorKind::Precondition,
            Self::InvalidBackupType { .. }
            | Self::MissingArgument { .. }
            | Self::InvalidOpenMode => ErrorKind::InvalidArgument,
            Self::Query { .. } => ErrorKind::Query,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
        }
    }

    /// Create an engine error from any displayable engine message.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Whether the user can likely fix this without code changes.
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::ShortHeader { .. })
    }
}
