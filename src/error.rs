//! Error types for the filesystem-isolation core.
//!
//! Uses thiserror for deriving std::error::Error and miette for rich diagnostics.
//!
//! Every failure in this crate is returned as a value; nothing aborts the
//! process. Mount operations distinguish "could not even try" (e.g. the bind
//! source is unreachable) from "the kernel refused" so callers can decide
//! whether retrying makes sense.

use miette::Diagnostic;
use nix::errno::Errno;
use thiserror::Error;

/// Top-level error type for the crate.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A mount, unmount, or mount-table operation failed
    #[error("Mount operation failed")]
    #[diagnostic(code(fsjail::mount))]
    Mount(#[from] MountError),

    /// Lock acquisition failed
    #[error("Lock acquisition failed")]
    #[diagnostic(code(fsjail::lock))]
    Lock(#[from] LockError),

    /// I/O error
    #[error("I/O error: {0}")]
    #[diagnostic(code(fsjail::io))]
    Io(#[from] std::io::Error),
}

/// Errors from mount operations and mount-table queries.
///
/// The variants form a closed set so callers can match on the failure mode
/// instead of interpreting magic negative return codes.
#[derive(Error, Debug, Diagnostic)]
pub enum MountError {
    /// The source path for a bind mount could not be accessed.
    ///
    /// This is reported before any syscall is attempted, so the mount table
    /// is guaranteed untouched when this variant is returned.
    #[error("Bind source is not accessible: {path}")]
    #[diagnostic(
        code(fsjail::mount::source_unavailable),
        help("Check that the source path exists and is readable by the sandbox supervisor")
    )]
    SourceUnavailable { path: String },

    /// The mount/umount/remount syscall itself failed.
    #[error("{op} failed on {path}: {errno}")]
    #[diagnostic(code(fsjail::mount::syscall))]
    Syscall {
        op: &'static str,
        path: String,
        errno: Errno,
    },

    /// The destination is already a mount point of the requested type.
    #[error("Already mounted: {path}")]
    #[diagnostic(code(fsjail::mount::already_mounted))]
    AlreadyMounted { path: String },

    /// The target is not a mount point.
    #[error("Not a mount point: {path}")]
    #[diagnostic(code(fsjail::mount::not_mounted))]
    NotMounted { path: String },

    /// The live mount table could not be opened.
    ///
    /// Individual malformed lines are skipped during parsing and never
    /// produce this error.
    #[error("Cannot read mount table {path}: {source}")]
    #[diagnostic(code(fsjail::mount::table))]
    Table {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from scoped file lock acquisition.
#[derive(Error, Debug, Diagnostic)]
pub enum LockError {
    /// The lock file could not be opened or created.
    #[error("Cannot open lock file {path}: {source}")]
    #[diagnostic(
        code(fsjail::lock::open),
        help("The lock file's parent directory must exist and be writable")
    )]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The flock syscall failed.
    #[error("Cannot lock {path}: {errno}")]
    #[diagnostic(code(fsjail::lock::flock))]
    Flock { path: String, errno: Errno },
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
