// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the configuration lifecycle engine.
//!
//! This module provides specialized error types for:
//! - Parsing `named.conf` text and resolving `include` directives
//! - Rendering configuration trees back to text
//! - Running the external syntax checker
//! - Snapshotting and restoring configuration revisions
//! - Controlling the BIND9 daemon
//!
//! Every error exposes a short `kind()` tag. The tag is stable and is what the
//! HTTP layer reports to clients alongside the human-readable message.

use crate::validator::ValidationResult;
use std::path::PathBuf;
use thiserror::Error;

/// Kind tag for malformed configuration lines
pub const KIND_PARSE_ERROR: &str = "ParseError";
/// Kind tag for blocks that are still open at end of input
pub const KIND_UNTERMINATED_BLOCK: &str = "UnterminatedBlock";
/// Kind tag for unreadable `include` targets
pub const KIND_INCLUDE_IO_ERROR: &str = "IncludeIOError";
/// Kind tag for rendering without a tree
pub const KIND_NIL_ROOT: &str = "NilRoot";
/// Kind tag for snapshotting a file that does not exist
pub const KIND_SOURCE_MISSING: &str = "SourceMissing";
/// Kind tag for restoring or deleting a snapshot that does not exist
pub const KIND_BACKUP_MISSING: &str = "BackupMissing";
/// Kind tag for generic filesystem failures
pub const KIND_IO_ERROR: &str = "IOError";
/// Kind tag for a checker that could not be started
pub const KIND_EXEC_LAUNCH_ERROR: &str = "ExecLaunchError";
/// Kind tag for a daemon reload that failed after a durable write
pub const KIND_RELOAD_AFTER_WRITE_FAILED: &str = "ReloadAfterWriteFailed";

/// Errors raised while parsing `named.conf` text.
///
/// Each variant carries the file being parsed and the 1-based line number of
/// the offending line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A line could not be classified as any known element
    #[error("{}:{line}: {cause}", .file.display())]
    Syntax {
        /// File containing the malformed line
        file: PathBuf,
        /// 1-based line number
        line: usize,
        /// Short description of what is wrong
        cause: String,
    },

    /// End of input reached while a block was still open
    #[error("{}:{line}: block '{name}' is never closed", .file.display())]
    UnterminatedBlock {
        /// File containing the block
        file: PathBuf,
        /// Line on which the block was opened
        line: usize,
        /// Directive name of the open block
        name: String,
    },

    /// An `include` target could not be read
    #[error("{}:{line}: cannot read included file {}: {reason}", .file.display(), .path.display())]
    IncludeIo {
        /// File containing the `include` directive
        file: PathBuf,
        /// Line of the `include` directive
        line: usize,
        /// Resolved path of the included file
        path: PathBuf,
        /// Underlying I/O failure
        reason: String,
    },

    /// An `include` directive refers back to a file already being parsed
    #[error("{}:{line}: include cycle through {}", .file.display(), .path.display())]
    IncludeCycle {
        /// File containing the `include` directive
        file: PathBuf,
        /// Line of the `include` directive
        line: usize,
        /// Resolved path that closes the cycle
        path: PathBuf,
    },

    /// `include` directives nested deeper than the configured limit
    #[error("{}:{line}: includes nested deeper than {limit} levels", .file.display())]
    IncludeDepthExceeded {
        /// File containing the `include` directive
        file: PathBuf,
        /// Line of the `include` directive
        line: usize,
        /// Configured nesting limit
        limit: usize,
    },

    /// The top-level file itself could not be read
    #[error("cannot read {}: {reason}", .file.display())]
    Io {
        /// File that could not be read
        file: PathBuf,
        /// Underlying I/O failure
        reason: String,
    },
}

impl ParseError {
    /// 1-based line number of the offending line, or 0 when the whole file failed.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::Syntax { line, .. }
            | Self::UnterminatedBlock { line, .. }
            | Self::IncludeIo { line, .. }
            | Self::IncludeCycle { line, .. }
            | Self::IncludeDepthExceeded { line, .. } => *line,
            Self::Io { .. } => 0,
        }
    }

    /// Short cause tag surfaced to clients.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Syntax { .. } | Self::IncludeCycle { .. } | Self::IncludeDepthExceeded { .. } => {
                KIND_PARSE_ERROR
            }
            Self::UnterminatedBlock { .. } => KIND_UNTERMINATED_BLOCK,
            Self::IncludeIo { .. } => KIND_INCLUDE_IO_ERROR,
            Self::Io { .. } => KIND_IO_ERROR,
        }
    }
}

/// Errors raised while rendering a configuration tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// No tree was supplied
    #[error("no configuration tree to render")]
    NilRoot,
}

/// Errors raised by the validator itself.
///
/// A checker that rejects the candidate is *not* an error; it is reported as a
/// [`ValidationResult`] with `valid == false`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidatorError {
    /// The temporary candidate file could not be created or written
    #[error("cannot prepare temporary file for validation: {reason}")]
    TempFile {
        /// Underlying I/O failure
        reason: String,
    },

    /// The checker executable could not be started
    #[error("cannot launch checker '{program}': {reason}")]
    Launch {
        /// Program that failed to start
        program: String,
        /// Underlying launch failure
        reason: String,
    },
}

impl ValidatorError {
    /// Short cause tag surfaced to clients.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TempFile { .. } => KIND_IO_ERROR,
            Self::Launch { .. } => KIND_EXEC_LAUNCH_ERROR,
        }
    }
}

/// Errors raised by the snapshot store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackupError {
    /// The file to snapshot does not exist
    #[error("cannot snapshot {}: file does not exist", .path.display())]
    SourceMissing {
        /// Path that was expected to exist
        path: PathBuf,
    },

    /// The snapshot to restore or delete does not exist
    #[error("backup {} does not exist", .path.display())]
    BackupMissing {
        /// Snapshot path that was expected to exist
        path: PathBuf,
    },

    /// A backup identifier is not a plain snapshot filename
    #[error("invalid backup id '{id}'")]
    InvalidBackupId {
        /// The rejected identifier
        id: String,
    },

    /// Any other filesystem failure
    #[error("backup I/O error on {}: {reason}", .path.display())]
    Io {
        /// Path involved in the failed operation
        path: PathBuf,
        /// Underlying I/O failure
        reason: String,
    },
}

impl BackupError {
    /// Short cause tag surfaced to clients.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceMissing { .. } => KIND_SOURCE_MISSING,
            Self::BackupMissing { .. } => KIND_BACKUP_MISSING,
            Self::InvalidBackupId { .. } => "InvalidBackupId",
            Self::Io { .. } => KIND_IO_ERROR,
        }
    }
}

/// Errors raised while controlling the BIND9 daemon.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DaemonError {
    /// The control utility could not be started
    #[error("cannot launch '{command}': {reason}")]
    Launch {
        /// Command line that failed to start
        command: String,
        /// Underlying launch failure
        reason: String,
    },

    /// The control utility exited unsuccessfully
    #[error("'{command}' failed: {output}")]
    CommandFailed {
        /// Command line that failed
        command: String,
        /// Combined output of the command
        output: String,
    },

    /// The control utility did not finish in time
    #[error("'{command}' timed out after {timeout_secs}s")]
    Timeout {
        /// Command line that timed out
        command: String,
        /// Configured timeout
        timeout_secs: u64,
    },
}

impl DaemonError {
    /// Short cause tag surfaced to clients.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Launch { .. } => KIND_EXEC_LAUNCH_ERROR,
            Self::CommandFailed { .. } => "DaemonCommandFailed",
            Self::Timeout { .. } => "DaemonTimeout",
        }
    }
}

/// Errors surfaced by the configuration manager to the HTTP layer.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// Parsing the tracked configuration failed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Rendering a configuration tree failed
    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// The validator could not run
    #[error(transparent)]
    Validator(#[from] ValidatorError),

    /// A snapshot operation failed
    #[error(transparent)]
    Backup(#[from] BackupError),

    /// A daemon control command failed
    #[error(transparent)]
    Daemon(#[from] DaemonError),

    /// Reading or writing the tracked file failed
    #[error("I/O error on {}: {reason}", .path.display())]
    Io {
        /// Path involved in the failed operation
        path: PathBuf,
        /// Underlying I/O failure
        reason: String,
    },

    /// The checker rejected the candidate content; nothing was written
    #[error("configuration rejected by checker: {}", .result.error)]
    ValidationRejected {
        /// The checker's verdict
        result: ValidationResult,
    },

    /// The new content is on disk but the daemon did not reload it
    #[error("configuration written but reload failed: {reason}")]
    ReloadAfterWriteFailed {
        /// Why the reload failed
        reason: String,
        /// Snapshot of the pre-change state, when one was taken
        backup: Option<PathBuf>,
    },

    /// A zone with this name is already declared
    #[error("zone '{zone}' is already declared")]
    ZoneAlreadyExists {
        /// Zone name
        zone: String,
    },

    /// No zone with this name is declared
    #[error("zone '{zone}' is not declared")]
    ZoneNotFound {
        /// Zone name
        zone: String,
    },

    /// A zone declaration request is incomplete
    #[error("invalid zone declaration: {reason}")]
    InvalidZone {
        /// What is wrong with the request
        reason: String,
    },

    /// The zone is declared in an included file and cannot be edited in place
    #[error("zone '{zone}' is declared in included file {}", .path.display())]
    ZoneInInclude {
        /// Zone name
        zone: String,
        /// Included file declaring the zone
        path: PathBuf,
    },
}

impl ConfigError {
    /// Short cause tag surfaced to clients.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(e) => e.kind(),
            Self::Generate(_) => KIND_NIL_ROOT,
            Self::Validator(e) => e.kind(),
            Self::Backup(e) => e.kind(),
            Self::Daemon(e) => e.kind(),
            Self::Io { .. } => KIND_IO_ERROR,
            Self::ValidationRejected { .. } => "ValidationFailed",
            Self::ReloadAfterWriteFailed { .. } => KIND_RELOAD_AFTER_WRITE_FAILED,
            Self::ZoneAlreadyExists { .. } => "ZoneAlreadyExists",
            Self::ZoneNotFound { .. } => "ZoneNotFound",
            Self::ZoneInInclude { .. } => "ZoneInInclude",
            Self::InvalidZone { .. } => "InvalidZone",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}
