// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for bindconf.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Configuration File Constants
// ============================================================================

/// Default location of the tracked BIND9 master configuration file
pub const DEFAULT_NAMED_CONF_PATH: &str = "/etc/bind/named.conf";

/// Indentation unit used when rendering configuration text (four spaces)
pub const INDENT: &str = "    ";

/// Prefix used when rendering comments
pub const COMMENT_PREFIX: &str = "#";

/// Maximum nesting of `include` directives before parsing is aborted
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 16;

/// Permission bits applied to files written by the service (rw-r--r--)
pub const CONFIG_FILE_MODE: u32 = 0o644;

// ============================================================================
// Validation Constants
// ============================================================================

/// Default syntax checker, resolved on the host search path
pub const DEFAULT_CHECKER: &str = "named-checkconf";

/// Hard timeout for a single checker invocation (5 seconds)
pub const DEFAULT_VALIDATOR_TIMEOUT_SECS: u64 = 5;

/// Suffix of the temporary file handed to the checker
pub const VALIDATION_TEMP_SUFFIX: &str = ".conf";

/// Prefix of the temporary file handed to the checker
pub const VALIDATION_TEMP_PREFIX: &str = "bindconf-";

/// Error text reported when the checker exceeds its timeout
pub const VALIDATION_TIMEOUT_MESSAGE: &str = "validation timed out";

/// Grace period for draining checker output after the process group is killed
pub const OUTPUT_DRAIN_GRACE_MILLIS: u64 = 1000;

// ============================================================================
// Backup Constants
// ============================================================================

/// Default directory holding configuration snapshots
pub const DEFAULT_BACKUP_DIR: &str = "./backup";

/// Default number of snapshots retained per tracked file
pub const DEFAULT_MAX_BACKUPS: usize = 10;

/// Timestamp embedded in snapshot filenames; sorts lexicographically in time order
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Extension of snapshot files
pub const BACKUP_EXTENSION: &str = "bak";

/// Permission bits of the backup directory (rwxr-xr-x)
pub const BACKUP_DIR_MODE: u32 = 0o755;

/// How many one-second steps a snapshot may advance to avoid a filename collision
pub const MAX_SNAPSHOT_COLLISION_STEPS: i64 = 60;

// ============================================================================
// Daemon Control Constants
// ============================================================================

/// Default BIND9 remote control utility
pub const DEFAULT_RNDC: &str = "rndc";

/// Default BIND9 daemon executable, used to start the server
pub const DEFAULT_NAMED: &str = "named";

/// Timeout for daemon control commands (30 seconds)
pub const DEFAULT_DAEMON_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// HTTP API Constants
// ============================================================================

/// Default listen address of the HTTP API
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Version prefix of all management routes
pub const API_PREFIX: &str = "/api/v1";
