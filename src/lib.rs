// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # bindconf - Configuration lifecycle engine for BIND9
//!
//! bindconf manages a BIND9 `named.conf` on the host it runs on. It parses the
//! file into a comment-preserving tree, renders trees back to canonical text,
//! diffs candidate revisions, validates them with `named-checkconf`, keeps
//! time-stamped snapshots, and commits changes with a snapshot → write →
//! reload transaction.
//!
//! ## Modules
//!
//! - [`named_conf`] - Configuration tree, parser and generator
//! - [`diff`] - Positional line diff
//! - [`validator`] - External checker with a hard timeout
//! - [`backup`] - Snapshot store with bounded retention
//! - [`daemon`] - BIND9 control through `rndc`
//! - [`manager`] - Safe-edit transactions and zone declarations
//! - [`api`] - HTTP API
//! - [`config`] - Command-line and environment configuration
//! - [`errors`] / [`http_errors`] - Error types and their HTTP mapping
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use bindconf::backup::BackupStore;
//! use bindconf::daemon::RndcController;
//! use bindconf::manager::ConfigManager;
//! use bindconf::validator::Validator;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let manager = ConfigManager::new(
//!     "/etc/bind/named.conf",
//!     Validator::new("named-checkconf", Duration::from_secs(5)),
//!     BackupStore::new("/var/lib/bindconf/backup", 10),
//!     Arc::new(RndcController::new(
//!         "rndc",
//!         "named",
//!         "/etc/bind/named.conf",
//!         Duration::from_secs(30),
//!     )),
//! );
//!
//! let current = manager.read_content().await?;
//! let proposed = current.replace("recursion yes;", "recursion no;");
//!
//! let diff = manager.propose(&proposed).await?;
//! println!("{} lines changed", diff.stats.added + diff.stats.removed);
//!
//! manager.update_content(&proposed).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod backup;
pub mod config;
pub mod constants;
pub mod daemon;
pub mod diff;
pub mod errors;
pub mod http_errors;
pub mod manager;
pub mod metrics;
pub mod named_conf;
pub mod validator;

#[cfg(test)]
mod validator_tests;
