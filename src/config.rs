// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service configuration from command-line flags and environment variables.
//!
//! Every flag can also be set through a `BINDCONF_*` environment variable; a
//! flag given on the command line wins over the environment.

use crate::backup::BackupStore;
use crate::constants::{
    DEFAULT_BACKUP_DIR, DEFAULT_CHECKER, DEFAULT_DAEMON_TIMEOUT_SECS, DEFAULT_LISTEN_ADDR,
    DEFAULT_MAX_BACKUPS, DEFAULT_MAX_INCLUDE_DEPTH, DEFAULT_NAMED, DEFAULT_NAMED_CONF_PATH,
    DEFAULT_RNDC, DEFAULT_VALIDATOR_TIMEOUT_SECS,
};
use crate::daemon::RndcController;
use crate::manager::ConfigManager;
use crate::named_conf::parser::Parser as ConfParser;
use crate::validator::Validator;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Control plane for a BIND9 `named.conf`.
#[derive(Debug, Clone, Parser)]
#[command(name = "bindconf", version, about)]
pub struct ServiceConfig {
    /// Address the HTTP API listens on
    #[arg(long, env = "BINDCONF_LISTEN", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen: SocketAddr,

    /// Tracked configuration file
    #[arg(long, env = "BINDCONF_CONFIG_PATH", default_value = DEFAULT_NAMED_CONF_PATH)]
    pub config_path: PathBuf,

    /// Directory holding configuration snapshots
    #[arg(long, env = "BINDCONF_BACKUP_DIR", default_value = DEFAULT_BACKUP_DIR)]
    pub backup_dir: PathBuf,

    /// Snapshots kept per tracked file (0 means the default of 10)
    #[arg(long, env = "BINDCONF_MAX_BACKUPS", default_value_t = DEFAULT_MAX_BACKUPS)]
    pub max_backups: usize,

    /// Syntax checker executable
    #[arg(long, env = "BINDCONF_CHECKER_PATH", default_value = DEFAULT_CHECKER)]
    pub checker_path: String,

    /// Checker timeout in seconds (0 means the default of 5)
    #[arg(
        long,
        env = "BINDCONF_VALIDATOR_TIMEOUT_SECS",
        default_value_t = DEFAULT_VALIDATOR_TIMEOUT_SECS
    )]
    pub validator_timeout_secs: u64,

    /// `rndc` executable
    #[arg(long, env = "BINDCONF_RNDC_PATH", default_value = DEFAULT_RNDC)]
    pub rndc_path: String,

    /// `named` executable, used to start the daemon
    #[arg(long, env = "BINDCONF_NAMED_PATH", default_value = DEFAULT_NAMED)]
    pub named_path: String,

    /// Timeout for daemon control commands in seconds
    #[arg(
        long,
        env = "BINDCONF_DAEMON_TIMEOUT_SECS",
        default_value_t = DEFAULT_DAEMON_TIMEOUT_SECS
    )]
    pub daemon_timeout_secs: u64,

    /// Bearer token required on /api/v1; authentication is off when unset
    #[arg(long, env = "BINDCONF_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Write committed content without running the checker first
    #[arg(long, env = "BINDCONF_SKIP_VALIDATION_ON_COMMIT")]
    pub skip_validation_on_commit: bool,

    /// Deepest chain of nested include directives followed when parsing
    #[arg(
        long,
        env = "BINDCONF_MAX_INCLUDE_DEPTH",
        default_value_t = DEFAULT_MAX_INCLUDE_DEPTH
    )]
    pub max_include_depth: usize,
}

impl ServiceConfig {
    /// Checker wrapper built from this configuration.
    #[must_use]
    pub fn validator(&self) -> Validator {
        Validator::new(
            self.checker_path.clone(),
            Duration::from_secs(self.validator_timeout_secs),
        )
    }

    /// Snapshot store built from this configuration.
    #[must_use]
    pub fn backup_store(&self) -> BackupStore {
        BackupStore::new(self.backup_dir.clone(), self.max_backups)
    }

    /// Daemon controller built from this configuration.
    #[must_use]
    pub fn daemon(&self) -> RndcController {
        RndcController::new(
            self.rndc_path.clone(),
            self.named_path.clone(),
            self.config_path.clone(),
            Duration::from_secs(self.daemon_timeout_secs),
        )
    }

    /// Configuration manager wired from this configuration.
    #[must_use]
    pub fn manager(&self) -> ConfigManager {
        ConfigManager::new(
            self.config_path.clone(),
            self.validator(),
            self.backup_store(),
            Arc::new(self.daemon()),
        )
        .with_parser(ConfParser::new(self.max_include_depth))
        .with_validation_on_commit(!self.skip_validation_on_commit)
    }
}
