// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! BIND9 daemon control.
//!
//! The configuration manager only needs to tell the running daemon to re-read
//! its configuration. That contract is the [`DaemonController`] trait. The
//! production implementation, [`RndcController`], shells out to `rndc` for
//! `reload`, `stop` and `status` and starts the daemon with `named -c <conf>`.
//!
//! # Example
//!
//! ```rust,no_run
//! use bindconf::daemon::{DaemonController, RndcController};
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let daemon = RndcController::new("rndc", "named", "/etc/bind/named.conf", Duration::from_secs(30));
//! daemon.reload().await?;
//! println!("{}", daemon.status().await?);
//! # Ok(())
//! # }
//! ```

use crate::constants::DEFAULT_DAEMON_TIMEOUT_SECS;
use crate::errors::DaemonError;
use crate::metrics;
use crate::validator::{CommandRunner, ProcessRunner};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Controls the lifecycle of the DNS daemon serving the tracked configuration.
#[async_trait]
pub trait DaemonController: Send + Sync {
    /// Ask the daemon to re-read its configuration.
    async fn reload(&self) -> Result<(), DaemonError>;

    /// Start the daemon.
    async fn start(&self) -> Result<(), DaemonError>;

    /// Stop the daemon.
    async fn stop(&self) -> Result<(), DaemonError>;

    /// Human-readable daemon status.
    async fn status(&self) -> Result<String, DaemonError>;
}

/// [`DaemonController`] driving BIND9 through `rndc` and `named`.
#[derive(Clone)]
pub struct RndcController {
    rndc: String,
    named: String,
    config_path: PathBuf,
    timeout: Duration,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for RndcController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RndcController")
            .field("rndc", &self.rndc)
            .field("named", &self.named)
            .field("config_path", &self.config_path)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RndcController {
    /// Create a controller that launches real processes.
    ///
    /// A zero `timeout` falls back to thirty seconds.
    #[must_use]
    pub fn new(
        rndc: impl Into<String>,
        named: impl Into<String>,
        config_path: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self::with_runner(rndc, named, config_path, timeout, Arc::new(ProcessRunner))
    }

    /// Create a controller that launches commands through `runner`.
    #[must_use]
    pub fn with_runner(
        rndc: impl Into<String>,
        named: impl Into<String>,
        config_path: impl Into<PathBuf>,
        timeout: Duration,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let timeout = if timeout.is_zero() {
            Duration::from_secs(DEFAULT_DAEMON_TIMEOUT_SECS)
        } else {
            timeout
        };
        Self {
            rndc: rndc.into(),
            named: named.into(),
            config_path: config_path.into(),
            timeout,
            runner,
        }
    }

    /// Run one control command and return its output on success.
    async fn execute(
        &self,
        label: &str,
        program: &str,
        args: Vec<String>,
    ) -> Result<String, DaemonError> {
        let command = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        debug!(command = %command, "Running daemon control command");

        let result = match self.runner.run(program, &args, self.timeout).await {
            Err(e) => Err(DaemonError::Launch {
                command,
                reason: e.to_string(),
            }),
            Ok(out) if out.timed_out => Err(DaemonError::Timeout {
                command,
                timeout_secs: self.timeout.as_secs(),
            }),
            Ok(out) if out.success() => Ok(out.output),
            Ok(out) => Err(DaemonError::CommandFailed {
                command,
                output: out.output.trim().to_string(),
            }),
        };

        metrics::record_daemon_command(label, result.is_ok());
        match &result {
            Ok(_) => info!(command = label, "Daemon command succeeded"),
            Err(e) => warn!(command = label, error = %e, "Daemon command failed"),
        }
        result
    }

    async fn rndc(&self, label: &str) -> Result<String, DaemonError> {
        self.execute(label, &self.rndc, vec![label.to_string()])
            .await
    }
}

#[async_trait]
impl DaemonController for RndcController {
    async fn reload(&self) -> Result<(), DaemonError> {
        self.rndc("reload").await.map(|_| ())
    }

    async fn start(&self) -> Result<(), DaemonError> {
        let args = vec![
            "-c".to_string(),
            self.config_path.to_string_lossy().into_owned(),
        ];
        self.execute("start", &self.named, args).await.map(|_| ())
    }

    async fn stop(&self) -> Result<(), DaemonError> {
        self.rndc("stop").await.map(|_| ())
    }

    async fn status(&self) -> Result<String, DaemonError> {
        self.rndc("status").await
    }
}
