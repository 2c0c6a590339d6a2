// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Candidate validation through an external syntax checker.
//!
//! The candidate text is written to a temporary `.conf` file and the checker
//! (`named-checkconf` by default) is run against it under a hard timeout. The
//! checker's exit status is authoritative: zero means valid, anything else
//! means invalid. A rejected candidate is a [`ValidationResult`], not an error.
//!
//! Processes are launched through the [`CommandRunner`] trait so tests can
//! substitute a pure function for the real process launcher.
//!
//! # Example
//!
//! ```rust,no_run
//! use bindconf::validator::Validator;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let validator = Validator::new("named-checkconf", Duration::from_secs(5));
//! let result = validator.validate("options { recursion no; };\n").await?;
//! if !result.valid {
//!     eprintln!("rejected: {}", result.error);
//! }
//! # Ok(())
//! # }
//! ```

use crate::constants::{
    CONFIG_FILE_MODE, DEFAULT_VALIDATOR_TIMEOUT_SECS, OUTPUT_DRAIN_GRACE_MILLIS,
    VALIDATION_TEMP_PREFIX, VALIDATION_TEMP_SUFFIX, VALIDATION_TIMEOUT_MESSAGE,
};
use crate::errors::ValidatorError;
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempPath;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Outcome of running an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal or timed out
    pub exit_code: Option<i32>,
    /// Interleaved stdout and stderr
    pub output: String,
    /// Whether the command was killed for exceeding its timeout
    pub timed_out: bool,
}

impl CommandOutput {
    /// Whether the command finished in time with exit code zero.
    #[must_use]
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Launches external commands under a timeout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, killing it once `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns an error only when the process cannot be started or waited on.
    /// Non-zero exits and timeouts are reported in [`CommandOutput`].
    async fn run(&self, program: &str, args: &[String], timeout: Duration)
        -> io::Result<CommandOutput>;
}

/// [`CommandRunner`] backed by real child processes.
///
/// Each child runs in its own process group. On timeout the whole group is
/// killed so helper processes spawned by the command do not linger.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> io::Result<CommandOutput> {
        let (mut reader, writer) = io::pipe()?;
        let mut child = {
            let mut command = Command::new(program);
            command
                .args(args)
                .stdin(Stdio::null())
                .stdout(writer.try_clone()?)
                .stderr(writer)
                .kill_on_drop(true);
            #[cfg(unix)]
            command.process_group(0);
            command.spawn()?
        };
        let pid = child.id();

        let drain = tokio::task::spawn_blocking(move || {
            let mut buf = Vec::new();
            let _ = reader.read_to_end(&mut buf);
            buf
        });

        let (exit_code, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => (status?.code(), false),
            Err(_) => {
                kill_process_group(pid);
                let _ = child.kill().await;
                (None, true)
            }
        };

        let grace = Duration::from_millis(OUTPUT_DRAIN_GRACE_MILLIS);
        let output = match tokio::time::timeout(grace, drain).await {
            Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            _ => {
                warn!(program = %program, "Output of command could not be collected");
                String::new()
            }
        };

        Ok(CommandOutput {
            exit_code,
            output,
            timed_out,
        })
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) {
        if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            debug!(pid = pid, error = %e, "Process group already gone");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// [`CommandRunner`] that answers with a plain function instead of a process.
///
/// ```rust
/// use bindconf::validator::{CommandOutput, FnRunner};
///
/// let runner = FnRunner::new(|_program, _args| {
///     Ok(CommandOutput { exit_code: Some(0), ..CommandOutput::default() })
/// });
/// # let _ = runner;
/// ```
pub struct FnRunner<F> {
    func: F,
}

impl<F> FnRunner<F>
where
    F: Fn(&str, &[String]) -> io::Result<CommandOutput> + Send + Sync,
{
    /// Wrap `func`; it receives the program and its arguments.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> CommandRunner for FnRunner<F>
where
    F: Fn(&str, &[String]) -> io::Result<CommandOutput> + Send + Sync,
{
    async fn run(
        &self,
        program: &str,
        args: &[String],
        _timeout: Duration,
    ) -> io::Result<CommandOutput> {
        (self.func)(program, args)
    }
}

/// Verdict of the checker on a candidate configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the checker accepted the candidate
    pub valid: bool,
    /// Why the candidate was rejected; empty when valid
    pub error: String,
    /// Combined checker output
    pub output: String,
}

impl ValidationResult {
    fn from_command(output: CommandOutput) -> Self {
        if output.timed_out {
            return Self {
                valid: false,
                error: VALIDATION_TIMEOUT_MESSAGE.to_string(),
                output: output.output,
            };
        }
        if output.exit_code == Some(0) {
            return Self {
                valid: true,
                error: String::new(),
                output: output.output,
            };
        }
        Self {
            valid: false,
            error: output.output.trim().to_string(),
            output: output.output,
        }
    }
}

/// Runs the external checker against candidate configuration text.
#[derive(Clone)]
pub struct Validator {
    checker: String,
    timeout: Duration,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("checker", &self.checker)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Validator {
    /// Create a validator that launches `checker` as a real process.
    ///
    /// A zero `timeout` falls back to the default of five seconds.
    #[must_use]
    pub fn new(checker: impl Into<String>, timeout: Duration) -> Self {
        Self::with_runner(checker, timeout, Arc::new(ProcessRunner))
    }

    /// Create a validator that launches the checker through `runner`.
    #[must_use]
    pub fn with_runner(
        checker: impl Into<String>,
        timeout: Duration,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let timeout = if timeout.is_zero() {
            Duration::from_secs(DEFAULT_VALIDATOR_TIMEOUT_SECS)
        } else {
            timeout
        };
        Self {
            checker: checker.into(),
            timeout,
            runner,
        }
    }

    /// Checker program name or path.
    #[must_use]
    pub fn checker(&self) -> &str {
        &self.checker
    }

    /// Hard timeout applied to each checker run.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ask the checker whether `content` is a valid configuration.
    ///
    /// The temporary file is removed on every exit path.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::TempFile`] if the candidate cannot be written
    /// and [`ValidatorError::Launch`] if the checker cannot be started.
    pub async fn validate(&self, content: &str) -> Result<ValidationResult, ValidatorError> {
        let start = Instant::now();
        let candidate = write_candidate(content)?;
        let args = vec![candidate.to_string_lossy().into_owned()];

        debug!(
            checker = %self.checker,
            candidate = %args[0],
            timeout = ?self.timeout,
            "Running configuration checker"
        );

        let outcome = self.runner.run(&self.checker, &args, self.timeout).await;

        if let Err(e) = candidate.close() {
            warn!(candidate = %args[0], error = %e, "Failed to remove validation candidate");
        }

        let output = outcome.map_err(|e| ValidatorError::Launch {
            program: self.checker.clone(),
            reason: e.to_string(),
        })?;

        let timed_out = output.timed_out;
        let result = ValidationResult::from_command(output);
        let label = match (result.valid, timed_out) {
            (true, _) => "valid",
            (false, true) => "timeout",
            (false, false) => "invalid",
        };
        metrics::record_validation(label, start.elapsed());

        if timed_out {
            warn!(checker = %self.checker, timeout = ?self.timeout, "Configuration checker timed out");
        } else {
            info!(checker = %self.checker, valid = result.valid, "Configuration checked");
        }

        Ok(result)
    }
}

fn write_candidate(content: &str) -> Result<TempPath, ValidatorError> {
    let temp_err = |e: io::Error| ValidatorError::TempFile {
        reason: e.to_string(),
    };

    let mut file = tempfile::Builder::new()
        .prefix(VALIDATION_TEMP_PREFIX)
        .suffix(VALIDATION_TEMP_SUFFIX)
        .tempfile()
        .map_err(temp_err)?;
    file.write_all(content.as_bytes()).map_err(temp_err)?;
    file.flush().map_err(temp_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(CONFIG_FILE_MODE))
            .map_err(temp_err)?;
    }

    Ok(file.into_temp_path())
}
