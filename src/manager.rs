// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Safe-edit transactions on a tracked `named.conf`.
//!
//! [`ConfigManager`] composes the parser, validator, snapshot store and daemon
//! controller into the operations the HTTP API exposes:
//!
//! - **Read** / **Parse** the tracked file
//! - **Propose** new content and get a line diff back
//! - **Validate** candidate content with the external checker
//! - **Commit**: validate, snapshot, write atomically, reload
//! - **Restore** a snapshot and reload
//! - declare and remove **zones** in the tracked file
//!
//! Commit, restore, snapshot management and zone edits are serialised by one
//! mutex per manager. Reads take no lock; writes go through temp file and
//! rename so readers never see a partial file.
//!
//! A reload failure after a successful write is reported as
//! [`ConfigError::ReloadAfterWriteFailed`]. The new content stays on disk and the
//! pre-change snapshot is named in the error for recovery.

use crate::backup::{write_atomic, BackupRecord, BackupStore};
use crate::constants::CONFIG_FILE_MODE;
use crate::daemon::DaemonController;
use crate::diff::{self, DiffResult};
use crate::errors::{BackupError, ConfigError};
use crate::metrics;
use crate::named_conf::{generator, parser::Parser, Block, ConfigElement, Simple};
use crate::validator::{ValidationResult, Validator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const ZONE: &str = "zone";
const VIEW: &str = "view";

/// A zone declared somewhere in the tracked configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneInfo {
    /// Zone name
    pub name: String,
    /// `type` statement value (`primary`, `master`, `secondary`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_type: Option<String>,
    /// `file` statement value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Enclosing view, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    /// File the declaration lives in
    pub source: PathBuf,
}

/// Request to declare a new zone at the top level of the tracked file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSpec {
    /// Zone name, e.g. `example.com`
    pub name: String,
    /// Zone type, e.g. `primary`
    #[serde(rename = "type")]
    pub zone_type: String,
    /// Zone data file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Extra statements, rendered verbatim as `name value;`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl ZoneSpec {
    fn to_block(&self) -> ConfigElement {
        let mut children = vec![ConfigElement::Simple(Simple::bare(
            "type",
            self.zone_type.trim(),
        ))];
        if let Some(file) = &self.file {
            children.push(ConfigElement::Simple(Simple::quoted("file", file.as_str())));
        }
        children.extend(self.options.iter().map(|(name, value)| {
            ConfigElement::Simple(Simple::bare(name.as_str(), value.as_str()))
        }));

        ConfigElement::Block(Block {
            name: ZONE.to_string(),
            value: Some(self.name.trim().to_string()),
            children,
            ..Block::default()
        })
    }

    fn check(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::InvalidZone { reason });
        if self.name.trim().is_empty() {
            return invalid("zone name is empty".to_string());
        }
        if !is_bare_word(&self.name) {
            return invalid("zone name contains reserved characters".to_string());
        }
        if self.zone_type.trim().is_empty() {
            return invalid("zone type is empty".to_string());
        }
        if !is_bare_word(self.zone_type.trim()) {
            return invalid("zone type contains reserved characters".to_string());
        }
        if let Some(file) = &self.file {
            if file.is_empty() || file.contains(['"', '\\', '\n', '\r']) {
                return invalid(format!("zone file '{file}' cannot be quoted"));
            }
        }
        for (name, value) in &self.options {
            if name == "type" || name == "file" {
                return invalid("type and file are set through their own fields".to_string());
            }
            if !is_bare_word(name) {
                return invalid(format!("option name '{name}' contains reserved characters"));
            }
            if !is_statement_value(value) {
                return invalid(format!("option '{name}' has a malformed value"));
            }
        }
        Ok(())
    }
}

/// Non-empty token free of quotes, braces, semicolons and whitespace.
fn is_bare_word(word: &str) -> bool {
    !word.is_empty()
        && !word.contains(['"', ';', '{', '}', '#'])
        && !word.contains("//")
        && !word.contains(char::is_whitespace)
}

/// Single-line statement payload: braces balance, quotes pair up, and `;` or a
/// comment marker only appears inside a brace list or a quoted string.
fn is_statement_value(value: &str) -> bool {
    if value.contains(['\n', '\r']) {
        return false;
    }
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut prev = '\0';
    for c in value.chars() {
        match c {
            '"' => in_quote = !in_quote,
            _ if in_quote => {}
            '{' => depth += 1,
            '}' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            ';' if depth == 0 => return false,
            '#' => return false,
            '/' if prev == '/' => return false,
            _ => {}
        }
        prev = c;
    }
    depth == 0 && !in_quote
}

/// Orchestrates edits to one tracked configuration file.
pub struct ConfigManager {
    config_path: PathBuf,
    parser: Parser,
    validator: Validator,
    backups: BackupStore,
    daemon: Arc<dyn DaemonController>,
    validate_on_commit: bool,
    lock: Mutex<()>,
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("config_path", &self.config_path)
            .field("parser", &self.parser)
            .field("validator", &self.validator)
            .field("backups", &self.backups)
            .field("validate_on_commit", &self.validate_on_commit)
            .finish_non_exhaustive()
    }
}

impl ConfigManager {
    /// Create a manager for the file at `config_path`.
    ///
    /// Commits are validated by default.
    #[must_use]
    pub fn new(
        config_path: impl Into<PathBuf>,
        validator: Validator,
        backups: BackupStore,
        daemon: Arc<dyn DaemonController>,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            parser: Parser::default(),
            validator,
            backups,
            daemon,
            validate_on_commit: true,
            lock: Mutex::new(()),
        }
    }

    /// Use `parser` for [`ConfigManager::parse`] and zone edits.
    #[must_use]
    pub fn with_parser(mut self, parser: Parser) -> Self {
        self.parser = parser;
        self
    }

    /// Whether commits run the checker before writing.
    #[must_use]
    pub fn with_validation_on_commit(mut self, enabled: bool) -> Self {
        self.validate_on_commit = enabled;
        self
    }

    /// Path of the tracked file.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Snapshot store backing this manager.
    #[must_use]
    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Current content of the tracked file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read.
    pub async fn read_content(&self) -> Result<String, ConfigError> {
        tokio::fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| ConfigError::io(&self.config_path, &e))
    }

    /// Line diff from the current content to `content`.
    ///
    /// A tracked file that does not exist yet diffs as empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the current file exists but cannot be read.
    pub async fn propose(&self, content: &str) -> Result<DiffResult, ConfigError> {
        let current = match tokio::fs::read_to_string(&self.config_path).await {
            Ok(current) => current,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(ConfigError::io(&self.config_path, &e)),
        };
        Ok(diff::diff(&current, content))
    }

    /// Run the checker on `content`. Nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error only if the checker cannot be run; a rejection is a
    /// [`ValidationResult`] with `valid == false`.
    pub async fn validate(&self, content: &str) -> Result<ValidationResult, ConfigError> {
        Ok(self.validator.validate(content).await?)
    }

    /// Parse the tracked file, inlining includes.
    ///
    /// # Errors
    ///
    /// Returns the parser's error when the file or an include is unreadable
    /// or malformed.
    pub fn parse(&self) -> Result<ConfigElement, ConfigError> {
        Ok(self.parser.parse_file(&self.config_path)?)
    }

    /// Replace the tracked file with `content` and reload the daemon.
    ///
    /// Returns the snapshot of the previous content, or `None` when there was
    /// no previous file.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ValidationRejected`] when the checker refuses `content`;
    ///   nothing is written
    /// - [`ConfigError::Backup`] or [`ConfigError::Io`] when the snapshot or the
    ///   write fails; the daemon is not reloaded
    /// - [`ConfigError::ReloadAfterWriteFailed`] when `content` is on disk but
    ///   the reload failed
    pub async fn update_content(
        &self,
        content: &str,
    ) -> Result<Option<BackupRecord>, ConfigError> {
        let _guard = self.lock.lock().await;
        self.commit_locked(content).await
    }

    async fn commit_locked(&self, content: &str) -> Result<Option<BackupRecord>, ConfigError> {
        let result = self.commit_steps(content).await;
        let status = match &result {
            Ok(_) => "success",
            Err(ConfigError::ValidationRejected { .. }) => "rejected",
            Err(ConfigError::ReloadAfterWriteFailed { .. }) => "reload_failed",
            Err(_) => "error",
        };
        metrics::record_commit(status);
        result
    }

    async fn commit_steps(&self, content: &str) -> Result<Option<BackupRecord>, ConfigError> {
        let path = &self.config_path;

        if self.validate_on_commit {
            let verdict = self.validator.validate(content).await?;
            if !verdict.valid {
                warn!(path = %path.display(), error = %verdict.error, "Commit rejected by checker");
                return Err(ConfigError::ValidationRejected { result: verdict });
            }
        } else {
            debug!(path = %path.display(), "Skipping validation on commit");
        }

        let backup = match self.backups.snapshot(path) {
            Ok(record) => Some(record),
            Err(BackupError::SourceMissing { .. }) => {
                warn!(path = %path.display(), "Tracked file does not exist yet, no snapshot taken");
                None
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Snapshot failed, commit aborted");
                return Err(e.into());
            }
        };

        let mode = existing_mode(path);
        if let Err(e) = write_atomic(path, content.as_bytes(), mode) {
            error!(path = %path.display(), error = %e, "Failed to write configuration");
            return Err(ConfigError::io(path, &e));
        }
        debug!(path = %path.display(), bytes = content.len(), "Configuration written");

        self.reload_after_write(backup.as_ref()).await?;

        info!(
            path = %path.display(),
            backup = ?backup.as_ref().map(|b| b.id.as_str()),
            "Configuration committed"
        );
        Ok(backup)
    }

    async fn reload_after_write(&self, backup: Option<&BackupRecord>) -> Result<(), ConfigError> {
        if let Err(e) = self.daemon.reload().await {
            error!(
                path = %self.config_path.display(),
                error = %e,
                backup = ?backup.map(|b| b.path.display().to_string()),
                "Configuration written but daemon reload failed"
            );
            return Err(ConfigError::ReloadAfterWriteFailed {
                reason: e.to_string(),
                backup: backup.map(|b| b.path.clone()),
            });
        }
        Ok(())
    }

    /// Snapshots of the tracked file, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Backup`] if the backup directory cannot be read.
    pub fn list_backups(&self) -> Result<Vec<BackupRecord>, ConfigError> {
        Ok(self.backups.list(&self.config_path)?)
    }

    /// Take a snapshot of the tracked file now.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Backup`] if the file is missing or cannot be copied.
    pub async fn create_backup(&self) -> Result<BackupRecord, ConfigError> {
        let _guard = self.lock.lock().await;
        Ok(self.backups.snapshot(&self.config_path)?)
    }

    /// Overwrite the tracked file with snapshot `id` and reload the daemon.
    ///
    /// The current file is snapshotted first; that snapshot is returned.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Backup`] when `id` is invalid, missing, or unreadable
    /// - [`ConfigError::ReloadAfterWriteFailed`] when the restore is on disk
    ///   but the reload failed
    pub async fn restore_backup(&self, id: &str) -> Result<Option<BackupRecord>, ConfigError> {
        let _guard = self.lock.lock().await;
        let backup = self.backups.resolve_for(&self.config_path, id)?;

        let previous = match self.backups.restore(&backup, &self.config_path) {
            Ok(previous) => previous,
            Err(e) => {
                metrics::record_commit("error");
                return Err(e.into());
            }
        };

        if let Err(e) = self.reload_after_write(previous.as_ref()).await {
            metrics::record_commit("reload_failed");
            return Err(e);
        }
        metrics::record_commit("success");
        info!(path = %self.config_path.display(), backup = %id, "Snapshot restored");
        Ok(previous)
    }

    /// Delete snapshot `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Backup`] when `id` is invalid or missing.
    pub async fn delete_backup(&self, id: &str) -> Result<(), ConfigError> {
        let _guard = self.lock.lock().await;
        let backup = self.backups.resolve_for(&self.config_path, id)?;
        Ok(self.backups.delete(&backup)?)
    }

    /// Zones declared in the tracked file, its includes and its views.
    ///
    /// # Errors
    ///
    /// Returns the parser's error when the configuration cannot be parsed.
    pub fn list_zones(&self) -> Result<Vec<ZoneInfo>, ConfigError> {
        let tree = self.parse()?;
        let source = absolute_source(&self.config_path);
        let mut zones = Vec::new();
        collect_zones(tree.children(), &source, None, &mut zones);
        Ok(zones)
    }

    /// Declare a zone at the end of the tracked file and commit.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidZone`] when `spec` is incomplete
    /// - [`ConfigError::ZoneAlreadyExists`] when a zone of that name is declared
    /// - any error of [`ConfigManager::update_content`]
    pub async fn add_zone(&self, spec: &ZoneSpec) -> Result<Option<BackupRecord>, ConfigError> {
        spec.check()?;
        let _guard = self.lock.lock().await;

        let tree = self.parse()?;
        let name = spec.name.trim();
        let mut existing = Vec::new();
        collect_zones(tree.children(), &self.config_path, None, &mut existing);
        if existing.iter().any(|z| z.name == name) {
            return Err(ConfigError::ZoneAlreadyExists {
                zone: name.to_string(),
            });
        }

        let mut children = tree.children().to_vec();
        children.push(spec.to_block());
        let content = generator::generate(&ConfigElement::root(children));

        info!(zone = %name, zone_type = %spec.zone_type, "Declaring zone");
        self.commit_locked(&content).await
    }

    /// Remove a zone declared in the tracked file itself and commit.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZoneInInclude`] when the zone lives in an included file
    /// - [`ConfigError::ZoneNotFound`] when no such zone is declared
    /// - any error of [`ConfigManager::update_content`]
    pub async fn remove_zone(&self, name: &str) -> Result<Option<BackupRecord>, ConfigError> {
        let _guard = self.lock.lock().await;

        let tree = self.parse()?;
        let mut children = tree.children().to_vec();
        if !remove_zone_from(&mut children, name) {
            let mut zones = Vec::new();
            collect_zones(tree.children(), &self.config_path, None, &mut zones);
            return Err(match zones.into_iter().find(|z| z.name == name) {
                Some(zone) => ConfigError::ZoneInInclude {
                    zone: name.to_string(),
                    path: zone.source,
                },
                None => ConfigError::ZoneNotFound {
                    zone: name.to_string(),
                },
            });
        }

        let content = generator::generate(&ConfigElement::root(children));
        info!(zone = %name, "Removing zone");
        self.commit_locked(&content).await
    }

    /// Ask the daemon to re-read its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Daemon`] when the control command fails.
    pub async fn reload(&self) -> Result<(), ConfigError> {
        Ok(self.daemon.reload().await?)
    }

    /// Start the daemon.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Daemon`] when the control command fails.
    pub async fn start(&self) -> Result<(), ConfigError> {
        Ok(self.daemon.start().await?)
    }

    /// Stop the daemon.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Daemon`] when the control command fails.
    pub async fn stop(&self) -> Result<(), ConfigError> {
        Ok(self.daemon.stop().await?)
    }

    /// Daemon status text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Daemon`] when the control command fails.
    pub async fn status(&self) -> Result<String, ConfigError> {
        Ok(self.daemon.status().await?)
    }
}

/// Permission bits of the existing file, or `0644` when there is none.
fn existing_mode(path: &Path) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(path) {
            return meta.permissions().mode() & 0o7777;
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    CONFIG_FILE_MODE
}

fn absolute_source(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn zone_statement(block: &Block, statement: &str) -> Option<String> {
    block.children.iter().find_map(|child| match child {
        ConfigElement::Simple(simple) if simple.name == statement => Some(simple.value.clone()),
        _ => None,
    })
}

/// Label of a one-line `zone "name" { ... };` kept as a statement.
fn inline_zone_name(simple: &Simple) -> Option<&str> {
    let rest = simple.value.strip_prefix('"')?;
    rest.find('"').map(|end| &rest[..end])
}

/// Value of `statement` inside the braces of a one-line zone.
fn inline_statement(simple: &Simple, statement: &str) -> Option<String> {
    let open = simple.value.find('{')?;
    simple.value[open + 1..]
        .split(';')
        .map(str::trim)
        .find_map(|part| {
            let rest = part.strip_prefix(statement)?;
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            Some(rest.trim().trim_matches('"').to_string())
        })
}

fn declares_zone(element: &ConfigElement, name: &str) -> bool {
    match element {
        ConfigElement::Block(block) => block.name == ZONE && block.value.as_deref() == Some(name),
        ConfigElement::Simple(simple) => simple.name == ZONE && inline_zone_name(simple) == Some(name),
        _ => false,
    }
}

fn collect_zones(
    elements: &[ConfigElement],
    source: &Path,
    view: Option<&str>,
    zones: &mut Vec<ZoneInfo>,
) {
    for element in elements {
        match element {
            ConfigElement::Block(block) if block.name == ZONE => {
                if let Some(name) = &block.value {
                    zones.push(ZoneInfo {
                        name: name.clone(),
                        zone_type: zone_statement(block, "type"),
                        file: zone_statement(block, "file"),
                        view: view.map(str::to_string),
                        source: source.to_path_buf(),
                    });
                }
            }
            ConfigElement::Simple(simple) if simple.name == ZONE => {
                if let Some(name) = inline_zone_name(simple) {
                    zones.push(ZoneInfo {
                        name: name.to_string(),
                        zone_type: inline_statement(simple, "type"),
                        file: inline_statement(simple, "file"),
                        view: view.map(str::to_string),
                        source: source.to_path_buf(),
                    });
                }
            }
            ConfigElement::Block(block) if block.name == VIEW => {
                collect_zones(&block.children, source, block.value.as_deref(), zones);
            }
            ConfigElement::Include(include) => {
                collect_zones(&include.children, &include.resolved_path, view, zones);
            }
            _ => {}
        }
    }
}

/// Remove the first declaration of `name` outside includes.
fn remove_zone_from(elements: &mut Vec<ConfigElement>, name: &str) -> bool {
    let position = elements
        .iter()
        .position(|element| declares_zone(element, name));
    if let Some(index) = position {
        let removed = elements.remove(index);
        if !removed.leading_comments().is_empty() {
            debug!(zone = %name, "Dropping comments attached to removed zone");
        }
        return true;
    }

    elements.iter_mut().any(|element| match element {
        ConfigElement::Block(block) if block.name == VIEW => {
            remove_zone_from(&mut block.children, name)
        }
        _ => false,
    })
}
