// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Positional line diff between two configuration revisions.
//!
//! Lines are compared index by index rather than by longest common
//! subsequence. The result is cheap, deterministic and stable when lines are
//! appended, which is what the review UI needs. A changed line is reported as
//! a `removed` line immediately followed by an `added` line with the same line
//! number.
//!
//! # Example
//!
//! ```rust
//! use bindconf::diff::{diff, DiffKind};
//!
//! let result = diff("a\nb\nc", "a\nB\nc");
//! assert_eq!(result.stats.added, 1);
//! assert_eq!(result.stats.removed, 1);
//! assert_eq!(result.lines[1].kind, DiffKind::Removed);
//! ```

use serde::{Deserialize, Serialize};

/// How a line differs between the two revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    /// Present and identical in both revisions
    Unchanged,
    /// Present only in the new revision
    Added,
    /// Present only in the old revision
    Removed,
}

/// One line of a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    /// How the line differs
    pub kind: DiffKind,
    /// 1-based position of the line
    pub line_number: usize,
    /// Line text without the newline
    pub content: String,
}

/// Counts of each kind of line in a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    /// Unchanged lines
    pub unchanged: usize,
    /// Added lines
    pub added: usize,
    /// Removed lines
    pub removed: usize,
    /// Sum of the three counts above
    pub total: usize,
}

/// Ordered diff lines plus statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Diff lines in emission order
    pub lines: Vec<DiffLine>,
    /// Counts of each kind in `lines`
    pub stats: DiffStats,
}

impl DiffResult {
    /// Whether the two revisions differ at all.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.stats.added > 0 || self.stats.removed > 0
    }

    fn push(&mut self, kind: DiffKind, line_number: usize, content: &str) {
        match kind {
            DiffKind::Unchanged => self.stats.unchanged += 1,
            DiffKind::Added => self.stats.added += 1,
            DiffKind::Removed => self.stats.removed += 1,
        }
        self.stats.total += 1;
        self.lines.push(DiffLine {
            kind,
            line_number,
            content: content.to_string(),
        });
    }
}

/// Compare `old` and `new` line by line.
#[must_use]
pub fn diff(old: &str, new: &str) -> DiffResult {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();
    let mut result = DiffResult::default();

    for i in 0..old_lines.len().max(new_lines.len()) {
        let line_number = i + 1;
        match (old_lines.get(i), new_lines.get(i)) {
            (Some(o), Some(n)) if o == n => result.push(DiffKind::Unchanged, line_number, o),
            (Some(o), Some(n)) => {
                result.push(DiffKind::Removed, line_number, o);
                result.push(DiffKind::Added, line_number, n);
            }
            (Some(o), None) => result.push(DiffKind::Removed, line_number, o),
            (None, Some(n)) => result.push(DiffKind::Added, line_number, n),
            (None, None) => {}
        }
    }

    result
}
