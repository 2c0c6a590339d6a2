// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Structured, comment-preserving representation of `named.conf`.
//!
//! The [`parser`] turns configuration text into a [`ConfigElement`] tree and the
//! [`generator`] renders a tree back to canonical text. Trees are plain values:
//! callers edit configuration by building a new tree and rendering it.
//!
//! # Example
//!
//! ```rust
//! use bindconf::named_conf::{generator, parser::Parser, ConfigElement};
//! use std::path::Path;
//!
//! let text = "options {\n    directory \"/var/named\";\n};\n";
//! let tree = Parser::default()
//!     .parse_str(Path::new("/etc/bind/named.conf"), text)
//!     .unwrap();
//! assert_eq!(tree.children().len(), 1);
//! assert_eq!(generator::generate(&tree), text);
//! ```

pub mod generator;
pub mod parser;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One node of a parsed configuration file.
///
/// Serialises with a `kind` tag (`root`, `block`, `simple`, `include`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConfigElement {
    /// Top of a tree; holds the file's top-level elements
    Root {
        /// Top-level elements in source order
        #[serde(default)]
        children: Vec<ConfigElement>,
    },
    /// `name ["label"] { ... };`
    Block(Block),
    /// `name value;`
    Simple(Simple),
    /// `include "path";` with the included file inlined
    Include(Include),
}

/// A braced block such as `options { ... };` or `zone "example.com" { ... };`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Directive name, including any bare qualifiers (`channel default_log`)
    pub name: String,
    /// Quoted label without the quotes (zone name, view name, key name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Comments on their own lines immediately before the block
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub leading_comments: Vec<String>,
    /// Comment after the opening brace on the same line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing_comment: Option<String>,
    /// Nested elements in source order
    #[serde(default)]
    pub children: Vec<ConfigElement>,
}

/// A single statement such as `directory "/var/named";` or `recursion no;`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Simple {
    /// Directive name
    pub name: String,
    /// Payload without the terminating semicolon
    #[serde(default)]
    pub value: String,
    /// Whether the payload was written as one quoted string
    #[serde(default = "default_quoted")]
    pub quoted: bool,
    /// Comments on their own lines immediately before the statement
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub leading_comments: Vec<String>,
    /// Comment after the statement on the same line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing_comment: Option<String>,
}

fn default_quoted() -> bool {
    true
}

/// An `include` directive together with the parsed contents of its target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Include {
    /// Path exactly as written in the directive
    pub path: String,
    /// Absolute path the directive resolved to
    #[serde(default)]
    pub resolved_path: PathBuf,
    /// Comments on their own lines immediately before the directive
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub leading_comments: Vec<String>,
    /// Comment after the directive on the same line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing_comment: Option<String>,
    /// Top-level elements of the included file
    #[serde(default)]
    pub children: Vec<ConfigElement>,
}

impl Simple {
    /// A statement with a quoted payload, rendered `name "value";`.
    #[must_use]
    pub fn quoted(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            quoted: true,
            leading_comments: Vec::new(),
            trailing_comment: None,
        }
    }

    /// A statement with a bare payload, rendered `name value;`.
    #[must_use]
    pub fn bare(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            quoted: false,
            ..Self::quoted(name, value)
        }
    }
}

impl ConfigElement {
    /// An empty tree.
    #[must_use]
    pub fn root(children: Vec<ConfigElement>) -> Self {
        Self::Root { children }
    }

    /// Directive name; empty for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Root { .. } => "",
            Self::Block(b) => &b.name,
            Self::Simple(s) => &s.name,
            Self::Include(_) => "include",
        }
    }

    /// Child elements; always empty for simple statements.
    #[must_use]
    pub fn children(&self) -> &[ConfigElement] {
        match self {
            Self::Root { children } => children,
            Self::Block(b) => &b.children,
            Self::Include(i) => &i.children,
            Self::Simple(_) => &[],
        }
    }

    /// Comments attached before this element.
    #[must_use]
    pub fn leading_comments(&self) -> &[String] {
        match self {
            Self::Root { .. } => &[],
            Self::Block(b) => &b.leading_comments,
            Self::Simple(s) => &s.leading_comments,
            Self::Include(i) => &i.leading_comments,
        }
    }

    /// Comment on the same line as this element, if any.
    #[must_use]
    pub fn trailing_comment(&self) -> Option<&str> {
        match self {
            Self::Root { .. } => None,
            Self::Block(b) => b.trailing_comment.as_deref(),
            Self::Simple(s) => s.trailing_comment.as_deref(),
            Self::Include(i) => i.trailing_comment.as_deref(),
        }
    }

    /// Kind tag as used in the JSON form.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Root { .. } => "root",
            Self::Block(_) => "block",
            Self::Simple(_) => "simple",
            Self::Include(_) => "include",
        }
    }
}

#[cfg(test)]
mod generator_tests;
#[cfg(test)]
mod parser_tests;
