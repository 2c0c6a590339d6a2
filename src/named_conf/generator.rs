// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Canonical text rendering of configuration trees.
//!
//! Rendering rules:
//!
//! - four spaces of indentation per nesting level
//! - leading comments become `# text` lines at the element's indent
//! - a trailing comment is appended as ` # text` to the element's first line
//! - blocks render as `name "label" {` ... `};`
//! - statements render as `name "value";`, `name value;` or `name;`
//! - includes render as `include "path";` without re-expanding the target

use super::{Block, ConfigElement, Include, Simple};
use crate::constants::{COMMENT_PREFIX, INDENT};
use crate::errors::GenerateError;
use std::fmt::Write;

/// Render an optional tree, failing with [`GenerateError::NilRoot`] when absent.
///
/// # Errors
///
/// Returns [`GenerateError::NilRoot`] if `root` is `None`.
pub fn render(root: Option<&ConfigElement>) -> Result<String, GenerateError> {
    root.map(generate).ok_or(GenerateError::NilRoot)
}

/// Render a tree to canonical text.
///
/// A root renders its children at the top level; any other element renders
/// itself at the top level.
#[must_use]
pub fn generate(root: &ConfigElement) -> String {
    let mut out = String::new();
    match root {
        ConfigElement::Root { children } => {
            for child in children {
                write_element(&mut out, child, 0);
            }
        }
        element => write_element(&mut out, element, 0),
    }
    out
}

fn write_element(out: &mut String, element: &ConfigElement, depth: usize) {
    let indent = INDENT.repeat(depth);

    for comment in element.leading_comments() {
        let _ = writeln!(out, "{indent}{COMMENT_PREFIX} {comment}");
    }

    match element {
        ConfigElement::Root { children } => {
            // Only reachable for hand-built trees that nest a root.
            for child in children {
                write_element(out, child, depth);
            }
        }
        ConfigElement::Block(block) => write_block(out, block, &indent, depth),
        ConfigElement::Simple(simple) => {
            out.push_str(&indent);
            out.push_str(&simple_line(simple));
            end_line(out, simple.trailing_comment.as_deref());
        }
        ConfigElement::Include(include) => write_include(out, include, &indent),
    }
}

fn write_block(out: &mut String, block: &Block, indent: &str, depth: usize) {
    out.push_str(indent);
    out.push_str(&block.name);
    if let Some(label) = block.value.as_deref().filter(|v| !v.is_empty()) {
        let _ = write!(out, " \"{label}\"");
    }
    out.push_str(" {");
    end_line(out, block.trailing_comment.as_deref());

    for child in &block.children {
        write_element(out, child, depth + 1);
    }

    let _ = writeln!(out, "{indent}}};");
}

fn write_include(out: &mut String, include: &Include, indent: &str) {
    let _ = write!(out, "{indent}include \"{}\";", include.path);
    end_line(out, include.trailing_comment.as_deref());
}

fn simple_line(simple: &Simple) -> String {
    if simple.value.is_empty() {
        format!("{};", simple.name)
    } else if simple.quoted {
        format!("{} \"{}\";", simple.name, simple.value)
    } else {
        format!("{} {};", simple.name, simple.value)
    }
}

fn end_line(out: &mut String, trailing_comment: Option<&str>) {
    if let Some(comment) = trailing_comment {
        let _ = write!(out, " {COMMENT_PREFIX} {comment}");
    }
    out.push('\n');
}
