// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Line-oriented parser for `named.conf`.
//!
//! The parser works one physical line at a time:
//!
//! - `//` and `#` comment lines are collected and attached to the next element
//! - a trailing comment is split off each line before it is classified
//! - `include "path";` is resolved against the including file's directory and
//!   the target is parsed and inlined
//! - a line ending in `{` opens a block that runs until a line reading `}` or `};`
//! - a line whose braces balance is kept verbatim as a single statement
//! - anything else is a `name value;` statement
//!
//! C-style `/* ... */` comments are not recognised.

use super::{Block, ConfigElement, Include, Simple};
use crate::constants::DEFAULT_MAX_INCLUDE_DEPTH;
use crate::errors::ParseError;
use std::path::{Component, Path, PathBuf};
use std::str::Lines;
use tracing::debug;

/// Parser for `named.conf`-style text.
#[derive(Debug, Clone, Copy)]
pub struct Parser {
    max_include_depth: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INCLUDE_DEPTH)
    }
}

impl Parser {
    /// Create a parser that follows at most `max_include_depth` nested includes.
    #[must_use]
    pub fn new(max_include_depth: usize) -> Self {
        Self { max_include_depth }
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Io`] if the file cannot be read, or any error
    /// produced by [`Parser::parse_str`].
    pub fn parse_file(&self, path: &Path) -> Result<ConfigElement, ParseError> {
        let file = absolute(path);
        let text = std::fs::read_to_string(&file).map_err(|e| ParseError::Io {
            file: file.clone(),
            reason: e.to_string(),
        })?;
        self.parse_str(&file, &text)
    }

    /// Parse `text` as the contents of the file at `path`.
    ///
    /// `path` is only used to resolve relative `include` directives and to
    /// label errors; it is not read.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the file and 1-based line number when a line
    /// is malformed, a block is never closed, or an included file cannot be read.
    pub fn parse_str(&self, path: &Path, text: &str) -> Result<ConfigElement, ParseError> {
        let file = absolute(path);
        let mut chain = vec![file.clone()];
        let children = self.parse_document(&file, text, &mut chain)?;
        Ok(ConfigElement::Root { children })
    }

    fn parse_document(
        &self,
        file: &Path,
        text: &str,
        chain: &mut Vec<PathBuf>,
    ) -> Result<Vec<ConfigElement>, ParseError> {
        let mut cursor = Cursor {
            parser: *self,
            file,
            lines: text.lines(),
            line_no: 0,
            pending: Vec::new(),
            chain,
        };
        let children = cursor.parse_body(None)?;
        if !cursor.pending.is_empty() {
            debug!(
                file = %file.display(),
                dropped = cursor.pending.len(),
                "Comments at end of file have no element to attach to"
            );
        }
        Ok(children)
    }
}

struct Cursor<'a, 'c> {
    parser: Parser,
    file: &'a Path,
    lines: Lines<'a>,
    line_no: usize,
    pending: Vec<String>,
    chain: &'c mut Vec<PathBuf>,
}

impl Cursor<'_, '_> {
    /// Parse elements until end of input or, inside a block, the closing brace.
    fn parse_body(&mut self, open: Option<(usize, &str)>) -> Result<Vec<ConfigElement>, ParseError> {
        let mut children = Vec::new();

        while let Some(raw) = self.lines.next() {
            self.line_no += 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(comment) = comment_line(trimmed) {
                self.pending.push(comment.to_string());
                continue;
            }

            let (code, trailing) = split_trailing_comment(trimmed);
            let code = code.trim();
            if code.is_empty() {
                continue;
            }

            if code == "}" || code == "};" {
                if open.is_some() {
                    return Ok(children);
                }
                return Err(self.syntax("closing brace without an open block"));
            }

            let element = self.parse_element(code, trailing)?;
            children.push(element);
        }

        match open {
            Some((line, name)) => Err(ParseError::UnterminatedBlock {
                file: self.file.to_path_buf(),
                line,
                name: name.to_string(),
            }),
            None => Ok(children),
        }
    }

    fn parse_element(
        &mut self,
        code: &str,
        trailing: Option<&str>,
    ) -> Result<ConfigElement, ParseError> {
        let trailing_comment = trailing.map(str::to_string);

        if is_include(code) {
            return self.parse_include(code, trailing_comment);
        }

        let opens = count_unquoted(code, '{');
        let closes = count_unquoted(code, '}');

        if opens == 0 && closes == 0 {
            let mut simple = self.parse_simple(code)?;
            simple.trailing_comment = trailing_comment;
            simple.leading_comments = std::mem::take(&mut self.pending);
            return Ok(ConfigElement::Simple(simple));
        }

        if opens == closes && !code.starts_with('{') {
            // One-line block: keep the inline text as the statement payload.
            let body = strip_terminator(code);
            let (name, rest) = split_name(body);
            return Ok(ConfigElement::Simple(Simple {
                name: name.to_string(),
                value: rest.to_string(),
                quoted: false,
                leading_comments: std::mem::take(&mut self.pending),
                trailing_comment,
            }));
        }

        if opens == 1 && closes == 0 && code.ends_with('{') {
            let header_line = self.line_no;
            let (name, value) = self.parse_block_header(&code[..code.len() - 1])?;
            let leading_comments = std::mem::take(&mut self.pending);
            let children = self.parse_body(Some((header_line, &name)))?;
            return Ok(ConfigElement::Block(Block {
                name,
                value,
                leading_comments,
                trailing_comment,
                children,
            }));
        }

        Err(self.syntax("unbalanced braces"))
    }

    fn parse_simple(&self, code: &str) -> Result<Simple, ParseError> {
        let body = strip_terminator(code);
        if body.is_empty() {
            return Err(self.syntax("empty statement"));
        }
        let (name, rest) = split_name(body);
        let (value, quoted) = match unquote(rest) {
            Some(inner) => (inner.to_string(), true),
            None => (rest.to_string(), false),
        };
        Ok(Simple {
            name: name.to_string(),
            value,
            quoted,
            leading_comments: Vec::new(),
            trailing_comment: None,
        })
    }

    /// Parse `name [qualifier ...] ["label"] [IN]` preceding an opening brace.
    fn parse_block_header(&self, header: &str) -> Result<(String, Option<String>), ParseError> {
        let mut names: Vec<&str> = Vec::new();
        let mut label: Option<String> = None;
        let mut class_seen = false;

        for token in tokenize(header) {
            if class_seen {
                return Err(self.syntax("unexpected token after class"));
            }
            if let Some(inner) = unquote(token) {
                if names.is_empty() || label.is_some() {
                    return Err(self.syntax("unexpected quoted string in block header"));
                }
                label = Some(inner.to_string());
            } else if label.is_some() {
                if !token.eq_ignore_ascii_case("IN") {
                    return Err(self.syntax("unexpected token after block label"));
                }
                class_seen = true;
            } else {
                names.push(token);
            }
        }

        if names.is_empty() {
            return Err(self.syntax("block without a name"));
        }
        Ok((names.join(" "), label))
    }

    fn parse_include(
        &mut self,
        code: &str,
        trailing_comment: Option<String>,
    ) -> Result<ConfigElement, ParseError> {
        let line = self.line_no;
        let target = strip_terminator(&code["include".len()..]);
        let Some(written) = unquote(target) else {
            return Err(self.syntax("malformed include directive"));
        };

        let resolved = resolve_include(self.file, written);
        if self.chain.contains(&resolved) {
            return Err(ParseError::IncludeCycle {
                file: self.file.to_path_buf(),
                line,
                path: resolved,
            });
        }
        if self.chain.len() > self.parser.max_include_depth {
            return Err(ParseError::IncludeDepthExceeded {
                file: self.file.to_path_buf(),
                line,
                limit: self.parser.max_include_depth,
            });
        }

        let text = std::fs::read_to_string(&resolved).map_err(|e| ParseError::IncludeIo {
            file: self.file.to_path_buf(),
            line,
            path: resolved.clone(),
            reason: e.to_string(),
        })?;

        debug!(
            file = %self.file.display(),
            include = %resolved.display(),
            "Parsing included file"
        );

        let leading_comments = std::mem::take(&mut self.pending);
        self.chain.push(resolved.clone());
        let children = self.parser.parse_document(&resolved, &text, self.chain);
        self.chain.pop();

        Ok(ConfigElement::Include(Include {
            path: written.to_string(),
            resolved_path: resolved,
            leading_comments,
            trailing_comment,
            children: children?,
        }))
    }

    fn syntax(&self, cause: &str) -> ParseError {
        ParseError::Syntax {
            file: self.file.to_path_buf(),
            line: self.line_no,
            cause: cause.to_string(),
        }
    }
}

/// Comment text of a full-line comment, without its delimiter.
fn comment_line(trimmed: &str) -> Option<&str> {
    trimmed
        .strip_prefix("//")
        .or_else(|| trimmed.strip_prefix('#'))
        .map(str::trim)
}

/// Split `line` at the first `//` or `#` that is not inside a quoted string.
///
/// Returns the code before the delimiter and the trimmed comment text after
/// it, if any. Backslash escapes are honoured both inside and outside quotes.
pub(crate) fn split_trailing_comment(line: &str) -> (&str, Option<&str>) {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = line.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' | '\'' => match quote {
                None => quote = Some(c),
                Some(q) if q == c => quote = None,
                Some(_) => {}
            },
            '#' if quote.is_none() => return split_comment(line, i, 1),
            '/' if quote.is_none() && matches!(chars.peek(), Some((_, '/'))) => {
                return split_comment(line, i, 2);
            }
            _ => {}
        }
    }

    (line, None)
}

fn split_comment(line: &str, at: usize, width: usize) -> (&str, Option<&str>) {
    let comment = line[at + width..].trim();
    let comment = (!comment.is_empty()).then_some(comment);
    (&line[..at], comment)
}

/// Count occurrences of `target` outside double-quoted strings.
fn count_unquoted(code: &str, target: char) -> usize {
    let mut in_quotes = false;
    let mut escaped = false;
    let mut count = 0;
    for c in code.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            in_quotes = !in_quotes;
        } else if c == target && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Split on whitespace, keeping double-quoted strings (with their quotes) whole.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => {
                in_quotes = !in_quotes;
                if start.is_none() {
                    start = Some(i);
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if let Some(s) = start.take() {
                    tokens.push(&text[s..i]);
                }
            }
            _ => {
                if start.is_none() {
                    start = Some(i);
                }
            }
        }
    }
    if let Some(s) = start {
        tokens.push(&text[s..]);
    }
    tokens
}

/// The contents of `text` if it is exactly one double-quoted string.
fn unquote(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return None;
        }
    }
    Some(inner)
}

/// Trim and drop one terminating semicolon.
fn strip_terminator(code: &str) -> &str {
    let code = code.trim();
    code.strip_suffix(';').unwrap_or(code).trim_end()
}

/// Split a statement into its first token and the trimmed remainder.
fn split_name(body: &str) -> (&str, &str) {
    match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    }
}

fn is_include(code: &str) -> bool {
    code.strip_prefix("include")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_whitespace() || c == '"')
}

/// Resolve an include target against the directory of the including file.
fn resolve_include(including_file: &Path, target: &str) -> PathBuf {
    let target = Path::new(target);
    if target.is_absolute() {
        return normalize(target);
    }
    let dir = including_file.parent().unwrap_or_else(|| Path::new("/"));
    normalize(&dir.join(target))
}

fn absolute(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    normalize(&absolute)
}

/// Lexically remove `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
