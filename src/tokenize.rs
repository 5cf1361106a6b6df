// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Translating raw text into a line-annotated token tree. Atoms keep
//! their exact source spelling, quote characters included, and are
//! never interpreted as numbers here; that is deferred to
//! [coerce](../coerce/index.html) so that a tree built from the
//! generic fallback can be exported back with the original atom text.

use anyhow::Context;
use kstring::KString;
use regex::Regex;
use std::fmt::Write;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

/// The four token alternatives, tried in order: left paren, right
/// paren, double-quoted string (no escape processing), bare atom.
/// Compiled once per process; initialization is race-free.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s*(?:(?P<l>\()|(?P<r>\))|(?P<q>"[^"]*")|(?P<s>[^()\s]+))"#).unwrap()
});

#[derive(Error, Debug)]
pub enum TokenizeError {
    #[error("unbalanced ')' at line {0}")]
    UnexpectedClose(u32),
    #[error("missing ')' for '(' opened at line {0}")]
    UnclosedList(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A bare word or a quoted string, spelled exactly as in the
    /// source.
    Atom(KString),
    List(ListToken),
}

/// A bracketed sequence `(key child...)`. The first item, when it is
/// an atom, is the list's key.
#[derive(Debug, Clone, PartialEq)]
pub struct ListToken {
    /// 1-based source line of the opening paren.
    pub line: u32,
    /// All elements in source order, key included.
    pub items: Vec<Token>,
}

impl Token {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Token::Atom(s) => Some(s),
            Token::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListToken> {
        match self {
            Token::Atom(_) => None,
            Token::List(l) => Some(l),
        }
    }
}

impl ListToken {
    pub fn key(&self) -> Option<&str> {
        self.items.first()?.as_atom()
    }

    /// Everything after the key.
    pub fn children(&self) -> &[Token] {
        self.items.get(1..).unwrap_or(&[])
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
           -> Result<(), std::fmt::Error> {
        match self {
            Token::Atom(s) => f.write_str(s),
            Token::List(l) => l.fmt(f),
        }
    }
}

impl std::fmt::Display for ListToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
           -> Result<(), std::fmt::Error> {
        f.write_char('(')?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_char(' ')?;
            }
            item.fmt(f)?;
        }
        f.write_char(')')
    }
}

// Cumulative byte offset just past the end of each input line,
// newline included.
fn line_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        offset += line.len();
        ends.push(offset);
    }
    ends
}

fn line_at(ends: &[usize], offset: usize) -> u32 {
    ends.partition_point(|&end| end <= offset) as u32 + 1
}

/// Scan `text` into the single top-level list. Bracket nesting must
/// balance exactly; that is the only fatal condition. Returns an
/// empty list when the input has no tokens. Top-level tokens beyond
/// the first list carry no structure to attach to and are discarded
/// with a warning.
pub fn tokenize(text: &str) -> Result<ListToken, TokenizeError> {
    let ends = line_ends(text);
    let mut stack: Vec<ListToken> = Vec::new();
    let mut top: Vec<Token> = Vec::new();

    for caps in TOKEN_RE.captures_iter(text) {
        if let Some(m) = caps.name("l") {
            stack.push(ListToken {
                line: line_at(&ends, m.start()),
                items: Vec::new(),
            });
        } else if let Some(m) = caps.name("r") {
            let done = match stack.pop() {
                Some(list) => list,
                None => {
                    return Err(TokenizeError::UnexpectedClose(
                        line_at(&ends, m.start())));
                }
            };
            match stack.last_mut() {
                Some(parent) => parent.items.push(Token::List(done)),
                None => top.push(Token::List(done)),
            }
        } else if let Some(m) = caps.name("q").or_else(|| caps.name("s")) {
            let atom = Token::Atom(KString::from_ref(m.as_str()));
            match stack.last_mut() {
                Some(list) => list.items.push(atom),
                None => top.push(atom),
            }
        }
    }

    if let Some(open) = stack.pop() {
        return Err(TokenizeError::UnclosedList(open.line));
    }

    let mut result: Option<ListToken> = None;
    let mut dropped = 0usize;
    for token in top {
        if result.is_none() {
            if let Token::List(list) = token {
                result = Some(list);
                continue;
            }
        }
        dropped += 1;
    }
    if dropped > 0 {
        warn!("discarding {dropped} top-level token(s) outside the first list");
    }
    Ok(result.unwrap_or(ListToken { line: 0, items: Vec::new() }))
}

/// Same as [tokenize] for input already split into lines.
pub fn tokenize_lines<'s>(
    lines: impl IntoIterator<Item = &'s str>,
) -> Result<ListToken, TokenizeError> {
    let mut text = String::new();
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    tokenize(&text)
}

/// Read and tokenize a whole file.
pub fn tokenize_file(path: &Path) -> anyhow::Result<ListToken> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {:?}", path))?;
    Ok(tokenize(&text)?)
}
