// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The dispatch engine: resolve, per child token, which handler of
//! the caller-supplied [Schema] builds the child's node, invoke it,
//! and fold the result into the parent's value map.
//!
//! Resolution order, first match wins:
//!
//! * a positional handler for the child's sibling index (stored
//!   dynamic-group),
//! * a required-unique handler for the child's key (unique-or-error),
//! * an always-group handler for the child's key (always-group),
//! * a declared default-boolean flag key on a bare atom
//!   (unique-or-error),
//! * the schema's fallback, by default generic coercion
//!   (dynamic-group).
//!
//! A handler failure for one child is recorded against the node being
//! built and never aborts the siblings; only a keyless root or a
//! designator mismatch is fatal here.

use crate::coerce;
use crate::node::{Key, MergePolicy, Node, Slot, Value, ValueMap};
use crate::tokenize::{ListToken, Token};
use anyhow::anyhow;
use kstring::KString;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("list at line {0} has no key")]
    MissingKey(u32),
    #[error("invalid header: {found} (expecting {expected})")]
    InvalidHeader { expected: KString, found: KString },
}

/// One recorded, non-fatal failure while building a node. `parent`
/// is filled in when the offending token is a bare atom that cannot
/// be located on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildError {
    pub message: String,
    pub token: Token,
    pub parent: Option<ListToken>,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
           -> Result<(), std::fmt::Error> {
        f.write_fmt(format_args!("{}: {}", self.message, self.token))?;
        if let Some(parent) = &self.parent {
            f.write_fmt(format_args!(" in {}", parent))?;
        }
        Ok(())
    }
}

/// A handler either returns a slot for the engine to store, or
/// `None` when it has consumed the value itself (stored it elsewhere
/// or dropped it on purpose).
pub type HandlerResult = anyhow::Result<Option<Slot>>;

/// One schema capability: turn a child token into a value slot.
pub trait Handler {
    fn parse(&self, token: &Token) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&Token) -> HandlerResult,
{
    fn parse(&self, token: &Token) -> HandlerResult {
        self(token)
    }
}

/// The capability lookup a concrete text format supplies. The engine
/// queries by child index and by child key; every method has a
/// permissive default so a schema only declares what it constrains.
pub trait Schema {
    /// Root key this schema accepts; `None` accepts any.
    fn designator(&self) -> Option<&str> {
        None
    }

    /// Handler for the child at this sibling position.
    fn positional(&self, index: usize) -> Option<&dyn Handler> {
        let _ = index;
        None
    }

    /// Handler for a key that must not occur more than once.
    fn unique(&self, key: &str) -> Option<&dyn Handler> {
        let _ = key;
        None
    }

    /// Handler for a key whose occurrences always collect into a
    /// group, even a single one.
    fn grouped(&self, key: &str) -> Option<&dyn Handler> {
        let _ = key;
        None
    }

    /// Keys whose bare presence means `true`; each one missing from
    /// the input is synthesized as an explicit `false` flag after
    /// dispatch.
    fn flag_keys(&self) -> &[KString] {
        &[]
    }

    /// Last resort for a child no other capability claimed.
    fn fallback(&self, index: usize, token: &Token) -> HandlerResult {
        let _ = index;
        generic(token)
    }
}

/// The schema with no capabilities: every child goes through the
/// generic coercion fallback.
#[derive(Debug, Default)]
pub struct Generic;

impl Schema for Generic {}

/// Build a validated node from a token list under the given schema.
pub fn build<S: Schema + ?Sized>(list: &ListToken, schema: &S)
                                 -> Result<Node, SchemaError> {
    let key = list.key().ok_or(SchemaError::MissingKey(list.line))?;
    if let Some(expected) = schema.designator() {
        if key != expected {
            return Err(SchemaError::InvalidHeader {
                expected: KString::from_ref(expected),
                found: KString::from_ref(key),
            });
        }
    }

    let mut map = ValueMap::new();
    let mut errors: Vec<BuildError> = Vec::new();

    for (index, child) in list.children().iter().enumerate() {
        let subkey = match child {
            Token::Atom(s) => Some(s.as_str()),
            Token::List(l) => l.key(),
        };
        let (result, policy) = resolve(schema, index, subkey, child);
        match result {
            Ok(Some(slot)) => {
                if let Err(e) = map.insert_slot(slot, policy) {
                    record(&mut errors, e.to_string(), child, list);
                }
            }
            Ok(None) => {}
            Err(e) => record(&mut errors, e.to_string(), child, list),
        }
    }

    for flag in schema.flag_keys() {
        let key = Key::Name(flag.clone());
        if !map.contains(&key) {
            let _ = map.insert(Node::flag(key, false),
                               MergePolicy::UniqueOrError);
        }
    }

    let mut node = Node::new(key, map);
    node.set_errors(errors);
    Ok(node)
}

fn resolve<S: Schema + ?Sized>(
    schema: &S,
    index: usize,
    subkey: Option<&str>,
    child: &Token,
) -> (HandlerResult, MergePolicy) {
    if let Some(handler) = schema.positional(index) {
        debug!("child {index}: positional handler");
        return (handler.parse(child), MergePolicy::DynamicGroup);
    }
    if let Some(key) = subkey {
        if let Some(handler) = schema.unique(key) {
            debug!("child {index}: required-unique handler for {key}");
            return (handler.parse(child), MergePolicy::UniqueOrError);
        }
        if let Some(handler) = schema.grouped(key) {
            debug!("child {index}: always-group handler for {key}");
            return (handler.parse(child), MergePolicy::AlwaysGroup);
        }
        if schema.flag_keys().iter().any(|k| k.as_str() == key) {
            debug!("child {index}: default-true flag {key}");
            return (default_true(child), MergePolicy::UniqueOrError);
        }
    }
    debug!("child {index}: fallback");
    (schema.fallback(index, child), MergePolicy::DynamicGroup)
}

fn record(errors: &mut Vec<BuildError>, message: String,
          token: &Token, parent: &ListToken) {
    let parent = match token {
        Token::Atom(_) => Some(parent.clone()),
        Token::List(_) => None,
    };
    let err = BuildError {
        message,
        token: token.clone(),
        parent,
    };
    error!("{err}");
    errors.push(err);
}

fn default_true(token: &Token) -> HandlerResult {
    match token {
        Token::Atom(s) =>
            Ok(Some(Slot::Node(Node::flag(s.as_str(), true)))),
        Token::List(_) => Err(anyhow!("invalid boolean data")),
    }
}

const DEPTH_FUEL: u32 = 500;
// ^ far beyond any sane config nesting; the guard exists for
// adversarial input only

/// Best-effort handling of a child no capability claimed. Atoms
/// coerce to anonymous scalar nodes. A flat list becomes a scalar
/// row keyed by its head; a list containing further lists is
/// re-dispatched schema-lessly.
pub fn generic(token: &Token) -> HandlerResult {
    generic_at(token, DEPTH_FUEL)
}

struct GenericAt(u32);

impl Schema for GenericAt {
    fn fallback(&self, _index: usize, token: &Token) -> HandlerResult {
        generic_at(token, self.0)
    }
}

fn generic_at(token: &Token, depth_fuel: u32) -> HandlerResult {
    match token {
        Token::Atom(s) =>
            Ok(Some(Slot::Node(Node::anon(coerce::scalar(s))))),
        Token::List(list) => {
            if depth_fuel == 0 {
                return Err(anyhow!("nesting too deep"));
            }
            let key = list.key().ok_or_else(|| anyhow!("no key"))?;
            if list.children().iter().any(|c| matches!(c, Token::List(_))) {
                let node = build(list, &GenericAt(depth_fuel - 1))?;
                return Ok(Some(Slot::Node(node)));
            }
            let mut scalars = Vec::with_capacity(list.children().len());
            for child in list.children() {
                if let Token::Atom(s) = child {
                    scalars.push(coerce::scalar(s));
                }
            }
            let value = match scalars.len() {
                0 => Value::None,
                1 => match scalars.pop() {
                    Some(s) => Value::Scalar(s),
                    None => Value::None,
                },
                _ => Value::Scalars(scalars),
            };
            Ok(Some(Slot::Node(Node::new(key, value))))
        }
    }
}

/// An explicit [Schema]: a mapping from position index and key
/// string to boxed handlers, built once per format and queried by
/// the engine. Unknown keys fall back to generic coercion unless the
/// table is [strict](HandlerTable::strict).
#[derive(Default)]
pub struct HandlerTable {
    header: Option<KString>,
    positional: HashMap<usize, Box<dyn Handler>>,
    unique: HashMap<KString, Box<dyn Handler>>,
    grouped: HashMap<KString, Box<dyn Handler>>,
    flags: Vec<KString>,
    strict: bool,
}

impl HandlerTable {
    pub fn new() -> HandlerTable {
        HandlerTable::default()
    }

    /// Accept only this root key.
    pub fn header(mut self, key: &str) -> HandlerTable {
        self.header = Some(KString::from_ref(key));
        self
    }

    /// Turn unknown keys into recorded errors instead of generic
    /// values.
    pub fn strict(mut self) -> HandlerTable {
        self.strict = true;
        self
    }

    /// Handle the child at this position.
    pub fn at(mut self, index: usize, handler: impl Handler + 'static)
              -> HandlerTable {
        self.positional.insert(index, Box::new(handler));
        self
    }

    /// Handle this key, at most once per parent.
    pub fn once(mut self, key: &str, handler: impl Handler + 'static)
                -> HandlerTable {
        self.unique.insert(KString::from_ref(key), Box::new(handler));
        self
    }

    /// Handle this key, always collecting into a group.
    pub fn group(mut self, key: &str, handler: impl Handler + 'static)
                 -> HandlerTable {
        self.grouped.insert(KString::from_ref(key), Box::new(handler));
        self
    }

    /// Declare a default-boolean flag key.
    pub fn flag(mut self, key: &str) -> HandlerTable {
        self.flags.push(KString::from_ref(key));
        self
    }
}

impl Schema for HandlerTable {
    fn designator(&self) -> Option<&str> {
        self.header.as_deref()
    }

    fn positional(&self, index: usize) -> Option<&dyn Handler> {
        self.positional.get(&index).map(|h| h.as_ref())
    }

    fn unique(&self, key: &str) -> Option<&dyn Handler> {
        self.unique.get(key).map(|h| h.as_ref())
    }

    fn grouped(&self, key: &str) -> Option<&dyn Handler> {
        self.grouped.get(key).map(|h| h.as_ref())
    }

    fn flag_keys(&self) -> &[KString] {
        &self.flags
    }

    fn fallback(&self, index: usize, token: &Token) -> HandlerResult {
        if self.strict {
            return Err(anyhow!("unknown key"));
        }
        let _ = index;
        generic(token)
    }
}
