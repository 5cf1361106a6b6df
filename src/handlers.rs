// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Ready-made handlers, the building blocks schemas are assembled
//! from. All of them are plain functions or small factories; a
//! custom handler is just another `Fn(&Token) -> HandlerResult`.

use crate::coerce;
use crate::node::{Node, Scalar, Slot, Value};
use crate::schema::{build, Handler, HandlerResult, Schema};
use crate::tokenize::Token;
use anyhow::{anyhow, bail};
use kstring::KString;
use num::BigInt;

/// Accepts anything and stores nothing.
pub fn discard(_token: &Token) -> HandlerResult {
    Ok(None)
}

/// Expects a bare atom; keeps its text verbatim as an anonymous
/// value.
pub fn atom(token: &Token) -> HandlerResult {
    atom_scalar(token, |s| Ok(Scalar::Str(KString::from_ref(s))))
}

pub fn atom_int(token: &Token) -> HandlerResult {
    atom_scalar(token, |s| Ok(Scalar::Int(s.parse::<BigInt>()?)))
}

pub fn atom_float(token: &Token) -> HandlerResult {
    atom_scalar(token, |s| Ok(Scalar::Float(s.parse::<f64>()?)))
}

fn atom_scalar(
    token: &Token,
    convert: impl Fn(&str) -> anyhow::Result<Scalar>,
) -> HandlerResult {
    match token {
        Token::Atom(s) => Ok(Some(Slot::Node(Node::anon(convert(s)?)))),
        Token::List(_) => Err(anyhow!("expects an atom")),
    }
}

/// Keyed expression with exactly `arity` atom values, kept verbatim.
pub fn row(arity: usize) -> impl Handler {
    move |token: &Token| {
        copy_row(token, arity, |s| Ok(Scalar::Str(KString::from_ref(s))))
    }
}

/// Keyed expression with exactly `arity` integer values.
pub fn int_row(arity: usize) -> impl Handler {
    move |token: &Token| {
        copy_row(token, arity, |s| Ok(Scalar::Int(s.parse::<BigInt>()?)))
    }
}

/// Keyed expression with exactly `arity` floating-point values.
pub fn float_row(arity: usize) -> impl Handler {
    move |token: &Token| {
        copy_row(token, arity, |s| Ok(Scalar::Float(s.parse::<f64>()?)))
    }
}

fn copy_row(
    token: &Token,
    arity: usize,
    convert: impl Fn(&str) -> anyhow::Result<Scalar>,
) -> HandlerResult {
    let list = match token {
        Token::List(list) => list,
        Token::Atom(_) => bail!("expects a list"),
    };
    let children = list.children();
    if children.len() != arity {
        bail!("len={}, expects {}", children.len(), arity);
    }
    let key = list.key().ok_or_else(|| anyhow!("no key"))?;
    let mut scalars = Vec::with_capacity(arity);
    for child in children {
        match child {
            Token::Atom(s) => scalars.push(convert(s)?),
            Token::List(l) =>
                bail!("expects an atom, got a list at line {}", l.line),
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

/// Boolean expression: a bare yes/no literal, or a `(key literal)`
/// pair. The spelling is retained for export; truth is computed on
/// demand via [Node::as_bool](crate::node::Node::as_bool).
pub fn boolean(token: &Token) -> HandlerResult {
    let (key, literal) = match token {
        Token::Atom(s) => (None, s),
        Token::List(list) => {
            let children = list.children();
            if children.len() != 1 {
                bail!("invalid boolean expression");
            }
            let key = list.key().ok_or_else(|| anyhow!("no key"))?;
            match &children[0] {
                Token::Atom(s) => (Some(key), s),
                Token::List(_) => bail!("invalid boolean expression"),
            }
        }
    };
    if coerce::boolean(literal).is_none() {
        bail!("invalid boolean value");
    }
    let node = match key {
        Some(key) => Node::new(key, Value::Bool(literal.clone())),
        None => Node::anon(Value::Bool(literal.clone())),
    };
    Ok(Some(Slot::Node(node)))
}

/// Parse a subtree under its own schema. A handler table composed of
/// `Nested` tables is how arbitrarily deep grammars are declared;
/// `Nested(Generic)` hands the subtree to the schema-less engine.
pub struct Nested<S>(pub S);

impl<S: Schema> Handler for Nested<S> {
    fn parse(&self, token: &Token) -> HandlerResult {
        let list = match token {
            Token::List(list) => list,
            Token::Atom(_) => bail!("expects a list"),
        };
        Ok(Some(Slot::Node(build(list, &self.0)?)))
    }
}
