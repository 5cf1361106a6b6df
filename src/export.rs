// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Regenerating indented S-expression text from a built tree. Every
//! node kind owns its textual shape: a flag writes its bare key, a
//! boolean writes `(key literal)`, a named composite wraps its
//! children in parens, a positional node emits bare content, and a
//! group splices its members at the caller's level with no
//! bracketing of its own.

use crate::node::{GroupNode, Node, Slot, Value};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

impl Node {
    /// Write this node. `prefix` is the current indentation,
    /// `indent` the increment per nesting level.
    pub fn export(&self, out: &mut impl Write, prefix: &str, indent: &str)
                  -> io::Result<()> {
        match self.value() {
            Value::None => match self.key() {
                Some(key) => write!(out, " {key}"),
                None => Ok(()),
            },
            Value::Flag(set) => {
                if *set {
                    if let Some(key) = self.key() {
                        write!(out, " {key}")?;
                    }
                }
                Ok(())
            }
            Value::Bool(literal) => match self.name() {
                Some(name) => write!(out, "\n{prefix}({name} {literal})"),
                None => write!(out, " {literal}"),
            },
            Value::Scalar(scalar) => match self.name() {
                Some(name) => write!(out, "\n{prefix}({name} {scalar})"),
                None => write!(out, " {scalar}"),
            },
            Value::Scalars(row) => {
                if let Some(name) = self.name() {
                    write!(out, "\n{prefix}({name}")?;
                    for scalar in row {
                        write!(out, " {scalar}")?;
                    }
                    write!(out, ")")
                } else {
                    for scalar in row {
                        write!(out, " {scalar}")?;
                    }
                    Ok(())
                }
            }
            Value::Map(map) => {
                if let Some(name) = self.name() {
                    write!(out, "\n{prefix}({name}")?;
                    let inner = format!("{prefix}{indent}");
                    for slot in map.values() {
                        slot.export(out, &inner, indent)?;
                    }
                    write!(out, ")")
                } else {
                    for slot in map.values() {
                        slot.export(out, prefix, indent)?;
                    }
                    Ok(())
                }
            }
        }
    }
}

impl GroupNode {
    /// A group writes no key and no parens of its own; members
    /// appear as repeated siblings at the caller's indent.
    pub fn export(&self, out: &mut impl Write, prefix: &str, indent: &str)
                  -> io::Result<()> {
        for node in self.iter() {
            node.export(out, prefix, indent)?;
        }
        Ok(())
    }
}

impl Slot {
    pub fn export(&self, out: &mut impl Write, prefix: &str, indent: &str)
                  -> io::Result<()> {
        match self {
            Slot::Node(node) => node.export(out, prefix, indent),
            Slot::Group(group) => group.export(out, prefix, indent),
        }
    }
}

/// Export with the default formatting: no prefix, two-space indent.
pub fn export(mut out: impl Write, node: &Node) -> io::Result<()> {
    node.export(&mut out, "", "  ")
}

/// Export to a file; owns opening and closing it.
pub fn export_file(path: &Path, node: &Node) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    node.export(&mut out, "", "  ")?;
    writeln!(out)?;
    out.flush()
}
