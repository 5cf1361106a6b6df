// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! This is an S-Expression parser, tree model and formatter for
//! line-oriented, schema-free configuration and description
//! languages, with the following goals:
//!
//! * Offering direct access to the token tree, `sexptree::tokenize`,
//!   with every list annotated with its source line and every atom
//!   kept in its original spelling (quotes included, numbers
//!   uninterpreted) so text can be exported back unchanged.
//!
//! * A uniform tree model, `sexptree::node`: named and positional
//!   children in one insertion-ordered multimap, repeated keys
//!   collected into groups, and an explicit merge policy per
//!   insertion instead of silent clobbering.
//!
//! * Declarative per-key validation, `sexptree::schema`: a schema is
//!   an ordinary table of handlers the engine queries by child
//!   position and child key, composable by nesting tables. Handler
//!   failures are collected per node rather than aborting the parse;
//!   only unbalanced brackets are fatal.
//!
//! * Round-trip export, `sexptree::export`, where each node kind
//!   controls its own textual shape.
//!
//! The engine is format-agnostic; the demo program and the tests use
//! KiCad-style footprint descriptions as their sample domain.

pub mod coerce;
pub mod export;
pub mod handlers;
pub mod node;
pub mod schema;
pub mod tokenize;
