// Copyright 2023 Christian Jaeger <ch@christianjaeger.ch>. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Semantic-checking parse of a KiCad-style footprint description.
//!
//! Run without arguments to parse the built-in sample, which
//! contains deliberate mistakes; the collected errors are printed
//! followed by the re-exported tree. Set `RUST_LOG=debug` to watch
//! handler resolution.

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use sexptree::export::export;
use sexptree::handlers::{self, Nested};
use sexptree::schema::{build, Generic, Handler, HandlerResult, HandlerTable};
use sexptree::tokenize::{tokenize, tokenize_file, Token};
use std::io::{stdout, BufWriter, Write};
use std::path::PathBuf;

const SAMPLE: &str = r#"
(module DIP-16_0 (layer F.Cu) (tedit 0)
  (fp_text reference REF** (at -11.14 0 90) (layer F.SilkS)
    (effects (font (size 1.2 1.2) (thickness 0.15)))
  )
  (fp_text oops DIP-16_0 (at 0 0) (layer F.Fab)
    (effects (font (size 1.2 1.2 opps) (thickness 0.15)))
  )
  (fp_line_opps (start -9.94 7.399999) (end 9.94 7.4) (layer F.SilkS) (width 0.15))
  (fp_line (start 9.94 7.4) (end 9.94 -7.399999) (layer F.SilkS) (width 0.15))
  (pad 16 thru_hole circle (at -8.89 -6.35) (size 1.05 1.05) (drill 0.65) (layers *.Cu *.Mask F.SilkS))
  (pad 1 thru_hole circle (at -8.89 6.35) (size 1.05 1.05) (drill 0.65) (layers *.Cu *.Mask F.SilkS))
)
"#;

// First value of an fp_text: either 'reference' or 'value'.
fn text_kind(token: &Token) -> HandlerResult {
    let s = token.as_atom().ok_or_else(|| anyhow!("expects atom"))?;
    if s != "reference" && s != "value" {
        bail!("unknown text value");
    }
    handlers::atom(token)
}

// (at x y) with an optional third float for the angle.
fn position(token: &Token) -> HandlerResult {
    handlers::float_row(2)
        .parse(token)
        .or_else(|_| handlers::float_row(3).parse(token))
}

fn font_schema() -> HandlerTable {
    HandlerTable::new()
        .strict()
        .once("size", handlers::float_row(2))
        .once("thickness", handlers::float_row(1))
}

fn effects_schema() -> HandlerTable {
    HandlerTable::new()
        .strict()
        .once("font", Nested(font_schema()))
}

fn text_schema() -> HandlerTable {
    HandlerTable::new()
        .strict()
        .at(0, text_kind)
        .at(1, handlers::atom)
        .once("at", position)
        .once("layer", handlers::row(1))
        .once("effects", Nested(effects_schema()))
}

fn line_schema() -> HandlerTable {
    HandlerTable::new()
        .strict()
        .once("start", handlers::float_row(2))
        .once("end", handlers::float_row(2))
        .once("layer", handlers::row(1))
        .once("width", handlers::float_row(1))
}

fn module_schema() -> HandlerTable {
    HandlerTable::new()
        .strict()
        .header("module")
        .at(0, handlers::atom)
        .once("layer", handlers::row(1))
        .once("tedit", handlers::int_row(1))
        .group("fp_text", Nested(text_schema()))
        .group("fp_line", Nested(line_schema()))
        // Feel lazy? Just let the generic engine handle pads.
        .group("pad", Nested(Generic))
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input file (default: the built-in sample)
    input_path: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let tokens = match &args.input_path {
        Some(path) => tokenize_file(path)?,
        None => tokenize(SAMPLE)?,
    };
    let module = build(&tokens, &module_schema())?;

    let errors = module.all_errors();
    if errors.is_empty() {
        eprintln!("no errors");
    } else {
        eprintln!("{} error(s):", errors.len());
        for e in &errors {
            eprintln!("  {e}");
        }
    }

    let mut out = BufWriter::new(stdout().lock());
    export(&mut out, &module)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
