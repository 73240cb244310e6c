//! The embedded procedure language for composite QA test calculations.
//!
//! Composite test procedures are short, semi-trusted numeric scripts
//! authored by clinic staff. This crate gives them a sandboxed home: a
//! Python-flavoured expression language with assignments, list literals,
//! library calls and a `result` output convention, executed by a
//! tree-walking evaluator over an explicit binding table.
//!
//! # Architecture
//!
//! - [`lexer`] tokenizes source text. The lenient [`lexer::scan_identifiers`]
//!   entry point backs dependency extraction and never fails; the strict
//!   [`lexer::lex`] feeds the parser.
//! - [`parser`] builds the [`ast`] with a hand-written recursive-descent
//!   parser.
//! - [`eval`] walks the AST against a [`qacalc_core::Context`] under a fuel
//!   budget ([`EvalConfig`]). Bare `/` is always true division; the
//!   language has no truncating integer division.
//! - [`library`] implements the fixed `math` / `numpy` / `scipy` handles.
//!
//! The evaluator can only reach what the context binds: input values,
//! prior results, the three library handles and the upload map. There are
//! no host-process primitives (filesystem, network, environment) to leak.

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod library;
pub mod parser;
pub mod token;

pub use error::{EvalError, LexError, ParseError};
pub use eval::{run_script, EvalConfig};
pub use lexer::scan_identifiers;
