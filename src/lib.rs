//! Crate root: wires together the compilation pipeline.
//!
//! Compilation is a single pass. The stages are:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` (with `expr` and `stmt`) recognises the grammar, checks types
//!   and emits code in the same walk, so no syntax tree is ever built.
//! - `codegen` holds the instruction shapes the parser emits and the label
//!   tag counter.
//! - `ty` and `symbols` hold the type rules and the declared variables.
//! - `error` centralises the diagnostics shared by the other modules.

pub mod codegen;
pub mod error;
pub mod parser;
pub mod symbols;
pub mod tokenizer;
pub mod ty;

mod expr;
mod stmt;

pub use error::{CompileError, CompileResult};
pub use tokenizer::Token;

/// Compile a source program into AT&T assembly for x86-64.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  let tokens = tokenizer::tokenize(source)?;
  parser::parse(tokens)
}

/// Only the lexical stage, for inspecting how a program is split up.
pub fn tokenize_source(source: &str) -> CompileResult<Vec<Token>> {
  tokenizer::tokenize(source)
}
