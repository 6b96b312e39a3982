//! Recursive-descent parser that type-checks and emits code in one pass.
//!
//! There is no syntax tree: each grammar rule writes its instructions into
//! the `Emitter` as soon as it recognises them and hands the static type of
//! what it pushed back to its caller. The rules are split across this file
//! (program and declarations), `expr.rs` and `stmt.rs`, all as methods on
//! the same `Parser` context.
//!
//! ```text
//! Program       := [VarDeclPart] StatementPart
//! VarDeclPart   := "VAR" VarDecl {";" VarDecl} "."
//! VarDecl       := Ident {"," Ident} ":" Type
//! StatementPart := Statement {";" Statement} "."
//! ```

use std::collections::BTreeMap;

use crate::codegen::{Emitter, TagAllocator};
use crate::error::{
  CompileResult, Location, RedeclaredSnafu, SyntaxSnafu, TrailingInputSnafu, TypeMismatchSnafu,
  UndeclaredIdentifierSnafu,
};
use crate::symbols::{RESERVED, SymbolTable};
use crate::tokenizer::{Token, TokenKind, TokenStream};
use crate::ty::Type;

/// Compile a whole token stream into assembly text.
pub fn parse(tokens: Vec<Token>) -> CompileResult<String> {
  let mut parser = Parser::new(tokens);
  parser.program()?;
  Ok(parser.asm.finish())
}

/// Everything the grammar rules share.
pub struct Parser {
  pub(crate) stream: TokenStream,
  pub(crate) symbols: SymbolTable,
  pub(crate) tags: TagAllocator,
  pub(crate) asm: Emitter,
}

impl Parser {
  pub fn new(tokens: Vec<Token>) -> Self {
    Self {
      stream: TokenStream::new(tokens),
      symbols: SymbolTable::new(),
      tags: TagAllocator::new(),
      asm: Emitter::new(),
    }
  }

  /// Assembly emitted so far.
  pub fn emitted(&self) -> &str {
    self.asm.as_str()
  }

  pub fn symbols(&self) -> &SymbolTable {
    &self.symbols
  }

  // Program := [VarDeclPart] StatementPart
  pub fn program(&mut self) -> CompileResult<()> {
    self.asm.data_preamble();
    if self.stream.at_keyword("VAR") {
      self.var_decl_part()?;
    }
    self.asm.prologue();
    self.statement_part()?;
    self.asm.epilogue();

    if !self.stream.is_eof() {
      return TrailingInputSnafu {
        at: self.stream.location(),
      }
      .fail();
    }
    Ok(())
  }

  // VarDeclPart := "VAR" VarDecl {";" VarDecl} "."
  fn var_decl_part(&mut self) -> CompileResult<()> {
    self.stream.expect_keyword("VAR")?;
    self.var_decl()?;
    while self.stream.consume(TokenKind::Semicolon) {
      self.var_decl()?;
    }
    self.stream.expect(TokenKind::Dot, "'.'")?;
    Ok(())
  }

  // VarDecl := Ident {"," Ident} ":" Type
  fn var_decl(&mut self) -> CompileResult<()> {
    // Repeating a name inside one list is harmless; the map collapses it.
    let mut names = BTreeMap::new();
    loop {
      let at = self.stream.location();
      let token = self.stream.expect(TokenKind::Ident, "identifier")?;
      names.entry(token.text).or_insert(at);
      if !self.stream.consume(TokenKind::Comma) {
        break;
      }
    }
    self.stream.expect(TokenKind::Colon, "':'")?;
    let ty = self.type_name()?;

    for (name, at) in names {
      if RESERVED.contains(&name.as_str()) {
        return SyntaxSnafu {
          at,
          message: format!("'{name}' is reserved and cannot be declared."),
        }
        .fail();
      }
      if !self.symbols.declare(&name, ty) {
        return RedeclaredSnafu { at, name }.fail();
      }
      self.asm.storage(&name, ty);
    }
    Ok(())
  }

  // Type := "INTEGER" | "BOOLEAN" | "DOUBLE" | "CHAR"
  fn type_name(&mut self) -> CompileResult<Type> {
    if self.stream.kind() == TokenKind::Keyword
      && let Some(ty) = Type::from_keyword(self.stream.text())
    {
      self.stream.advance();
      return Ok(ty);
    }
    SyntaxSnafu {
      at: self.stream.location(),
      message: "type expected (INTEGER, BOOLEAN, DOUBLE or CHAR).",
    }
    .fail()
  }

  // StatementPart := Statement {";" Statement} "."
  fn statement_part(&mut self) -> CompileResult<()> {
    self.statement()?;
    while self.stream.consume(TokenKind::Semicolon) {
      self.statement()?;
    }
    self.stream.expect(TokenKind::Dot, "'.'")?;
    Ok(())
  }

  /// Declared type of `name`, or an error located at the current token.
  pub(crate) fn type_of(&self, name: &str) -> CompileResult<Type> {
    match self.symbols.type_of(name) {
      Some(ty) => Ok(ty),
      None => UndeclaredIdentifierSnafu {
        at: self.stream.location(),
        name,
      }
      .fail(),
    }
  }

  /// Turn a failed compatibility check into a located error.
  pub(crate) fn checked<T>(&self, at: Location, check: Result<T, String>) -> CompileResult<T> {
    check.or_else(|message| TypeMismatchSnafu { at, message }.fail())
  }
}
