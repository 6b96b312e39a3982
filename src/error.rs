//! Shared error type for every stage of the compiler.
//!
//! Compilation stops at the first problem: each grammar rule returns a
//! `CompileResult` and the error travels up with `?` until `main` reports it.
//! Diagnostics quote the token that was being read when things went wrong.

use std::fmt;

use snafu::Snafu;

use crate::tokenizer::{Token, TokenKind};

pub type CompileResult<T> = Result<T, CompileError>;

/// The token under the cursor when an error was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
  pub line: usize,
  pub lexeme: String,
  pub kind: TokenKind,
}

impl Location {
  pub fn of(token: &Token) -> Self {
    Self {
      line: token.line,
      lexeme: token.text.clone(),
      kind: token.kind,
    }
  }
}

impl fmt::Display for Location {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Line n°{}, read: '{}'({})",
      self.line, self.lexeme, self.kind
    )
  }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("{at}, but {message}"))]
  Lexical { at: Location, message: String },

  #[snafu(display("{at}, but {message}"))]
  Syntax { at: Location, message: String },

  #[snafu(display("{at}, but variable '{name}' is not declared."))]
  UndeclaredIdentifier { at: Location, name: String },

  #[snafu(display("{at}, but variable '{name}' is already declared."))]
  Redeclared { at: Location, name: String },

  #[snafu(display("{at}, but TYPES error: {message}"))]
  TypeMismatch { at: Location, message: String },

  #[snafu(display("{at}, but {message}"))]
  UnsupportedType { at: Location, message: String },

  #[snafu(display("{at}, but unexpected input after the end of the program."))]
  TrailingInput { at: Location },
}

impl CompileError {
  /// Where the error was detected.
  pub fn location(&self) -> &Location {
    match self {
      Self::Lexical { at, .. }
      | Self::Syntax { at, .. }
      | Self::UndeclaredIdentifier { at, .. }
      | Self::Redeclared { at, .. }
      | Self::TypeMismatch { at, .. }
      | Self::UnsupportedType { at, .. }
      | Self::TrailingInput { at } => at,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn at(line: usize, lexeme: &str, kind: TokenKind) -> Location {
    Location {
      line,
      lexeme: lexeme.to_string(),
      kind,
    }
  }

  #[test]
  fn diagnostic_quotes_the_offending_token() {
    let err = CompileError::UndeclaredIdentifier {
      at: at(3, "y", TokenKind::Ident),
      name: "y".to_string(),
    };
    assert_eq!(
      err.to_string(),
      "Line n°3, read: 'y'(ID), but variable 'y' is not declared."
    );
  }

  #[test]
  fn type_errors_are_prefixed() {
    let err = CompileError::TypeMismatch {
      at: at(1, ".", TokenKind::Dot),
      message: "cannot assign different types.".to_string(),
    };
    assert_eq!(
      err.to_string(),
      "Line n°1, read: '.'(DOT), but TYPES error: cannot assign different types."
    );
    assert_eq!(err.location().line, 1);
  }
}
