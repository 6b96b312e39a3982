//! Expression rules. Each one leaves a single word on the stack and returns
//! its static type.
//!
//! ```text
//! Expression       := SimpleExpression [RelOp SimpleExpression]
//! SimpleExpression := Term {AddOp Term}
//! Term             := Factor {MulOp Factor}
//! Factor           := Number | Ident | CharConst | BoolConst
//!                   | "!" Factor | "(" Expression ")"
//! ```

use crate::error::{CompileResult, Location, SyntaxSnafu, TypeMismatchSnafu};
use crate::parser::Parser;
use crate::tokenizer::{Token, TokenKind};
use crate::ty::{AddOp, MulOp, RelOp, Type};

impl Parser {
  pub(crate) fn expression(&mut self) -> CompileResult<Type> {
    let lhs = self.simple_expression()?;
    if self.stream.kind() != TokenKind::RelOp {
      return Ok(lhs);
    }
    let at = self.stream.location();
    let op = self.operator(RelOp::parse)?;
    let rhs = self.simple_expression()?;
    let ty = self.checked(at, op.check(lhs, rhs))?;
    let tag = self.tags.next_tag();
    self.asm.compare(op, lhs, tag);
    Ok(ty)
  }

  fn simple_expression(&mut self) -> CompileResult<Type> {
    let mut lhs = self.term()?;
    while self.stream.kind() == TokenKind::AddOp {
      let at = self.stream.location();
      let op = self.operator(AddOp::parse)?;
      let rhs = self.term()?;
      lhs = self.checked(at, op.check(lhs, rhs))?;
      self.asm.additive(op, lhs);
    }
    Ok(lhs)
  }

  fn term(&mut self) -> CompileResult<Type> {
    let mut lhs = self.factor()?;
    while self.stream.kind() == TokenKind::MulOp {
      let at = self.stream.location();
      let op = self.operator(MulOp::parse)?;
      let rhs = self.factor()?;
      lhs = self.checked(at, op.check(lhs, rhs))?;
      self.asm.multiplicative(op, lhs);
    }
    Ok(lhs)
  }

  fn factor(&mut self) -> CompileResult<Type> {
    match self.stream.kind() {
      TokenKind::LParen => {
        self.stream.advance();
        let ty = self.expression()?;
        self.stream.expect(TokenKind::RParen, "')'")?;
        Ok(ty)
      }
      TokenKind::Number => {
        let token = self.stream.advance();
        self.number(&token)
      }
      TokenKind::Ident => self.variable(),
      TokenKind::CharConst => {
        let token = self.stream.advance();
        self.asm.push_char(char_value(&token));
        Ok(Type::Char)
      }
      TokenKind::BoolConst => {
        let token = self.stream.advance();
        self.asm.push_boolean(token.text == "TRUE");
        Ok(Type::Boolean)
      }
      TokenKind::Not => {
        let at = self.stream.location();
        self.stream.advance();
        let ty = self.factor()?;
        if ty != Type::Boolean {
          return TypeMismatchSnafu {
            at,
            message: "cannot apply NOT operator to non-boolean types.",
          }
          .fail();
        }
        self.asm.not();
        Ok(ty)
      }
      _ => SyntaxSnafu {
        at: self.stream.location(),
        message: "'(' or number or identifier or constant expected.",
      }
      .fail(),
    }
  }

  /// Push the value of the identifier under the cursor.
  pub(crate) fn variable(&mut self) -> CompileResult<Type> {
    let ty = self.type_of(self.stream.text())?;
    let token = self.stream.advance();
    self.asm.push_variable(&token.text, ty);
    Ok(ty)
  }

  /// Push a numeric literal that has already been consumed.
  pub(crate) fn number(&mut self, token: &Token) -> CompileResult<Type> {
    if token.text.contains('.') {
      let value = parse_double(token)?;
      self.asm.push_double(value);
      Ok(Type::Double)
    } else {
      let value = parse_integer(token)?;
      self.asm.push_integer(value);
      Ok(Type::Integer)
    }
  }

  fn operator<T>(&mut self, parse: fn(&str) -> Option<T>) -> CompileResult<T> {
    match parse(self.stream.text()) {
      Some(op) => {
        self.stream.advance();
        Ok(op)
      }
      None => SyntaxSnafu {
        at: self.stream.location(),
        message: "operator expected.",
      }
      .fail(),
    }
  }
}

/// The character between the quotes of a `CharConst` token.
pub(crate) fn char_value(token: &Token) -> char {
  token.text.chars().nth(1).unwrap_or('\0')
}

pub(crate) fn parse_integer(token: &Token) -> CompileResult<u64> {
  token.text.parse::<u64>().or_else(|_| {
    SyntaxSnafu {
      at: Location::of(token),
      message: "integer constant out of range.",
    }
    .fail()
  })
}

/// Decimal text to the nearest representable double.
fn parse_double(token: &Token) -> CompileResult<f64> {
  token.text.parse::<f64>().or_else(|_| {
    SyntaxSnafu {
      at: Location::of(token),
      message: "malformed decimal constant.",
    }
    .fail()
  })
}
