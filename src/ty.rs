//! Static types and the operator compatibility rules.
//!
//! Checks return the result type on success or a message describing the
//! violation; the parser attaches the location and turns it into a
//! `CompileError::TypeMismatch`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
  Integer,
  Boolean,
  Double,
  Char,
}

impl Type {
  pub fn from_keyword(word: &str) -> Option<Self> {
    match word {
      "INTEGER" => Some(Self::Integer),
      "BOOLEAN" => Some(Self::Boolean),
      "DOUBLE" => Some(Self::Double),
      "CHAR" => Some(Self::Char),
      _ => None,
    }
  }

  /// Bytes of static storage reserved for a variable of this type.
  pub fn size(self) -> usize {
    match self {
      Self::Integer | Self::Boolean | Self::Double => 8,
      Self::Char => 1,
    }
  }

  pub fn is_numeric(self) -> bool {
    matches!(self, Self::Integer | Self::Double)
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Integer => "INTEGER",
      Self::Boolean => "BOOLEAN",
      Self::Double => "DOUBLE",
      Self::Char => "CHAR",
    };
    f.write_str(name)
  }
}

/// `+`, `-` and `||`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOp {
  Add,
  Sub,
  Or,
}

impl AddOp {
  pub fn parse(text: &str) -> Option<Self> {
    match text {
      "+" => Some(Self::Add),
      "-" => Some(Self::Sub),
      "||" => Some(Self::Or),
      _ => None,
    }
  }

  pub fn check(self, lhs: Type, rhs: Type) -> Result<Type, String> {
    if lhs != rhs {
      return Err("cannot add/subtract/or different types.".into());
    }
    if lhs == Type::Char {
      return Err("cannot add/subtract/or characters.".into());
    }
    match self {
      Self::Or if lhs != Type::Boolean => {
        Err("cannot apply OR operator to non-boolean types.".into())
      }
      Self::Add | Self::Sub if !lhs.is_numeric() => {
        Err("cannot add/subtract non-numerical types.".into())
      }
      _ => Ok(lhs),
    }
  }
}

/// `*`, `/`, `%` and `&&`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MulOp {
  Mul,
  Div,
  Mod,
  And,
}

impl MulOp {
  pub fn parse(text: &str) -> Option<Self> {
    match text {
      "*" => Some(Self::Mul),
      "/" => Some(Self::Div),
      "%" => Some(Self::Mod),
      "&&" => Some(Self::And),
      _ => None,
    }
  }

  pub fn check(self, lhs: Type, rhs: Type) -> Result<Type, String> {
    if lhs == Type::Char || rhs == Type::Char {
      return Err("cannot apply multiplicative operations to CHAR.".into());
    }
    if lhs != rhs {
      return Err("cannot apply multiplicative operations between different types.".into());
    }
    match self {
      Self::And if lhs != Type::Boolean => {
        Err("cannot apply AND operator to non-boolean types.".into())
      }
      Self::Mod if lhs != Type::Integer => {
        Err("cannot apply MOD operator to non-integer types.".into())
      }
      Self::Mul | Self::Div if !lhs.is_numeric() => {
        Err("cannot multiply/divide non-numerical types.".into())
      }
      _ => Ok(lhs),
    }
  }
}

/// Comparison operators. `<>` is accepted as a spelling of `!=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
  Eq,
  Ne,
  Lt,
  Gt,
  Le,
  Ge,
}

impl RelOp {
  pub fn parse(text: &str) -> Option<Self> {
    match text {
      "==" => Some(Self::Eq),
      "!=" | "<>" => Some(Self::Ne),
      "<" => Some(Self::Lt),
      ">" => Some(Self::Gt),
      "<=" => Some(Self::Le),
      ">=" => Some(Self::Ge),
      _ => None,
    }
  }

  /// Comparisons always produce a boolean.
  pub fn check(self, lhs: Type, rhs: Type) -> Result<Type, String> {
    if lhs != rhs {
      return Err("cannot compare different types.".into());
    }
    Ok(Type::Boolean)
  }

  /// Conditional jump taken when the comparison holds. Operands compare
  /// unsigned, which also matches the flags `fcomip` leaves for doubles.
  pub fn jump(self) -> &'static str {
    match self {
      Self::Eq => "je",
      Self::Ne => "jne",
      Self::Lt => "jb",
      Self::Gt => "ja",
      Self::Le => "jbe",
      Self::Ge => "jae",
    }
  }
}
