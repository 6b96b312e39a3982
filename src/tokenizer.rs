//! Lexical analysis: turns the raw program text into a vector of tokens.
//!
//! Every token keeps its exact source text and line so diagnostics can quote
//! it. The parser reads the vector through `TokenStream`, which offers one
//! token of lookahead and nothing more.

use std::fmt;

use crate::error::{CompileResult, Location, LexicalSnafu, SyntaxSnafu};

/// Reserved words. Anything else spelled like an identifier is an identifier.
pub const KEYWORDS: [&str; 18] = [
  "VAR", "BEGIN", "END", "IF", "THEN", "ELSE", "WHILE", "DO", "FOR", "TO", "DOWNTO", "CASE",
  "OF", "DISPLAY", "INTEGER", "BOOLEAN", "DOUBLE", "CHAR",
];

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Eof,
  Unknown,
  Number,
  Ident,
  CharConst,
  BoolConst,
  LBracket,
  RBracket,
  LParen,
  RParen,
  Comma,
  Colon,
  Semicolon,
  Dot,
  AddOp,
  MulOp,
  RelOp,
  Not,
  Assign,
  Keyword,
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Eof => "EOF",
      Self::Unknown => "UNKNOWN",
      Self::Number => "NUMBER",
      Self::Ident => "ID",
      Self::CharConst => "CHARCONST",
      Self::BoolConst => "BOOLCONST",
      Self::LBracket => "LBRACKET",
      Self::RBracket => "RBRACKET",
      Self::LParen => "LPAREN",
      Self::RParen => "RPAREN",
      Self::Comma => "COMMA",
      Self::Colon => "COLON",
      Self::Semicolon => "SEMICOLON",
      Self::Dot => "DOT",
      Self::AddOp => "ADDOP",
      Self::MulOp => "MULOP",
      Self::RelOp => "RELOP",
      Self::Not => "NOT",
      Self::Assign => "ASSIGN",
      Self::Keyword => "KEYWORD",
    };
    f.pad(name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub text: String,
  pub line: usize,
}

impl Token {
  pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
    Self {
      kind,
      text: text.into(),
      line,
    }
  }

  pub fn is_keyword(&self, word: &str) -> bool {
    self.kind == TokenKind::Keyword && self.text == word
  }
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let chars: Vec<char> = input.chars().collect();
  let mut line = 1;
  let mut i = 0;

  while i < chars.len() {
    let c = chars[i];

    if c == '\n' {
      line += 1;
      i += 1;
      continue;
    }
    if c.is_whitespace() {
      i += 1;
      continue;
    }

    // Comments: `{ ... }` and `(* ... *)`.
    if c == '{' || (c == '(' && chars.get(i + 1) == Some(&'*')) {
      let start_line = line;
      let closer: &[char] = if c == '{' { &['}'] } else { &['*', ')'] };
      i += if c == '{' { 1 } else { 2 };
      loop {
        if i >= chars.len() {
          let opener = if c == '{' { "{" } else { "(*" };
          return LexicalSnafu {
            at: Location {
              line: start_line,
              lexeme: opener.to_string(),
              kind: TokenKind::Unknown,
            },
            message: "comment is never closed.",
          }
          .fail();
        }
        if chars[i..].starts_with(closer) {
          i += closer.len();
          break;
        }
        if chars[i] == '\n' {
          line += 1;
        }
        i += 1;
      }
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
      }
      // A dot only belongs to the number when a digit follows it, so that
      // `1..5` stays a range.
      if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
          i += 1;
        }
      }
      let text: String = chars[start..i].iter().collect();
      tokens.push(Token::new(TokenKind::Number, text, line));
      continue;
    }

    if c.is_ascii_alphabetic() {
      let start = i;
      while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
        i += 1;
      }
      let text: String = chars[start..i].iter().collect();
      let kind = if KEYWORDS.contains(&text.as_str()) {
        TokenKind::Keyword
      } else if text == "TRUE" || text == "FALSE" {
        TokenKind::BoolConst
      } else {
        TokenKind::Ident
      };
      tokens.push(Token::new(kind, text, line));
      continue;
    }

    if c == '\'' {
      if i + 2 < chars.len() && chars[i + 1] != '\n' && chars[i + 2] == '\'' {
        let text: String = chars[i..i + 3].iter().collect();
        // CHAR variables hold a single byte.
        if !chars[i + 1].is_ascii() {
          return LexicalSnafu {
            at: Location {
              line,
              lexeme: text,
              kind: TokenKind::Unknown,
            },
            message: "character constants must be ASCII.",
          }
          .fail();
        }
        tokens.push(Token::new(TokenKind::CharConst, text, line));
        i += 3;
        continue;
      }
      return LexicalSnafu {
        at: Location {
          line,
          lexeme: "'".to_string(),
          kind: TokenKind::Unknown,
        },
        message: "malformed character constant.",
      }
      .fail();
    }

    let two: String = chars[i..chars.len().min(i + 2)].iter().collect();
    let double = match two.as_str() {
      ":=" => Some(TokenKind::Assign),
      "||" => Some(TokenKind::AddOp),
      "&&" => Some(TokenKind::MulOp),
      "==" | "!=" | "<>" | "<=" | ">=" => Some(TokenKind::RelOp),
      _ => None,
    };
    if let Some(kind) = double {
      tokens.push(Token::new(kind, two, line));
      i += 2;
      continue;
    }

    let kind = match c {
      '+' | '-' => TokenKind::AddOp,
      '*' | '/' | '%' => TokenKind::MulOp,
      '<' | '>' => TokenKind::RelOp,
      '!' => TokenKind::Not,
      '(' => TokenKind::LParen,
      ')' => TokenKind::RParen,
      '[' => TokenKind::LBracket,
      ']' => TokenKind::RBracket,
      ',' => TokenKind::Comma,
      ':' => TokenKind::Colon,
      ';' => TokenKind::Semicolon,
      '.' => TokenKind::Dot,
      _ => {
        return LexicalSnafu {
          at: Location {
            line,
            lexeme: c.to_string(),
            kind: TokenKind::Unknown,
          },
          message: "unrecognised character.",
        }
        .fail();
      }
    };
    tokens.push(Token::new(kind, c, line));
    i += 1;
  }

  tokens.push(Token::new(TokenKind::Eof, "", line));
  Ok(tokens)
}

/// Cursor over the token vector: the current token is the only lookahead.
pub struct TokenStream {
  tokens: Vec<Token>,
  pos: usize,
}

impl TokenStream {
  /// Take ownership of the tokens; the vector must end with an `Eof` token.
  pub fn new(tokens: Vec<Token>) -> Self {
    debug_assert!(matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof));
    Self { tokens, pos: 0 }
  }

  pub fn current(&self) -> &Token {
    &self.tokens[self.pos]
  }

  pub fn kind(&self) -> TokenKind {
    self.current().kind
  }

  pub fn text(&self) -> &str {
    &self.current().text
  }

  pub fn location(&self) -> Location {
    Location::of(self.current())
  }

  /// Consume the current token and return it. `Eof` is never consumed.
  pub fn advance(&mut self) -> Token {
    let token = self.tokens[self.pos].clone();
    if token.kind != TokenKind::Eof {
      self.pos += 1;
    }
    token
  }

  pub fn at_keyword(&self, word: &str) -> bool {
    self.current().is_keyword(word)
  }

  /// Consume the current token if it has the given kind.
  pub fn consume(&mut self, kind: TokenKind) -> bool {
    if self.kind() == kind {
      self.advance();
      return true;
    }
    false
  }

  /// Consume the current token, which must have the given kind.
  pub fn expect(&mut self, kind: TokenKind, what: &str) -> CompileResult<Token> {
    if self.kind() == kind {
      return Ok(self.advance());
    }
    SyntaxSnafu {
      at: self.location(),
      message: format!("{what} expected."),
    }
    .fail()
  }

  /// Consume the given keyword.
  pub fn expect_keyword(&mut self, word: &str) -> CompileResult<()> {
    if self.kind() != TokenKind::Keyword {
      return SyntaxSnafu {
        at: self.location(),
        message: format!("keyword '{word}' expected."),
      }
      .fail();
    }
    if self.text() != word {
      return SyntaxSnafu {
        at: self.location(),
        message: format!("'{word}' keyword expected."),
      }
      .fail();
    }
    self.advance();
    Ok(())
  }

  pub fn is_eof(&self) -> bool {
    self.kind() == TokenKind::Eof
  }
}
