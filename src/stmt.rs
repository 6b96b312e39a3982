//! Statement rules. Each one leaves the stack exactly as deep as it found it.
//!
//! Control-flow statements take one tag when they start and suffix every
//! label they emit with it; nested statements take their own.
//!
//! ```text
//! Statement := Assign | If | While | For | Block | Display | Case
//! Assign    := Ident ":=" Expression
//! If        := "IF" Expression "THEN" Statement ["ELSE" Statement]
//! While     := "WHILE" Expression "DO" Statement
//! For       := "FOR" Assign ("TO" | "DOWNTO") Expression "DO" Statement
//! Block     := "BEGIN" Statement {";" Statement} "END"
//! Display   := "DISPLAY" Expression
//! Case      := "CASE" Expression "OF" Element {";" Element} ["ELSE" Statement] "END"
//! Element   := Label {"," Label} ":" Statement
//! Label     := Constant [".." Constant] | Ident
//! ```

use crate::error::{
  CompileResult, Location, SyntaxSnafu, TypeMismatchSnafu, UnsupportedTypeSnafu,
};
use crate::expr::{char_value, parse_integer};
use crate::parser::Parser;
use crate::tokenizer::{Token, TokenKind};
use crate::ty::Type;

/// Largest number of values a single `CASE` range may expand to.
pub const MAX_CASE_RANGE: u64 = 1024;

impl Parser {
  pub(crate) fn statement(&mut self) -> CompileResult<()> {
    match self.stream.kind() {
      TokenKind::Ident => self.assignment().map(|_| ()),
      TokenKind::Keyword => match self.stream.text() {
        "IF" => self.if_statement(),
        "WHILE" => self.while_statement(),
        "FOR" => self.for_statement(),
        "BEGIN" => self.block(),
        "DISPLAY" => self.display(),
        "CASE" => self.case_statement(),
        _ => SyntaxSnafu {
          at: self.stream.location(),
          message: "statement keyword expected (IF, WHILE, FOR, BEGIN, DISPLAY or CASE).",
        }
        .fail(),
      },
      _ => SyntaxSnafu {
        at: self.stream.location(),
        message: "keyword or identifier expected.",
      }
      .fail(),
    }
  }

  /// Returns the assigned variable's name and type.
  fn assignment(&mut self) -> CompileResult<(String, Type)> {
    if self.stream.kind() != TokenKind::Ident {
      return SyntaxSnafu {
        at: self.stream.location(),
        message: "identifier expected.",
      }
      .fail();
    }
    let var_ty = self.type_of(self.stream.text())?;
    let name = self.stream.advance().text;
    self.stream.expect(TokenKind::Assign, "':='")?;
    let expr_ty = self.expression()?;
    if var_ty != expr_ty {
      return TypeMismatchSnafu {
        at: self.stream.location(),
        message: format!("cannot assign {expr_ty} to '{name}' of type {var_ty}."),
      }
      .fail();
    }
    self.asm.pop_variable(&name, var_ty);
    Ok((name, var_ty))
  }

  fn if_statement(&mut self) -> CompileResult<()> {
    let tag = self.tags.next_tag();
    self.stream.expect_keyword("IF")?;
    self.condition("IF")?;
    self.asm.jump_if_false(&format!(".LElse{tag}"));
    self.stream.expect_keyword("THEN")?;
    self.statement()?;
    self.asm.jump(&format!(".LEndIf{tag}"));
    self.asm.label(format!(".LElse{tag}"));
    if self.stream.at_keyword("ELSE") {
      self.stream.advance();
      self.statement()?;
    }
    self.asm.label(format!(".LEndIf{tag}"));
    Ok(())
  }

  fn while_statement(&mut self) -> CompileResult<()> {
    let tag = self.tags.next_tag();
    self.stream.expect_keyword("WHILE")?;
    self.asm.label(format!(".LWhile{tag}"));
    self.condition("WHILE")?;
    self.asm.jump_if_false(&format!(".LEndWhile{tag}"));
    self.stream.expect_keyword("DO")?;
    self.statement()?;
    self.asm.jump(&format!(".LWhile{tag}"));
    self.asm.label(format!(".LEndWhile{tag}"));
    Ok(())
  }

  /// Inclusive counting loop. The bound is evaluated again before every
  /// iteration and popped straight away, so the body runs on a clean stack.
  fn for_statement(&mut self) -> CompileResult<()> {
    let tag = self.tags.next_tag();
    self.stream.expect_keyword("FOR")?;
    if self.stream.kind() == TokenKind::Ident
      && self.type_of(self.stream.text())? != Type::Integer
    {
      return TypeMismatchSnafu {
        at: self.stream.location(),
        message: "loop variable must be INTEGER.",
      }
      .fail();
    }
    let (var, _) = self.assignment()?;

    let downward = self.stream.at_keyword("DOWNTO");
    if downward {
      self.stream.advance();
    } else {
      self.stream.expect_keyword("TO")?;
    }

    self.asm.label(format!(".LFor{tag}"));
    let at = self.stream.location();
    if self.expression()? != Type::Integer {
      return TypeMismatchSnafu {
        at,
        message: "loop bound must be INTEGER.",
      }
      .fail();
    }
    let end = format!(".LEndFor{tag}");
    self.asm.ins("pop %rax");
    self.asm.ins(format!("cmp %rax, {var}(%rip)"));
    self.asm.ins(format!("{} {end}", if downward { "jb" } else { "ja" }));

    self.stream.expect_keyword("DO")?;
    self.statement()?;

    // Stepping past the last unsigned value would wrap around and never
    // satisfy the exit test.
    if downward {
      self.asm.ins(format!("cmpq $0, {var}(%rip)"));
      self.asm.ins(format!("je {end}"));
      self.asm.ins(format!("decq {var}(%rip)"));
    } else {
      self.asm.ins(format!("cmpq $-1, {var}(%rip)"));
      self.asm.ins(format!("je {end}"));
      self.asm.ins(format!("incq {var}(%rip)"));
    }
    self.asm.jump(&format!(".LFor{tag}"));
    self.asm.label(end);
    Ok(())
  }

  fn block(&mut self) -> CompileResult<()> {
    self.stream.expect_keyword("BEGIN")?;
    self.statement()?;
    while self.stream.consume(TokenKind::Semicolon) {
      self.statement()?;
    }
    self.stream.expect_keyword("END")
  }

  fn display(&mut self) -> CompileResult<()> {
    let tag = self.tags.next_tag();
    self.stream.expect_keyword("DISPLAY")?;
    let ty = self.expression()?;
    self.asm.display(ty, tag);
    Ok(())
  }

  fn case_statement(&mut self) -> CompileResult<()> {
    let tag = self.tags.next_tag();
    self.stream.expect_keyword("CASE")?;
    let selector = self.expression()?;
    self.stream.expect_keyword("OF")?;

    let mut element = 1;
    self.case_element(selector, tag, element)?;
    while self.stream.consume(TokenKind::Semicolon) {
      element += 1;
      self.case_element(selector, tag, element)?;
    }

    // Nothing matched: the selector is still on the stack.
    self.asm.label(format!(".LCaseElse{tag}"));
    self.asm.ins("add $8, %rsp");
    if self.stream.at_keyword("ELSE") {
      self.stream.advance();
      self.statement()?;
    }
    self.stream.expect_keyword("END")?;
    self.asm.label(format!(".LEndCase{tag}"));
    Ok(())
  }

  /// One `labels : statement` arm. Every label compares against the pushed
  /// selector; a match pops it and enters the arm, a miss pushes it back.
  fn case_element(&mut self, selector: Type, tag: u64, element: u32) -> CompileResult<()> {
    let arm = format!(".LCase{tag}_{element}");
    let next = format!(".LCaseNext{tag}_{element}");

    self.case_label(selector, &arm)?;
    while self.stream.consume(TokenKind::Comma) {
      self.case_label(selector, &arm)?;
    }
    self.stream.expect(TokenKind::Colon, "':'")?;
    self.asm.jump(&next);

    self.asm.label(&arm);
    self.statement()?;
    self.asm.jump(&format!(".LEndCase{tag}"));
    self.asm.label(&next);
    Ok(())
  }

  fn case_label(&mut self, selector: Type, arm: &str) -> CompileResult<()> {
    let at = self.stream.location();
    if self.stream.kind() == TokenKind::Ident {
      let ty = self.variable()?;
      self.expect_label_type(at, selector, ty)?;
      self.match_selector(arm);
      return Ok(());
    }

    let low = self.case_constant()?;
    let ty = self.push_constant(&low)?;
    self.expect_label_type(at, selector, ty)?;
    self.match_selector(arm);

    if self.stream.kind() != TokenKind::Dot {
      return Ok(());
    }
    self.stream.advance();
    self.stream.expect(TokenKind::Dot, "'..'")?;
    let high = self.case_constant()?;
    let (first, last) = match ty {
      Type::Integer if high.kind == TokenKind::Number && !high.text.contains('.') => {
        (parse_integer(&low)?, parse_integer(&high)?)
      }
      Type::Char if high.kind == TokenKind::CharConst => {
        (char_value(&low) as u64, char_value(&high) as u64)
      }
      Type::Integer | Type::Char => {
        return TypeMismatchSnafu {
          at: Location::of(&high),
          message: format!("range bounds must both be {ty}."),
        }
        .fail();
      }
      _ => {
        return UnsupportedTypeSnafu {
          at: Location::of(&high),
          message: format!("ranges of {ty} values are not supported."),
        }
        .fail();
      }
    };
    if last < first {
      return SyntaxSnafu {
        at: Location::of(&high),
        message: "range upper bound is below its lower bound.",
      }
      .fail();
    }
    if last - first >= MAX_CASE_RANGE {
      return SyntaxSnafu {
        at: Location::of(&high),
        message: format!("range holds more than {MAX_CASE_RANGE} values."),
      }
      .fail();
    }
    for value in first + 1..=last {
      self.asm.push_integer(value);
      self.match_selector(arm);
    }
    Ok(())
  }

  fn case_constant(&mut self) -> CompileResult<Token> {
    match self.stream.kind() {
      TokenKind::Number | TokenKind::CharConst | TokenKind::BoolConst => Ok(self.stream.advance()),
      _ => SyntaxSnafu {
        at: self.stream.location(),
        message: "case label expected (number, character, boolean or identifier).",
      }
      .fail(),
    }
  }

  fn push_constant(&mut self, token: &Token) -> CompileResult<Type> {
    match token.kind {
      TokenKind::CharConst => {
        self.asm.push_char(char_value(token));
        Ok(Type::Char)
      }
      TokenKind::BoolConst => {
        self.asm.push_boolean(token.text == "TRUE");
        Ok(Type::Boolean)
      }
      _ => self.number(token),
    }
  }

  fn expect_label_type(&self, at: Location, selector: Type, label: Type) -> CompileResult<()> {
    if selector != label {
      return TypeMismatchSnafu {
        at,
        message: format!("'CASE' expression is {selector} but label is {label}."),
      }
      .fail();
    }
    Ok(())
  }

  /// Stack on entry: selector, label value.
  fn match_selector(&mut self, arm: &str) {
    self.asm.ins("pop %rbx");
    self.asm.ins("pop %rax");
    self.asm.ins("cmp %rbx, %rax");
    self.asm.ins(format!("je {arm}"));
    self.asm.ins("push %rax");
  }

  /// Conditions of `IF` and `WHILE` must be boolean.
  fn condition(&mut self, construct: &str) -> CompileResult<()> {
    let at = self.stream.location();
    if self.expression()? != Type::Boolean {
      return TypeMismatchSnafu {
        at,
        message: format!("'{construct}' expression must be BOOLEAN."),
      }
      .fail();
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use crate::error::CompileError;
  use crate::generate_assembly;

  fn compile(src: &str) -> String {
    generate_assembly(src).unwrap()
  }

  #[test]
  fn if_without_else_still_has_both_labels() {
    let asm = compile("VAR b : BOOLEAN; x : INTEGER. IF b THEN x := 1.");
    assert!(asm.contains("    je .LElse1\n"));
    assert!(asm.contains("    jmp .LEndIf1\n.LElse1:\n.LEndIf1:\n"));
  }

  #[test]
  fn if_condition_must_be_boolean() {
    let err = generate_assembly("VAR x : INTEGER. IF x THEN x := 1.").unwrap_err();
    assert!(matches!(err, CompileError::TypeMismatch { .. }));
    assert_eq!(err.location().lexeme, "x");
  }

  #[test]
  fn while_loops_back_to_its_condition() {
    let asm = compile("VAR x : INTEGER. WHILE x < 10 DO x := x + 1.");
    let top = asm.find(".LWhile1:").unwrap();
    let exit = asm.find("je .LEndWhile1").unwrap();
    let back = asm.find("jmp .LWhile1").unwrap();
    assert!(top < exit && exit < back);
    assert!(asm.contains(".LEndWhile1:\n"));
  }

  #[test]
  fn nested_loops_get_distinct_tags() {
    let asm = compile(
      "VAR i, j : INTEGER. WHILE i < 3 DO BEGIN j := 0; WHILE j < 3 DO j := j + 1; i := i + 1 END.",
    );
    assert!(asm.contains(".LWhile1:"));
    assert!(asm.contains(".LWhile3:"));
    assert!(asm.contains(".LEndWhile3:"));
    assert!(asm.contains(".LEndWhile1:"));
  }

  #[test]
  fn for_counts_up_inclusively() {
    let asm = compile("VAR i : INTEGER. FOR i := 1 TO 3 DO DISPLAY i.");
    assert!(asm.contains(".LFor1:\n    push $3\n    pop %rax\n    cmp %rax, i(%rip)\n    ja .LEndFor1\n"));
    assert!(asm.contains("    incq i(%rip)\n    jmp .LFor1\n.LEndFor1:\n"));
  }

  #[test]
  fn for_downto_guards_against_wrapping() {
    let asm = compile("VAR i : INTEGER. FOR i := 3 DOWNTO 0 DO DISPLAY i.");
    assert!(asm.contains("    jb .LEndFor1\n"));
    assert!(asm.contains("    cmpq $0, i(%rip)\n    je .LEndFor1\n    decq i(%rip)\n"));
  }

  #[test]
  fn for_variable_must_be_integer() {
    let err = generate_assembly("VAR c : CHAR. FOR c := 'a' TO 'z' DO DISPLAY c.").unwrap_err();
    assert!(matches!(err, CompileError::TypeMismatch { .. }));
  }

  #[test]
  fn for_bound_must_be_integer() {
    let err = generate_assembly("VAR i : INTEGER. FOR i := 1 TO 'z' DO DISPLAY i.").unwrap_err();
    assert!(matches!(err, CompileError::TypeMismatch { .. }));
  }

  #[test]
  fn for_needs_to_or_downto() {
    let err = generate_assembly("VAR i : INTEGER. FOR i := 1 UNTIL 3 DO DISPLAY i.").unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }));
  }

  #[test]
  fn assignment_type_must_match() {
    let err = generate_assembly("VAR x : INTEGER. x := 'a'.").unwrap_err();
    assert!(matches!(err, CompileError::TypeMismatch { .. }));
  }

  #[test]
  fn assignment_to_undeclared_variable() {
    let err = generate_assembly("VAR x : INTEGER. y := 1.").unwrap_err();
    assert_eq!(
      err.to_string(),
      "Line n°1, read: 'y'(ID), but variable 'y' is not declared."
    );
  }

  #[test]
  fn block_requires_end() {
    let err = generate_assembly("VAR x : INTEGER. BEGIN x := 1; x := 2.").unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }));
  }

  #[test]
  fn unknown_statement_keyword() {
    let err = generate_assembly("VAR x : INTEGER. THEN x := 1.").unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }));
  }

  #[test]
  fn display_each_type() {
    let asm = compile(
      "VAR i : INTEGER; b : BOOLEAN; d : DOUBLE; c : CHAR. DISPLAY i; DISPLAY b; DISPLAY d; DISPLAY c.",
    );
    assert!(asm.contains(".LFormatInteger(%rip)"));
    assert!(asm.contains(".LDisplayFalse2:"));
    assert!(asm.contains(".LFormatDouble(%rip)"));
    assert!(asm.contains(".LFormatChar(%rip)"));
    assert_eq!(asm.matches("call putchar@PLT").count(), 4);
  }

  #[test]
  fn case_with_lists_ranges_and_else() {
    let asm = compile(
      "VAR x, y : INTEGER. CASE x OF 1, 2 : y := 10; 3..5 : y := 20; y : y := 30 ELSE y := 0 END.",
    );
    assert_eq!(asm.matches("je .LCase1_1").count(), 2);
    assert_eq!(asm.matches("je .LCase1_2").count(), 3);
    assert_eq!(asm.matches("je .LCase1_3").count(), 1);
    assert!(asm.contains("    push $4\n"));
    assert!(asm.contains(".LCaseElse1:\n    add $8, %rsp\n"));
    assert!(asm.contains(".LEndCase1:\n"));
  }

  #[test]
  fn case_without_else_drops_the_selector() {
    let asm = compile("VAR c : CHAR. CASE c OF 'a' : DISPLAY c END.");
    assert!(asm.contains(".LCaseElse1:\n    add $8, %rsp\n.LEndCase1:\n"));
  }

  #[test]
  fn case_char_range() {
    let asm = compile("VAR c : CHAR. CASE c OF 'a'..'c' : DISPLAY c END.");
    assert_eq!(asm.matches("je .LCase1_1").count(), 3);
  }

  #[test]
  fn case_label_type_must_match_selector() {
    let err = generate_assembly("VAR x : INTEGER. CASE x OF 'a' : x := 1 END.").unwrap_err();
    assert!(matches!(err, CompileError::TypeMismatch { .. }));
    assert_eq!(err.location().lexeme, "'a'");
  }

  #[test]
  fn case_range_must_be_ordered_and_bounded() {
    let reversed = generate_assembly("VAR x : INTEGER. CASE x OF 5..1 : x := 1 END.").unwrap_err();
    assert!(matches!(reversed, CompileError::Syntax { .. }));
    let huge = generate_assembly("VAR x : INTEGER. CASE x OF 1..5000 : x := 1 END.").unwrap_err();
    assert!(matches!(huge, CompileError::Syntax { .. }));
  }

  #[test]
  fn case_range_of_doubles_is_unsupported() {
    let err = generate_assembly("VAR d : DOUBLE. CASE d OF 1.0..2.0 : d := 1.0 END.").unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedType { .. }));
    assert_eq!(err.location().lexeme, "2.0");
  }

  #[test]
  fn case_range_bounds_must_agree() {
    let err = generate_assembly("VAR x : INTEGER. CASE x OF 1..'z' : x := 1 END.").unwrap_err();
    assert!(matches!(err, CompileError::TypeMismatch { .. }));
  }
}
