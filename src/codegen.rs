//! Code generation: the instruction shapes the parser emits as it goes.
//!
//! The target is a stack machine layered on x86-64: every expression leaves
//! exactly one 8-byte word on the hardware stack and every statement leaves
//! the stack as it found it. Output is AT&T syntax, appended line by line to
//! an `Emitter`; nothing already emitted is ever rewritten, so forward
//! references go through labels. Compiler labels all start with `.L` and can
//! therefore never clash with a variable name.

use crate::ty::{AddOp, MulOp, RelOp, Type};

/// Append-only sink for assembly text.
#[derive(Debug, Default)]
pub struct Emitter {
  asm: String,
}

impl Emitter {
  pub fn new() -> Self {
    Self::default()
  }

  /// An indented instruction or directive.
  pub fn ins(&mut self, line: impl AsRef<str>) {
    self.asm.push_str("    ");
    self.asm.push_str(line.as_ref());
    self.asm.push('\n');
  }

  pub fn label(&mut self, name: impl AsRef<str>) {
    self.asm.push_str(name.as_ref());
    self.asm.push_str(":\n");
  }

  pub fn as_str(&self) -> &str {
    &self.asm
  }

  pub fn finish(self) -> String {
    self.asm
  }

  /// Format strings and boolean texts handed to `printf`.
  pub fn data_preamble(&mut self) {
    self.ins(".data");
    for (label, text) in [
      (".LFormatInteger", "%llu"),
      (".LFormatDouble", "%lf"),
      (".LFormatChar", "%c"),
      (".LTrueString", "TRUE"),
      (".LFalseString", "FALSE"),
    ] {
      self.label(label);
      self.ins(format!(".string \"{text}\""));
    }
  }

  /// Zero-initialised static storage for one variable.
  pub fn storage(&mut self, name: &str, ty: Type) {
    self.label(name);
    match ty {
      Type::Integer | Type::Boolean => self.ins(".quad 0"),
      Type::Double => self.ins(".double 0.0"),
      Type::Char => self.ins(".byte 0"),
    }
  }

  /// Enter `main`. `%rbx` is callee-saved and used as scratch, so it is kept
  /// in the frame; the extra 8 bytes keep `%rsp` 16-byte aligned between
  /// statements.
  pub fn prologue(&mut self) {
    self.ins(".text");
    self.ins(".globl main");
    self.label("main");
    self.ins("push %rbp");
    self.ins("mov %rsp, %rbp");
    self.ins("push %rbx");
    self.ins("sub $8, %rsp");
  }

  pub fn epilogue(&mut self) {
    self.ins("mov -8(%rbp), %rbx");
    self.ins("mov %rbp, %rsp");
    self.ins("pop %rbp");
    self.ins("mov $0, %eax");
    self.ins("ret");
  }

  pub fn push_integer(&mut self, value: u64) {
    if value <= i32::MAX as u64 {
      self.ins(format!("push ${value}"));
    } else {
      self.ins(format!("movabs ${value}, %rax"));
      self.ins("push %rax");
    }
  }

  /// There is no 64-bit floating immediate: reserve a word and fill it with
  /// two 32-bit stores, least significant half first.
  pub fn push_double(&mut self, value: f64) {
    let bits = value.to_bits();
    let low = bits as u32;
    let high = (bits >> 32) as u32;
    self.ins("sub $8, %rsp");
    self.ins(format!("movl ${low}, (%rsp)"));
    self.ins(format!("movl ${high}, 4(%rsp)"));
  }

  pub fn push_char(&mut self, c: char) {
    self.ins(format!("push ${}", c as u32));
  }

  /// Canonical booleans: all ones for true, zero for false.
  pub fn push_boolean(&mut self, value: bool) {
    self.ins(if value { "push $-1" } else { "push $0" });
  }

  pub fn push_variable(&mut self, name: &str, ty: Type) {
    match ty {
      Type::Char => {
        self.ins(format!("movzbq {name}(%rip), %rax"));
        self.ins("push %rax");
      }
      _ => self.ins(format!("pushq {name}(%rip)")),
    }
  }

  pub fn pop_variable(&mut self, name: &str, ty: Type) {
    match ty {
      Type::Char => {
        self.ins("pop %rax");
        self.ins(format!("movb %al, {name}(%rip)"));
      }
      _ => self.ins(format!("popq {name}(%rip)")),
    }
  }

  /// Combine the two topmost words. `ty` is the already-checked operand type.
  pub fn additive(&mut self, op: AddOp, ty: Type) {
    if ty == Type::Double {
      let fop = match op {
        AddOp::Add => "faddp",
        _ => "fsubp",
      };
      self.double_operation(fop);
      return;
    }
    self.pop_operands();
    match op {
      AddOp::Add => self.ins("add %rbx, %rax"),
      AddOp::Sub => self.ins("sub %rbx, %rax"),
      AddOp::Or => self.ins("or %rbx, %rax"),
    }
    self.ins("push %rax");
  }

  pub fn multiplicative(&mut self, op: MulOp, ty: Type) {
    if ty == Type::Double {
      let fop = match op {
        MulOp::Mul => "fmulp",
        _ => "fdivp",
      };
      self.double_operation(fop);
      return;
    }
    self.pop_operands();
    match op {
      MulOp::Mul => {
        self.ins("mul %rbx");
        self.ins("push %rax");
      }
      MulOp::Div => {
        self.ins("mov $0, %rdx");
        self.ins("div %rbx");
        self.ins("push %rax");
      }
      MulOp::Mod => {
        self.ins("mov $0, %rdx");
        self.ins("div %rbx");
        self.ins("push %rdx");
      }
      MulOp::And => {
        self.ins("and %rbx, %rax");
        self.ins("push %rax");
      }
    }
  }

  pub fn not(&mut self) {
    self.ins("pop %rax");
    self.ins("not %rax");
    self.ins("push %rax");
  }

  /// Replace the two topmost words by a canonical boolean, branching to one
  /// of two constant pushes.
  pub fn compare(&mut self, op: RelOp, ty: Type, tag: u64) {
    if ty == Type::Double {
      // Both operands are on the x87 stack before `add` clobbers the
      // flags; `fcomip` sets them last.
      self.ins("fldl (%rsp)");
      self.ins("fldl 8(%rsp)");
      self.ins("add $16, %rsp");
      self.ins("fcomip %st(1), %st");
      self.ins("fstp %st(0)");
    } else {
      self.ins("pop %rax");
      self.ins("pop %rbx");
      self.ins("cmp %rax, %rbx");
    }
    self.ins(format!("{} .LTrue{tag}", op.jump()));
    self.ins("push $0");
    self.ins(format!("jmp .LCompared{tag}"));
    self.label(format!(".LTrue{tag}"));
    self.ins("push $-1");
    self.label(format!(".LCompared{tag}"));
  }

  /// Pop a boolean and jump to `target` when it is false.
  pub fn jump_if_false(&mut self, target: &str) {
    self.ins("pop %rax");
    self.ins("cmp $0, %rax");
    self.ins(format!("je {target}"));
  }

  pub fn jump(&mut self, target: &str) {
    self.ins(format!("jmp {target}"));
  }

  /// Pop a value of type `ty`, print it, then print a newline.
  pub fn display(&mut self, ty: Type, tag: u64) {
    match ty {
      Type::Integer => {
        self.ins("pop %rsi");
        self.ins("leaq .LFormatInteger(%rip), %rdi");
        self.ins("mov $0, %eax");
        self.ins("call printf@PLT");
      }
      Type::Boolean => {
        self.ins("pop %rax");
        self.ins("cmp $0, %rax");
        self.ins(format!("je .LDisplayFalse{tag}"));
        self.ins("leaq .LTrueString(%rip), %rdi");
        self.ins(format!("jmp .LDisplay{tag}"));
        self.label(format!(".LDisplayFalse{tag}"));
        self.ins("leaq .LFalseString(%rip), %rdi");
        self.label(format!(".LDisplay{tag}"));
        self.ins("mov $0, %eax");
        self.ins("call printf@PLT");
      }
      Type::Char => {
        self.ins("pop %rsi");
        self.ins("leaq .LFormatChar(%rip), %rdi");
        self.ins("mov $0, %eax");
        self.ins("call printf@PLT");
      }
      Type::Double => {
        self.ins("movsd (%rsp), %xmm0");
        self.ins("add $8, %rsp");
        self.ins("leaq .LFormatDouble(%rip), %rdi");
        self.ins("mov $1, %eax");
        self.ins("call printf@PLT");
      }
    }
    self.ins("mov $10, %edi");
    self.ins("call putchar@PLT");
  }

  /// Right operand into `%rbx`, left operand into `%rax`.
  fn pop_operands(&mut self) {
    self.ins("pop %rbx");
    self.ins("pop %rax");
  }

  /// Load both words on the x87 stack, the left operand on top. GNU as
  /// encodes `fsubp`/`fdivp %st, %st(1)` as `%st(1) = %st - %st(1)`, which
  /// is left minus (over) right here.
  fn double_operation(&mut self, fop: &str) {
    self.ins("fldl (%rsp)");
    self.ins("fldl 8(%rsp)");
    self.ins(format!("{fop} %st(0), %st(1)"));
    self.ins("add $8, %rsp");
    self.ins("fstpl (%rsp)");
  }
}

/// Source of label suffixes. Every value is handed out once.
#[derive(Debug, Default)]
pub struct TagAllocator {
  last: u64,
}

impl TagAllocator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn next_tag(&mut self) -> u64 {
    self.last += 1;
    self.last
  }
}
