//! Flat, program-wide table of declared variables.

use std::collections::HashMap;

use crate::ty::Type;

/// Names the generated code already uses as global symbols.
pub const RESERVED: [&str; 3] = ["main", "printf", "putchar"];

#[derive(Debug, Default)]
pub struct SymbolTable {
  vars: HashMap<String, Type>,
}

impl SymbolTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `name`. Returns `false` when it was already present, in which
  /// case the existing binding is left untouched.
  pub fn declare(&mut self, name: &str, ty: Type) -> bool {
    if self.vars.contains_key(name) {
      return false;
    }
    self.vars.insert(name.to_string(), ty);
    true
  }

  #[cfg(test)]
  pub fn is_declared(&self, name: &str) -> bool {
    self.vars.contains_key(name)
  }

  pub fn type_of(&self, name: &str) -> Option<Type> {
    self.vars.get(name).copied()
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.vars.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }
}
