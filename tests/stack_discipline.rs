//! Simulates the stack depth of emitted code instead of running it.
//!
//! Every instruction after `main:` is walked in order. Jumps record the depth
//! their target must be entered with and labels verify it, so a statement
//! that leaks or drops a word shows up as a mismatch or as a wrong depth at
//! the epilogue. Calls must also find the stack 16-byte aligned.

use std::collections::{HashMap, HashSet};

use pasc64::generate_assembly;

/// `push %rbp`, `push %rbx` and the alignment word.
const FRAME_WORDS: i64 = 3;

const EVERYTHING: &str = "
  VAR i, n : INTEGER; d : DOUBLE; c : CHAR; b : BOOLEAN.
  n := 0;
  FOR i := 1 TO 10 DO
    IF i % 2 == 0 THEN n := n + i ELSE n := n - 1;
  FOR i := 5 DOWNTO 1 DO DISPLAY i;
  WHILE n > 0 DO n := n / 2;
  d := 1.5 * 2.0 - 0.25;
  b := (d >= 2.75) && !(n <> 0) || FALSE;
  DISPLAY b; DISPLAY d; DISPLAY 7.5 / 2.5;
  c := 'q';
  CASE c OF
    'a'..'f', 'x' : DISPLAY 1;
    'q' : BEGIN DISPLAY c; DISPLAY 'Q' END
    ELSE DISPLAY 0
  END;
  CASE n OF 1 : DISPLAY n; i, 2..4 : n := 0 END;
  CASE b OF TRUE : DISPLAY b END.
";

fn stack_effect(ins: &str) -> i64 {
  let mut parts = ins.split_whitespace();
  let mnemonic = parts.next().unwrap_or("");
  let words = || {
    let imm = parts
      .clone()
      .next()
      .unwrap()
      .trim_start_matches('$')
      .trim_end_matches(',');
    imm.parse::<i64>().unwrap() / 8
  };
  match mnemonic {
    "push" | "pushq" => 1,
    "pop" | "popq" => -1,
    "sub" if ins.ends_with("%rsp") => words(),
    "add" if ins.ends_with("%rsp") => -words(),
    _ => 0,
  }
}

fn assert_balanced(asm: &str) {
  let start = asm.find("main:\n").unwrap() + "main:\n".len();
  let mut depth = Some(0);
  let mut labels: HashMap<&str, i64> = HashMap::new();

  for line in asm[start..].lines() {
    if let Some(name) = line.strip_suffix(':') {
      let entry = match (depth, labels.get(name).copied()) {
        (Some(here), Some(seen)) => {
          assert_eq!(here, seen, "inconsistent depth at {name}");
          here
        }
        (Some(here), None) => here,
        (None, Some(seen)) => seen,
        (None, None) => panic!("{name} is never reached"),
      };
      labels.insert(name, entry);
      depth = Some(entry);
      continue;
    }

    let ins = line.trim();
    if ins == "mov -8(%rbp), %rbx" {
      assert_eq!(depth, Some(FRAME_WORDS), "unbalanced program");
      return;
    }
    let here = depth.unwrap_or_else(|| panic!("'{ins}' is never reached"));
    let mut parts = ins.split_whitespace();
    let mnemonic = parts.next().unwrap();
    if mnemonic.starts_with('j') {
      let target = parts.next().unwrap();
      match labels.get(target) {
        Some(&seen) => assert_eq!(seen, here, "jump to {target} with a different depth"),
        None => {
          labels.insert(target, here);
        }
      }
      depth = if mnemonic == "jmp" { None } else { Some(here) };
      continue;
    }
    if mnemonic == "call" {
      // With the return address the callee sees an even number of words.
      assert_eq!(here % 2, 1, "misaligned call");
    }
    let next = here + stack_effect(ins);
    assert!(next >= 0, "'{ins}' pops below the frame");
    depth = Some(next);
  }
  panic!("no epilogue found");
}

fn label_names(asm: &str) -> Vec<&str> {
  asm
    .lines()
    .filter(|line| !line.starts_with(' '))
    .filter_map(|line| line.strip_suffix(':'))
    .collect()
}

#[test]
fn every_construct_is_balanced() {
  assert_balanced(&generate_assembly(EVERYTHING).unwrap());
}

#[test]
fn nested_control_flow_is_balanced() {
  let src = "
    VAR i, j, k : INTEGER.
    FOR i := 1 TO 3 DO
      FOR j := i DOWNTO 1 DO
        WHILE k < i * j DO
          CASE k % 3 OF
            0 : k := k + 1;
            1 : IF k > 4 THEN k := k + 2
          ELSE k := k + 3
          END.
  ";
  assert_balanced(&generate_assembly(src).unwrap());
}

#[test]
fn double_comparison_drops_both_operands() {
  assert_balanced(&generate_assembly("VAR b : BOOLEAN. b := 1.5 < 2.5; DISPLAY b.").unwrap());
}

#[test]
fn simulator_catches_a_leak() {
  let asm = generate_assembly("VAR x : INTEGER. x := 1.").unwrap();
  let leaky = asm.replace("    popq x(%rip)\n", "");
  let result = std::panic::catch_unwind(|| assert_balanced(&leaky));
  assert!(result.is_err());
}

#[test]
fn labels_are_unique() {
  let asm = generate_assembly(EVERYTHING).unwrap();
  let all = label_names(&asm);
  let distinct: HashSet<&str> = all.iter().copied().collect();
  assert_eq!(all.len(), distinct.len());
  assert!(all.iter().any(|label| label.starts_with(".LCase")));
}
