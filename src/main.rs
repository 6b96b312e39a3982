use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use pasc64::{CompileError, generate_assembly, tokenize_source};
use snafu::{ResultExt, Snafu};

/// Compile a Pascal-like program to x86-64 AT&T assembly.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
  /// Source file; standard input when omitted.
  input: Option<PathBuf>,
  /// Write the assembly here instead of standard output.
  #[arg(short, long)]
  output: Option<PathBuf>,
  /// Dump the token stream to standard error before compiling.
  #[arg(long)]
  tokens: bool,
}

#[derive(Debug, Snafu)]
enum CliError {
  #[snafu(display("could not read {}: {source}", path.display()))]
  ReadInput { path: PathBuf, source: io::Error },

  #[snafu(display("could not read standard input: {source}"))]
  ReadStdin { source: io::Error },

  #[snafu(display("could not write {}: {source}", path.display()))]
  WriteOutput { path: PathBuf, source: io::Error },

  #[snafu(display("{source}"))]
  Compile { source: CompileError },
}

fn read_source(input: Option<&PathBuf>) -> Result<String, CliError> {
  match input {
    Some(path) => fs::read_to_string(path).context(ReadInputSnafu { path }),
    None => {
      let mut source = String::new();
      io::stdin()
        .read_to_string(&mut source)
        .context(ReadStdinSnafu)?;
      Ok(source)
    }
  }
}

fn run(args: &Args) -> Result<(), CliError> {
  let source = read_source(args.input.as_ref())?;

  if args.tokens {
    for token in tokenize_source(&source).context(CompileSnafu)? {
      eprintln!("{:>4}  {:<10} {}", token.line, token.kind, token.text);
    }
  }

  // Nothing reaches the output until the whole program has compiled.
  let asm = generate_assembly(&source).context(CompileSnafu)?;
  match &args.output {
    Some(path) => fs::write(path, asm).context(WriteOutputSnafu { path }),
    None => {
      print!("{asm}");
      Ok(())
    }
  }
}

fn main() {
  let args = Args::parse();
  if let Err(err) = run(&args) {
    eprintln!("{err}");
    process::exit(-1);
  }
}
