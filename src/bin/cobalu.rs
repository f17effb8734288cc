//! Command-line entry point. One positional argument: the path to a source
//! file. Parses it, halts without executing if parsing failed, otherwise
//! runs it; exits non-zero iff the error log is non-empty at shutdown.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use cobalu::Interpreter;
use diag::Severity;

#[derive(Debug, Parser)]
#[clap(name = "cobalu", version)]
struct App {
  /// Path to a Cobalu source file.
  file: PathBuf,
}

fn main() -> anyhow::Result<()> {
  let app = App::parse();

  let source = std::fs::read_to_string(&app.file)
    .with_context(|| format!("failed to read {}", app.file.display()))?;

  let mut errors = diag::ErrorLog::new();
  let interpreter = Interpreter::parse(&source, &mut errors);

  if !errors.has_severity(Severity::Parse) {
    interpreter.run(&mut errors);
  }

  if !errors.is_empty() {
    let color = supports_color::on(supports_color::Stream::Stderr)
      .map(|c| c.has_basic)
      .unwrap_or(false);
    eprint!("{}", errors.report(&app.file.display().to_string(), &source, color));
  }

  if errors.is_empty() {
    Ok(())
  } else {
    anyhow::bail!("failed to run {}", app.file.display());
  }
}
