//! Public facade over the Cobalu front-end (`syntax`) and the execution
//! core defined here: lex, parse, and run a source string, collecting
//! every diagnostic into one [`diag::ErrorLog`].

pub mod calculus;
pub mod eval;

pub use diag::ErrorLog;

/// One run of one source file: parses it, then executes the parsed
/// program if parsing produced no errors.
///
/// Parse and runtime diagnostics both land in the same [`ErrorLog`];
/// callers that need to stop before executing on a parse error should
/// check `errors.has_severity(diag::Severity::Parse)` after [`Interpreter::parse`]
/// and before calling [`Interpreter::run`].
pub struct Interpreter<'src> {
  program: syntax::Program<'src>,
}

impl<'src> Interpreter<'src> {
  /// Lexes and parses `src`, recording any parse diagnostics into `errors`.
  pub fn parse(src: &'src str, errors: &mut diag::ErrorLog) -> Self {
    Interpreter {
      program: syntax::parse(src, errors),
    }
  }

  /// Executes the parsed program, recording any runtime diagnostics into
  /// `errors`.
  pub fn run(self, errors: &mut diag::ErrorLog) {
    let mut evaluator = eval::Evaluator::new(self.program.blocks);
    evaluator.run(&self.program.body, errors);
  }
}

/// Convenience wrapper for callers that just want a pass/fail result:
/// parses `src`, halts without executing if parsing failed, otherwise runs
/// it. Returns the accumulated [`ErrorLog`] either way.
pub fn run_source(src: &str) -> diag::ErrorLog {
  let mut errors = diag::ErrorLog::new();
  let interpreter = Interpreter::parse(src, &mut errors);
  if !errors.has_severity(diag::Severity::Parse) {
    interpreter.run(&mut errors);
  }
  errors
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn run_source_executes_a_simple_program() {
    let errors = run_source("print(1 + 2 * 3);");
    assert!(errors.is_empty());
  }

  #[test]
  fn run_source_halts_before_executing_on_parse_error() {
    let errors = run_source("var = ;");
    assert!(errors.has_severity(diag::Severity::Parse));
  }

  #[test]
  fn run_source_reports_runtime_errors() {
    let errors = run_source("print(1 + \"x\");");
    assert!(errors.has_severity(diag::Severity::Runtime));
  }
}
