//! The append-only error log threaded through lexing, parsing, and execution.
//!
//! A session owns a single [`ErrorLog`] instead of reaching for global mutable
//! state; every stage of the pipeline appends [`Diagnostic`]s to it and the
//! driver decides, once at the end, whether to render and how to exit.

use span::Span;

use crate::report::Report;
use crate::source::Source;

/// Which stage of the pipeline raised a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
  Parse,
  Runtime,
}

#[derive(Clone, Debug)]
pub struct Diagnostic {
  pub context: String,
  pub message: String,
  pub severity: Severity,
  pub span: Option<Span>,
}

impl Diagnostic {
  pub fn new(context: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
    Diagnostic {
      context: context.into(),
      message: message.into(),
      severity,
      span: None,
    }
  }

  pub fn spanned(mut self, span: impl Into<Span>) -> Self {
    self.span = Some(span.into());
    self
  }
}

/// Append-only sink for diagnostics raised while lexing, parsing, or
/// executing a single source.
#[derive(Default)]
pub struct ErrorLog {
  diagnostics: Vec<Diagnostic>,
}

impl ErrorLog {
  pub fn new() -> Self {
    ErrorLog::default()
  }

  pub fn push(&mut self, diagnostic: Diagnostic) {
    self.diagnostics.push(diagnostic);
  }

  pub fn parse_error(&mut self, context: impl Into<String>, message: impl Into<String>) {
    self.push(Diagnostic::new(context, message, Severity::Parse));
  }

  pub fn runtime_error(&mut self, context: impl Into<String>, message: impl Into<String>) {
    self.push(Diagnostic::new(context, message, Severity::Runtime));
  }

  pub fn is_empty(&self) -> bool {
    self.diagnostics.is_empty()
  }

  pub fn len(&self) -> usize {
    self.diagnostics.len()
  }

  pub fn has_severity(&self, severity: Severity) -> bool {
    self.diagnostics.iter().any(|d| d.severity == severity)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
    self.diagnostics.iter()
  }

  /// Render every accumulated diagnostic against `source`, one block per
  /// diagnostic, falling back to a bare `context: message` line when a
  /// diagnostic carries no span (e.g. a top-level I/O failure).
  pub fn report(&self, file: &str, source: &str, color: bool) -> String {
    let mut out = String::new();
    for diagnostic in &self.diagnostics {
      let rendered = match diagnostic.span {
        Some(span) => Report::error()
          .source(Source::file(file, source))
          .message(format!("{}: {}", diagnostic.context, diagnostic.message))
          .span(span)
          .color(color)
          .build()
          .emit_to_string()
          .unwrap_or_else(|e| format!("error: failed to render diagnostic: {e}")),
        None => format!("error: {}: {}\n", diagnostic.context, diagnostic.message),
      };
      out.push_str(&rendered);
    }
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_log_reports_nothing() {
    let log = ErrorLog::new();
    assert!(log.is_empty());
    assert_eq!(log.report("test", "", true), "");
  }

  #[test]
  fn spanned_diagnostic_renders_snippet() {
    let mut log = ErrorLog::new();
    log.push(Diagnostic::new("parser", "unexpected token", Severity::Parse).spanned(0..3));
    let rendered = log.report("test.cb", "var x", false);
    assert!(rendered.contains("unexpected token"));
    assert!(rendered.contains("var"));
  }

  #[test]
  fn unspanned_diagnostic_falls_back_to_plain_line() {
    let mut log = ErrorLog::new();
    log.runtime_error("io", "file not found");
    let rendered = log.report("test.cb", "", true);
    assert_eq!(rendered, "error: io: file not found\n");
  }

  #[test]
  fn has_severity_distinguishes_parse_from_runtime() {
    let mut log = ErrorLog::new();
    log.runtime_error("eval", "types don't match");
    assert!(log.has_severity(Severity::Runtime));
    assert!(!log.has_severity(Severity::Parse));
  }
}
