//! The runtime value stack machine (§4.5).
//!
//! `Calculus` is a LIFO of dynamically-typed [`Value`]s. Every operation
//! pops its operands, enforces the type rules, and pushes its result (or an
//! error, which leaves the stack exactly as deep as it would have been had
//! the operation never run).

use diag::ErrorLog;

/// Tag indices are part of the contract (§3): `0 = double`, `1 = bool`,
/// `2 = string`, `4 = null`. Index `3` is reserved and unassigned.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
  Double(f64),
  Bool(bool),
  String(String),
  Null,
}

impl Value {
  pub fn tag(&self) -> u8 {
    match self {
      Value::Double(_) => 0,
      Value::Bool(_) => 1,
      Value::String(_) => 2,
      Value::Null => 4,
    }
  }

  fn is_string(&self) -> bool {
    matches!(self, Value::String(_))
  }

  /// Truthiness for `if`/`while`/`for` conditions: zero and `false` are
  /// falsy, `null` is falsy, everything else (including any string) is
  /// truthy.
  pub fn is_truthy(&self) -> bool {
    match self {
      Value::Double(d) => *d != 0.0,
      Value::Bool(b) => *b,
      Value::String(_) => true,
      Value::Null => false,
    }
  }

  /// `%g`-style formatting for doubles, `true`/`false` for bools,
  /// single-quoted for strings, `null` otherwise.
  pub fn display_for_print(&self) -> String {
    match self {
      Value::Double(d) => format_double(*d),
      Value::Bool(b) => b.to_string(),
      Value::String(s) => format!("'{s}'"),
      Value::Null => "null".to_owned(),
    }
  }
}

/// Mimics C's `printf("%g", ...)` at the default precision of 6 significant
/// digits: fixed notation with trailing zeros (and a dangling `.`) stripped,
/// switching to exponential notation once the decimal exponent is `>= 6` or
/// `< -4`.
fn format_double(d: f64) -> String {
  const PRECISION: i32 = 6;

  if d.is_infinite() {
    return if d > 0.0 { "inf".to_owned() } else { "-inf".to_owned() };
  }
  if d.is_nan() {
    return "nan".to_owned();
  }
  if d == 0.0 {
    return "0".to_owned();
  }

  let sign = if d.is_sign_negative() { "-" } else { "" };
  let magnitude = d.abs();
  // `%e` with PRECISION-1 digits after the point gives PRECISION significant
  // digits total; its exponent is exactly the `%g` switchover test.
  let scientific = format!("{:.*e}", (PRECISION - 1) as usize, magnitude);
  let (mantissa, exponent) = scientific.split_once('e').expect("scientific notation has an 'e'");
  let exponent: i32 = exponent.parse().expect("exponent is a valid integer");

  if !(-4..PRECISION).contains(&exponent) {
    let mantissa = strip_trailing_zeros(mantissa);
    format!("{sign}{mantissa}e{}{:02}", if exponent >= 0 { "+" } else { "-" }, exponent.abs())
  } else {
    let decimals = (PRECISION - 1 - exponent).max(0) as usize;
    let fixed = format!("{:.*}", decimals, magnitude);
    format!("{sign}{}", strip_trailing_zeros(&fixed))
  }
}

/// Drops trailing zeros after a decimal point, and the point itself if
/// nothing is left after it.
fn strip_trailing_zeros(s: &str) -> String {
  if !s.contains('.') {
    return s.to_owned();
  }
  let trimmed = s.trim_end_matches('0');
  trimmed.trim_end_matches('.').to_owned()
}

/// A pair is incompatible for `==`/`!=` iff exactly one side is a string
/// (§4.5's `TypesMatch`). Every other pairing, including mismatched
/// double/bool/null combinations, is compatible.
fn types_match(a: &Value, b: &Value) -> bool {
  a.is_string() == b.is_string()
}

/// The value-stack engine. Owns no error state of its own: every operation
/// that can fail takes the session's [`ErrorLog`] and reports into it,
/// leaving the stack untouched on failure.
#[derive(Default)]
pub struct Calculus {
  stack: Vec<Value>,
}

impl Calculus {
  pub fn new() -> Self {
    Calculus::default()
  }

  pub fn len(&self) -> usize {
    self.stack.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stack.is_empty()
  }

  pub fn push(&mut self, value: Value) {
    self.stack.push(value);
  }

  pub fn get(&self, offset: usize) -> Option<&Value> {
    self.stack.get(offset)
  }

  pub fn set(&mut self, offset: usize, value: Value) {
    self.stack[offset] = value;
  }

  /// Truncates the stack back down to `len`, discarding anything a call
  /// frame or block pushed above it.
  pub fn truncate(&mut self, len: usize) {
    self.stack.truncate(len);
  }

  /// An operation needing `needed` operands that finds fewer logs exactly
  /// one runtime error and becomes a no-op, popping nothing at all. Returns
  /// `true` iff the stack was too shallow.
  fn arity_check(&mut self, errors: &mut ErrorLog, needed: usize) -> bool {
    if self.stack.len() < needed {
      errors.runtime_error("", "illegal instruction stack of execution is empty");
      true
    } else {
      false
    }
  }

  fn pop(&mut self) -> Value {
    self.stack.pop().expect("checked by arity_check")
  }

  /// Pops and returns the top value for a caller that needs to inspect it
  /// (a condition, a variable's new value, a return value). Reports the
  /// empty-stack error and yields [`Value::Null`] if there was nothing to
  /// pop, so evaluation can keep going instead of aborting outright.
  pub fn pop_for(&mut self, errors: &mut ErrorLog) -> Value {
    if self.arity_check(errors, 1) {
      return Value::Null;
    }
    self.pop()
  }

  pub fn add(&mut self, errors: &mut ErrorLog) {
    if self.arity_check(errors, 2) {
      return;
    }
    let right = self.pop();
    let left = self.pop();
    match (left, right) {
      (Value::Double(l), Value::Double(r)) => self.push(Value::Double(l + r)),
      (Value::String(l), Value::String(r)) => self.push(Value::String(l + &r)),
      _ => errors.runtime_error("", "types don't match"),
    }
  }

  fn binary_numeric(&mut self, errors: &mut ErrorLog, op: impl FnOnce(f64, f64) -> f64) {
    if self.arity_check(errors, 2) {
      return;
    }
    let right = self.pop();
    let left = self.pop();
    if std::mem::discriminant(&left) != std::mem::discriminant(&right) {
      errors.runtime_error("", "types don't match");
      return;
    }
    match (left, right) {
      (Value::Double(l), Value::Double(r)) => self.push(Value::Double(op(l, r))),
      (Value::String(_), Value::String(_)) => errors.runtime_error("", "illegal instruction in strings"),
      _ => errors.runtime_error("", "illegal instruction in strings"),
    }
  }

  pub fn sub(&mut self, errors: &mut ErrorLog) {
    self.binary_numeric(errors, |l, r| l - r);
  }

  pub fn mul(&mut self, errors: &mut ErrorLog) {
    self.binary_numeric(errors, |l, r| l * r);
  }

  /// Division by zero inherits host `f64` semantics (`inf`/`nan`); it is
  /// not treated as an error, matching the original's `divData`.
  pub fn div(&mut self, errors: &mut ErrorLog) {
    self.binary_numeric(errors, |l, r| l / r);
  }

  pub fn neg_sign(&mut self, errors: &mut ErrorLog) {
    if self.arity_check(errors, 1) {
      return;
    }
    let value = self.pop();
    match value {
      Value::Double(d) => self.push(Value::Double(-d)),
      _ => errors.runtime_error("", "illegal instruction in strings"),
    }
  }

  pub fn logical_not(&mut self, errors: &mut ErrorLog) {
    if self.arity_check(errors, 1) {
      return;
    }
    let value = self.pop();
    match value {
      Value::Double(d) => self.push(Value::Double(if d == 0.0 { 1.0 } else { 0.0 })),
      Value::Bool(b) => self.push(Value::Bool(!b)),
      Value::String(_) => errors.runtime_error("", "illegal instruction in strings"),
      Value::Null => errors.runtime_error("", "illegal instruction in strings"),
    }
  }

  /// Both operands are always evaluated onto the stack by the caller before
  /// this runs; the original does not short-circuit `&&`/`||` and this
  /// preserves that rather than introducing it (§9 open question).
  fn logical_binary(&mut self, errors: &mut ErrorLog, op: impl FnOnce(bool, bool) -> bool) {
    if self.arity_check(errors, 2) {
      return;
    }
    let right = self.pop();
    let left = self.pop();
    match (left, right) {
      (Value::Bool(l), Value::Bool(r)) => self.push(Value::Bool(op(l, r))),
      _ => errors.runtime_error("", "types don't match"),
    }
  }

  pub fn and(&mut self, errors: &mut ErrorLog) {
    self.logical_binary(errors, |l, r| l && r);
  }

  pub fn or(&mut self, errors: &mut ErrorLog) {
    self.logical_binary(errors, |l, r| l || r);
  }

  /// As numbers, treating a bool as `0.0`/`1.0` when compared against a
  /// double, since `TypesMatch` permits the pairing but the original's
  /// cross-type branch is dead code (an `&&` comparing one variable against
  /// two different values). Differing non-numeric-compatible combinations
  /// (e.g. `null` against a double) compare unequal.
  fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
      (Value::Double(l), Value::Double(r)) => l == r,
      (Value::Bool(l), Value::Bool(r)) => l == r,
      (Value::String(l), Value::String(r)) => l == r,
      (Value::Null, Value::Null) => true,
      (Value::Double(l), Value::Bool(r)) | (Value::Bool(r), Value::Double(l)) => {
        *l == if *r { 1.0 } else { 0.0 }
      }
      _ => false,
    }
  }

  fn compare(&mut self, errors: &mut ErrorLog, result: impl FnOnce(bool) -> bool) {
    if self.arity_check(errors, 2) {
      return;
    }
    let right = self.pop();
    let left = self.pop();
    if !types_match(&left, &right) {
      errors.runtime_error("", "types don't match");
      return;
    }
    self.push(Value::Bool(result(Self::values_equal(&left, &right))));
  }

  pub fn eq(&mut self, errors: &mut ErrorLog) {
    self.compare(errors, |eq| eq);
  }

  pub fn neq(&mut self, errors: &mut ErrorLog) {
    self.compare(errors, |eq| !eq);
  }

  /// Ordering comparisons reject strings outright rather than inventing a
  /// lexicographic order the original never implements (§9 open question).
  fn order(&mut self, errors: &mut ErrorLog, op: impl FnOnce(f64, f64) -> bool) {
    if self.arity_check(errors, 2) {
      return;
    }
    let right = self.pop();
    let left = self.pop();
    let (l, r) = match (&left, &right) {
      (Value::Double(l), Value::Double(r)) => (*l, *r),
      (Value::Bool(l), Value::Bool(r)) => (*l as i32 as f64, *r as i32 as f64),
      (Value::Double(l), Value::Bool(r)) => (*l, *r as i32 as f64),
      (Value::Bool(l), Value::Double(r)) => (*l as i32 as f64, *r),
      (Value::String(_), _) | (_, Value::String(_)) => {
        errors.runtime_error("", "illegal instruction in strings");
        return;
      }
      _ => {
        errors.runtime_error("", "types don't match");
        return;
      }
    };
    self.push(Value::Bool(op(l, r)));
  }

  pub fn lt(&mut self, errors: &mut ErrorLog) {
    self.order(errors, |l, r| l < r);
  }

  pub fn gt(&mut self, errors: &mut ErrorLog) {
    self.order(errors, |l, r| l > r);
  }

  pub fn le(&mut self, errors: &mut ErrorLog) {
    self.order(errors, |l, r| l <= r);
  }

  pub fn ge(&mut self, errors: &mut ErrorLog) {
    self.order(errors, |l, r| l >= r);
  }

  /// Pops and prints the top value, per the per-type format in §4.4.
  pub fn print_top(&mut self, errors: &mut ErrorLog) {
    if self.arity_check(errors, 1) {
      return;
    }
    let value = self.pop();
    println!("{}", value.display_for_print());
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn calc_with(values: Vec<Value>) -> Calculus {
    let mut c = Calculus::new();
    for v in values {
      c.push(v);
    }
    c
  }

  #[test]
  fn add_numbers() {
    let mut errors = ErrorLog::new();
    let mut c = calc_with(vec![Value::Double(1.0), Value::Double(2.0)]);
    c.add(&mut errors);
    assert!(errors.is_empty());
    assert_eq!(c.get(0), Some(&Value::Double(3.0)));
  }

  #[test]
  fn add_strings_concatenates() {
    let mut errors = ErrorLog::new();
    let mut c = calc_with(vec![
      Value::String("foo".into()),
      Value::String("bar".into()),
    ]);
    c.add(&mut errors);
    assert!(errors.is_empty());
    assert_eq!(c.get(0), Some(&Value::String("foobar".into())));
  }

  #[test]
  fn add_mismatched_types_is_a_runtime_error() {
    let mut errors = ErrorLog::new();
    let mut c = calc_with(vec![Value::Double(1.0), Value::String("x".into())]);
    c.add(&mut errors);
    assert_eq!(errors.iter().next().unwrap().message, "types don't match");
  }

  #[test]
  fn sub_on_strings_is_illegal() {
    let mut errors = ErrorLog::new();
    let mut c = calc_with(vec![Value::String("a".into()), Value::String("b".into())]);
    c.sub(&mut errors);
    assert_eq!(
      errors.iter().next().unwrap().message,
      "illegal instruction in strings"
    );
  }

  #[test]
  fn div_by_zero_yields_infinity_not_an_error() {
    let mut errors = ErrorLog::new();
    let mut c = calc_with(vec![Value::Double(1.0), Value::Double(0.0)]);
    c.div(&mut errors);
    assert!(errors.is_empty());
    assert_eq!(c.get(0), Some(&Value::Double(f64::INFINITY)));
  }

  #[test]
  fn neg_sign_rejects_bool() {
    let mut errors = ErrorLog::new();
    let mut c = calc_with(vec![Value::Bool(true)]);
    c.neg_sign(&mut errors);
    assert_eq!(
      errors.iter().next().unwrap().message,
      "illegal instruction in strings"
    );
  }

  #[test]
  fn logical_not_on_number_flips_zeroness() {
    let mut errors = ErrorLog::new();
    let mut c = calc_with(vec![Value::Double(0.0)]);
    c.logical_not(&mut errors);
    assert_eq!(c.get(0), Some(&Value::Double(1.0)));
  }

  #[test]
  fn eq_rejects_string_against_double() {
    let mut errors = ErrorLog::new();
    let mut c = calc_with(vec![Value::String("x".into()), Value::Double(1.0)]);
    c.eq(&mut errors);
    assert_eq!(errors.iter().next().unwrap().message, "types don't match");
  }

  #[test]
  fn eq_allows_bool_against_double() {
    let mut errors = ErrorLog::new();
    let mut c = calc_with(vec![Value::Bool(true), Value::Double(1.0)]);
    c.eq(&mut errors);
    assert!(errors.is_empty());
    assert_eq!(c.get(0), Some(&Value::Bool(true)));
  }

  #[test]
  fn eq_same_value_is_true() {
    let mut errors = ErrorLog::new();
    let mut c = calc_with(vec![Value::String("hi".into()), Value::String("hi".into())]);
    c.eq(&mut errors);
    assert_eq!(c.get(0), Some(&Value::Bool(true)));
  }

  #[test]
  fn empty_stack_reports_exactly_one_error() {
    let mut errors = ErrorLog::new();
    let mut c = Calculus::new();
    c.add(&mut errors);
    assert_eq!(errors.len(), 1);
    assert_eq!(
      errors.iter().next().unwrap().message,
      "illegal instruction stack of execution is empty"
    );
  }

  #[test]
  fn tag_indices_match_the_contract() {
    assert_eq!(Value::Double(0.0).tag(), 0);
    assert_eq!(Value::Bool(false).tag(), 1);
    assert_eq!(Value::String(String::new()).tag(), 2);
    assert_eq!(Value::Null.tag(), 4);
  }

  #[test]
  fn print_formats_each_type() {
    assert_eq!(Value::Double(1.0).display_for_print(), "1");
    assert_eq!(Value::Double(2.5).display_for_print(), "2.5");
    assert_eq!(Value::Bool(true).display_for_print(), "true");
    assert_eq!(Value::String("hi".into()).display_for_print(), "'hi'");
    assert_eq!(Value::Null.display_for_print(), "null");
  }

  #[test]
  fn print_switches_to_exponential_past_six_significant_digits() {
    assert_eq!(Value::Double(1_000_000.0).display_for_print(), "1e+06");
    assert_eq!(Value::Double(-1_000_000.0).display_for_print(), "-1e+06");
    assert_eq!(Value::Double(0.00001234).display_for_print(), "1.234e-05");
  }

  #[test]
  fn print_rounds_fractions_to_six_significant_digits() {
    assert_eq!(Value::Double(1.0 / 3.0).display_for_print(), "0.333333");
    assert_eq!(Value::Double(100.0).display_for_print(), "100");
    assert_eq!(Value::Double(123_456.0).display_for_print(), "123456");
    assert_eq!(Value::Double(123_456.789).display_for_print(), "123457");
  }

  /// A binary op's second pop used to be checked by nothing but the first
  /// op's empty-stack guard; with exactly one operand below it, the second
  /// `pop()` would panic instead of reporting an error. Reachable on valid
  /// input like `print((1 + "x") + 2);`, where the inner `+` type-errors and
  /// leaves the stack one short for the outer `+`.
  #[test]
  fn binary_op_on_a_one_deep_stack_reports_an_error_instead_of_panicking() {
    let mut errors = ErrorLog::new();
    let mut c = calc_with(vec![Value::Double(2.0)]);
    c.add(&mut errors);
    assert_eq!(
      errors.iter().next().unwrap().message,
      "illegal instruction stack of execution is empty"
    );
    assert_eq!(c.len(), 1);
    assert_eq!(c.get(0), Some(&Value::Double(2.0)));
  }
}
