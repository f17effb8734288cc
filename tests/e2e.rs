//! End-to-end scenarios driven through the `cobalu` binary itself, since
//! `print` writes straight to stdout rather than through anything the
//! library API hands back.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn run(src: &str) -> assert_cmd::assert::Assert {
  let mut file = NamedTempFile::new().expect("failed to create temp source file");
  file.write_all(src.as_bytes()).unwrap();

  Command::cargo_bin("cobalu")
    .unwrap()
    .arg(file.path())
    .assert()
}

#[test]
fn arithmetic_precedence() {
  run("print(1+2*3);").success().stdout("7\n");
}

#[test]
fn string_concatenation() {
  run(r#"var x = "foo"; var y = "bar"; print(x+y);"#)
    .success()
    .stdout("'foobar'\n");
}

#[test]
fn while_loop_counts_up() {
  run("var i = 0; while (i < 3) { print(i); i = i + 1; }")
    .success()
    .stdout("0\n1\n2\n");
}

#[test]
fn function_call_returns_a_value() {
  run("func add(a,b) { return a+b; } print(add(2,3));")
    .success()
    .stdout("5\n");
}

#[test]
fn break_outside_a_loop_is_a_parse_error_and_nothing_runs() {
  run("break;")
    .failure()
    .stdout("")
    .stderr(predicate::str::contains("found in a block without loop"));
}

#[test]
fn adding_a_number_to_a_string_is_a_runtime_error() {
  run(r#"print(1 + "x");"#)
    .failure()
    .stdout("")
    .stderr(predicate::str::contains("types don't match"));
}

#[test]
fn scope_shadowing_restores_the_outer_binding_on_block_exit() {
  run("var x = 1; { var x = 2; print(x); } print(x);")
    .success()
    .stdout("2\n1\n");
}

#[test]
fn for_loop_runs_init_cond_body_iter_in_order() {
  run("for (var i = 0; i < 3; i = i + 1) { print(i); }")
    .success()
    .stdout("0\n1\n2\n");
}

#[test]
fn print_formats_each_value_kind() {
  run(r#"print("hi"); print(1.0); print(true); print(null);"#)
    .success()
    .stdout("'hi'\n1\ntrue\nnull\n");
}
