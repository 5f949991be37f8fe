//! End-to-end tests of the two binaries over stdin/stdout.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn wlp4gen_writes_assembly_to_stdout() {
    Command::cargo_bin("wlp4gen")
        .unwrap()
        .write_stdin("int wain(int a, int b) { return a + b; }")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(".import print"))
        .stdout(predicate::str::contains("wain:"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn wlp4gen_prints_error_marker_on_stderr() {
    Command::cargo_bin("wlp4gen")
        .unwrap()
        .write_stdin("int wain(int a, int b) { return a")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR"));
}

#[test]
fn wlp4gen_flags_type_errors() {
    Command::cargo_bin("wlp4gen")
        .unwrap()
        .write_stdin("int wain(int* a, int* b) { return 0; }")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR"));
}

#[test]
fn asm_emits_big_endian_words() {
    let output = Command::cargo_bin("asm")
        .unwrap()
        .write_stdin("add $1, $2, $3\n")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(output.stdout, vec![0x00, 0x43, 0x08, 0x20]);
}

#[test]
fn asm_prints_exactly_one_diagnostic_line() {
    let output = Command::cargo_bin("asm")
        .unwrap()
        .write_stdin("add $1, $2\n")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.lines().count(), 1, "stderr was: {stderr}");
}

#[test]
fn asm_accepts_empty_input() {
    let output = Command::cargo_bin("asm")
        .unwrap()
        .write_stdin("")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn compiler_output_feeds_the_assembler() {
    let compiled = Command::cargo_bin("wlp4gen")
        .unwrap()
        .write_stdin("int f(int x) { return x + 1; } int wain(int a, int b) { return f(a); }")
        .output()
        .unwrap();
    assert!(compiled.status.success());

    let assembled = Command::cargo_bin("asm")
        .unwrap()
        .write_stdin(compiled.stdout)
        .output()
        .unwrap();
    assert!(
        assembled.status.success(),
        "asm stderr: {}",
        String::from_utf8_lossy(&assembled.stderr)
    );
    assert!(!assembled.stdout.is_empty());
    assert_eq!(assembled.stdout.len() % 4, 0);
}
