use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempfile::NamedTempFile;

fn source(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(text.as_bytes()).expect("failed to write source");
    file
}

fn gorbit(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_gorbit"))
        .args(args)
        .env_remove("GORBIT_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start gorbit");

    // The program may exit without reading its input
    if let Some(mut pipe) = child.stdin.take() {
        let _ = pipe.write_all(stdin);
    }
    child.wait_with_output().unwrap()
}

#[test]
fn halts_with_success() {
    let file = source("S65 T D");
    let out = gorbit(&[file.path().to_str().unwrap()], b"");

    assert_eq!(out.status.code(), Some(0));
    assert_eq!(out.stdout, b"A");
}

#[test]
fn both_dispatch_strategies_print_the_same() {
    let file = source("R O0 I1 B8 G0 T S0 B0");
    let path = file.path().to_str().unwrap();

    let switch = gorbit(&[path, "--dispatch", "switch"], b"hello");
    let table = gorbit(&[path, "--dispatch", "table"], b"hello");

    assert_eq!(switch.stdout, b"hello");
    assert_eq!(switch.stdout, table.stdout);
    assert_eq!(switch.status.code(), table.status.code());
}

#[test]
fn illegal_instruction_exits_with_one() {
    let file = source("S66 T X5");
    let out = gorbit(&[file.path().to_str().unwrap()], b"");

    assert_eq!(out.status.code(), Some(1));
    assert_eq!(
        String::from_utf8(out.stdout).unwrap(),
        "BAttempt to execute illegal instruction at program counter 2. Accumulator: 66. Instruction: X5\n"
    );
}

#[test]
fn wrong_argument_count_exits_with_two() {
    let out = gorbit(&[], b"");
    assert_eq!(out.status.code(), Some(2));

    let out = gorbit(&["one.gor", "two.gor"], b"");
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn unreadable_source_exits_with_three() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let missing = dir.path().join("missing.gor");
    let out = gorbit(&[missing.to_str().unwrap()], b"");

    assert_eq!(out.status.code(), Some(3));
    assert!(String::from_utf8(out.stdout).unwrap().starts_with("cannot open input file"));
}

#[test]
fn oversized_program_exits_with_four() {
    let file = source(&"T ".repeat(256));
    let out = gorbit(&[file.path().to_str().unwrap()], b"");

    assert_eq!(out.status.code(), Some(4));
    assert_eq!(out.stdout, b"error, program too big\n");
}

#[test]
fn trace_goes_to_stderr() {
    let file = source("S65 T");
    let out = gorbit(&[file.path().to_str().unwrap(), "--trace"], b"");

    assert_eq!(out.status.code(), Some(0));
    assert_eq!(out.stdout, b"A");

    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("000 Executed S: Acc (65)"));
    assert!(stderr.contains("001 Executed T"));
}
