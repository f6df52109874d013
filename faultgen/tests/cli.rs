use std::process::{Command, Output};

const FAULTGEN_BINARY: &str = env!("CARGO_BIN_EXE_faultgen");

fn faultgen(args: &[&str]) -> Output {
    match Command::new(FAULTGEN_BINARY).args(args).output() {
        Ok(output) => output,
        Err(err) => panic!("failed to run {} {:?}: {}", FAULTGEN_BINARY, args, err),
    }
}

#[test]
fn test_missing_argument_is_usage_error() {
    let output = faultgen(&[]);
    assert_eq!(output.status.code(), Some(255));
    assert!(String::from_utf8_lossy(&output.stderr).contains("number of desired page faults is required"));
}

#[test]
fn test_non_numeric_argument_is_usage_error() {
    let output = faultgen(&["many"]);
    assert_eq!(output.status.code(), Some(255));
}

#[test]
fn test_zero_faults_is_usage_error() {
    let output = faultgen(&["0"]);
    assert_eq!(output.status.code(), Some(255));
}

#[test]
fn test_touches_requested_pages() {
    let output = faultgen(&["--delay=0s", "--interval=0s", "3"]);
    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("page size"), "{}", stdout);
    assert!(stdout.contains("touched 3 pages"), "{}", stdout);
}

#[test]
fn test_hog_with_limit() {
    let output = faultgen(&[
        "hog",
        "--chunk=65536",
        "--stride=4096",
        "--interval=0s",
        "--limit=2",
    ]);
    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("allocated 2 chunks, touched 32 times"), "{}", stdout);
}
