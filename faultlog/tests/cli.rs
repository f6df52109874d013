use std::{fs, process::Command};

use tempfile::tempdir;

const FAULTLOG_BINARY: &str = env!("CARGO_BIN_EXE_faultlog");

#[test]
fn test_collects_probe_output() {
    let dir = tempdir().expect("tempdir");
    let source = dir.path().join("pf_probe_B");
    let log = dir.path().join("pf_probe_B.log");
    fs::write(
        &source,
        "PID =       10 Page Fault at Address 0x1000 at Time 5\nEXIT_CODE\n",
    )
    .expect("write source");

    let output = Command::new(FAULTLOG_BINARY)
        .arg(format!("--source={}", source.display()))
        .arg(format!("--log={}", log.display()))
        .arg("--interval=0s")
        .output()
        .expect("run faultlog");
    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("completed, 1 lines written"), "{}", stdout);
    assert_eq!(
        fs::read_to_string(&log).expect("log is written"),
        "   0:: PID =       10 Page Fault at Address 0x1000 at Time 5\n"
    );
}

#[test]
fn test_missing_probe_fails() {
    let dir = tempdir().expect("tempdir");
    let output = Command::new(FAULTLOG_BINARY)
        .arg(format!("--source={}", dir.path().join("missing").display()))
        .arg(format!("--log={}", dir.path().join("out.log").display()))
        .output()
        .expect("run faultlog");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to open probe"));
}
