#![cfg(unix)]

use std::fs;
use std::time::{Duration, Instant};

use hatdeck_ui::menu::ScriptSpec;
use hatdeck_ui::runner::{
    CommandLauncher, ProcessFailure, ProcessRunner, ScriptLauncher, NO_OUTPUT, TIMEOUT_TEXT,
};
use tempfile::TempDir;

fn script(dir: &TempDir, body: &str) -> ScriptSpec {
    let path = dir.path().join("job.sh");
    fs::write(&path, body).unwrap();
    ScriptSpec::with_interpreter(path, "sh")
}

#[test]
fn stdout_then_stderr_block() {
    let dir = TempDir::new().unwrap();
    let spec = script(&dir, "echo hello\necho oops >&2\n");
    let lines = ProcessRunner::new(CommandLauncher).run(&spec);
    assert_eq!(lines, vec!["hello", "ERR:", "oops"]);
}

#[test]
fn long_lines_are_hard_wrapped() {
    let dir = TempDir::new().unwrap();
    let spec = script(
        &dir,
        "echo 'Open ports on 192.168.1.1: 22, 80, 443'\n",
    );
    let lines = ProcessRunner::new(CommandLauncher).run(&spec);
    assert_eq!(
        lines,
        vec!["Open ports on 192.16", "8.1.1: 22, 80, 443"]
    );
}

#[test]
fn non_zero_exit_is_still_output() {
    let dir = TempDir::new().unwrap();
    let spec = script(&dir, "echo partial\nexit 3\n");
    let lines = ProcessRunner::new(CommandLauncher).run(&spec);
    assert_eq!(lines, vec!["partial"]);
}

#[test]
fn silent_script_shows_sentinel() {
    let dir = TempDir::new().unwrap();
    let spec = script(&dir, "true\n");
    let lines = ProcessRunner::new(CommandLauncher).run(&spec);
    assert_eq!(lines, vec![NO_OUTPUT]);
}

#[test]
fn slow_script_is_killed_at_timeout() {
    let dir = TempDir::new().unwrap();
    let spec = script(&dir, "echo early\nexec sleep 10\n");
    let started = Instant::now();
    let lines = ProcessRunner::new(CommandLauncher)
        .with_timeout(Duration::from_millis(300))
        .run(&spec);
    assert_eq!(lines, vec![TIMEOUT_TEXT], "no partial output on timeout");
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "runner returned after {:?}",
        started.elapsed()
    );
}

#[test]
fn missing_program_is_a_launch_error() {
    let spec = ScriptSpec::new("/nonexistent/hatdeck-test-script");
    match CommandLauncher.launch(&spec, Duration::from_secs(5)) {
        Err(ProcessFailure::Launch(_)) => {}
        other => panic!("expected launch failure, got {other:?}"),
    }
    let lines = ProcessRunner::new(CommandLauncher).run(&spec);
    assert!(
        lines[0].starts_with("Error running s"),
        "got {lines:?}"
    );
}

#[test]
fn killed_by_signal_is_a_failure() {
    let dir = TempDir::new().unwrap();
    let spec = script(&dir, "kill -9 $$\n");
    match CommandLauncher.launch(&spec, Duration::from_secs(5)) {
        Err(ProcessFailure::Signaled(9)) => {}
        other => panic!("expected signal 9, got {other:?}"),
    }
}
