//! Child process execution with captured output and a hard timeout.
//!
//! A menu action runs exactly once. Whatever happens (clean exit, timeout,
//! spawn failure) ends up as a short list of display lines no wider than the
//! panel can show.

use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use hatdeck_logging::targets::T_PROC;
use thiserror::Error;

use crate::menu::ScriptSpec;

pub const SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);
pub const WRAP_WIDTH: usize = 20;
pub const TIMEOUT_TEXT: &str = "Script timeout.";
pub const FAILURE_PREFIX: &str = "Error running script: ";
pub const NO_OUTPUT: &str = "<no output>";

const WAIT_POLL: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum ProcessFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Launch(#[source] io::Error),
    #[error("{0}")]
    Io(#[source] io::Error),
    #[error("terminated by signal {0}")]
    Signaled(i32),
}

/// Raw text captured from a finished child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Starts a script and waits for it, bounded by `timeout`.
pub trait ScriptLauncher: Send + Sync {
    fn launch(&self, spec: &ScriptSpec, timeout: Duration)
        -> Result<CapturedOutput, ProcessFailure>;
}

impl<L: ScriptLauncher + ?Sized> ScriptLauncher for Box<L> {
    fn launch(
        &self,
        spec: &ScriptSpec,
        timeout: Duration,
    ) -> Result<CapturedOutput, ProcessFailure> {
        (**self).launch(spec, timeout)
    }
}

/// Spawns real child processes with piped stdout/stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandLauncher;

impl CommandLauncher {
    fn command(spec: &ScriptSpec) -> Command {
        let mut command = match &spec.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&spec.script);
                cmd
            }
            None => Command::new(&spec.script),
        };
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl ScriptLauncher for CommandLauncher {
    fn launch(
        &self,
        spec: &ScriptSpec,
        timeout: Duration,
    ) -> Result<CapturedOutput, ProcessFailure> {
        let deadline = Instant::now() + timeout;
        let mut child = Self::command(spec)
            .spawn()
            .map_err(ProcessFailure::Launch)?;
        tracing::debug!(target: T_PROC, pid = child.id(), script = %spec.script.display(), "Child spawned");

        // Drain both pipes on their own threads so a chatty child cannot block on a full pipe.
        let stdout_rx = drain(child.stdout.take());
        let stderr_rx = drain(child.stderr.take());

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    #[cfg(unix)]
                    {
                        use std::os::unix::process::ExitStatusExt;
                        if let Some(signal) = status.signal() {
                            return Err(ProcessFailure::Signaled(signal));
                        }
                    }
                    tracing::debug!(target: T_PROC, code = ?status.code(), "Child exited");
                    break;
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        stop(&mut child);
                        return Err(ProcessFailure::Timeout(timeout));
                    }
                    thread::sleep(WAIT_POLL);
                }
                Err(err) => {
                    stop(&mut child);
                    return Err(ProcessFailure::Io(err));
                }
            }
        }

        // A grandchild may still hold the pipes open; the deadline still applies.
        let stdout = collect(stdout_rx, deadline, timeout)?;
        let stderr = collect(stderr_rx, deadline, timeout)?;
        Ok(CapturedOutput { stdout, stderr })
    }
}

fn stop(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R>(pipe: Option<R>) -> Receiver<io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    match pipe {
        Some(mut pipe) => {
            let reader_tx = tx.clone();
            let spawned = thread::Builder::new()
                .name("pipe-reader".to_string())
                .spawn(move || {
                    let mut buf = Vec::new();
                    let result = pipe.read_to_end(&mut buf).map(|_| buf);
                    let _ = reader_tx.send(result);
                });
            if let Err(err) = spawned {
                let _ = tx.send(Err(err));
            }
        }
        None => {
            let _ = tx.send(Ok(Vec::new()));
        }
    }
    rx
}

fn collect(
    rx: Receiver<io::Result<Vec<u8>>>,
    deadline: Instant,
    timeout: Duration,
) -> Result<String, ProcessFailure> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match rx.recv_timeout(remaining) {
        Ok(Ok(bytes)) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Ok(Err(err)) => Err(ProcessFailure::Io(err)),
        Err(RecvTimeoutError::Timeout) => Err(ProcessFailure::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(ProcessFailure::Io(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "output reader vanished",
        ))),
    }
}

/// Runs a script through a launcher and turns the outcome into display lines.
pub struct ProcessRunner<L> {
    launcher: L,
    timeout: Duration,
    wrap_width: usize,
}

impl<L: ScriptLauncher> ProcessRunner<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            timeout: SCRIPT_TIMEOUT,
            wrap_width: WRAP_WIDTH,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_wrap_width(mut self, width: usize) -> Self {
        self.wrap_width = width.max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn run(&self, spec: &ScriptSpec) -> Vec<String> {
        let started = Instant::now();
        let result = self.launcher.launch(spec, self.timeout);
        match &result {
            Ok(out) => tracing::info!(
                target: T_PROC,
                script = %spec.script.display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                stdout_bytes = out.stdout.len(),
                stderr_bytes = out.stderr.len(),
                "Script finished"
            ),
            Err(err) => tracing::warn!(
                target: T_PROC,
                script = %spec.script.display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Script failed: {err}"
            ),
        }
        display_lines(&result_text(result), self.wrap_width)
    }
}

/// Flatten a launch result into the text shown to the user.
pub fn result_text(result: Result<CapturedOutput, ProcessFailure>) -> String {
    match result {
        Ok(CapturedOutput { stdout, stderr }) => {
            if stderr.is_empty() {
                stdout
            } else {
                format!("{stdout}\nERR:\n{stderr}")
            }
        }
        Err(ProcessFailure::Timeout(_)) => TIMEOUT_TEXT.to_string(),
        Err(err) => format!("{FAILURE_PREFIX}{err}"),
    }
}

/// Every character that ends a line, `\r` included so progress updates split.
const LINE_BREAKS: [char; 10] = [
    '\n', '\r', '\x0b', '\x0c', '\x1c', '\x1d', '\x1e', '\u{85}', '\u{2028}', '\u{2029}',
];

/// Split on line breaks and hard-wrap every line at `width` characters.
/// Never returns an empty list.
pub fn display_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    // "\r\n" yields an empty piece between the two breaks, which is skipped below.
    for line in text.split(|c: char| LINE_BREAKS.contains(&c)) {
        let chars: Vec<char> = line.chars().collect();
        for chunk in chars.chunks(width) {
            lines.push(chunk.iter().collect());
        }
    }
    if lines.is_empty() {
        lines.push(NO_OUTPUT.to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Canned(Mutex<Option<Result<CapturedOutput, ProcessFailure>>>);

    impl Canned {
        fn new(result: Result<CapturedOutput, ProcessFailure>) -> Self {
            Self(Mutex::new(Some(result)))
        }
    }

    impl ScriptLauncher for Canned {
        fn launch(
            &self,
            _spec: &ScriptSpec,
            _timeout: Duration,
        ) -> Result<CapturedOutput, ProcessFailure> {
            self.0
                .lock()
                .unwrap()
                .take()
                .expect("launcher used more than once")
        }
    }

    fn run_canned(result: Result<CapturedOutput, ProcessFailure>) -> Vec<String> {
        ProcessRunner::new(Canned::new(result)).run(&ScriptSpec::new("/x"))
    }

    #[test]
    fn forty_five_chars_wrap_into_20_20_5() {
        let line: String = ('a'..='z').cycle().take(45).collect();
        let lines = display_lines(&line, 20);
        let lengths: Vec<usize> = lines.iter().map(|l| l.chars().count()).collect();
        assert_eq!(lengths, vec![20, 20, 5]);
        assert_eq!(lines.concat(), line);
    }

    #[test]
    fn wrapping_ignores_word_boundaries() {
        let lines = display_lines("hello world, this is long", 10);
        assert_eq!(lines, vec!["hello worl", "d, this is", " long"]);
    }

    #[test]
    fn wrapping_counts_characters_not_bytes() {
        let lines = display_lines("réseaux détectés", 5);
        assert_eq!(lines, vec!["résea", "ux dé", "tecté", "s"]);
    }

    #[test]
    fn line_order_is_preserved() {
        let lines = display_lines("one\ntwo\nthree", 20);
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn carriage_returns_and_form_feeds_break_lines() {
        assert_eq!(
            display_lines("scan 10%\rscan 100%\x0cnext", 20),
            vec!["scan 10%", "scan 100%", "next"]
        );
        assert_eq!(display_lines("a\r\nb\u{2028}c\u{85}d", 20), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn empty_output_yields_sentinel() {
        assert_eq!(display_lines("", 20), vec![NO_OUTPUT]);
        assert_eq!(display_lines("\n\n", 20), vec![NO_OUTPUT]);
    }

    #[test]
    fn stderr_block_only_when_present() {
        let out = CapturedOutput {
            stdout: "ok\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(result_text(Ok(out)), "ok\n");

        let out = CapturedOutput {
            stdout: "ok\n".to_string(),
            stderr: "boom\n".to_string(),
        };
        assert_eq!(result_text(Ok(out)), "ok\n\nERR:\nboom\n");
    }

    #[test]
    fn timeout_is_a_single_literal_line() {
        let lines = run_canned(Err(ProcessFailure::Timeout(SCRIPT_TIMEOUT)));
        assert_eq!(lines, vec![TIMEOUT_TEXT]);
    }

    #[test]
    fn launch_failure_embeds_cause() {
        let err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let text = result_text(Err(ProcessFailure::Launch(err)));
        assert_eq!(text, "Error running script: missing");
    }

    #[test]
    fn stdout_and_stderr_become_wrapped_lines() {
        let lines = run_canned(Ok(CapturedOutput {
            stdout: "Detected tag: TAG_001\n".to_string(),
            stderr: "warn\n".to_string(),
        }));
        assert_eq!(
            lines,
            vec!["Detected tag: TAG_00", "1", "ERR:", "warn"]
        );
    }

    #[test]
    fn reader_spawn_error_becomes_io_failure() {
        let (tx, rx) = mpsc::channel();
        tx.send(Err(io::Error::new(io::ErrorKind::Other, "no threads")))
            .unwrap();
        let deadline = Instant::now() + Duration::from_secs(1);
        match collect(rx, deadline, Duration::from_secs(1)) {
            Err(ProcessFailure::Io(err)) => assert_eq!(err.to_string(), "no threads"),
            other => panic!("expected io failure, got {other:?}"),
        }
    }

    #[test]
    fn missing_pipe_collects_as_empty() {
        let rx = drain(None::<io::Empty>);
        let deadline = Instant::now() + Duration::from_secs(1);
        assert_eq!(collect(rx, deadline, Duration::from_secs(1)).unwrap(), "");
    }

    #[test]
    fn wrap_width_is_never_zero() {
        let runner = ProcessRunner::new(Canned::new(Ok(CapturedOutput::default())))
            .with_wrap_width(0);
        assert_eq!(runner.wrap_width, 1);
    }
}
