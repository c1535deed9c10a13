//! Low-level `adb` invocation and outcome capture.
//!
//! Every device interaction goes through [`CommandRunner::run`]. The
//! production implementation, [`AdbRunner`], spawns the `adb` binary with an
//! argument vector (no host shell in between) and folds every way a process
//! can fail into a [`CommandOutcome`] with `succeeded = false`. It never
//! returns an error.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Normalized result of one `adb` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub succeeded: bool,
    /// Stdout with trailing whitespace removed.
    pub output: String,
    /// Stderr when non-empty, or a spawn/exit diagnostic on failure.
    pub diagnostic: Option<String>,
    /// Process exit code or OS error number, when one is known.
    pub code: Option<i32>,
}

impl CommandOutcome {
    #[cfg(test)]
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            output: output.into(),
            diagnostic: None,
            code: Some(0),
        }
    }

    pub fn failure(diagnostic: impl Into<String>, code: Option<i32>) -> Self {
        Self {
            succeeded: false,
            output: String::new(),
            diagnostic: Some(diagnostic.into()),
            code,
        }
    }

    /// Best text to report when the outcome is treated as a failure:
    /// the diagnostic if there is one, else stdout.
    pub fn failure_text(&self) -> String {
        match &self.diagnostic {
            Some(d) if !d.trim().is_empty() => d.clone(),
            _ => self.output.clone(),
        }
    }
}

/// Executes a single `adb` command against an optional device serial.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `adb [-s <device>] <args...>`.
    async fn run(&self, args: &[String], device: Option<&str>) -> CommandOutcome;
}

/// Build the full argument vector, prefixing `-s <device>` when present.
pub fn build_args(args: &[String], device: Option<&str>) -> Vec<String> {
    let mut full = Vec::with_capacity(args.len() + 2);
    if let Some(d) = device.filter(|d| !d.is_empty()) {
        full.push("-s".to_string());
        full.push(d.to_string());
    }
    full.extend(args.iter().cloned());
    full
}

/// [`CommandRunner`] backed by the real `adb` binary.
pub struct AdbRunner {
    program: String,
}

impl AdbRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl CommandRunner for AdbRunner {
    async fn run(&self, args: &[String], device: Option<&str>) -> CommandOutcome {
        let argv = build_args(args, device);
        debug!(program = %self.program, args = ?argv, "running adb");

        let output = Command::new(&self.program)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let outcome = match output {
            Ok(out) => {
                let stdout = String::from_utf8_lossy(&out.stdout).trim_end().to_string();
                let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
                let stderr = (!stderr.is_empty()).then_some(stderr);
                if out.status.success() {
                    CommandOutcome {
                        succeeded: true,
                        output: stdout,
                        diagnostic: stderr,
                        code: out.status.code(),
                    }
                } else {
                    let diagnostic = stderr.unwrap_or_else(|| match out.status.code() {
                        Some(c) => format!("{} exited with status {c}", self.program),
                        None => format!("{} terminated by signal", self.program),
                    });
                    CommandOutcome {
                        succeeded: false,
                        output: stdout,
                        diagnostic: Some(diagnostic),
                        code: out.status.code(),
                    }
                }
            }
            Err(e) => CommandOutcome::failure(
                format!("Failed to spawn {}: {e}", self.program),
                e.raw_os_error(),
            ),
        };

        if !outcome.succeeded {
            debug!(
                args = ?argv,
                code = ?outcome.code,
                diagnostic = outcome.diagnostic.as_deref().unwrap_or(""),
                "adb command failed"
            );
        }
        outcome
    }
}

/// Quote a string for a POSIX device shell (`adb shell ...` arguments are
/// re-joined and interpreted by `sh` on the device).
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Convenience for building argument vectors from string literals.
#[macro_export]
macro_rules! argv {
    ($($arg:expr),* $(,)?) => {
        vec![$(::std::string::ToString::to_string(&$arg)),*]
    };
}
