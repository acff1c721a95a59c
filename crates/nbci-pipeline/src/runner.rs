//! External command execution with timeouts.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Specification of one external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable (path or PATH-resolved name).
    pub program: String,

    /// Arguments.
    pub args: Vec<String>,

    /// Working directory.
    pub cwd: PathBuf,

    /// Environment overlay applied on top of the inherited environment.
    pub env: BTreeMap<String, String>,

    /// Kill the command after this long; `None` means wait indefinitely.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: BTreeMap::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Some(Duration::from_secs(secs));
        self
    }

    /// Render the command line for logging and fake matching.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Outcome of one command invocation. Spawn failures and timeouts are
/// folded into the outcome so stages apply a single failure policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit code; -1 when the process never produced one.
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr, or the spawn error text.
    pub stderr: String,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the timeout elapsed before the command finished.
    pub timed_out: bool,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }

    /// A zero-exit outcome, for fakes.
    pub fn ok() -> Self {
        Self {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 1,
            timed_out: false,
        }
    }

    /// A nonzero-exit outcome, for fakes.
    pub fn failed(exit_code: i32) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: "command failed".to_string(),
            duration_ms: 1,
            timed_out: false,
        }
    }

    /// A timed-out outcome, for fakes.
    pub fn timeout() -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: "timed out".to_string(),
            duration_ms: 1,
            timed_out: true,
        }
    }
}

/// Trait for command-runner backends, so stage logic can be exercised
/// against a scripted fake without spawning live subprocesses.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> CommandOutcome;
}

/// Real subprocess runner backed by tokio.
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> CommandOutcome {
        let start = Instant::now();
        tracing::debug!(command = %spec.display(), "spawning");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(&spec.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return CommandOutcome {
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: format!("failed to spawn {}: {e}", spec.program),
                    duration_ms: start.elapsed().as_millis() as u64,
                    timed_out: false,
                };
            }
        };

        let waited = match spec.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    // kill_on_drop reaps the child when the future drops.
                    return CommandOutcome {
                        exit_code: -1,
                        stdout: String::new(),
                        stderr: format!(
                            "{} timed out after {} seconds",
                            spec.program,
                            limit.as_secs()
                        ),
                        duration_ms: start.elapsed().as_millis() as u64,
                        timed_out: true,
                    };
                }
            },
            None => child.wait_with_output().await,
        };

        match waited {
            Ok(output) => CommandOutcome {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                duration_ms: start.elapsed().as_millis() as u64,
                timed_out: false,
            },
            Err(e) => CommandOutcome {
                exit_code: -1,
                stdout: String::new(),
                stderr: format!("failed to wait for {}: {e}", spec.program),
                duration_ms: start.elapsed().as_millis() as u64,
                timed_out: false,
            },
        }
    }
}
