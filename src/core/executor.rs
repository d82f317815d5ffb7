//! Command execution for running checks.
//!
//! [`Executor`] spawns a child process and captures its stdout and stderr
//! into one merged buffer. [`CheckExecutor`] turns a configured check and a
//! filtered file list into an invocation and interprets the result.

use crate::config::PreCommitCheck;
use crate::core::error::{Error, Result};
use crate::core::git::Vcs;
use crate::core::runner::{CheckResult, Status};
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program followed by its arguments.
    pub args: Vec<OsString>,
    /// Working directory; the current directory when `None`.
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    /// Creates an invocation of `cmd` in the current directory.
    #[must_use]
    pub fn new<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        Self {
            args: cmd.iter().map(|a| a.as_ref().to_os_string()).collect(),
            cwd: None,
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn in_dir(mut self, cwd: Option<&Path>) -> Self {
        self.cwd = cwd.map(Path::to_path_buf);
        self
    }

    /// Returns the program name.
    #[must_use]
    pub fn program(&self) -> Option<&OsStr> {
        self.args.first().map(OsString::as_os_str)
    }
}

/// Output from a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: i32,
    /// Interleaved stdout and stderr.
    pub output: String,
    /// Duration the command took to run.
    pub duration: Duration,
}

impl CommandOutput {
    /// Returns true if the command succeeded (exit code 0).
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Something that can run an [`Invocation`] to completion.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessRunner {
    /// Runs the invocation and waits for it to exit.
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// Executor for running external commands.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
}

impl Executor {
    /// Creates a new executor with its own current-thread runtime.
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::io("start async runtime", e))?;
        Ok(Self { runtime })
    }

    async fn execute(invocation: &Invocation) -> Result<CommandOutput> {
        let start = Instant::now();

        let (program, args) = invocation.args.split_first().ok_or_else(|| Error::Internal {
            message: "empty command line".to_string(),
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(ref cwd) = invocation.cwd {
            cmd.current_dir(cwd);
        }

        tracing::debug!(args = ?invocation.args, cwd = ?invocation.cwd, "Spawning command");

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::CommandNotFound {
                    command: program.to_string_lossy().into_owned(),
                }
            } else {
                Error::io(format!("spawn {}", program.to_string_lossy()), e)
            }
        })?;

        let merged = Arc::new(Mutex::new(Vec::new()));
        let stdout_handle = child
            .stdout
            .take()
            .map(|stream| tokio::spawn(drain(stream, Arc::clone(&merged))));
        let stderr_handle = child
            .stderr
            .take()
            .map(|stream| tokio::spawn(drain(stream, Arc::clone(&merged))));

        let status = child
            .wait()
            .await
            .map_err(|e| Error::io("wait for command", e))?;

        for handle in [stdout_handle, stderr_handle].into_iter().flatten() {
            handle
                .await
                .map_err(|e| Error::Internal {
                    message: format!("output task failed: {e}"),
                })?
                .map_err(|e| Error::io("read command output", e))?;
        }

        let bytes = std::mem::take(&mut *merged.lock().await);

        Ok(CommandOutput {
            exit_code: status.code().unwrap_or(1),
            output: String::from_utf8_lossy(&bytes).into_owned(),
            duration: start.elapsed(),
        })
    }
}

impl ProcessRunner for Executor {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.runtime.block_on(Self::execute(invocation))
    }
}

/// Copies a child stream into the shared buffer chunk by chunk.
async fn drain<R>(mut stream: R, merged: Arc<Mutex<Vec<u8>>>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0_u8; 8192];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        merged.lock().await.extend_from_slice(&buf[..n]);
    }
}

/// Runs configured checks through a [`ProcessRunner`].
pub struct CheckExecutor<'a> {
    runner: &'a dyn ProcessRunner,
    vcs: &'a dyn Vcs,
    stage_fixes: bool,
}

impl std::fmt::Debug for CheckExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckExecutor")
            .field("stage_fixes", &self.stage_fixes)
            .finish_non_exhaustive()
    }
}

impl<'a> CheckExecutor<'a> {
    /// Creates a check executor.
    ///
    /// With `stage_fixes`, files touched by a successful fix command are
    /// added back to the index.
    #[must_use]
    pub fn new(runner: &'a dyn ProcessRunner, vcs: &'a dyn Vcs, stage_fixes: bool) -> Self {
        Self {
            runner,
            vcs,
            stage_fixes,
        }
    }

    /// Runs `check.cmd` against `files`.
    pub fn run(&self, check: &PreCommitCheck, files: &[PathBuf]) -> Result<CheckResult> {
        let name = check.display_name();
        if files.is_empty() {
            return Ok(CheckResult::skipped(name));
        }

        let output = self.invoke(&self.invocation(check, &check.cmd, files)?)?;
        let status = if output.success() {
            Status::Passed
        } else {
            Status::Failed
        };
        Ok(CheckResult::from_output(name, status, output))
    }

    /// Runs `check.fix_cmd` against `files`, re-staging them on success.
    pub fn fix(&self, check: &PreCommitCheck, files: &[PathBuf]) -> Result<CheckResult> {
        let name = check.display_name();
        if !check.is_fixable() || files.is_empty() {
            return Ok(CheckResult::skipped(name));
        }

        let output = self.invoke(&self.invocation(check, &check.fix_cmd, files)?)?;
        if !output.success() {
            return Ok(CheckResult::from_output(name, Status::FixFailed, output));
        }

        if self.stage_fixes {
            self.vcs.stage(files)?;
        }
        Ok(CheckResult::from_output(name, Status::Fixed, output))
    }

    /// Runs a message or push check with `args` appended to its command.
    pub fn run_with_args<S: AsRef<OsStr>>(
        &self,
        name: String,
        cmd: &[String],
        args: &[S],
    ) -> Result<CheckResult> {
        let output = self.invoke(&Invocation::new(cmd).with_args(args))?;
        let status = if output.success() {
            Status::Passed
        } else {
            Status::Failed
        };
        Ok(CheckResult::from_output(name, status, output))
    }

    fn invocation(
        &self,
        check: &PreCommitCheck,
        cmd: &[String],
        files: &[PathBuf],
    ) -> Result<Invocation> {
        let invocation = Invocation::new(cmd).in_dir(check.working_dir.as_deref());
        if !check.pass_files {
            return Ok(invocation);
        }
        match check.working_dir.as_deref() {
            Some(dir) => Ok(invocation.with_args(rebase(files, dir)?)),
            None => Ok(invocation.with_args(files)),
        }
    }

    /// Runs an invocation, reporting a missing program as a failed run.
    fn invoke(&self, invocation: &Invocation) -> Result<CommandOutput> {
        match self.runner.run(invocation) {
            Err(Error::CommandNotFound { command }) => {
                tracing::warn!(%command, "Command not found");
                Ok(CommandOutput {
                    exit_code: 127,
                    output: format!("command not found: {command}\n"),
                    duration: Duration::ZERO,
                })
            },
            other => other,
        }
    }
}

/// Rewrites repository-relative `files` so they resolve from `dir`.
///
/// Files under `dir` lose that prefix. Files outside it are made absolute.
fn rebase(files: &[PathBuf], dir: &Path) -> Result<Vec<PathBuf>> {
    let dir: PathBuf = dir
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let root = std::env::current_dir().map_err(|e| Error::io("read current directory", e))?;

    Ok(files
        .iter()
        .map(|file| match file.strip_prefix(&dir) {
            Ok(inner) => inner.to_path_buf(),
            Err(_) => root.join(file),
        })
        .collect())
}
