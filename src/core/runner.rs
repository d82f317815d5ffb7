//! Check runner for executing hook checks.
//!
//! [`Checks`] drives a hook run: it resolves the changed paths, narrows them
//! per check through the check's filter chain, runs each check in declaration
//! order, applies fail-fast, and performs at most one autofix-then-retry
//! cycle before reporting the aggregate result.

use crate::config::{Check, Config, PreCommitCheck};
use crate::core::changes::ChangeSet;
use crate::core::error::{Error, Result};
use crate::core::executor::{CheckExecutor, CommandOutput, ProcessRunner};
use crate::core::filter::FilterChain;
use crate::core::git::{ChangeScope, Vcs};
use crate::core::output::{OutputConfig, Reporter};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// The Git hook a run was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Hook {
    /// `pre-commit`, also used by `run` and `fix`.
    PreCommit,
    /// `commit-msg`.
    CommitMsg,
    /// `pre-push`.
    PrePush,
}

impl Hook {
    /// Returns the Git name of the hook.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreCommit => "pre-commit",
            Self::CommitMsg => "commit-msg",
            Self::PrePush => "pre-push",
        }
    }
}

/// Final state of one check (or fix) in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Command exited 0.
    Passed,
    /// Command exited non-zero, or could not be started.
    Failed,
    /// Nothing to check, or deselected.
    Skipped,
    /// Not attempted because an earlier check failed with fail-fast on.
    NotRun,
    /// Fix command exited 0.
    Fixed,
    /// Fix command exited non-zero.
    FixFailed,
}

impl Status {
    /// Returns true for outcomes that fail the run.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::FixFailed)
    }

    /// Returns true for outcomes where the command never ran.
    #[must_use]
    pub const fn is_skipped(self) -> bool {
        matches!(self, Self::Skipped | Self::NotRun)
    }
}

/// Result of running a single check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// Name of the check.
    pub name: String,
    /// Outcome.
    pub status: Status,
    /// Merged stdout and stderr of the command.
    pub output: String,
    /// How long the command ran.
    pub duration: Duration,
}

impl CheckResult {
    /// Creates a skipped check result.
    #[must_use]
    pub fn skipped(name: String) -> Self {
        Self::without_output(name, Status::Skipped)
    }

    /// Creates a result for a check cut off by fail-fast.
    #[must_use]
    pub fn not_run(name: String) -> Self {
        Self::without_output(name, Status::NotRun)
    }

    /// Creates a result from a finished command.
    #[must_use]
    pub fn from_output(name: String, status: Status, output: CommandOutput) -> Self {
        Self {
            name,
            status,
            output: output.output,
            duration: output.duration,
        }
    }

    fn without_output(name: String, status: Status) -> Self {
        Self {
            name,
            status,
            output: String::new(),
            duration: Duration::ZERO,
        }
    }
}

/// Result of running all checks of a hook.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Hook that was run.
    pub hook: Hook,
    /// Results of the authoritative pass (the retry pass if autofix ran).
    pub checks: Vec<CheckResult>,
    /// Results of the autofix pass, if one ran.
    pub fixes: Vec<CheckResult>,
    /// Whether an autofix-then-retry cycle ran.
    pub autofixed: bool,
    /// Total duration.
    pub duration: Duration,
}

impl RunResult {
    /// Returns true if no check failed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Returns the number of passed checks.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| matches!(c.status, Status::Passed | Status::Fixed))
            .count()
    }

    /// Returns the number of failed checks.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.status.is_failure()).count()
    }

    /// Returns the number of skipped checks.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.checks.iter().filter(|c| c.status.is_skipped()).count()
    }

    /// Returns failed check results.
    #[must_use]
    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| c.status.is_failure())
    }

    /// Returns the process exit code for this result.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.success())
    }
}

/// Options for a pre-commit run.
#[derive(Debug, Clone)]
pub struct PreCommitOptions {
    /// Only run fix commands.
    pub fix_mode: bool,
    /// Which changes to look at.
    pub scope: ChangeScope,
    /// Stop at the first failing check.
    pub fail_fast: bool,
    /// Names of checks to skip.
    pub skip: Vec<String>,
    /// If non-empty, names of the only checks to run.
    pub only: Vec<String>,
}

impl Default for PreCommitOptions {
    fn default() -> Self {
        Self {
            fix_mode: false,
            scope: ChangeScope::Staged,
            fail_fast: false,
            skip: Vec::new(),
            only: Vec::new(),
        }
    }
}

/// What one hook's checks run against.
#[derive(Debug, Clone, Copy)]
enum Subject<'s> {
    /// Changed files, narrowed per check; pre-commit.
    Changes {
        changes: &'s ChangeSet,
        skipped: &'s [bool],
    },
    /// The commit message file; commit-msg.
    Message(&'s Path),
    /// The commits being pushed and the files they touch; pre-push.
    Push {
        commits: &'s [String],
        changes: &'s ChangeSet,
    },
}

/// The check engine for one configuration.
pub struct Checks<'a> {
    config: Config,
    checks: Vec<Check>,
    chains: Vec<FilterChain>,
    vcs: &'a dyn Vcs,
    runner: &'a dyn ProcessRunner,
    reporter: Reporter,
}

impl std::fmt::Debug for Checks<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checks")
            .field("config", &self.config)
            .field("chains", &self.chains)
            .field("reporter", &self.reporter)
            .finish_non_exhaustive()
    }
}

impl<'a> Checks<'a> {
    /// Registers the configured checks, compiling their filter chains.
    pub fn new(
        config: Config,
        vcs: &'a dyn Vcs,
        runner: &'a dyn ProcessRunner,
        output: OutputConfig,
    ) -> Result<Self> {
        let chains = config
            .pre_commit
            .iter()
            .map(|check| {
                FilterChain::compile(
                    &check.display_name(),
                    check.base_pattern.as_deref(),
                    &check.filters,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            checks: config.checks(),
            config,
            chains,
            vcs,
            runner,
            reporter: Reporter::new(output),
        })
    }

    /// Returns the configuration being run.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the pre-commit checks (or, in fix mode, their fix commands).
    pub fn run_pre_commit(&self, options: &PreCommitOptions) -> Result<RunResult> {
        let start = Instant::now();
        let skipped = self.selection(&options.skip, &options.only)?;

        let changes = self.vcs.changes(&options.scope)?;
        let executor = CheckExecutor::new(
            self.runner,
            self.vcs,
            !options.scope.includes_unstaged(),
        );

        if options.fix_mode {
            let fixes = self.fix_pass(&executor, &skipped, &changes, true)?;
            let result = RunResult {
                hook: Hook::PreCommit,
                checks: fixes,
                fixes: Vec::new(),
                autofixed: false,
                duration: start.elapsed(),
            };
            self.reporter.summary(&result);
            return Ok(result);
        }

        let fail_fast = options.fail_fast || self.config.fail_fast;
        let subject = Subject::Changes {
            changes: &changes,
            skipped: &skipped,
        };
        let mut checks = self.check_pass(&executor, Hook::PreCommit, subject, fail_fast)?;
        let mut fixes = Vec::new();
        let mut autofixed = false;

        if self.autofix_eligible(&checks) {
            tracing::debug!("Running autofix pass");
            self.reporter.autofixing();
            fixes = self.fix_pass(&executor, &skipped, &changes, false)?;

            let changes = self.vcs.changes(&options.scope)?;
            let subject = Subject::Changes {
                changes: &changes,
                skipped: &skipped,
            };
            checks = self.check_pass(&executor, Hook::PreCommit, subject, fail_fast)?;
            self.keep_fix_failures(&mut checks, &fixes);
            autofixed = true;
        }

        let result = RunResult {
            hook: Hook::PreCommit,
            checks,
            fixes,
            autofixed,
            duration: start.elapsed(),
        };
        self.reporter.summary(&result);
        Ok(result)
    }

    /// Runs the commit-msg checks against the message file at `path`.
    pub fn run_commit_msg(&self, path: &Path) -> Result<RunResult> {
        let start = Instant::now();
        let executor = CheckExecutor::new(self.runner, self.vcs, false);
        let checks = self.check_pass(
            &executor,
            Hook::CommitMsg,
            Subject::Message(path),
            self.config.fail_fast,
        )?;

        let result = RunResult {
            hook: Hook::CommitMsg,
            checks,
            fixes: Vec::new(),
            autofixed: false,
            duration: start.elapsed(),
        };
        self.reporter.summary(&result);
        Ok(result)
    }

    /// Runs the pre-push checks against what is not yet on `remote`.
    ///
    /// Checks get the hashes of the commits to push, or with `pass_files`
    /// the paths changed since the last pushed commit.
    pub fn run_pre_push(&self, remote: &str) -> Result<RunResult> {
        let start = Instant::now();
        let branch = self.vcs.current_branch()?;
        let since = self.vcs.last_pushed_commit(remote, &branch)?;
        let commits = self.vcs.commits_since(since.clone())?;
        let changes = if commits.is_empty() {
            ChangeSet::default()
        } else {
            self.vcs.changes(&ChangeScope::Since(since.clone()))?
        };
        tracing::debug!(
            %remote,
            %branch,
            ?since,
            commits = commits.len(),
            paths = changes.len(),
            "Resolved changes to push"
        );

        let executor = CheckExecutor::new(self.runner, self.vcs, false);
        let subject = Subject::Push {
            commits: &commits,
            changes: &changes,
        };
        let checks = self.check_pass(&executor, Hook::PrePush, subject, self.config.fail_fast)?;

        let result = RunResult {
            hook: Hook::PrePush,
            checks,
            fixes: Vec::new(),
            autofixed: false,
            duration: start.elapsed(),
        };
        self.reporter.summary(&result);
        Ok(result)
    }

    /// Resolves `--skip` / `--only` into a per-check skip flag.
    fn selection(&self, skip: &[String], only: &[String]) -> Result<Vec<bool>> {
        let names: Vec<String> = self
            .config
            .pre_commit
            .iter()
            .map(PreCommitCheck::display_name)
            .collect();

        if let Some(unknown) = skip.iter().chain(only).find(|n| !names.contains(n)) {
            return Err(Error::UnknownCheck {
                name: unknown.clone(),
            });
        }

        Ok(self
            .config
            .pre_commit
            .iter()
            .zip(&names)
            .map(|(check, name)| {
                check.skip || skip.contains(name) || (!only.is_empty() && !only.contains(name))
            })
            .collect())
    }

    /// Files `check` number `index` should see in `changes`.
    fn files_for(&self, index: usize, changes: &ChangeSet) -> Vec<PathBuf> {
        changes.filtered(&self.chains[index]).existing()
    }

    /// Runs the checks of `hook` in declaration order, honoring fail-fast.
    fn check_pass(
        &self,
        executor: &CheckExecutor<'_>,
        hook: Hook,
        subject: Subject<'_>,
        fail_fast: bool,
    ) -> Result<Vec<CheckResult>> {
        let mut results = Vec::new();
        let mut aborted = false;

        let checks = self.checks.iter().filter(|c| c.hook() == hook.as_str());
        for (index, check) in checks.enumerate() {
            let result = if aborted {
                CheckResult::not_run(check.display_name())
            } else {
                self.run_check(executor, index, check, subject)?
            };
            self.reporter.finished(&result);

            let stops_run = match check {
                Check::PreCommit(check) => check.fail_fast,
                Check::CommitMsg(_) | Check::PrePush(_) => false,
            };
            if result.status.is_failure() && (fail_fast || stops_run) {
                aborted = true;
            }
            results.push(result);
        }

        Ok(results)
    }

    /// Runs check number `index` of its hook, or skips it if it has nothing
    /// to look at.
    fn run_check(
        &self,
        executor: &CheckExecutor<'_>,
        index: usize,
        check: &Check,
        subject: Subject<'_>,
    ) -> Result<CheckResult> {
        let name = check.display_name();

        match (check, subject) {
            (Check::PreCommit(check), Subject::Changes { changes, skipped }) => {
                let files = self.files_for(index, changes);
                if skipped[index] || files.is_empty() {
                    return Ok(CheckResult::skipped(name));
                }
                self.reporter.running(&name);
                executor.run(check, &files)
            },
            (Check::CommitMsg(check), Subject::Message(path)) => {
                self.reporter.running(&name);
                executor.run_with_args(name, &check.cmd, &[path])
            },
            (Check::PrePush(check), Subject::Push { commits, changes }) => {
                if commits.is_empty() {
                    return Ok(CheckResult::skipped(name));
                }
                if !check.pass_files {
                    self.reporter.running(&name);
                    return executor.run_with_args(name, &check.cmd, commits);
                }
                let files = changes.existing();
                if files.is_empty() {
                    return Ok(CheckResult::skipped(name));
                }
                self.reporter.running(&name);
                executor.run_with_args(name, &check.cmd, &files)
            },
            (check, _) => Err(Error::Internal {
                message: format!("{} check run outside its hook", check.hook()),
            }),
        }
    }

    /// Runs every selected fix command against its slice of `changes`.
    ///
    /// Checks without a fix command are reported only when `report_unfixable`
    /// is set. A failing fix does not stop the others.
    fn fix_pass(
        &self,
        executor: &CheckExecutor<'_>,
        skipped: &[bool],
        changes: &ChangeSet,
        report_unfixable: bool,
    ) -> Result<Vec<CheckResult>> {
        let mut results = Vec::new();

        for (index, check) in self.config.pre_commit.iter().enumerate() {
            if !check.is_fixable() && !report_unfixable {
                continue;
            }

            let name = check.display_name();
            let files = self.files_for(index, changes);

            let result = if skipped[index] || !check.is_fixable() || files.is_empty() {
                CheckResult::skipped(name)
            } else {
                self.reporter.fixing(&name);
                executor.fix(check, &files)?
            };
            self.reporter.finished(&result);
            results.push(result);
        }

        Ok(results)
    }

    /// A fix that failed leaves its check failed, whatever the retry said.
    fn keep_fix_failures(&self, checks: &mut [CheckResult], fixes: &[CheckResult]) {
        let fixable = self
            .config
            .pre_commit
            .iter()
            .enumerate()
            .filter(|(_, check)| check.is_fixable())
            .map(|(index, _)| index);

        for (index, fix) in fixable.zip(fixes) {
            let check = &mut checks[index];
            if fix.status == Status::FixFailed && !check.status.is_failure() {
                tracing::debug!(check = %check.name, "Fix failed; keeping the check failed");
                check.status = Status::FixFailed;
                check.output.clone_from(&fix.output);
                self.reporter.finished(check);
            }
        }
    }

    /// Autofix runs if some failed check is fixable and opted in.
    fn autofix_eligible(&self, results: &[CheckResult]) -> bool {
        results
            .iter()
            .zip(&self.config.pre_commit)
            .any(|(result, check)| {
                result.status == Status::Failed
                    && check.is_fixable()
                    && (self.config.autofix || check.autofix)
            })
    }
}
