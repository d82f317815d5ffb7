//! Terminal reporting of check progress.
//!
//! Every check gets a `[iprecommit] <name>: <status>` line on stderr. Colour,
//! verbosity and the progress spinner are decided once, in [`OutputConfig`],
//! and carried by the [`Reporter`] that the check engine owns.

use crate::core::runner::{CheckResult, Hook, RunResult, Status};
use console::{style, StyledObject};
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::time::Duration;

const PREFIX: &str = "[iprecommit]";

/// How status output should look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Emit ANSI colours.
    pub color: bool,
    /// Print the output of passing checks too.
    pub verbose: bool,
    /// Show a spinner while a check runs.
    pub progress: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::plain()
    }
}

impl OutputConfig {
    /// Plain output: no colour, no spinner, failures only.
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            color: false,
            verbose: false,
            progress: false,
        }
    }

    /// Detects settings from the terminal and environment.
    ///
    /// `color` forces colour on or off; otherwise it follows `NO_COLOR`,
    /// `CLICOLOR_FORCE` and whether stderr is a terminal.
    #[must_use]
    pub fn detect(color: Option<bool>, verbose: bool) -> Self {
        let is_term = console::Term::stderr().is_term();
        Self {
            color: color.unwrap_or_else(console::colors_enabled_stderr),
            verbose,
            progress: is_term,
        }
    }
}

/// Prints per-check status lines and the final summary.
#[derive(Debug)]
pub struct Reporter {
    config: OutputConfig,
    spinner: RefCell<Option<ProgressBar>>,
}

impl Reporter {
    /// Creates a reporter.
    #[must_use]
    pub fn new(config: OutputConfig) -> Self {
        Self {
            config,
            spinner: RefCell::new(None),
        }
    }

    /// Returns the reporter's output settings.
    #[must_use]
    pub const fn config(&self) -> OutputConfig {
        self.config
    }

    /// Announces that a check is starting.
    pub fn running(&self, name: &str) {
        self.line(name, "running", |s| s);
        self.start_spinner(name);
    }

    /// Announces that a fix command is starting.
    pub fn fixing(&self, name: &str) {
        self.line(name, "fixing", |s| s.cyan());
        self.start_spinner(name);
    }

    /// Reports the outcome of a check or fix.
    pub fn finished(&self, result: &CheckResult) {
        self.stop_spinner();

        if self.should_show_output(result) {
            eprint!("{}", result.output);
            if !result.output.ends_with('\n') {
                eprintln!();
            }
        }

        match result.status {
            Status::Passed => self.line(&result.name, "passed", |s| s.green()),
            Status::Failed => self.line(&result.name, "failed", |s| s.red()),
            Status::Skipped => self.line(&result.name, "skipped", |s| s.yellow()),
            Status::NotRun => self.line(&result.name, "skipped (fail-fast)", |s| s.yellow()),
            Status::Fixed => self.line(&result.name, "finished", |s| s.cyan()),
            Status::FixFailed => self.line(&result.name, "fix failed", |s| s.red()),
        }

        if result.status.is_failure() {
            eprintln!();
            eprintln!();
        }
    }

    /// Announces the autofix pass.
    pub fn autofixing(&self) {
        eprintln!();
        eprintln!(
            "{} {}",
            self.paint(style(PREFIX)),
            self.paint(style("running fix commands, then checking again").cyan())
        );
        eprintln!();
    }

    /// Prints the closing summary of a run.
    pub fn summary(&self, result: &RunResult) {
        let failed = result.failed_count();
        if failed == 0 {
            if self.config.verbose {
                eprintln!(
                    "{}",
                    self.paint(
                        style(format!(
                            "All checks passed ({} passed, {} skipped) in {}",
                            result.passed_count(),
                            result.skipped_count(),
                            humantime::format_duration(round_to_millis(result.duration))
                        ))
                        .green()
                    )
                );
            }
            return;
        }

        let verb = match result.hook {
            Hook::PrePush => "Push",
            Hook::PreCommit | Hook::CommitMsg => "Commit",
        };
        eprintln!();
        eprintln!(
            "{}",
            self.paint(style(format!("{failed} failed. {verb} aborted.")).red().bold())
        );
    }

    fn should_show_output(&self, result: &CheckResult) -> bool {
        !result.output.is_empty() && (self.config.verbose || result.status.is_failure())
    }

    fn line<'a>(
        &self,
        name: &'a str,
        word: &'a str,
        color: impl FnOnce(StyledObject<&'a str>) -> StyledObject<&'a str>,
    ) {
        eprintln!(
            "{} {}: {}",
            self.paint(style(PREFIX)),
            self.paint(style(name).bold()),
            self.paint(color(style(word)))
        );
    }

    fn paint<D>(&self, styled: StyledObject<D>) -> StyledObject<D> {
        styled.force_styling(self.config.color)
    }

    fn start_spinner(&self, name: &str) {
        if !self.config.progress {
            return;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .ok()
                .unwrap_or_else(ProgressStyle::default_spinner),
        );
        pb.set_message(format!("{name}..."));
        pb.enable_steady_tick(Duration::from_millis(100));
        *self.spinner.borrow_mut() = Some(pb);
    }

    fn stop_spinner(&self) {
        if let Some(pb) = self.spinner.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }
}

fn round_to_millis(duration: Duration) -> Duration {
    Duration::from_millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}
