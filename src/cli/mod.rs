//! Command-line interface for iprecommit.
//!
//! This module provides the `iprecommit` CLI with subcommands for:
//! - `install` / `uninstall`: Manage the git hooks
//! - `run`: Run the pre-commit checks
//! - `fix`: Run the fix commands of the pre-commit checks
//! - `run-commit-msg` / `run-pre-push`: Run the other hooks' checks
//! - `list`: List configured checks
//! - `builtin`: Built-in check commands
//! - `completions`: Shell completions

mod commands;

use crate::core::error::{Error, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code for command-line usage errors.
const USAGE_EXIT_CODE: u8 = 64;

/// Dead-simple Git hook management.
#[derive(Debug, Parser)]
#[command(
    name = "iprecommit",
    author,
    version,
    about = "Dead-simple Git hook management",
    long_about = r#"
iprecommit runs the checks declared in precommit.toml from the pre-commit,
commit-msg and pre-push hooks of a Git repository.

Quick start:
  iprecommit install   # Install hooks and create precommit.toml
  # Edit precommit.toml, then commit as usual.

Environment variables:
  IPRECOMMIT_DEBUG=1              Print diagnostic information first
  IPRECOMMIT_TOML_TEMPLATE=path   Template copied by `install`
  NO_COLOR=1                      Disable colour output
"#,
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Use color output.
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,
}

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Always use color.
    Always,
    /// Auto-detect color support.
    #[default]
    Auto,
    /// Never use color.
    Never,
}

impl ColorChoice {
    /// Returns the forced colour setting, if any.
    #[must_use]
    pub const fn forced(self) -> Option<bool> {
        match self {
            Self::Always => Some(true),
            Self::Never => Some(false),
            Self::Auto => None,
        }
    }
}

/// Path to the configuration file.
#[derive(Debug, Clone, Args)]
pub struct ConfigArg {
    /// Custom path to TOML configuration file. [default: precommit.toml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Which files the pre-commit checks look at.
#[derive(Debug, Clone, Args)]
pub struct SelectionArgs {
    /// Also run on unstaged files.
    #[arg(long, conflicts_with = "all")]
    pub unstaged: bool,

    /// Run on all files in the repository.
    #[arg(long)]
    pub all: bool,

    /// Skip the given check (repeatable).
    #[arg(long, value_name = "CHECK")]
    pub skip: Vec<String>,

    /// Run only the given check (repeatable).
    #[arg(long, value_name = "CHECK")]
    pub only: Vec<String>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install iprecommit hooks in the current Git repository.
    Install {
        /// Overwrite existing hooks.
        #[arg(short, long)]
        force: bool,

        /// Customize configuration file path. [default: precommit.toml]
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Uninstall the iprecommit hooks in the current Git repository.
    Uninstall {
        /// Uninstall hooks not created by iprecommit.
        #[arg(short, long)]
        force: bool,
    },

    /// Manually run the pre-commit hook.
    #[command(visible_alias = "r")]
    Run {
        #[command(flatten)]
        config: ConfigArg,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Stop after the first failing check.
        #[arg(long)]
        fail_fast: bool,
    },

    /// Apply fixes to failing checks.
    Fix {
        #[command(flatten)]
        config: ConfigArg,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Manually run the commit-msg hook.
    RunCommitMsg {
        #[command(flatten)]
        config: ConfigArg,

        /// File holding the commit message.
        #[arg(long, value_name = "FILE")]
        commit_msg: PathBuf,
    },

    /// Manually run the pre-push hook.
    RunPrePush {
        #[command(flatten)]
        config: ConfigArg,

        /// Remote being pushed to.
        #[arg(long)]
        remote: String,
    },

    /// List all configured checks.
    #[command(visible_alias = "l")]
    List {
        #[command(flatten)]
        config: ConfigArg,

        /// Print the checks as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run a built-in check.
    #[command(subcommand)]
    Builtin(BuiltinCommand),

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Built-in check commands.
#[derive(Debug, Subcommand)]
pub enum BuiltinCommand {
    /// Check that files end with a newline.
    NewlineAtEof {
        /// Append the missing newline instead of failing.
        #[arg(long)]
        fix: bool,

        /// Fail on empty files too.
        #[arg(long)]
        disallow_empty: bool,

        /// Files to check.
        paths: Vec<PathBuf>,
    },

    /// Check that files and commit messages contain no forbidden strings.
    NoForbiddenStrings {
        /// Files to check.
        #[arg(long, num_args = 0..)]
        paths: Vec<PathBuf>,

        /// Commits whose messages to check.
        #[arg(long, num_args = 0..)]
        commits: Vec<String>,

        /// Strings to forbid. [default: DO NOT COMMIT, DO NOT SUBMIT]
        #[arg(long, num_args = 1..)]
        strings: Vec<String>,

        /// Match the strings case-sensitively.
        #[arg(long)]
        case_sensitive: bool,
    },

    /// Check the format of a commit message.
    CommitMsgFormat {
        /// File holding the commit message.
        path: PathBuf,

        /// Maximum length of the first line. [default: --max-line-length]
        #[arg(long, value_name = "N")]
        max_first_line_length: Option<usize>,

        /// Maximum length of any line.
        #[arg(long, value_name = "N")]
        max_line_length: Option<usize>,

        /// Require the first line to start with a capital letter.
        #[arg(long)]
        require_capitalized: bool,
    },
}

/// Runs the CLI.
pub fn run() -> Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { USAGE_EXIT_CODE } else { 0 };
            e.print().ok();
            return Ok(ExitCode::from(code));
        },
    };

    setup_logging(cli.verbose, cli.quiet);
    tracing::debug!(?cli, "Parsed arguments");

    let Some(command) = cli.command else {
        return Err(Error::usage(
            "no subcommand given. Run `iprecommit --help` for usage.",
        ));
    };

    let global = commands::Global {
        color: cli.color.forced(),
        verbose: cli.verbose,
        command: format!("{command:?}"),
    };

    match command {
        Commands::Install { force, path } => commands::install(&global, force, path.as_deref()),
        Commands::Uninstall { force } => commands::uninstall(&global, force),
        Commands::Run {
            config,
            selection,
            fail_fast,
        } => commands::run(&global, config.config.as_deref(), &selection, fail_fast),
        Commands::Fix { config, selection } => {
            commands::fix(&global, config.config.as_deref(), &selection)
        },
        Commands::RunCommitMsg { config, commit_msg } => {
            commands::run_commit_msg(&global, config.config.as_deref(), &commit_msg)
        },
        Commands::RunPrePush { config, remote } => {
            commands::run_pre_push(&global, config.config.as_deref(), &remote)
        },
        Commands::List { config, json } => {
            commands::list(&global, config.config.as_deref(), json)
        },
        Commands::Builtin(builtin) => commands::builtin(builtin),
        Commands::Completions { shell } => {
            commands::completions(shell);
            Ok(ExitCode::SUCCESS)
        },
    }
}

/// Sets up logging based on verbosity flags.
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(cli: Cli) -> Option<(ConfigArg, SelectionArgs, bool)> {
        match cli.command {
            Some(Commands::Run {
                config,
                selection,
                fail_fast,
            }) => Some((config, selection, fail_fast)),
            _ => None,
        }
    }

    #[test]
    fn test_cli_parsing_help() {
        let cli = Cli::try_parse_from(["iprecommit", "--help"]);
        // --help causes early exit, so this will be an error
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_version() {
        let cli = Cli::try_parse_from(["iprecommit", "--version"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    // =========================================================================
    // Subcommand parsing tests
    // =========================================================================

    #[test]
    fn test_parse_install() {
        let cli = Cli::try_parse_from(["iprecommit", "install"]).expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Install {
                force: false,
                path: None
            })
        ));
    }

    #[test]
    fn test_parse_install_with_force_and_path() {
        let cli = Cli::try_parse_from(["iprecommit", "install", "--force", "--path", "hooks.toml"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Install {
                force: true,
                path: Some(_)
            })
        ));
    }

    #[test]
    fn test_parse_uninstall() {
        let cli = Cli::try_parse_from(["iprecommit", "uninstall", "--force"]).expect("parse");
        assert!(matches!(cli.command, Some(Commands::Uninstall { force: true })));
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["iprecommit", "run"]).expect("parse");
        let (config, selection, fail_fast) = run_args(cli).expect("run subcommand");
        assert!(config.config.is_none());
        assert!(!selection.unstaged);
        assert!(!selection.all);
        assert!(selection.skip.is_empty());
        assert!(!fail_fast);
    }

    #[test]
    fn test_parse_run_with_flags() {
        let cli = Cli::try_parse_from([
            "iprecommit",
            "run",
            "--config",
            "other.toml",
            "--all",
            "--fail-fast",
            "--skip",
            "A",
            "--skip",
            "B",
            "--only",
            "C",
        ])
        .expect("parse");
        let (config, selection, fail_fast) = run_args(cli).expect("run subcommand");
        assert_eq!(config.config, Some(PathBuf::from("other.toml")));
        assert!(selection.all);
        assert_eq!(selection.skip, vec!["A", "B"]);
        assert_eq!(selection.only, vec!["C"]);
        assert!(fail_fast);
    }

    #[test]
    fn test_unstaged_conflicts_with_all() {
        let result = Cli::try_parse_from(["iprecommit", "run", "--unstaged", "--all"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_fix_has_no_fail_fast() {
        assert!(Cli::try_parse_from(["iprecommit", "fix", "--unstaged"]).is_ok());
        assert!(Cli::try_parse_from(["iprecommit", "fix", "--fail-fast"]).is_err());
    }

    #[test]
    fn test_parse_run_alias() {
        let cli = Cli::try_parse_from(["iprecommit", "r"]).expect("parse run alias");
        assert!(matches!(cli.command, Some(Commands::Run { .. })));
    }

    #[test]
    fn test_parse_run_commit_msg() {
        let cli = Cli::try_parse_from([
            "iprecommit",
            "run-commit-msg",
            "--commit-msg",
            ".git/COMMIT_EDITMSG",
        ])
        .expect("parse");
        assert!(matches!(cli.command, Some(Commands::RunCommitMsg { .. })));
    }

    #[test]
    fn test_run_commit_msg_requires_file() {
        assert!(Cli::try_parse_from(["iprecommit", "run-commit-msg"]).is_err());
    }

    #[test]
    fn test_parse_run_pre_push() {
        let cli = Cli::try_parse_from(["iprecommit", "run-pre-push", "--remote", "origin"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::RunPrePush { ref remote, .. }) if remote == "origin"
        ));
    }

    #[test]
    fn test_parse_list_json() {
        let cli = Cli::try_parse_from(["iprecommit", "list", "--json"]).expect("parse");
        assert!(matches!(cli.command, Some(Commands::List { json: true, .. })));
    }

    #[test]
    fn test_parse_builtin_newline() {
        let cli = Cli::try_parse_from([
            "iprecommit",
            "builtin",
            "newline-at-eof",
            "--fix",
            "a.txt",
            "b.txt",
        ])
        .expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Builtin(BuiltinCommand::NewlineAtEof { fix: true, ref paths, .. }))
                if paths.len() == 2
        ));
    }

    #[test]
    fn test_parse_builtin_forbidden_with_empty_paths() {
        let cli = Cli::try_parse_from(["iprecommit", "builtin", "no-forbidden-strings", "--paths"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Builtin(BuiltinCommand::NoForbiddenStrings { ref paths, .. }))
                if paths.is_empty()
        ));
    }

    #[test]
    fn test_parse_builtin_commit_msg_format() {
        let cli = Cli::try_parse_from([
            "iprecommit",
            "builtin",
            "commit-msg-format",
            "--max-line-length",
            "72",
            "msg.txt",
        ])
        .expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Builtin(BuiltinCommand::CommitMsgFormat {
                max_line_length: Some(72),
                max_first_line_length: None,
                require_capitalized: false,
                ..
            }))
        ));
    }

    #[test]
    fn test_parse_completions_bash() {
        let cli = Cli::try_parse_from(["iprecommit", "completions", "bash"]).expect("parse");
        assert!(matches!(cli.command, Some(Commands::Completions { .. })));
    }

    // =========================================================================
    // Global flags tests
    // =========================================================================

    #[test]
    fn test_parse_verbose_flag() {
        let cli = Cli::try_parse_from(["iprecommit", "--verbose", "run"]).expect("parse");
        assert!(cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_parse_short_quiet() {
        let cli = Cli::try_parse_from(["iprecommit", "run", "-q"]).expect("parse");
        assert!(cli.quiet);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["iprecommit", "-v", "-q", "run"]).is_err());
    }

    #[test]
    fn test_parse_color() {
        let cli = Cli::try_parse_from(["iprecommit", "--color", "never", "run"]).expect("parse");
        assert_eq!(cli.color, ColorChoice::Never);
        assert_eq!(cli.color.forced(), Some(false));

        let cli = Cli::try_parse_from(["iprecommit", "run"]).expect("parse");
        assert_eq!(cli.color, ColorChoice::Auto);
        assert_eq!(cli.color.forced(), None);
    }

    #[test]
    fn test_parse_no_subcommand() {
        let cli = Cli::try_parse_from(["iprecommit"]).expect("parse");
        assert!(cli.command.is_none());
    }

}
