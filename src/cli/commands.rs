//! CLI command implementations.

use super::{BuiltinCommand, SelectionArgs};
use crate::checks::commit_msg::{self, FormatOptions};
use crate::checks::forbidden::{self, ForbiddenStrings, DEFAULT_FORBIDDEN};
use crate::checks::newline::{self, NewlineOptions};
use crate::checks::{is_builtin, FINDINGS_EXIT_CODE};
use crate::config::{Check, Config, CONFIG_FILE_NAME};
use crate::core::error::{Error, Result};
use crate::core::executor::Executor;
use crate::core::git::{ChangeScope, GitRepo};
use crate::core::output::OutputConfig;
use crate::core::runner::{Checks, Hook, PreCommitOptions, RunResult};
use console::{style, StyledObject};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Marker identifying hook scripts written by `install`.
const HOOK_MARKER: &str = "generated by iprecommit";

/// Env var naming a file to copy instead of the built-in config template.
const ENV_TOML_TEMPLATE: &str = "IPRECOMMIT_TOML_TEMPLATE";

/// Env var that turns on the diagnostic dump.
const ENV_DEBUG: &str = "IPRECOMMIT_DEBUG";

/// Hooks managed by `install` and `uninstall`, in installation order.
const HOOKS: [Hook; 3] = [Hook::PreCommit, Hook::CommitMsg, Hook::PrePush];

/// Hook script template.
const HOOK_SCRIPT: &str = r#"#!/bin/sh

# generated by iprecommit, version {version}

set -e

if [ -x {exe} ]; then
  {exe} {args}
elif command -v iprecommit >/dev/null 2>&1; then
  iprecommit {args}
else
  echo "ERROR: You have a {hook} script at {path} created by"
  echo "iprecommit, but the 'iprecommit' executable could not be found."
  echo
  echo "To fix this, reinstall iprecommit and run:"
  echo
  echo "  iprecommit install --force"
  echo
  echo "Or delete {path} if you don't want to use iprecommit."
  exit 1
fi
"#;

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Global {
    /// Forced colour setting, `None` to auto-detect.
    pub color: Option<bool>,
    /// Verbose output.
    pub verbose: bool,
    /// The parsed command, echoed by the `IPRECOMMIT_DEBUG` dump.
    pub command: String,
}

impl Global {
    fn output(&self) -> OutputConfig {
        OutputConfig::detect(self.color, self.verbose)
    }

    fn paint<D>(&self, styled: StyledObject<D>) -> StyledObject<D> {
        styled.force_styling(self.color.unwrap_or_else(console::colors_enabled_stderr))
    }
}

/// Everything a hook run needs: the repository, its configuration and a
/// process runner.
struct Session {
    repo: GitRepo,
    config: Config,
    executor: Executor,
}

impl Session {
    fn open(global: &Global, config_path: Option<&Path>) -> Result<Self> {
        let repo = open_repo(global)?;
        let config = Config::load_from(&config_path_or_default(config_path))?;
        let executor = Executor::new()?;
        Ok(Self {
            repo,
            config,
            executor,
        })
    }

    fn checks(&self, global: &Global) -> Result<Checks<'_>> {
        Checks::new(
            self.config.clone(),
            &self.repo,
            &self.executor,
            global.output(),
        )
    }
}

/// Finds the repository, moves into its root and prints the debug dump if
/// requested.
fn open_repo(global: &Global) -> Result<GitRepo> {
    let repo = GitRepo::discover()?;
    std::env::set_current_dir(repo.root())
        .map_err(|e| Error::io(format!("change directory to {}", repo.root().display()), e))?;

    if debug_enabled(std::env::var(ENV_DEBUG).ok().as_deref()) {
        print_debugging_info(&repo, global);
    }

    Ok(repo)
}

fn config_path_or_default(config_path: Option<&Path>) -> PathBuf {
    config_path.map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), Path::to_path_buf)
}

fn debug_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| v != "0")
}

fn print_debugging_info(repo: &GitRepo, global: &Global) {
    eprintln!("debug: iprecommit version: {}", env!("CARGO_PKG_VERSION"));

    match repo.version() {
        Ok(version) => eprintln!("debug: git version: {version}"),
        Err(e) => eprintln!("debug: failed to get git version: {e}"),
    }

    match repo.config_list() {
        Ok(entries) => {
            for (key, value) in entries.iter().filter(|(k, _)| k.starts_with("core.")) {
                eprintln!("debug: git config: {key}={value}");
            }
        },
        Err(e) => eprintln!("debug: failed to get git config: {e}"),
    }

    eprintln!(
        "debug: env: PATH={}",
        std::env::var("PATH").unwrap_or_default()
    );
    for (key, value) in std::env::vars().filter(|(k, _)| k.starts_with("GIT_")) {
        eprintln!("debug: env: {key}={value}");
    }

    eprintln!("debug: git root: {}", repo.root().display());
    eprintln!("debug: args: {}", global.command);
}

/// Install git hooks.
pub fn install(global: &Global, force: bool, path: Option<&Path>) -> Result<ExitCode> {
    let repo = open_repo(global)?;
    let hooks_dir = repo.hooks_dir();

    // Bail before changing anything if a foreign hook is in the way.
    for hook in HOOKS {
        let hook_path = hooks_dir.join(hook.as_str());
        if hook_path.exists() && !is_our_hook(&hook_path)? {
            if !force {
                return Err(Error::HookExists { path: hook_path });
            }
            eprintln!(
                "{} Overwriting existing hook at {}.",
                global.paint(style("!").yellow()),
                hook_path.display()
            );
        }
    }

    let config_path = config_path_or_default(path);
    let wrote_config = if config_path.exists() {
        false
    } else {
        write_config_template(global, &config_path)?;
        true
    };

    std::fs::create_dir_all(&hooks_dir).map_err(|e| Error::io("create hooks dir", e))?;

    let exe = iprecommit_path(repo.root());
    let extra_args = path
        .map(|p| format!(" --config {}", shell_quote(&p.to_string_lossy())))
        .unwrap_or_default();

    for hook in HOOKS {
        let hook_path = hooks_dir.join(hook.as_str());
        let args = match hook {
            Hook::PreCommit => "run".to_string(),
            Hook::CommitMsg => r#"run-commit-msg --commit-msg "$1""#.to_string(),
            Hook::PrePush => r#"run-pre-push --remote "$1""#.to_string(),
        } + &extra_args;

        let script = HOOK_SCRIPT
            .replace("{version}", env!("CARGO_PKG_VERSION"))
            .replace("{exe}", &shell_quote(&exe))
            .replace("{args}", &args)
            .replace("{hook}", hook.as_str())
            .replace("{path}", &hook_path.display().to_string());

        replace_file(&hook_path, &script)?;
        tracing::debug!(path = %hook_path.display(), "Wrote hook script");
        eprintln!(
            "{} Created hook: {}",
            global.paint(style("✓").green()),
            hook_path.display()
        );
    }

    if wrote_config {
        eprintln!();
        eprintln!(
            "Created {} from template. Edit it to add your own checks.",
            config_path.display()
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// Uninstall git hooks.
pub fn uninstall(global: &Global, force: bool) -> Result<ExitCode> {
    let repo = open_repo(global)?;
    let hooks_dir = repo.hooks_dir();

    if !hooks_dir.join(Hook::PreCommit.as_str()).exists() {
        return Err(Error::NoHook);
    }

    let mut installed = Vec::new();
    for hook in HOOKS {
        let hook_path = hooks_dir.join(hook.as_str());
        if !hook_path.exists() {
            continue;
        }
        if !is_our_hook(&hook_path)? {
            if !force {
                return Err(Error::HookNotOurs { path: hook_path });
            }
            eprintln!(
                "{} Uninstalling existing hook at {}.",
                global.paint(style("!").yellow()),
                hook_path.display()
            );
        }
        installed.push(hook_path);
    }

    for hook_path in installed {
        std::fs::remove_file(&hook_path).map_err(|e| Error::io("remove hook", e))?;
        eprintln!(
            "{} Removed hook: {}",
            global.paint(style("✓").green()),
            hook_path.display()
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn is_our_hook(path: &Path) -> Result<bool> {
    // Hooks may be binaries, so read bytes rather than text.
    let content = std::fs::read(path).map_err(|e| Error::io("read existing hook", e))?;
    Ok(String::from_utf8_lossy(&content).contains(HOOK_MARKER))
}

fn write_config_template(global: &Global, config_path: &Path) -> Result<()> {
    if let Some(template) = std::env::var_os(ENV_TOML_TEMPLATE) {
        let template = PathBuf::from(template);
        match std::fs::copy(&template, config_path) {
            Ok(_) => return Ok(()),
            Err(e) => {
                let reason = if e.kind() == std::io::ErrorKind::NotFound {
                    "does not exist"
                } else {
                    "could not be copied"
                };
                tracing::debug!(error = %e, "Failed to copy config template");
                eprintln!(
                    "{} File at {ENV_TOML_TEMPLATE} ({}) {reason}. Falling back to default template.",
                    global.paint(style("!").yellow()),
                    template.display()
                );
            },
        }
    }

    std::fs::write(config_path, Config::template()).map_err(|e| Error::io("write config", e))
}

/// Returns the path hooks should run `iprecommit` by: the running binary,
/// relative to `root` when it lives inside the repository.
fn iprecommit_path(root: &Path) -> String {
    let exe = std::env::current_exe()
        .ok()
        .or_else(|| which::which("iprecommit").ok())
        .unwrap_or_else(|| PathBuf::from("iprecommit"));

    exe.strip_prefix(root)
        .map_or_else(|_| exe.clone(), Path::to_path_buf)
        .to_string_lossy()
        .into_owned()
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Writes `contents` to a sibling temp file, makes it executable and renames
/// it over `path`.
fn replace_file(path: &Path, contents: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(
        ".iprecommit-tempfile-{}-{file_name}",
        std::process::id()
    ));

    std::fs::write(&temp, contents).map_err(|e| Error::io("write hook", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&temp)
            .map_err(|e| Error::io("get hook metadata", e))?
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&temp, perms).map_err(|e| Error::io("set hook perms", e))?;
    }

    std::fs::rename(&temp, path).map_err(|e| Error::io("replace hook", e))
}

fn pre_commit_options(selection: &SelectionArgs, fix_mode: bool, fail_fast: bool) -> PreCommitOptions {
    PreCommitOptions {
        fix_mode,
        scope: ChangeScope::from_flags(selection.unstaged, selection.all),
        fail_fast,
        skip: selection.skip.clone(),
        only: selection.only.clone(),
    }
}

fn exit_code(result: &RunResult) -> ExitCode {
    ExitCode::from(result.exit_code())
}

/// Run the pre-commit checks.
pub fn run(
    global: &Global,
    config_path: Option<&Path>,
    selection: &SelectionArgs,
    fail_fast: bool,
) -> Result<ExitCode> {
    let session = Session::open(global, config_path)?;
    let options = pre_commit_options(selection, false, fail_fast);
    let result = session.checks(global)?.run_pre_commit(&options)?;
    Ok(exit_code(&result))
}

/// Run the fix commands of the pre-commit checks.
pub fn fix(
    global: &Global,
    config_path: Option<&Path>,
    selection: &SelectionArgs,
) -> Result<ExitCode> {
    let session = Session::open(global, config_path)?;
    let options = pre_commit_options(selection, true, false);
    let result = session.checks(global)?.run_pre_commit(&options)?;
    Ok(exit_code(&result))
}

/// Run the commit-msg checks.
pub fn run_commit_msg(
    global: &Global,
    config_path: Option<&Path>,
    message_path: &Path,
) -> Result<ExitCode> {
    let session = Session::open(global, config_path)?;

    std::fs::File::open(message_path).map_err(|e| {
        Error::usage(format!(
            "could not read commit message file {}: {e}",
            message_path.display()
        ))
    })?;

    let result = session.checks(global)?.run_commit_msg(message_path)?;
    Ok(exit_code(&result))
}

/// Run the pre-push checks.
pub fn run_pre_push(global: &Global, config_path: Option<&Path>, remote: &str) -> Result<ExitCode> {
    let session = Session::open(global, config_path)?;
    let result = session.checks(global)?.run_pre_push(remote)?;
    Ok(exit_code(&result))
}

/// List configured checks.
pub fn list(global: &Global, config_path: Option<&Path>, json: bool) -> Result<ExitCode> {
    open_repo(global)?;
    let config = Config::load_from(&config_path_or_default(config_path))?;
    let checks = config.checks();

    let mut stdout = std::io::stdout().lock();
    if json {
        let text = serde_json::to_string_pretty(&checks).map_err(|e| Error::Internal {
            message: format!("Failed to serialize checks: {e}"),
        })?;
        writeln!(stdout, "{text}").map_err(|e| Error::io("write output", e))?;
        return Ok(ExitCode::SUCCESS);
    }

    for hook in HOOKS {
        let of_hook: Vec<&Check> = checks.iter().filter(|c| c.hook() == hook.as_str()).collect();
        if of_hook.is_empty() {
            continue;
        }
        writeln!(stdout, "{}:", global.paint(style(hook.as_str()).bold()))
            .map_err(|e| Error::io("write output", e))?;
        for check in of_hook {
            let builtin = if is_builtin(check.cmd()) { " (builtin)" } else { "" };
            writeln!(
                stdout,
                "  {} - {}{builtin}",
                global.paint(style(check.display_name()).cyan()),
                check.cmd().join(" ")
            )
            .map_err(|e| Error::io("write output", e))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Run a built-in check.
pub fn builtin(command: BuiltinCommand) -> Result<ExitCode> {
    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr().lock();

    let passed = match command {
        BuiltinCommand::NewlineAtEof {
            fix,
            disallow_empty,
            paths,
        } => newline::run(
            &paths,
            NewlineOptions {
                fix,
                disallow_empty,
            },
            &mut stdout,
            &mut stderr,
        )?,
        BuiltinCommand::NoForbiddenStrings {
            paths,
            commits,
            strings,
            case_sensitive,
        } => {
            let forbidden = if strings.is_empty() {
                ForbiddenStrings::new(DEFAULT_FORBIDDEN, case_sensitive)?
            } else {
                ForbiddenStrings::new(&strings, case_sensitive)?
            };
            let repo = if commits.is_empty() {
                None
            } else {
                Some(GitRepo::discover()?)
            };
            forbidden::run(
                &forbidden,
                &paths,
                &commits,
                |rev| repo.as_ref().map_or_else(|| Ok(String::new()), |r| r.commit_message(rev)),
                &mut stdout,
                &mut stderr,
            )?
        },
        BuiltinCommand::CommitMsgFormat {
            path,
            max_first_line_length,
            max_line_length,
            require_capitalized,
        } => {
            let text = std::fs::read_to_string(&path).map_err(|e| {
                Error::usage(format!(
                    "could not read commit message file {}: {e}",
                    path.display()
                ))
            })?;
            let options = FormatOptions {
                max_first_line_length,
                max_line_length,
                require_capitalized,
            };
            let problems = commit_msg::problems(&text, &options);
            for problem in &problems {
                writeln!(stdout, "{problem}").map_err(|e| Error::io("write output", e))?;
            }
            problems.is_empty()
        },
    };

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(FINDINGS_EXIT_CODE)
    })
}

/// Generate shell completions.
pub fn completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    clap_complete::generate(
        shell,
        &mut super::Cli::command(),
        "iprecommit",
        &mut std::io::stdout(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case::unset(None, false)]
    #[case::zero(Some("0"), false)]
    #[case::one(Some("1"), true)]
    #[case::empty(Some(""), true)]
    #[case::word(Some("yes"), true)]
    fn test_debug_enabled(#[case] value: Option<&str>, #[case] expected: bool) {
        assert_eq!(debug_enabled(value), expected);
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/usr/bin/iprecommit"), "'/usr/bin/iprecommit'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_config_path_or_default() {
        assert_eq!(config_path_or_default(None), PathBuf::from(CONFIG_FILE_NAME));
        assert_eq!(
            config_path_or_default(Some(Path::new("hooks.toml"))),
            PathBuf::from("hooks.toml")
        );
    }

    #[test]
    fn test_iprecommit_path_is_relative_inside_root() {
        let exe = std::env::current_exe().expect("current exe");
        let root = exe.parent().and_then(Path::parent).expect("exe has grandparent");
        let path = iprecommit_path(root);
        assert!(!Path::new(&path).is_absolute());
        assert!(path.ends_with(&*exe.file_name().expect("file name").to_string_lossy()));
    }

    #[test]
    fn test_replace_file_is_executable() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("pre-commit");
        std::fs::write(&path, "old").expect("write");

        replace_file(&path, "#!/bin/sh\n").expect("replace");

        assert_eq!(std::fs::read_to_string(&path).expect("read"), "#!/bin/sh\n");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
        let leftovers = std::fs::read_dir(dir.path()).expect("read dir").count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_is_our_hook() {
        let dir = TempDir::new().expect("create temp dir");
        let ours = dir.path().join("ours");
        let theirs = dir.path().join("theirs");
        std::fs::write(&ours, format!("#!/bin/sh\n# {HOOK_MARKER}, version 1\n")).expect("write");
        std::fs::write(&theirs, "#!/bin/sh\nexec husky\n").expect("write");

        assert!(is_our_hook(&ours).expect("read"));
        assert!(!is_our_hook(&theirs).expect("read"));
    }
}
