//! Git repository operations.
//!
//! This module provides utilities for interacting with Git repositories:
//! finding the repository root and hooks directory, listing changed paths,
//! re-staging fixed files, and the commit queries used by the pre-push hook.

use crate::core::changes::ChangeSet;
use crate::core::error::{Error, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Which changes a run looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeScope {
    /// Changes staged in the index.
    Staged,
    /// Staged and unstaged changes to tracked files, plus untracked files.
    Unstaged,
    /// Every tracked and untracked file in the repository.
    All,
    /// Changes between a revision (the empty tree when `None`) and `HEAD`.
    Since(Option<String>),
}

impl ChangeScope {
    /// Returns the scope selected by the `--unstaged` / `--all` flags.
    #[must_use]
    pub const fn from_flags(unstaged: bool, all: bool) -> Self {
        if all {
            Self::All
        } else if unstaged {
            Self::Unstaged
        } else {
            Self::Staged
        }
    }

    /// Returns true if this scope reaches beyond the index.
    ///
    /// Fixed files are only re-staged when this is false, so that unrelated
    /// unstaged edits are never promoted into the commit.
    #[must_use]
    pub const fn includes_unstaged(&self) -> bool {
        matches!(self, Self::Unstaged | Self::All)
    }
}

/// The version-control queries the check engine depends on.
#[cfg_attr(test, mockall::automock)]
pub trait Vcs {
    /// Returns the changed paths for `scope`.
    fn changes(&self, scope: &ChangeScope) -> Result<ChangeSet>;

    /// Adds `paths` to the index.
    fn stage(&self, paths: &[PathBuf]) -> Result<()>;

    /// Returns the name of the checked-out branch.
    fn current_branch(&self) -> Result<String>;

    /// Returns the commit `remote/branch` points at, if the remote knows it.
    fn last_pushed_commit(&self, remote: &str, branch: &str) -> Result<Option<String>>;

    /// Returns the commits reachable from `HEAD` but not from `since`.
    fn commits_since(&self, since: Option<String>) -> Result<Vec<String>>;
}

/// Represents a Git repository.
#[derive(Debug, Clone)]
pub struct GitRepo {
    /// Root directory of the repository (where .git is).
    root: PathBuf,
    /// Path to the .git directory (or file for worktrees).
    git_dir: PathBuf,
}

impl GitRepo {
    /// Discovers the Git repository from the current directory.
    pub fn discover() -> Result<Self> {
        Self::discover_from(&std::env::current_dir().map_err(|e| Error::io("get current dir", e))?)
    }

    /// Discovers the Git repository from a specific path.
    pub fn discover_from(path: &Path) -> Result<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel", "--git-dir"])
            .current_dir(path)
            .output()
            .map_err(|e| Error::io("run git rev-parse", e))?;

        if !output.status.success() {
            return Err(Error::NotGitRepo);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = stdout.lines();

        let root = lines.next().map(PathBuf::from).ok_or(Error::NotGitRepo)?;

        let git_dir = lines
            .next()
            .map(|s| {
                let p = PathBuf::from(s);
                if p.is_absolute() {
                    p
                } else {
                    path.join(p)
                }
            })
            .ok_or(Error::NotGitRepo)?;

        Ok(Self { root, git_dir })
    }

    /// Returns the root directory of the repository.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .git directory path.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Returns the hooks directory path.
    #[must_use]
    pub fn hooks_dir(&self) -> PathBuf {
        // Check for custom hooks path first
        if let Ok(output) = self.git(["config", "--get", "core.hooksPath"]) {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    let hooks_path = PathBuf::from(&path);
                    if hooks_path.is_absolute() {
                        return hooks_path;
                    }
                    return self.root.join(hooks_path);
                }
            }
        }

        // Default to .git/hooks
        self.git_dir.join("hooks")
    }

    /// Returns the path to a specific hook.
    #[must_use]
    pub fn hook_path(&self, hook_name: &str) -> PathBuf {
        self.hooks_dir().join(hook_name)
    }

    /// Returns the output of `git --version`.
    pub fn version(&self) -> Result<String> {
        let output = self.checked("--version", ["--version"])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Returns every `key=value` pair of `git config --list`.
    pub fn config_list(&self) -> Result<Vec<(String, String)>> {
        let output = self.checked("config --list", ["config", "--list"])?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect())
    }

    /// Returns the full message of commit `rev`.
    pub fn commit_message(&self, rev: &str) -> Result<String> {
        let output = self.checked("log", ["log", "-1", rev, "--format=%B"])?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Returns the object name of `HEAD`, if there is one yet.
    fn head(&self) -> Option<String> {
        let output = self.git(["rev-parse", "--verify", "--quiet", "HEAD"]).ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Returns the hash of the empty tree in this repository's object format.
    fn empty_tree(&self) -> Result<String> {
        let output = Command::new("git")
            .args(["hash-object", "-t", "tree", "--stdin"])
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::io("run git hash-object", e))?;

        if !output.status.success() {
            return Err(Error::git("hash-object", stderr_of(&output)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Lists paths from `git diff --name-only -z` with one diff filter letter.
    fn diff_paths(&self, base: &[&str], filter: &str) -> Result<Vec<PathBuf>> {
        let filter = format!("--diff-filter={filter}");
        let mut args = vec!["diff", "--name-only", "-z", "--no-renames", filter.as_str()];
        args.extend_from_slice(base);

        let output = self.checked("diff", args)?;
        Ok(decode_path_list(&output.stdout))
    }

    fn untracked_files(&self) -> Result<Vec<PathBuf>> {
        let output = self.checked(
            "ls-files",
            ["ls-files", "--others", "--exclude-standard", "-z"],
        )?;
        Ok(decode_path_list(&output.stdout))
    }

    fn tracked_files(&self) -> Result<Vec<PathBuf>> {
        let output = self.checked("ls-files", ["ls-files", "--cached", "-z"])?;
        Ok(decode_path_list(&output.stdout))
    }

    /// Diffs `base` with the added/modified/deleted split.
    fn diff_change_set(&self, base: &[&str]) -> Result<ChangeSet> {
        Ok(ChangeSet::new(
            self.diff_paths(base, "A")?,
            self.diff_paths(base, "M")?,
            self.diff_paths(base, "D")?,
        ))
    }

    fn git<I, S>(&self, args: I) -> std::io::Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .output()
    }

    /// Runs git and turns a non-zero exit into [`Error::GitOperation`].
    fn checked<I, S>(&self, operation: &str, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self
            .git(args)
            .map_err(|e| Error::io(format!("run git {operation}"), e))?;

        if !output.status.success() {
            return Err(Error::git(operation, stderr_of(&output)));
        }

        Ok(output)
    }
}

impl Vcs for GitRepo {
    fn changes(&self, scope: &ChangeScope) -> Result<ChangeSet> {
        let changes = match scope {
            ChangeScope::Staged => self.diff_change_set(&["--cached"])?,
            ChangeScope::Unstaged => {
                let base = match self.head() {
                    Some(head) => head,
                    None => self.empty_tree()?,
                };
                let mut changes = self.diff_change_set(&[base.as_str()])?;
                changes.added.extend(self.untracked_files()?);
                changes
            },
            ChangeScope::All => {
                ChangeSet::new(self.untracked_files()?, self.tracked_files()?, Vec::new())
            },
            ChangeScope::Since(rev) => {
                let base = match rev {
                    Some(rev) => rev.clone(),
                    None => self.empty_tree()?,
                };
                self.diff_change_set(&[base.as_str(), "HEAD"])?
            },
        };

        tracing::debug!(
            ?scope,
            added = changes.added.len(),
            modified = changes.modified.len(),
            deleted = changes.deleted.len(),
            "Resolved changes"
        );

        Ok(changes)
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        tracing::debug!(count = paths.len(), "Re-staging fixed files");

        let mut args: Vec<&OsStr> = vec![OsStr::new("add"), OsStr::new("--")];
        args.extend(paths.iter().map(|p| p.as_os_str()));
        self.checked("add", args)?;
        Ok(())
    }

    fn current_branch(&self) -> Result<String> {
        let output = self.checked("branch", ["branch", "--show-current"])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn last_pushed_commit(&self, remote: &str, branch: &str) -> Result<Option<String>> {
        let output = self
            .git(["rev-parse", "--verify", "--quiet", &format!("{remote}/{branch}")])
            .map_err(|e| Error::io("run git rev-parse", e))?;

        // Nothing pushed yet: everything reachable from HEAD is new.
        if !output.status.success() {
            return Ok(None);
        }

        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    }

    fn commits_since(&self, since: Option<String>) -> Result<Vec<String>> {
        let range = since.map_or_else(|| "HEAD".to_string(), |rev| format!("{rev}..HEAD"));
        let output = self.checked("log", ["log", range.as_str(), "--format=%H"])?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// Splits NUL-separated git output into paths without assuming UTF-8.
fn decode_path_list(stdout: &[u8]) -> Vec<PathBuf> {
    stdout
        .split(|b| *b == 0)
        .filter(|p| !p.is_empty())
        .map(path_from_bytes)
        .collect()
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}
