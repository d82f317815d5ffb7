//! Configuration handling for iprecommit.
//!
//! This module loads and validates `precommit.toml`: top-level settings plus
//! ordered `[[pre_commit]]`, `[[commit_msg]]` and `[[pre_push]]` check lists.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "precommit.toml";

const TOP_LEVEL_KEYS: &[&str] = &[
    "autofix",
    "fail_fast",
    "failfast",
    "pre_commit",
    "commit_msg",
    "pre_push",
];

const PRE_COMMIT_KEYS: &[&str] = &[
    "name",
    "cmd",
    "fix_cmd",
    "pass_files",
    "filters",
    "base_pattern",
    "working_dir",
    "fail_fast",
    "autofix",
    "skip",
];

const COMMIT_MSG_KEYS: &[&str] = &["name", "cmd"];

const PRE_PUSH_KEYS: &[&str] = &["name", "cmd", "pass_files"];

/// Fragment of an unknown key, and the known key it most likely meant.
const SUGGESTIONS: &[(&str, &str)] = &[
    ("fail", "fail_fast"),
    ("auto", "autofix"),
    ("fix", "fix_cmd"),
    ("cmd", "cmd"),
    ("command", "cmd"),
    ("pass", "pass_files"),
    ("file", "pass_files"),
    ("filter", "filters"),
    ("glob", "filters"),
    ("include", "filters"),
    ("exclude", "filters"),
    ("pattern", "base_pattern"),
    ("dir", "working_dir"),
    ("cwd", "working_dir"),
    ("skip", "skip"),
    ("name", "name"),
];

const TEMPLATE: &str = r#"# This file configures Git hooks for the project.
# Documentation: https://github.com/iafisher/iprecommit

# Set 'fail_fast' to 'true' to abort the run after the first failing check.
# You can also set 'fail_fast' on individual checks.
fail_fast = false

[[pre_commit]]
name = "NoForbiddenStrings"
cmd = ["iprecommit", "builtin", "no-forbidden-strings", "--paths"]

[[pre_commit]]
name = "NewlineAtEndOfFile"
cmd = ["iprecommit", "builtin", "newline-at-eof"]
fix_cmd = ["iprecommit", "builtin", "newline-at-eof", "--fix"]
# Uncomment the next two lines to have this check auto-fix and retry immediately on failure.
# autofix = true
# fail_fast = true

# [[pre_commit]]
# name = "PythonFormat"
# cmd = ["black", "--check"]
# filters = ["*.py"]
# fix_cmd = ["black"]
# autofix = true
# fail_fast = true

# [[pre_commit]]
# name = "ProjectTests"
# cmd = ["./run_tests"]
# pass_files = false

# commit-msg checks
[[commit_msg]]
name = "CommitMessageFormat"
cmd = ["iprecommit", "builtin", "commit-msg-format", "--max-line-length", "72"]

# pre-push checks (run on commit messages)
[[pre_push]]
name = "NoForbiddenStrings"
cmd = ["iprecommit", "builtin", "no-forbidden-strings", "--commits"]

# Set 'pass_files' to 'true' to run on the files changed since the last push instead.
# [[pre_push]]
# name = "NoForbiddenStringsInFiles"
# cmd = ["iprecommit", "builtin", "no-forbidden-strings", "--paths"]
# pass_files = true
"#;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Run fix commands and retry whenever a fixable check fails.
    pub autofix: bool,
    /// Stop after the first failing check.
    #[serde(alias = "failfast")]
    pub fail_fast: bool,
    /// Checks run by the pre-commit hook, in declaration order.
    pub pre_commit: Vec<PreCommitCheck>,
    /// Checks run by the commit-msg hook.
    pub commit_msg: Vec<CommitMsgCheck>,
    /// Checks run by the pre-push hook.
    pub pre_push: Vec<PrePushCheck>,
}

impl Config {
    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound {
                    path: path.to_path_buf(),
                });
            },
            Err(e) => return Err(Error::io(format!("read {}", path.display()), e)),
        };

        let config = Self::parse(&content)?;
        tracing::debug!(
            path = %path.display(),
            pre_commit = config.pre_commit.len(),
            commit_msg = config.commit_msg.len(),
            pre_push = config.pre_push.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn parse(content: &str) -> Result<Self> {
        let table: toml::Table = content
            .parse()
            .map_err(|e| Error::config_parse_with_source("Failed to parse TOML", e))?;

        check_keys(&table)?;

        let config: Self = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| Error::config_parse(e.message().to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Returns the default config path for a repository rooted at `root`.
    #[must_use]
    pub fn default_path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE_NAME)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        for (i, check) in self.pre_commit.iter().enumerate() {
            validate_check("pre_commit", i, check.name.as_deref(), &check.cmd)?;
        }
        for (i, check) in self.commit_msg.iter().enumerate() {
            validate_check("commit_msg", i, check.name.as_deref(), &check.cmd)?;
        }
        for (i, check) in self.pre_push.iter().enumerate() {
            validate_check("pre_push", i, check.name.as_deref(), &check.cmd)?;
        }
        Ok(())
    }

    /// Returns every configured check, tagged with its hook.
    #[must_use]
    pub fn checks(&self) -> Vec<Check> {
        self.pre_commit
            .iter()
            .cloned()
            .map(Check::PreCommit)
            .chain(self.commit_msg.iter().cloned().map(Check::CommitMsg))
            .chain(self.pre_push.iter().cloned().map(Check::PrePush))
            .collect()
    }

    /// Returns the text of the default `precommit.toml`.
    #[must_use]
    pub const fn template() -> &'static str {
        TEMPLATE
    }
}

/// A check run by the pre-commit hook against changed files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreCommitCheck {
    /// Display name; defaults to the command line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Command and arguments.
    pub cmd: Vec<String>,
    /// Command that repairs what `cmd` complains about; empty when unfixable.
    pub fix_cmd: Vec<String>,
    /// Append the filtered file list to the command.
    pub pass_files: bool,
    /// Ordered glob patterns; a leading `!` excludes.
    pub filters: Vec<String>,
    /// Intrinsic include pattern applied before `filters`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_pattern: Option<String>,
    /// Directory to run the command in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Stop the run if this check fails.
    pub fail_fast: bool,
    /// Fix and retry when this check fails.
    pub autofix: bool,
    /// Never run this check.
    pub skip: bool,
}

impl Default for PreCommitCheck {
    fn default() -> Self {
        Self {
            name: None,
            cmd: Vec::new(),
            fix_cmd: Vec::new(),
            pass_files: true,
            filters: Vec::new(),
            base_pattern: None,
            working_dir: None,
            fail_fast: false,
            autofix: false,
            skip: false,
        }
    }
}

impl PreCommitCheck {
    /// Creates a check running `cmd`.
    #[must_use]
    pub fn new<S: Into<String>>(cmd: impl IntoIterator<Item = S>) -> Self {
        Self {
            cmd: cmd.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Returns the name shown in status lines.
    #[must_use]
    pub fn display_name(&self) -> String {
        display_name(self.name.as_deref(), &self.cmd)
    }

    /// Returns true if the check has a fix command.
    #[must_use]
    pub fn is_fixable(&self) -> bool {
        !self.fix_cmd.is_empty()
    }
}

/// A check run by the commit-msg hook against the message file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitMsgCheck {
    /// Display name; defaults to the command line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Command and arguments.
    pub cmd: Vec<String>,
}

impl CommitMsgCheck {
    /// Returns the name shown in status lines.
    #[must_use]
    pub fn display_name(&self) -> String {
        display_name(self.name.as_deref(), &self.cmd)
    }
}

/// A check run by the pre-push hook.
///
/// The command receives the hashes of the commits being pushed, or with
/// `pass_files` the paths those commits added or modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrePushCheck {
    /// Display name; defaults to the command line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Command and arguments.
    pub cmd: Vec<String>,
    /// Append changed paths instead of commit hashes.
    pub pass_files: bool,
}

impl PrePushCheck {
    /// Returns the name shown in status lines.
    #[must_use]
    pub fn display_name(&self) -> String {
        display_name(self.name.as_deref(), &self.cmd)
    }
}

/// Any configured check, tagged with the hook that runs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "hook", rename_all = "kebab-case")]
pub enum Check {
    /// Runs on `pre-commit`.
    PreCommit(PreCommitCheck),
    /// Runs on `commit-msg`.
    CommitMsg(CommitMsgCheck),
    /// Runs on `pre-push`.
    PrePush(PrePushCheck),
}

impl Check {
    /// Returns the hook name this check belongs to.
    #[must_use]
    pub const fn hook(&self) -> &'static str {
        match self {
            Self::PreCommit(_) => "pre-commit",
            Self::CommitMsg(_) => "commit-msg",
            Self::PrePush(_) => "pre-push",
        }
    }

    /// Returns the name shown in status lines.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::PreCommit(c) => c.display_name(),
            Self::CommitMsg(c) => c.display_name(),
            Self::PrePush(c) => c.display_name(),
        }
    }

    /// Returns the check's command line.
    #[must_use]
    pub fn cmd(&self) -> &[String] {
        match self {
            Self::PreCommit(c) => &c.cmd,
            Self::CommitMsg(c) => &c.cmd,
            Self::PrePush(c) => &c.cmd,
        }
    }
}

fn display_name(name: Option<&str>, cmd: &[String]) -> String {
    name.map_or_else(|| cmd.join(" "), str::to_string)
}

fn validate_check(table: &str, index: usize, name: Option<&str>, cmd: &[String]) -> Result<()> {
    if cmd.is_empty() || cmd[0].is_empty() {
        return Err(Error::config_invalid(
            format!("{table}[{index}].cmd"),
            "must be a non-empty list",
        ));
    }
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(Error::config_invalid(
            format!("{table}[{index}].name"),
            "must not be empty",
        ));
    }
    Ok(())
}

fn check_keys(table: &toml::Table) -> Result<()> {
    check_table_keys("The top-level table", table, TOP_LEVEL_KEYS)?;

    for (key, label, known) in [
        ("pre_commit", "A [[pre_commit]] entry", PRE_COMMIT_KEYS),
        ("commit_msg", "A [[commit_msg]] entry", COMMIT_MSG_KEYS),
        ("pre_push", "A [[pre_push]] entry", PRE_PUSH_KEYS),
    ] {
        let Some(value) = table.get(key) else {
            continue;
        };
        let entries = value
            .as_array()
            .ok_or_else(|| Error::config_invalid(key, "must be an array of tables"))?;
        for entry in entries {
            let entry = entry
                .as_table()
                .ok_or_else(|| Error::config_invalid(key, "must be an array of tables"))?;
            check_table_keys(label, entry, known)?;
        }
    }

    Ok(())
}

fn check_table_keys(label: &str, table: &toml::Table, known: &[&str]) -> Result<()> {
    let Some(key) = table.keys().find(|k| !known.contains(&k.as_str())) else {
        return Ok(());
    };

    let nested = known != TOP_LEVEL_KEYS;
    let (suggestion, top_level) = match suggest_key(key, known) {
        Some(target) => (Some(target), false),
        None if nested => (suggest_key(key, TOP_LEVEL_KEYS), true),
        None => (None, false),
    };

    Err(Error::UnknownKey {
        table: label.to_string(),
        key: key.clone(),
        suggestion: suggestion.map(str::to_string),
        top_level: top_level && suggestion.is_some(),
    })
}

/// Guesses which known key an unrecognized key was meant to be.
fn suggest_key(key: &str, known: &[&str]) -> Option<&'static str> {
    let key = key.to_ascii_lowercase();
    SUGGESTIONS
        .iter()
        .find(|(fragment, target)| key.contains(fragment) && known.contains(target))
        .map(|(_, target)| *target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.autofix);
        assert!(!config.fail_fast);
        assert!(config.pre_commit.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
autofix = true
fail_fast = true

[[pre_commit]]
name = "PythonFormat"
cmd = ["black", "--check"]
fix_cmd = ["black"]
filters = ["*.py", "!vendor/*"]
working_dir = "python"
autofix = true

[[pre_commit]]
cmd = ["./run_tests"]
pass_files = false
skip = true

[[commit_msg]]
cmd = ["check-msg"]

[[pre_push]]
name = "Push"
cmd = ["check-push"]
"#,
        )
        .expect("parse config");

        assert!(config.autofix);
        assert!(config.fail_fast);
        assert_eq!(config.pre_commit.len(), 2);

        let format = &config.pre_commit[0];
        assert_eq!(format.display_name(), "PythonFormat");
        assert_eq!(format.fix_cmd, vec!["black".to_string()]);
        assert!(format.pass_files);
        assert!(format.is_fixable());
        assert_eq!(format.working_dir, Some(PathBuf::from("python")));

        let tests = &config.pre_commit[1];
        assert_eq!(tests.display_name(), "./run_tests");
        assert!(!tests.pass_files);
        assert!(tests.skip);
        assert!(!tests.is_fixable());

        assert_eq!(config.commit_msg[0].display_name(), "check-msg");
        assert_eq!(config.pre_push[0].display_name(), "Push");
    }

    #[test]
    fn test_legacy_failfast_alias() {
        let config = Config::parse("failfast = true").expect("parse config");
        assert!(config.fail_fast);
    }

    #[test]
    fn test_template_parses() {
        let config = Config::parse(Config::template()).expect("template should parse");
        assert_eq!(config.pre_commit.len(), 2);
        assert_eq!(config.commit_msg.len(), 1);
        assert_eq!(config.pre_push.len(), 1);
        assert!(config.pre_commit[1].is_fixable());
    }

    #[rstest]
    #[case::fail("failfast_please = true", "The top-level table", Some("fail_fast"))]
    #[case::auto("auto_fix = true", "The top-level table", Some("autofix"))]
    #[case::unknown("zzz = 1", "The top-level table", None)]
    #[case::check_fix(
        "[[pre_commit]]\ncmd = [\"x\"]\nfixcmd = [\"y\"]",
        "A [[pre_commit]] entry",
        Some("fix_cmd")
    )]
    #[case::check_glob(
        "[[pre_commit]]\ncmd = [\"x\"]\nglobs = [\"*.py\"]",
        "A [[pre_commit]] entry",
        Some("filters")
    )]
    #[case::check_dir(
        "[[pre_commit]]\ncmd = [\"x\"]\ndirectory = \"a\"",
        "A [[pre_commit]] entry",
        Some("working_dir")
    )]
    #[case::message_check_points_fail_fast_to_top_level(
        "[[commit_msg]]\ncmd = [\"x\"]\nfail_fast = true",
        "A [[commit_msg]] entry",
        Some("fail_fast")
    )]
    #[case::push_check_points_fail_to_top_level(
        "[[pre_push]]\ncmd = [\"x\"]\nfailfast = true",
        "A [[pre_push]] entry",
        Some("fail_fast")
    )]
    #[case::push_check_files(
        "[[pre_push]]\ncmd = [\"x\"]\nfiles = true",
        "A [[pre_push]] entry",
        Some("pass_files")
    )]
    #[case::message_check_nothing_close("[[commit_msg]]\ncmd = [\"x\"]\nzzz = 1", "A [[commit_msg]] entry", None)]
    fn test_unknown_key(
        #[case] content: &str,
        #[case] expected_table: &str,
        #[case] expected_suggestion: Option<&str>,
    ) {
        let err = Config::parse(content).expect_err("should reject unknown key");
        assert!(
            matches!(
                &err,
                Error::UnknownKey { table, suggestion, .. }
                    if table == expected_table && suggestion.as_deref() == expected_suggestion
            ),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_unknown_key_message() {
        let err = Config::parse("failfast_please = true").expect_err("should fail");
        assert_eq!(
            err.to_string(),
            "The top-level table has a key that iprecommit does not recognize: failfast_please (Did you mean 'fail_fast'?)"
        );
        assert_eq!(err.exit_code(), 78);
    }

    #[test]
    fn test_fail_key_in_push_check_points_to_top_level() {
        let err = Config::parse("[[pre_push]]\ncmd = [\"x\"]\nfail_fast = true")
            .expect_err("should reject fail_fast in a push check");
        assert!(matches!(err, Error::UnknownKey { top_level: true, .. }));
        assert_eq!(
            err.to_string(),
            "A [[pre_push]] entry has a key that iprecommit does not recognize: fail_fast (Did you mean 'fail_fast' in the top-level table?)"
        );
    }

    #[test]
    fn test_pre_commit_fail_key_is_local() {
        let err = Config::parse("[[pre_commit]]\ncmd = [\"x\"]\nfailfast = true")
            .expect_err("should reject unknown key");
        assert!(matches!(
            err,
            Error::UnknownKey { ref suggestion, top_level: false, .. }
                if suggestion.as_deref() == Some("fail_fast")
        ));
    }

    #[test]
    fn test_pre_push_pass_files() {
        let config = Config::parse("[[pre_push]]\ncmd = [\"x\"]\npass_files = true")
            .expect("parse config");
        assert!(config.pre_push[0].pass_files);

        let config = Config::parse("[[pre_push]]\ncmd = [\"x\"]").expect("parse config");
        assert!(!config.pre_push[0].pass_files);
    }

    #[test]
    fn test_empty_cmd_rejected() {
        let err = Config::parse("[[pre_commit]]\ncmd = []").expect_err("should fail");
        assert!(matches!(err, Error::ConfigInvalid { ref field, .. } if field == "pre_commit[0].cmd"));
    }

    #[test]
    fn test_missing_cmd_rejected() {
        let err = Config::parse("[[pre_push]]\nname = \"x\"").expect_err("should fail");
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = Config::parse("[[commit_msg]]\nname = \" \"\ncmd = [\"x\"]").expect_err("should fail");
        assert!(matches!(err, Error::ConfigInvalid { ref field, .. } if field == "commit_msg[0].name"));
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let err = Config::parse("[[pre_commit]]\ncmd = \"black\"").expect_err("should fail");
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_check_list_must_be_tables() {
        let err = Config::parse("pre_commit = 1").expect_err("should fail");
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::parse("this is not toml").expect_err("should fail");
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let err = Config::load_from(&temp.path().join(CONFIG_FILE_NAME)).expect_err("should fail");
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let path = Config::default_path(temp.path());
        std::fs::write(&path, "[[pre_commit]]\ncmd = [\"true\"]\n").expect("write config");
        let config = Config::load_from(&path).expect("load config");
        assert_eq!(config.pre_commit, vec![PreCommitCheck::new(["true"])]);
    }

    #[test]
    fn test_checks_are_tagged_by_hook() {
        let config = Config::parse(Config::template()).expect("parse template");
        let hooks: Vec<&str> = config.checks().iter().map(Check::hook).collect();
        assert_eq!(hooks, vec!["pre-commit", "pre-commit", "commit-msg", "pre-push"]);
    }

    #[test]
    fn test_check_serializes_with_hook_tag() {
        let check = Check::PrePush(PrePushCheck {
            name: Some("Push".to_string()),
            cmd: vec!["x".to_string()],
            pass_files: false,
        });
        let json = serde_json::to_value(&check).expect("serialize");
        assert_eq!(json["hook"], "pre-push");
        assert_eq!(json["name"], "Push");
    }
}
