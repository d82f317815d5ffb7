//! Built-in check commands.
//!
//! These back the `iprecommit builtin <name>` subcommands, so a
//! `precommit.toml` can use them like any other external command. Each one
//! prints its findings to stdout and exits with [`FINDINGS_EXIT_CODE`] when
//! there are any.

pub mod commit_msg;
pub mod forbidden;
pub mod newline;

/// Exit code of a built-in check that found problems.
pub const FINDINGS_EXIT_CODE: u8 = 2;

/// Names of the built-in check subcommands.
pub mod names {
    /// Files must end with a newline.
    pub const NEWLINE_AT_EOF: &str = "newline-at-eof";
    /// Files and commit messages must not contain forbidden strings.
    pub const NO_FORBIDDEN_STRINGS: &str = "no-forbidden-strings";
    /// Commit messages must be well formed.
    pub const COMMIT_MSG_FORMAT: &str = "commit-msg-format";
}

/// Returns true if `cmd` invokes one of the built-in checks.
#[must_use]
pub fn is_builtin(cmd: &[String]) -> bool {
    match cmd {
        [_, sub, name, ..] if sub == "builtin" => matches!(
            name.as_str(),
            names::NEWLINE_AT_EOF | names::NO_FORBIDDEN_STRINGS | names::COMMIT_MSG_FORMAT
        ),
        _ => false,
    }
}
