//! `no-forbidden-strings`: files and commit messages must not contain
//! markers such as "DO NOT COMMIT".

use crate::core::error::{Error, Result};
use regex::{Regex, RegexBuilder};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

/// Strings forbidden when none are given.
// Split so this file does not trip the check itself.
pub const DEFAULT_FORBIDDEN: &[&str] = &[concat!("DO NOT ", "COMMIT"), concat!("DO NOT ", "SUBMIT")];

/// Compiled set of forbidden strings.
#[derive(Debug, Clone)]
pub struct ForbiddenStrings {
    pattern: Regex,
}

impl ForbiddenStrings {
    /// Compiles `strings` into one literal alternation.
    pub fn new<S: AsRef<str>>(strings: &[S], case_sensitive: bool) -> Result<Self> {
        let alternation = strings
            .iter()
            .map(|s| regex::escape(s.as_ref()))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = RegexBuilder::new(&alternation)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| Error::usage(format!("invalid forbidden strings: {e}")))?;

        Ok(Self { pattern })
    }

    /// Returns the default set, matched case-insensitively.
    pub fn defaults() -> Result<Self> {
        Self::new(DEFAULT_FORBIDDEN, false)
    }

    /// Returns true if `text` contains any forbidden string.
    #[must_use]
    pub fn found_in(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Scans `paths` and the messages of `commits`, printing every offender to
/// `out`. Returns true if none contained a forbidden string.
///
/// `message_of` looks up the full message of a commit.
pub fn run<F>(
    forbidden: &ForbiddenStrings,
    paths: &[PathBuf],
    commits: &[String],
    message_of: F,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<bool>
where
    F: Fn(&str) -> Result<String>,
{
    let write_err = |e| Error::io("write output", e);
    let both = !paths.is_empty() && !commits.is_empty();
    let mut passed = true;

    for path in paths {
        if path.is_dir() {
            writeln!(err, "skipping directory: {}", path.display()).map_err(write_err)?;
            continue;
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                writeln!(err, "skipping non-UTF-8 file: {}", path.display()).map_err(write_err)?;
                continue;
            },
            Err(e) => return Err(Error::io(format!("read {}", path.display()), e)),
        };

        if forbidden.found_in(&text) {
            passed = false;
            if both {
                writeln!(out, "path: {}", path.display()).map_err(write_err)?;
            } else {
                writeln!(out, "{}", path.display()).map_err(write_err)?;
            }
        }
    }

    for commit in commits {
        if forbidden.found_in(&message_of(commit)?) {
            passed = false;
            if both {
                writeln!(out, "commit: {commit}").map_err(write_err)?;
            } else {
                writeln!(out, "{commit}").map_err(write_err)?;
            }
        }
    }

    Ok(passed)
}
