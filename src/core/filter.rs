//! Ordered include/exclude glob chains.
//!
//! A check's `filters` list is compiled once into a [`FilterChain`]. Applying
//! a chain tags each candidate path as included or excluded; every pattern, in
//! declaration order, overwrites the tag of the paths it matches. A pattern
//! written with a leading `!` excludes.

use crate::core::error::{Error, Result};
use glob::Pattern;
use std::path::{Path, PathBuf};

/// Whether a matching pattern includes or excludes a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Matching paths are included.
    Include,
    /// Matching paths are excluded.
    Exclude,
}

/// A single compiled glob with its polarity.
#[derive(Debug, Clone)]
pub struct FilterPattern {
    glob: Pattern,
    polarity: Polarity,
}

impl FilterPattern {
    /// Parses a filter string; a leading `!` marks an exclude pattern.
    pub fn parse(raw: &str) -> std::result::Result<Self, glob::PatternError> {
        let (polarity, glob) = match raw.strip_prefix('!') {
            Some(rest) => (Polarity::Exclude, rest),
            None => (Polarity::Include, raw),
        };

        Ok(Self {
            glob: Pattern::new(glob)?,
            polarity,
        })
    }

    /// Returns the polarity of this pattern.
    #[must_use]
    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Returns true if the glob matches `path`.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        self.glob.matches_path(path)
    }
}

/// An optional base pattern followed by an ordered list of filter patterns.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    base: Option<Pattern>,
    patterns: Vec<FilterPattern>,
}

impl FilterChain {
    /// Compiles a chain for the check named `check`.
    ///
    /// Glob syntax errors are reported here, when the check is registered,
    /// so that applying a chain can never fail.
    pub fn compile(check: &str, base: Option<&str>, filters: &[String]) -> Result<Self> {
        let invalid = |pattern: &str, e: glob::PatternError| Error::InvalidPattern {
            check: check.to_string(),
            pattern: pattern.to_string(),
            message: e.msg.to_string(),
        };

        let base = base
            .map(|raw| Pattern::new(raw).map_err(|e| invalid(raw, e)))
            .transpose()?;

        let patterns = filters
            .iter()
            .map(|raw| FilterPattern::parse(raw).map_err(|e| invalid(raw, e)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { base, patterns })
    }

    /// Returns true if the chain has neither a base pattern nor filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base.is_none() && self.patterns.is_empty()
    }

    /// Returns the candidates that survive the chain, in their original order.
    #[must_use]
    pub fn apply(&self, candidates: &[PathBuf]) -> Vec<PathBuf> {
        candidates
            .iter()
            .filter(|path| self.includes(path))
            .cloned()
            .collect()
    }

    /// Returns the final tag of a single path.
    #[must_use]
    pub fn includes(&self, path: &Path) -> bool {
        let initial = match (&self.base, self.patterns.first()) {
            (Some(base), _) => base.matches_path(path),
            // A leading include restricts; anything else starts from "everything".
            (None, Some(first)) => first.polarity() == Polarity::Exclude,
            (None, None) => true,
        };

        self.patterns.iter().fold(initial, |included, pattern| {
            if pattern.matches(path) {
                pattern.polarity() == Polarity::Include
            } else {
                included
            }
        })
    }
}
