//! Error types for iprecommit.
//!
//! This module defines all errors that can abort a run. A failing check is
//! not an error: it is reported through [`crate::core::runner::RunResult`].

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`], used to pick the exit code and to decide
/// whether to show usage help or configuration details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad configuration file or check selection.
    Config,
    /// Bad command-line usage.
    Usage,
    /// Not in a repository, or a git query failed.
    Environment,
    /// Local I/O failure.
    Io,
    /// Bug in iprecommit.
    Internal,
}

/// All possible errors in iprecommit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Configuration errors
    // =========================================================================
    /// Configuration file not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path where config was expected.
        path: PathBuf,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        /// Description of the parse error.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    ConfigInvalid {
        /// Field name that is invalid.
        field: String,
        /// Description of why it's invalid.
        message: String,
    },

    /// Key that iprecommit does not recognize.
    #[error("{table} has a key that iprecommit does not recognize: {key}{}", did_you_mean(.suggestion.as_deref(), .top_level))]
    UnknownKey {
        /// Human name of the table holding the key.
        table: String,
        /// The offending key.
        key: String,
        /// Closest known key, if any.
        suggestion: Option<String>,
        /// The suggested key belongs in the top-level table instead.
        top_level: bool,
    },

    /// Glob in a check's filter list could not be compiled.
    #[error("Invalid filter pattern '{pattern}' in check '{check}': {message}")]
    InvalidPattern {
        /// Name of the check owning the pattern.
        check: String,
        /// The pattern as written.
        pattern: String,
        /// Reason reported by the glob compiler.
        message: String,
    },

    /// `--skip` or `--only` named a check that is not configured.
    #[error("Unknown check: {name}")]
    UnknownCheck {
        /// The unknown name.
        name: String,
    },

    // =========================================================================
    // Usage errors
    // =========================================================================
    /// Command-line usage error.
    #[error("{message}")]
    Usage {
        /// What was wrong with the invocation.
        message: String,
    },

    // =========================================================================
    // Git errors
    // =========================================================================
    /// Not in a Git repository.
    #[error("iprecommit must be run in a Git repository")]
    NotGitRepo,

    /// Git operation failed.
    #[error("Git operation failed: {operation} - {message}")]
    GitOperation {
        /// Name of the operation that failed.
        operation: String,
        /// Error message.
        message: String,
    },

    // =========================================================================
    // Check execution errors
    // =========================================================================
    /// Command not found.
    #[error("Command not found: {command}")]
    CommandNotFound {
        /// The command that wasn't found.
        command: String,
    },

    // =========================================================================
    // Hook errors
    // =========================================================================
    /// Hook already exists and wasn't created by us.
    #[error("{path} already exists. Re-run with --force to overwrite.")]
    HookExists {
        /// Path to existing hook.
        path: PathBuf,
    },

    /// Hook exists but was not generated by iprecommit.
    #[error("Existing hook at {path} is not from iprecommit. Re-run with --force to uninstall anyway.")]
    HookNotOurs {
        /// Path to the foreign hook.
        path: PathBuf,
    },

    /// There is no hook to uninstall.
    #[error("No pre-commit hook exists.")]
    NoHook,

    // =========================================================================
    // I/O errors
    // =========================================================================
    /// File I/O error.
    #[error("I/O error: {message}")]
    Io {
        /// Description of what failed.
        message: String,
        /// Source error.
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Internal errors
    // =========================================================================
    /// Internal error (should never happen).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn did_you_mean(suggestion: Option<&str>, top_level: &bool) -> String {
    match suggestion {
        Some(s) if *top_level => format!(" (Did you mean '{s}' in the top-level table?)"),
        Some(s) => format!(" (Did you mean '{s}'?)"),
        None => String::new(),
    }
}

impl Error {
    /// Creates a new configuration parse error.
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new configuration parse error with source.
    pub fn config_parse_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new invalid-configuration error.
    pub fn config_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a new usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Creates a new I/O error with context.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Creates a new Git operation error.
    pub fn git(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GitOperation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::UnknownKey { .. }
            | Self::InvalidPattern { .. }
            | Self::UnknownCheck { .. } => ErrorKind::Config,
            Self::Usage { .. }
            | Self::HookExists { .. }
            | Self::HookNotOurs { .. }
            | Self::NoHook => ErrorKind::Usage,
            Self::NotGitRepo | Self::GitOperation { .. } | Self::CommandNotFound { .. } => {
                ErrorKind::Environment
            },
            Self::Io { .. } => ErrorKind::Io,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Returns true if this is a user-correctable error.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Config | ErrorKind::Usage | ErrorKind::Environment
        )
    }

    /// Returns an exit code appropriate for this error.
    ///
    /// Exit code 1 is reserved for "a check failed", so no error maps to it.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Usage => 64,       // EX_USAGE
            ErrorKind::Environment => 65, // EX_DATAERR
            ErrorKind::Internal => 70,    // EX_SOFTWARE
            ErrorKind::Io => 74,          // EX_IOERR
            ErrorKind::Config => 78,      // EX_CONFIG
        }
    }
}
