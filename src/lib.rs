//! # iprecommit
//!
//! Dead-simple Git hook management.
//!
//! Checks are external commands declared in `precommit.toml`. For each Git
//! hook, iprecommit works out which files changed, narrows them per check
//! through an ordered include/exclude filter chain, runs the check, and on
//! failure can run the check's fix command and try once more.
//!
//! ## Features
//!
//! - **Three hooks**: `pre-commit` checks changed files, `commit-msg` checks
//!   the message, `pre-push` checks the commits about to be pushed
//! - **Filter chains**: `filters = ["*.py", "!vendor/*"]`, evaluated in order
//! - **Fail-fast and autofix**: per check or for the whole file
//! - **Built-in checks**: `iprecommit builtin newline-at-eof` and friends
//!
//! ## Example
//!
//! ```rust,no_run
//! use iprecommit::core::executor::Executor;
//! use iprecommit::core::git::GitRepo;
//! use iprecommit::core::output::OutputConfig;
//! use iprecommit::core::runner::PreCommitOptions;
//! use iprecommit::{Checks, Config};
//!
//! fn main() -> iprecommit::Result<()> {
//!     let repo = GitRepo::discover()?;
//!     let config = Config::load_from(&Config::default_path(repo.root()))?;
//!     let executor = Executor::new()?;
//!
//!     let checks = Checks::new(config, &repo, &executor, OutputConfig::plain())?;
//!     let result = checks.run_pre_commit(&PreCommitOptions::default())?;
//!
//!     if !result.success() {
//!         std::process::exit(1);
//!     }
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/iprecommit/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod checks;
pub mod cli;
pub mod config;
pub mod core;

// Re-export main types for convenience
pub use config::Config;
pub use core::error::{Error, Result};
pub use core::runner::{CheckResult, Checks, RunResult};
