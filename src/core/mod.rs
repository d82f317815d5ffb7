//! Core functionality for iprecommit.
//!
//! This module contains the main components:
//! - [`filter`]: Ordered include/exclude glob chains
//! - [`changes`]: Snapshot of changed paths
//! - [`runner`]: Check orchestration (fail-fast, autofix, retry)
//! - [`executor`]: Process execution and per-check invocation
//! - [`output`]: Status lines and summaries
//! - [`error`]: Error types and result handling
//! - [`git`]: Git repository operations

pub mod changes;
pub mod error;
pub mod executor;
pub mod filter;
pub mod git;
pub mod output;
pub mod runner;
