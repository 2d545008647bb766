//! Self-update orchestrator for the agentation toolchain.
//!
//! The toolchain has two independently distributed halves:
//!
//! - the **agentation source component**, a git checkout that is updated by
//!   pulling its tracked branch and rebuilding in place;
//! - the **OpenCode binary**, shipped as prebuilt per-platform archives
//!   attached to GitHub releases.
//!
//! One run of `agentation-update` brings both up to date. The two pipelines
//! operate on disjoint resources and report independent outcomes; the run
//! succeeds iff neither pipeline hit an operation failure. Preconditions that
//! are not met (no checkout, unrecognized platform, unreachable network) are
//! skips, not failures.
//!
//! # Module layout
//!
//! - [`platform`] — maps the host to the `<os>-<arch>` identifier used in
//!   release asset names
//! - [`config`] — paths and knobs for one run, with TOML overrides
//! - [`core`] — outcome model and error taxonomy
//! - [`git`] — version-control operations behind the `VersionControl` trait
//! - [`source`] — the stash/pull/rebuild/restore pipeline
//! - [`release`] — the feed/download/swap pipeline and version marker
//! - [`orchestrator`] — wires production collaborators and aggregates
//! - [`cli`] — argument parsing, logging setup, and the summary output

pub mod cli;
pub mod config;
pub mod core;
pub mod git;
pub mod orchestrator;
pub mod platform;
pub mod release;
pub mod source;
