//! Core types shared across the update pipelines: the error taxonomy and the
//! per-pipeline outcome model.

pub mod error;
pub mod outcome;

pub use error::{ErrorContext, UpdaterError, user_friendly_error};
pub use outcome::{RunReport, UpdateOutcome};
