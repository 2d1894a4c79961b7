//! Core library for driving an external test tool and publishing what it produces.
//!
//! The pieces compose left to right: [`engine::Supervisor`] runs one session and
//! yields an [`model::ExecutionOutcome`], [`report::tree::TreeBuilder`] turns
//! report directories into numbered [`report::ReportNode`] trees,
//! [`report::atx`] ships report files to the reporting service, and
//! [`verdict`] folds test counts into a build verdict.

pub mod clock;
pub mod config;
pub mod engine;
pub mod errors;
pub mod model;
pub mod report;
pub mod tool;
pub mod verdict;

pub use engine::Supervisor;
pub use errors::{
    ArchiveError, ConfigError, DiscoveryError, ExecutionError, ToolError, UploadError,
};
pub use model::{CheckFinding, ExecutionOutcome, ExecutionSession, Severity};
pub use verdict::{decide, failed_percentage, CountSummary, ThresholdConfig, Verdict};
