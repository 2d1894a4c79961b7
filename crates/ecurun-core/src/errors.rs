//! Error taxonomy for the core.
//!
//! Connection and open/close failures propagate; per-file upload problems and
//! missing sub-reports are absorbed into summaries by the callers.

use crate::model::{CheckFinding, Severity};
use std::path::PathBuf;

/// Failures reported by a tool connection.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The tool (or its bridge) could not be reached.
    #[error("test tool unavailable: {message}")]
    Unavailable { message: String },

    /// The bridge answered with something that is not a valid response.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// The tool rejected the request.
    #[error("tool error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn remote(code: i64, message: impl Into<String>) -> Self {
        Self::Remote {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("cannot connect to test tool: {0}")]
    Connection(#[source] ToolError),

    #[error("opening {} failed: {source}", target.display())]
    Open {
        target: PathBuf,
        #[source]
        source: ToolError,
    },

    #[error("validation of {} failed with {} error(s)", target.display(), error_count(findings))]
    Validation {
        target: PathBuf,
        findings: Vec<CheckFinding>,
    },

    #[error("execution of {} failed: {source}", target.display())]
    Execution {
        target: PathBuf,
        #[source]
        source: ToolError,
    },

    /// The host interrupted the run and the abort-and-collect recovery failed too.
    #[error("execution of {} was interrupted and could not be recovered: {source}", target.display())]
    Interrupted {
        target: PathBuf,
        #[source]
        source: ToolError,
    },
}

fn error_count(findings: &[CheckFinding]) -> usize {
    findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count()
}

/// I/O fault while walking a report tree. "No reports found" is not an error.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read report metadata from {}: {message}", path.display())]
    Metadata { path: PathBuf, message: String },

    #[error("invalid report file pattern: {message}")]
    Pattern { message: String },
}

impl DiscoveryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("cannot connect to test tool for upload: {0}")]
    Connection(#[source] ToolError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("report file missing in {}", dir.display())]
    MissingReport { dir: PathBuf },

    #[error("empty test results are not allowed")]
    EmptyResults,

    #[error("generating document for {} failed: {source}", report_file.display())]
    Document {
        report_file: PathBuf,
        #[source]
        source: ToolError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("cannot archive {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("report file missing in {}", dir.display())]
    MissingReport { dir: PathBuf },

    #[error("empty test results are not allowed")]
    EmptyResults,

    #[error(
        "archive target {} contains report directory {}",
        target.display(),
        dir.display()
    )]
    TargetContainsReport { target: PathBuf, dir: PathBuf },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_counts_only_errors() {
        let findings = vec![
            CheckFinding::new("a.pkg", 3, "unused variable", Severity::Warning),
            CheckFinding::new("a.pkg", 7, "unknown keyword", Severity::Error),
            CheckFinding::new("b.pkg", 1, "missing mapping", Severity::Error),
        ];
        let err = ExecutionError::Validation {
            target: PathBuf::from("suite.prj"),
            findings,
        };
        assert_eq!(
            err.to_string(),
            "validation of suite.prj failed with 2 error(s)"
        );
    }
}
