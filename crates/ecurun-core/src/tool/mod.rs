//! Control interface to the external test tool.
//!
//! A [`ToolConnector`] hands out exclusively-owned [`ToolClient`] connections.
//! Callers scope every connection to one phase of work and drop it on every
//! exit path; opened targets outlive connections and are closed explicitly.

pub mod bridge;

use crate::errors::ToolError;
use crate::model::{CheckFinding, JobExecutionMode, TargetKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Options for opening a target in the tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOptions {
    /// Run project packages relative to their own directory.
    #[serde(default)]
    pub exec_in_current_pkg_dir: bool,
    /// Optional filter expression restricting the project's packages.
    #[serde(default)]
    pub filter_expression: Option<String>,
}

/// A target opened in the tool. Only meaningful to the tool that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetHandle {
    pub path: PathBuf,
    pub kind: TargetKind,
}

/// Identifies one execution inside the tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionState {
    Running,
    Finished,
    Aborted,
    Idle,
    /// Any terminal state this crate does not know by name.
    #[serde(other)]
    Other,
}

impl ExecutionState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// What the tool reports for a finished (or aborted) execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub verdict: String,
    /// Path of the report database; its directory is the report directory.
    pub report_db: PathBuf,
}

impl ExecutionReport {
    pub fn report_dir(&self) -> PathBuf {
        self.report_db
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

/// Request to render a report file into a document (and upload it, for upload templates).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub report_file: PathBuf,
    pub out_dir: PathBuf,
    pub template: String,
    pub overwrite: bool,
    pub options: BTreeMap<String, String>,
}

/// One live connection to the tool.
#[async_trait]
pub trait ToolClient: Send {
    async fn open(&mut self, target: &Path, options: &OpenOptions) -> Result<TargetHandle, ToolError>;

    /// Returns every diagnostic for the opened target.
    async fn validate(&mut self, target: &TargetHandle) -> Result<Vec<CheckFinding>, ToolError>;

    async fn execute(
        &mut self,
        target: &TargetHandle,
        mode: JobExecutionMode,
    ) -> Result<ExecutionToken, ToolError>;

    /// The execution currently in flight, as seen by a fresh connection.
    async fn current_execution(&mut self) -> Result<ExecutionToken, ToolError>;

    async fn poll_state(&mut self, execution: &ExecutionToken) -> Result<ExecutionState, ToolError>;

    async fn abort(&mut self, execution: &ExecutionToken) -> Result<(), ToolError>;

    async fn result(&mut self, execution: &ExecutionToken) -> Result<ExecutionReport, ToolError>;

    /// Waits until the tool is idle; `0` waits indefinitely. `false` means the wait timed out.
    async fn wait_idle(&mut self, timeout_secs: u64) -> Result<bool, ToolError>;

    /// `false` means the tool refused to close the target.
    async fn close(&mut self, target: &TargetHandle) -> Result<bool, ToolError>;

    async fn generate_document(&mut self, request: &DocumentRequest) -> Result<(), ToolError>;
}

/// Produces fresh connections to one configured tool instance.
#[async_trait]
pub trait ToolConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ToolClient>, ToolError>;

    /// Human-readable identifier for log lines.
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_states_are_terminal() {
        let s: ExecutionState = serde_json::from_str("\"CRASHED\"").unwrap();
        assert_eq!(s, ExecutionState::Other);
        assert!(!s.is_running());
        let s: ExecutionState = serde_json::from_str("\"RUNNING\"").unwrap();
        assert!(s.is_running());
    }

    #[test]
    fn report_dir_is_parent_of_report_db() {
        let r = ExecutionReport {
            verdict: "SUCCESS".into(),
            report_db: PathBuf::from("/reports/Smoke_2024/Smoke.trf"),
        };
        assert_eq!(r.report_dir(), PathBuf::from("/reports/Smoke_2024"));
    }
}
