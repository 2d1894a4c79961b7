//! Generates and uploads one document per report file through the test tool.
//!
//! The tool signals a rejected upload only by writing a sentinel error log
//! into the output directory. A rejected file fails the publish but does not
//! stop it; a tool error does, since the connection cannot be trusted anymore.

use crate::config::UploadConfig;
use crate::errors::{ToolError, UploadError};
use crate::tool::{DocumentRequest, ToolConnector};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Document template that renders and uploads to the reporting service.
pub const TEMPLATE: &str = "ATX";

/// Written by the tool into the output directory when an upload was rejected.
pub const ERROR_LOG: &str = "error.log.raw.json";

/// One rejection reason from the sentinel error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct ErrorLogEntry {
    pub file: String,
    pub status: String,
    pub text: String,
}

// Entries stay raw so one bad entry does not hide the ones before it.
#[derive(Debug, Deserialize)]
struct ErrorLog {
    #[serde(rename = "ENTRIES", default)]
    entries: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UploadIssue {
    /// The tool wrote an error log; entries are in file order.
    Rejected {
        report_file: PathBuf,
        entries: Vec<ErrorLogEntry>,
    },
    /// The error log, or one of its entries, could not be read.
    Unreadable { report_file: PathBuf, message: String },
    /// The tool failed while handling this file. Later files were not attempted.
    Tool { report_file: PathBuf, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    /// Files handed to the tool, in order.
    pub attempted: Vec<PathBuf>,
    pub issues: Vec<UploadIssue>,
}

impl UploadSummary {
    pub fn is_success(&self) -> bool {
        self.issues.is_empty()
    }
}

pub struct UploadPipeline {
    connector: Arc<dyn ToolConnector>,
}

impl UploadPipeline {
    pub fn new(connector: Arc<dyn ToolConnector>) -> Self {
        Self { connector }
    }

    /// Uploads `files` in order on one connection.
    ///
    /// Only a failure to connect is returned as an error; everything else ends
    /// up in the summary.
    pub async fn publish(
        &self,
        files: &[PathBuf],
        config: &UploadConfig,
    ) -> Result<UploadSummary, UploadError> {
        let mut summary = UploadSummary::default();
        if files.is_empty() {
            tracing::info!("-> No report files found to upload!");
            return Ok(summary);
        }

        let mut client = self.connector.connect().await.map_err(|e| {
            tracing::error!(tool = %self.connector.describe(), "cannot connect to test tool: {e}");
            UploadError::Connection(e)
        })?;

        for file in files {
            tracing::info!("-> Generating and uploading ATX report: {}", file.display());
            let out_dir = output_dir(file);
            let request = DocumentRequest {
                report_file: file.clone(),
                out_dir: out_dir.clone(),
                template: TEMPLATE.to_string(),
                overwrite: true,
                options: config.settings.clone(),
            };
            summary.attempted.push(file.clone());

            let generated = async {
                client.generate_document(&request).await?;
                client.wait_idle(0).await?;
                Ok::<(), ToolError>(())
            }
            .await;
            if let Err(e) = generated {
                tracing::error!(file = %file.display(), "-> Uploading ATX report failed: {e}");
                summary.issues.push(UploadIssue::Tool {
                    report_file: file.clone(),
                    message: e.to_string(),
                });
                break;
            }

            summary.issues.extend(check_error_log(file, &out_dir));
        }
        Ok(summary)
    }
}

/// `<parent of report file>/ATX`.
pub fn output_dir(report_file: &Path) -> PathBuf {
    report_file
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(TEMPLATE)
}

/// Issues from the sentinel log in `out_dir`, empty when there is none.
///
/// Entries read before a malformed one are still reported as a rejection,
/// followed by a generic issue for the malformed entry.
fn check_error_log(report_file: &Path, out_dir: &Path) -> Vec<UploadIssue> {
    let path = out_dir.join(ERROR_LOG);
    if !path.is_file() {
        return Vec::new();
    }
    tracing::error!("Error while uploading ATX report:");
    let unreadable = |message: String| {
        tracing::error!("-> Could not parse ATX JSON response: {message}");
        UploadIssue::Unreadable {
            report_file: report_file.to_path_buf(),
            message,
        }
    };

    let parsed = std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str::<ErrorLog>(&raw).map_err(|e| e.to_string()));
    let log = match parsed {
        Ok(log) => log,
        Err(message) => return vec![unreadable(message)],
    };

    let mut entries = Vec::new();
    let mut malformed = None;
    for (index, value) in log.entries.into_iter().enumerate() {
        match serde_json::from_value::<ErrorLogEntry>(value) {
            Ok(entry) => {
                tracing::error!("{}: {} - {}", entry.status, entry.file, entry.text);
                entries.push(entry);
            }
            Err(e) => {
                malformed = Some(unreadable(format!("entry {index}: {e}")));
                break;
            }
        }
    }

    let mut issues = Vec::new();
    if !entries.is_empty() || malformed.is_none() {
        issues.push(UploadIssue::Rejected {
            report_file: report_file.to_path_buf(),
            entries,
        });
    }
    issues.extend(malformed);
    issues
}
