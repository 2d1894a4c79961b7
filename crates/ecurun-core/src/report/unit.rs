//! UNIT publishing: renders JUnit reports through the tool and decides a
//! verdict from their counts.

use super::junit::read_counts;
use super::trf::{collect_report_files, relative_slash_path};
use crate::errors::{DiscoveryError, ToolError, UploadError};
use crate::tool::{DocumentRequest, ToolConnector};
use crate::verdict::{decide, CountSummary, ThresholdConfig, Verdict};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

pub const TEMPLATE: &str = "UNIT";
pub const JUNIT_REPORT_FILE: &str = "junit-report.xml";

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub counts: CountSummary,
    pub verdict: Verdict,
    pub junit_files: Vec<PathBuf>,
}

pub struct UnitPublisher {
    connector: Arc<dyn ToolConnector>,
    thresholds: ThresholdConfig,
    allow_missing: bool,
}

impl UnitPublisher {
    pub fn new(connector: Arc<dyn ToolConnector>, thresholds: ThresholdConfig) -> Self {
        Self {
            connector,
            thresholds,
            allow_missing: false,
        }
    }

    pub fn with_allow_missing(mut self, allow_missing: bool) -> Self {
        self.allow_missing = allow_missing;
        self
    }

    pub async fn publish(&self, report_dirs: &[PathBuf]) -> Result<UnitReport, UploadError> {
        tracing::info!("Publishing UNIT reports...");
        let mut files = Vec::new();
        for dir in report_dirs {
            files.extend(collect_report_files(dir)?);
        }
        if !files.is_empty() {
            self.generate(&files).await?;
        }

        let mut junit_files = Vec::new();
        for dir in report_dirs {
            junit_files.extend(find_junit_reports(dir)?);
        }
        let mut counts = CountSummary::default();
        for file in &junit_files {
            counts.merge(&read_counts(file)?);
        }

        if counts.total == 0 {
            tracing::info!("-> No UNIT test results found.");
        } else {
            tracing::info!(
                "-> Found {} test result(s) in total: #Passed: {}, #Failed: {}, #Skipped: {}",
                counts.total,
                counts.passed,
                counts.failed,
                counts.skipped
            );
        }
        let verdict = decide(&counts, &self.thresholds, self.allow_missing);
        if counts.total > 0 || self.allow_missing {
            tracing::info!("UNIT reports published successfully.");
        }
        Ok(UnitReport {
            counts,
            verdict,
            junit_files,
        })
    }

    async fn generate(&self, files: &[PathBuf]) -> Result<(), UploadError> {
        let mut client = self.connector.connect().await.map_err(|e| {
            tracing::error!(tool = %self.connector.describe(), "cannot connect to test tool: {e}");
            UploadError::Connection(e)
        })?;
        for file in files {
            tracing::info!("-> Generating UNIT report: {}", file.display());
            let request = DocumentRequest {
                report_file: file.clone(),
                out_dir: file
                    .parent()
                    .unwrap_or_else(|| Path::new(""))
                    .join(TEMPLATE),
                template: TEMPLATE.to_string(),
                overwrite: true,
                options: BTreeMap::new(),
            };
            let generated = async {
                client.generate_document(&request).await?;
                client.wait_idle(0).await?;
                Ok::<(), ToolError>(())
            }
            .await;
            if let Err(source) = generated {
                tracing::error!("-> Generating UNIT report failed: {source}");
                return Err(UploadError::Document {
                    report_file: file.clone(),
                    source,
                });
            }
        }
        Ok(())
    }
}

/// Every `UNIT/junit-report.xml` below `dir`, sorted.
pub fn find_junit_reports(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let suffix = format!("{TEMPLATE}/{JUNIT_REPORT_FILE}");
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            DiscoveryError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let rel = relative_slash_path(rel);
        if rel == suffix || rel.ends_with(&format!("/{suffix}")) {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}
