//! Uploads a run's report directories and builds the linked report tree.

use super::pipeline::{UploadPipeline, UploadSummary};
use super::urls::{finalize_urls, UrlContext};
use super::AtxLinker;
use crate::clock::now_millis;
use crate::config::UploadConfig;
use crate::errors::UploadError;
use crate::report::tree::TreeBuilder;
use crate::report::trf::{collect_report_files, first_report_file};
use crate::report::ReportNode;
use crate::tool::ToolConnector;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct AtxUpload {
    /// Links into the reporting service. `dateTo` is final only on success.
    pub reports: Vec<ReportNode>,
    pub summary: UploadSummary,
}

impl AtxUpload {
    pub fn is_success(&self) -> bool {
        self.summary.is_success()
    }
}

pub struct AtxUploader {
    pipeline: UploadPipeline,
    config: UploadConfig,
}

impl AtxUploader {
    pub fn new(connector: Arc<dyn ToolConnector>, config: UploadConfig) -> Self {
        Self {
            pipeline: UploadPipeline::new(connector),
            config,
        }
    }

    /// Uploads every report file below `report_dirs`.
    ///
    /// `started_at_ms` opens the date window of the report URLs.
    pub async fn upload(
        &self,
        report_dirs: &[PathBuf],
        started_at_ms: i64,
    ) -> Result<AtxUpload, UploadError> {
        let urls = UrlContext::new(self.config.base_url(), started_at_ms, started_at_ms)
            .with_project_id(self.config.project_id().map(str::to_string));
        let builder = TreeBuilder::new(AtxLinker::new(urls, self.config.single_testplan_map));

        let mut upload_dirs = Vec::new();
        let mut files = Vec::new();
        for dir in report_dirs {
            if first_report_file(dir)?.is_none() {
                if self.config.allow_missing {
                    continue;
                }
                tracing::error!("Report file in '{}' does not exist.", dir.display());
                return Err(UploadError::MissingReport { dir: dir.clone() });
            }
            files.extend(collect_report_files(dir)?);
            upload_dirs.push(dir.clone());
        }

        let mut reports = builder.build_dirs(&upload_dirs)?;
        if reports.is_empty() && !self.config.allow_missing {
            tracing::error!("Empty test results are not allowed, setting build status to FAILURE!");
            return Err(UploadError::EmptyResults);
        }

        let summary = self.pipeline.publish(&files, &self.config).await?;
        if summary.is_success() {
            finalize_urls(&mut reports, now_millis());
            tracing::info!("ATX reports uploaded successfully.");
        } else {
            tracing::error!("Uploading ATX reports failed.");
        }
        Ok(AtxUpload { reports, summary })
    }
}
