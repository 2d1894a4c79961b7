//! Publishing report files to the reporting service (ATX upload).

pub mod pipeline;
pub mod uploader;
pub mod urls;

pub use pipeline::{ErrorLogEntry, UploadIssue, UploadPipeline, UploadSummary};
pub use uploader::{AtxUpload, AtxUploader};
pub use urls::{finalize_urls, valid_atx_name, UrlContext};

use super::trf::{ReportKind, TrfMetadata};
use super::tree::ReportLinker;
use super::ReportLink;
use crate::errors::DiscoveryError;
use std::path::Path;

/// What a top-level report passes down to its sub-reports.
#[derive(Debug, Clone)]
pub struct AtxScope {
    pub test_name: String,
    pub kind: ReportKind,
    /// Test plan the sub-report URLs are narrowed to.
    pub plan: Option<String>,
}

/// Links nodes to report pages on the reporting service.
///
/// Top-level names come from the report database; sub-report names from
/// their directory.
#[derive(Debug, Clone)]
pub struct AtxLinker {
    urls: UrlContext,
    single_testplan_map: bool,
}

impl AtxLinker {
    pub fn new(urls: UrlContext, single_testplan_map: bool) -> Self {
        Self {
            urls,
            single_testplan_map,
        }
    }

    pub fn urls(&self) -> &UrlContext {
        &self.urls
    }
}

impl ReportLinker for AtxLinker {
    type Scope = AtxScope;

    fn top_level(
        &self,
        report_file: &Path,
        _title: &str,
    ) -> Result<(ReportLink, AtxScope), DiscoveryError> {
        let meta = TrfMetadata::read(report_file)?;
        let test_name = valid_atx_name(&meta.name);
        let url = match meta.kind {
            ReportKind::Package => self.urls.package_url(&test_name),
            ReportKind::Project => self.urls.project_url(&test_name, None),
        };
        let plan = (!self.single_testplan_map).then(|| test_name.clone());
        Ok((
            ReportLink::Url { url, trend: false },
            AtxScope {
                test_name,
                kind: meta.kind,
                plan,
            },
        ))
    }

    fn extra_children(&self, scope: &AtxScope, title: &str) -> Vec<(String, ReportLink)> {
        match scope.kind {
            ReportKind::Package => vec![(
                title.to_string(),
                ReportLink::Url {
                    url: self.urls.package_trend_url(&scope.test_name),
                    trend: true,
                },
            )],
            ReportKind::Project => Vec::new(),
        }
    }

    fn sub_report(
        &self,
        scope: &AtxScope,
        _report_file: &Path,
        title: &str,
    ) -> Result<ReportLink, DiscoveryError> {
        let url = self
            .urls
            .project_url(&valid_atx_name(title), scope.plan.as_deref());
        Ok(ReportLink::Url { url, trend: false })
    }
}
