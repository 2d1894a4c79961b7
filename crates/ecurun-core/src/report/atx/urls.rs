//! Report URLs on the reporting service.
//!
//! URLs are built before the upload with a provisional `dateTo`, which
//! [`finalize_urls`] rewrites once the upload has completed.

use crate::report::{ReportLink, ReportNode};
use regex::Regex;
use std::sync::OnceLock;

pub const TREND_PATH: &str =
    "wicket/bookmarkable/de.tracetronic.ttstm.web.detail.TestReportViewPage?testCase";

/// Shared parts of every URL produced for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlContext {
    pub base_url: String,
    pub project_id: Option<String>,
    pub date_from: i64,
    pub date_to: i64,
}

impl UrlContext {
    pub fn new(base_url: impl Into<String>, date_from: i64, date_to: i64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: None,
            date_from,
            date_to,
        }
    }

    pub fn with_project_id(mut self, project_id: Option<String>) -> Self {
        self.project_id = project_id;
        self
    }

    fn reports(&self) -> String {
        format!(
            "{}/reports?dateFrom={}&dateTo={}",
            self.base_url, self.date_from, self.date_to
        )
    }

    fn with_project(&self, mut url: String) -> String {
        if let Some(id) = &self.project_id {
            url.push_str("&projectId=");
            url.push_str(id);
        }
        url
    }

    /// Single test case (package) results.
    pub fn package_url(&self, test_name: &str) -> String {
        self.with_project(format!("{}&testcase={test_name}", self.reports()))
    }

    /// History of one test case, without a date range.
    pub fn package_trend_url(&self, test_name: &str) -> String {
        self.with_project(format!("{}/{TREND_PATH}={test_name}", self.base_url))
    }

    /// Execution plan results. With a `plan`, narrows to the planned folder `test_name`.
    pub fn project_url(&self, test_name: &str, plan: Option<&str>) -> String {
        let url = match plan {
            Some(plan) => format!(
                "{}&testexecplan={plan}&plannedTestCaseFolder={test_name}*",
                self.reports()
            ),
            None => format!("{}&testexecplan={test_name}", self.reports()),
        };
        self.with_project(url)
    }
}

/// Name as accepted by the reporting service: only `[A-Za-z0-9_]`, never
/// starting with a digit.
pub fn valid_atx_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn date_to_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"dateTo=\d+").unwrap())
}

/// Replaces the first `dateTo=<digits>` in `url`; URLs without one are returned unchanged.
pub fn update_end_date(url: &str, date_to: i64) -> String {
    date_to_pattern()
        .replace(url, format!("dateTo={date_to}").as_str())
        .into_owned()
}

/// Rewrites `dateTo` in every URL node of the forest, recursively.
pub fn finalize_urls(nodes: &mut [ReportNode], date_to: i64) {
    for node in nodes {
        if let ReportLink::Url { url, .. } = &mut node.link {
            *url = update_end_date(url, date_to);
        }
        finalize_urls(&mut node.children, date_to);
    }
}
