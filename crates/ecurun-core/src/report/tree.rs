//! Builds numbered report trees from report directories.
//!
//! A directory contributes a node only when it holds a primary report file.
//! Its subdirectories are then searched for sub-reports, recursively; a
//! directory without a report file ends its branch. Ids come from one
//! [`IdSequence`] shared by the whole walk and are assigned in pre-order,
//! siblings in sorted name order.

use super::trf::{first_report_file, relative_slash_path, sub_directories};
use super::{IdSequence, ReportLink, ReportNode};
use crate::errors::DiscoveryError;
use std::path::{Path, PathBuf};

/// Decides what each node links to.
pub trait ReportLinker {
    /// State carried from a top-level report into its sub-reports.
    type Scope;

    fn top_level(
        &self,
        report_file: &Path,
        title: &str,
    ) -> Result<(ReportLink, Self::Scope), DiscoveryError>;

    /// Extra children placed before any sub-report, as `(title, link)` pairs.
    fn extra_children(&self, _scope: &Self::Scope, _title: &str) -> Vec<(String, ReportLink)> {
        Vec::new()
    }

    fn sub_report(
        &self,
        scope: &Self::Scope,
        report_file: &Path,
        title: &str,
    ) -> Result<ReportLink, DiscoveryError>;
}

/// Links nodes to report files inside a local archive.
#[derive(Debug, Clone)]
pub struct ArchiveLinker {
    base: PathBuf,
}

impl ArchiveLinker {
    /// Paths are rendered relative to `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn link(&self, report_file: &Path) -> Result<ReportLink, DiscoveryError> {
        let size = std::fs::metadata(report_file)
            .map_err(|e| DiscoveryError::io(report_file, e))?
            .len();
        let rel = report_file.strip_prefix(&self.base).unwrap_or(report_file);
        Ok(ReportLink::File {
            path: relative_slash_path(rel),
            size,
        })
    }
}

impl ReportLinker for ArchiveLinker {
    type Scope = ();

    fn top_level(&self, report_file: &Path, _title: &str) -> Result<(ReportLink, ()), DiscoveryError> {
        Ok((self.link(report_file)?, ()))
    }

    fn sub_report(&self, _scope: &(), report_file: &Path, _title: &str) -> Result<ReportLink, DiscoveryError> {
        self.link(report_file)
    }
}

pub struct TreeBuilder<L> {
    linker: L,
}

impl<L: ReportLinker> TreeBuilder<L> {
    pub fn new(linker: L) -> Self {
        Self { linker }
    }

    pub fn linker(&self) -> &L {
        &self.linker
    }

    /// Treats every immediate subdirectory of `root` as a top-level report directory.
    pub fn build(&self, root: &Path) -> Result<Vec<ReportNode>, DiscoveryError> {
        let dirs = sub_directories(root)?;
        self.build_dirs(&dirs)
    }

    /// Builds one tree per report directory, in the given order.
    pub fn build_dirs(&self, dirs: &[PathBuf]) -> Result<Vec<ReportNode>, DiscoveryError> {
        let mut ids = IdSequence::new();
        let mut roots = Vec::new();
        for dir in dirs {
            if let Some(node) = self.top_level(dir, &mut ids)? {
                roots.push(node);
            }
        }
        tracing::debug!(reports = ids.last(), "report tree built");
        Ok(roots)
    }

    fn top_level(&self, dir: &Path, ids: &mut IdSequence) -> Result<Option<ReportNode>, DiscoveryError> {
        let Some(report_file) = first_report_file(dir)? else {
            tracing::debug!(dir = %dir.display(), "no report file, skipping");
            return Ok(None);
        };
        let title = dir_name(dir);
        let (link, scope) = self.linker.top_level(&report_file, &title)?;
        let mut node = ReportNode::new(ids.next_id(), title.clone(), link);
        for (extra_title, extra_link) in self.linker.extra_children(&scope, &title) {
            node.add_child(ReportNode::new(ids.next_id(), extra_title, extra_link));
        }
        self.sub_reports(&mut node, dir, &scope, ids)?;
        Ok(Some(node))
    }

    fn sub_reports(
        &self,
        parent: &mut ReportNode,
        dir: &Path,
        scope: &L::Scope,
        ids: &mut IdSequence,
    ) -> Result<(), DiscoveryError> {
        for sub_dir in sub_directories(dir)? {
            let Some(report_file) = first_report_file(&sub_dir)? else {
                continue;
            };
            let title = sub_report_title(&dir_name(&sub_dir)).to_string();
            let link = self.linker.sub_report(scope, &report_file, &title)?;
            let mut child = ReportNode::new(ids.next_id(), title, link);
            self.sub_reports(&mut child, &sub_dir, scope, ids)?;
            parent.add_child(child);
        }
        Ok(())
    }
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Strips one leading `"Report"` plus a single whitespace character.
pub fn sub_report_title(dir_name: &str) -> &str {
    dir_name
        .strip_prefix("Report")
        .and_then(|rest| rest.strip_prefix(char::is_whitespace))
        .unwrap_or(dir_name)
}
