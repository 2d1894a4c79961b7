//! Copies report files into a local archive and indexes them as a report tree.

use super::tree::{ArchiveLinker, TreeBuilder};
use super::trf::{collect_report_files, first_report_file};
use super::{write_json, ReportNode};
use crate::errors::ArchiveError;
use std::path::{Path, PathBuf};

/// Index written next to the archived reports.
pub const INDEX_FILE: &str = "reports.json";

#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub target: PathBuf,
    /// Keep earlier archives instead of clearing `target` first.
    pub keep_all: bool,
    pub allow_missing: bool,
}

impl ArchiveOptions {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            keep_all: false,
            allow_missing: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveSummary {
    pub reports: Vec<ReportNode>,
    pub copied_files: usize,
    /// Written only when at least one report was archived.
    pub index: Option<PathBuf>,
}

/// Archives each report directory into `<target>/<dir name>`.
pub fn archive_reports(
    report_dirs: &[PathBuf],
    options: &ArchiveOptions,
) -> Result<ArchiveSummary, ArchiveError> {
    tracing::info!("Publishing TRF reports...");
    let target = &options.target;

    if let Some(dir) = report_dir_inside(target, report_dirs) {
        tracing::error!(
            "Archive target '{}' contains report directory '{}'.",
            target.display(),
            dir.display()
        );
        return Err(ArchiveError::TargetContainsReport {
            target: target.clone(),
            dir: dir.clone(),
        });
    }
    if !report_dirs.is_empty() && !options.keep_all && target.exists() {
        std::fs::remove_dir_all(target).map_err(|source| ArchiveError::Io {
            path: target.clone(),
            source,
        })?;
    }

    let mut archived_dirs = Vec::new();
    let mut copied_files = 0;
    for report_dir in report_dirs {
        let Some(report_file) = first_report_file(report_dir)? else {
            if options.allow_missing {
                continue;
            }
            tracing::error!(
                "Report file in '{}' does not exist.",
                report_dir.display()
            );
            return Err(ArchiveError::MissingReport {
                dir: report_dir.clone(),
            });
        };

        tracing::info!("- Archiving TRF report: {}", report_file.display());
        let Some(dir_name) = report_dir.file_name() else {
            continue;
        };
        let target_dir = target.join(dir_name);
        let copied = copy_reports(report_dir, &target_dir)?;
        if copied == 0 {
            continue;
        }
        if copied > 1 {
            tracing::info!("-> Archived {} sub-report(s).", copied - 1);
        }
        copied_files += copied;
        archived_dirs.push(target_dir);
    }

    let reports = TreeBuilder::new(ArchiveLinker::new(target)).build_dirs(&archived_dirs)?;
    if reports.is_empty() {
        if !options.allow_missing {
            tracing::error!("Empty test results are not allowed, setting build status to FAILURE!");
            return Err(ArchiveError::EmptyResults);
        }
        return Ok(ArchiveSummary {
            reports,
            copied_files,
            index: None,
        });
    }

    let index = target.join(INDEX_FILE);
    write_json(&reports, &index).map_err(|source| ArchiveError::Io {
        path: index.clone(),
        source,
    })?;
    tracing::info!("TRF reports published successfully.");
    Ok(ArchiveSummary {
        reports,
        copied_files,
        index: Some(index),
    })
}

/// First report directory at or below `target`, compared by canonical path.
fn report_dir_inside<'a>(target: &Path, report_dirs: &'a [PathBuf]) -> Option<&'a PathBuf> {
    let target = target.canonicalize().ok()?;
    report_dirs
        .iter()
        .find(|dir| dir.canonicalize().is_ok_and(|dir| dir.starts_with(&target)))
}

fn copy_reports(report_dir: &Path, target_dir: &Path) -> Result<usize, ArchiveError> {
    let files = collect_report_files(report_dir)?;
    for file in &files {
        let Ok(rel) = file.strip_prefix(report_dir) else {
            continue;
        };
        let dest = target_dir.join(rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ArchiveError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::copy(file, &dest).map_err(|source| ArchiveError::Io {
            path: dest.clone(),
            source,
        })?;
    }
    Ok(files.len())
}
