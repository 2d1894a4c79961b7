//! Report file (`*.trf`) recognition and metadata.
//!
//! A report file is an SQLite database. Job reports (`Job_*.trf`) are written
//! alongside the main report and are never the primary report of a directory.

use crate::errors::DiscoveryError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Marker stored as project name when the report belongs to a single package.
const PACKAGE_MARKER: &str = "$$$_PACKAGE_$$$";

const REPORT_GLOB: &str = "*.trf";
const JOB_REPORT_GLOB: &str = "Job_*.trf";
/// Job reports below the top level belong to sub-executions and are not archived.
const NESTED_JOB_REPORT_GLOB: &str = "*/**/Job_*.trf";

struct ReportPatterns {
    /// Matched against file names.
    report: GlobSet,
    job: GlobSet,
    /// Matched against `/`-separated paths relative to a report directory.
    nested_job: GlobSet,
}

static PATTERNS: OnceLock<Result<ReportPatterns, String>> = OnceLock::new();

fn compile(globs: &[&str]) -> Result<GlobSet, globset::Error> {
    let mut b = GlobSetBuilder::new();
    for g in globs {
        b.add(Glob::new(g)?);
    }
    b.build()
}

fn patterns() -> Result<&'static ReportPatterns, DiscoveryError> {
    PATTERNS
        .get_or_init(|| {
            let nested_job = globset::GlobBuilder::new(NESTED_JOB_REPORT_GLOB)
                .literal_separator(true)
                .build()
                .map_err(|e| e.to_string())?;
            Ok(ReportPatterns {
                report: compile(&[REPORT_GLOB]).map_err(|e| e.to_string())?,
                job: compile(&[JOB_REPORT_GLOB]).map_err(|e| e.to_string())?,
                nested_job: GlobSetBuilder::new()
                    .add(nested_job)
                    .build()
                    .map_err(|e| e.to_string())?,
            })
        })
        .as_ref()
        .map_err(|message| DiscoveryError::Pattern {
            message: message.clone(),
        })
}

/// Whether `file_name` names a primary report file.
pub fn is_report_file_name(file_name: &str) -> Result<bool, DiscoveryError> {
    let p = patterns()?;
    Ok(p.report.is_match(file_name) && !p.job.is_match(file_name))
}

/// The first primary report file directly inside `dir`, by file name.
pub fn first_report_file(dir: &Path) -> Result<Option<PathBuf>, DiscoveryError> {
    let entries = std::fs::read_dir(dir).map_err(|e| DiscoveryError::io(dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DiscoveryError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| DiscoveryError::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_report_file_name(name)? {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names.into_iter().next().map(|name| dir.join(name)))
}

/// Immediate subdirectories of `dir`, sorted by name. Symbolic links are not followed.
pub fn sub_directories(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let entries = std::fs::read_dir(dir).map_err(|e| DiscoveryError::io(dir, e))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DiscoveryError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| DiscoveryError::io(entry.path(), e))?;
        if file_type.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Every `*.trf` below `dir`, in walk order, minus job reports of nested executions.
pub fn collect_report_files(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let p = patterns()?;
    let mut files = Vec::new();
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
        let is_report = entry
            .file_name()
            .to_str()
            .is_some_and(|name| p.report.is_match(name));
        if is_report && !p.nested_job.is_match(&rel) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// `/`-separated rendering of a relative path.
pub fn relative_slash_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Package,
    Project,
}

/// Name and kind of the test a report file belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrfMetadata {
    pub name: String,
    pub kind: ReportKind,
}

impl TrfMetadata {
    pub fn read(report_file: &Path) -> Result<Self, DiscoveryError> {
        let conn = Connection::open_with_flags(report_file, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| metadata_error(report_file, e))?;

        let project = query_name(&conn, "SELECT name FROM prj")
            .map_err(|e| metadata_error(report_file, e))?;
        match project {
            Some(name) if name == PACKAGE_MARKER => {
                let package = query_name(&conn, "SELECT name FROM pkg")
                    .map_err(|e| metadata_error(report_file, e))?;
                let name = package.ok_or_else(|| DiscoveryError::Metadata {
                    path: report_file.to_path_buf(),
                    message: "package name missing".into(),
                })?;
                Ok(Self {
                    name,
                    kind: ReportKind::Package,
                })
            }
            Some(name) => Ok(Self {
                name,
                kind: ReportKind::Project,
            }),
            None => Err(DiscoveryError::Metadata {
                path: report_file.to_path_buf(),
                message: "project name missing".into(),
            }),
        }
    }
}

fn query_name(conn: &Connection, sql: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(sql, [], |row| row.get::<_, String>(0))
        .optional()
}

fn metadata_error(path: &Path, e: rusqlite::Error) -> DiscoveryError {
    DiscoveryError::Metadata {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}
