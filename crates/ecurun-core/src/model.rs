use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// What kind of test file a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Package,
    Project,
}

impl TargetKind {
    /// Derives the kind from the file extension (`.pkg` / `.prj`, case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pkg" => Some(Self::Package),
            "prj" => Some(Self::Project),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Project => "project",
        }
    }
}

/// How the tool schedules the jobs of a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobExecutionMode {
    NoExecution,
    #[default]
    Sequential,
    Parallel,
}

impl JobExecutionMode {
    /// Numeric value understood by the tool.
    pub fn value(&self) -> u8 {
        match self {
            Self::NoExecution => 0,
            Self::Sequential => 1,
            Self::Parallel => 2,
        }
    }
}

/// One supervised run of the external tool against one target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSession {
    pub target: PathBuf,
    pub kind: TargetKind,
    pub mode: JobExecutionMode,
    /// Seconds; `0` means unbounded.
    pub timeout_secs: u64,
    pub check_before_run: bool,
}

impl ExecutionSession {
    pub fn new(target: impl Into<PathBuf>, kind: TargetKind) -> Self {
        Self {
            target: target.into(),
            kind,
            mode: JobExecutionMode::default(),
            timeout_secs: 0,
            check_before_run: false,
        }
    }

    pub fn with_mode(mut self, mode: JobExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_check(mut self, check_before_run: bool) -> Self {
        self.check_before_run = check_before_run;
        self
    }

    /// Base file name without extension, used as the default test name.
    pub fn test_name(&self) -> String {
        self.target
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Terminal result of a session. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    verdict: String,
    report_dir: PathBuf,
    aborted: bool,
}

impl ExecutionOutcome {
    pub fn new(verdict: impl Into<String>, report_dir: impl Into<PathBuf>, aborted: bool) -> Self {
        Self {
            verdict: verdict.into(),
            report_dir: report_dir.into(),
            aborted,
        }
    }

    /// Tool-defined verdict string (e.g. `SUCCESS`, `FAILED`, `ERROR`).
    pub fn verdict(&self) -> &str {
        &self.verdict
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Note,
    Warning,
    Error,
}

/// One validation diagnostic reported by the tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFinding {
    pub file_path: String,
    pub line: u32,
    pub message: String,
    pub severity: Severity,
}

impl CheckFinding {
    pub fn new(
        file_path: impl Into<String>,
        line: u32,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            line,
            message: message.into(),
            severity,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for CheckFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}): {}", self.file_path, self.line, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_kind_from_extension() {
        assert_eq!(
            TargetKind::from_path(Path::new("tests/Smoke.PKG")),
            Some(TargetKind::Package)
        );
        assert_eq!(
            TargetKind::from_path(Path::new("Suite.prj")),
            Some(TargetKind::Project)
        );
        assert_eq!(TargetKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(TargetKind::from_path(Path::new("no_extension")), None);
    }

    #[test]
    fn finding_display_matches_log_format() {
        let f = CheckFinding::new("Pkg/Main.pkg", 12, "unknown signal", Severity::Error);
        assert_eq!(f.to_string(), "Pkg/Main.pkg (line 12): unknown signal");
        assert!(f.is_error());
    }

    #[test]
    fn session_test_name_is_file_stem() {
        let s = ExecutionSession::new("/work/Regression.prj", TargetKind::Project);
        assert_eq!(s.test_name(), "Regression");
    }
}
