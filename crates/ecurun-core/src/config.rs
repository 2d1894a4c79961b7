//! YAML configuration (`ecurun.yaml`).

use crate::errors::ConfigError;
use crate::model::JobExecutionMode;
use crate::verdict::ThresholdConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

pub const DEFAULT_PROG_ID: &str = "ECU-TEST.Application";
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 0;
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_BRIDGE_COMMAND: &str = "ecu-test-bridge";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub version: u32,
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub upload: Option<UploadConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            tool: ToolConfig::default(),
            execution: ExecutionConfig::default(),
            publish: PublishConfig::default(),
            upload: None,
        }
    }
}

/// Identifies the tool instance a connector talks to.
///
/// Passed explicitly into connectors; there is no process-wide registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    #[serde(default)]
    prog_id: String,
    /// Timeout for tool requests in seconds; `0` waits indefinitely.
    #[serde(default)]
    pub timeout_secs: u64,
    #[serde(default)]
    pub bridge_command: Option<PathBuf>,
    #[serde(default)]
    pub bridge_args: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            prog_id: DEFAULT_PROG_ID.to_string(),
            timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            bridge_command: None,
            bridge_args: Vec::new(),
        }
    }
}

impl ToolConfig {
    pub fn new(prog_id: impl Into<String>) -> Self {
        Self::default().with_prog_id(prog_id)
    }

    /// Program identifier; a blank value falls back to [`DEFAULT_PROG_ID`].
    pub fn prog_id(&self) -> &str {
        let trimmed = self.prog_id.trim();
        if trimmed.is_empty() {
            DEFAULT_PROG_ID
        } else {
            trimmed
        }
    }

    pub fn with_prog_id(mut self, prog_id: impl Into<String>) -> Self {
        self.prog_id = prog_id.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn bridge_command(&self) -> &Path {
        self.bridge_command
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_BRIDGE_COMMAND))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    #[serde(default = "default_execution_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub check_test_file: bool,
    #[serde(default)]
    pub mode: JobExecutionMode,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_EXECUTION_TIMEOUT_SECS,
            check_test_file: true,
            mode: JobExecutionMode::default(),
        }
    }
}

fn default_execution_timeout() -> u64 {
    DEFAULT_EXECUTION_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishConfig {
    /// Where local report archives go; archiving is disabled when unset.
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,
    /// Keep earlier archives instead of clearing the target first.
    #[serde(default)]
    pub keep_all: bool,
    #[serde(default)]
    pub allow_missing: bool,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

/// Settings for shipping reports to the reporting service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    pub base_url: String,
    #[serde(default)]
    pub project_id: Option<String>,
    /// Reference into the host's credential store; never resolved here.
    #[serde(default)]
    pub credentials_id: Option<String>,
    /// Map all sub-reports onto one test plan instead of nesting under the project.
    #[serde(default)]
    pub single_testplan_map: bool,
    #[serde(default)]
    pub allow_missing: bool,
    /// Passed through to the tool's document generator.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl UploadConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Project id, ignoring blank values.
    pub fn project_id(&self) -> Option<&str> {
        self.project_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

pub fn load_config(path: &Path) -> Result<RunConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw, path)
}

pub fn parse_config(raw: &str, path: &Path) -> Result<RunConfig, ConfigError> {
    let cfg: RunConfig = serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion {
            found: cfg.version,
            supported: SUPPORTED_CONFIG_VERSION,
        });
    }
    if let Some(upload) = &cfg.upload {
        if upload.base_url().is_empty() {
            return Err(ConfigError::Invalid("upload.base_url must not be empty".into()));
        }
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prog_id() {
        assert_eq!(ToolConfig::default().prog_id(), DEFAULT_PROG_ID);
    }

    #[test]
    fn empty_prog_id_falls_back_to_default() {
        assert_eq!(ToolConfig::new("").prog_id(), DEFAULT_PROG_ID);
        assert_eq!(ToolConfig::new("   ").prog_id(), DEFAULT_PROG_ID);
    }

    #[test]
    fn custom_prog_id() {
        assert_eq!(
            ToolConfig::new("ECU-TEST6.Application").prog_id(),
            "ECU-TEST6.Application"
        );
    }

    #[test]
    fn default_and_custom_tool_timeout() {
        assert_eq!(ToolConfig::default().timeout_secs, DEFAULT_TOOL_TIMEOUT_SECS);
        assert_eq!(ToolConfig::default().with_timeout(120).timeout_secs, 120);
    }

    #[test]
    fn parses_full_config() {
        let yaml = r#"
version: 1
tool:
  prog_id: ECU-TEST6.Application
  bridge_command: /opt/bridge/bin/bridge
execution:
  timeout_secs: 600
  check_test_file: false
  mode: parallel
publish:
  archive_dir: reports
  allow_missing: true
  thresholds:
    unstable: 5
    failed: 150
upload:
  base_url: http://reports.local:8085/
  project_id: "7"
  settings:
    uploadToServer: "True"
"#;
        let cfg = parse_config(yaml, Path::new("ecurun.yaml")).unwrap();
        assert_eq!(cfg.tool.prog_id(), "ECU-TEST6.Application");
        assert_eq!(cfg.tool.bridge_command(), Path::new("/opt/bridge/bin/bridge"));
        assert_eq!(cfg.execution.timeout_secs, 600);
        assert!(!cfg.execution.check_test_file);
        assert_eq!(cfg.execution.mode, JobExecutionMode::Parallel);
        assert!(cfg.publish.allow_missing);
        assert_eq!(cfg.publish.thresholds.failed(), 100.0);
        let upload = cfg.upload.unwrap();
        assert_eq!(upload.base_url(), "http://reports.local:8085");
        assert_eq!(upload.project_id(), Some("7"));
        assert_eq!(upload.settings.get("uploadToServer").map(String::as_str), Some("True"));
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = parse_config("version: 1\n", Path::new("ecurun.yaml")).unwrap();
        assert_eq!(cfg.execution.timeout_secs, DEFAULT_EXECUTION_TIMEOUT_SECS);
        assert!(cfg.execution.check_test_file);
        assert_eq!(cfg.tool.prog_id(), DEFAULT_PROG_ID);
        assert!(cfg.upload.is_none());
    }

    #[test]
    fn rejects_unknown_version() {
        let err = parse_config("version: 2\n", Path::new("ecurun.yaml")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnsupportedVersion { found: 2, supported: 1 }
        ));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = parse_config("version: 1\nexecution:\n  timeout: 5\n", Path::new("x.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
