use crate::cli::args::{ConfigArgs, ThresholdArgs, DEFAULT_CONFIG};
use anyhow::Context;
use ecurun_core::config::{load_config, RunConfig};
use ecurun_core::ThresholdConfig;
use serde::Serialize;
use std::path::Path;

/// Loads the config file. Only an absent *default* file falls back to defaults;
/// an explicitly named file has to exist.
pub fn load(args: &ConfigArgs) -> anyhow::Result<RunConfig> {
    if args.config == Path::new(DEFAULT_CONFIG) && !args.config.exists() {
        tracing::debug!("no {DEFAULT_CONFIG} found, using built-in defaults");
        return Ok(RunConfig::default());
    }
    let cfg = load_config(&args.config)?;
    tracing::debug!(config = %args.config.display(), "loaded config");
    Ok(cfg)
}

/// Flag values win over the configured thresholds, one side at a time.
pub fn thresholds(base: ThresholdConfig, args: &ThresholdArgs) -> ThresholdConfig {
    ThresholdConfig::new(
        args.unstable_threshold.unwrap_or(base.unstable()),
        args.failed_threshold.unwrap_or(base.failed()),
    )
}

pub fn write_json<T: Serialize>(value: &T, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(out, json).with_context(|| format!("failed to write {}", out.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_one_threshold_at_a_time() {
        let base = ThresholdConfig::new(5.0, 50.0);
        let args = ThresholdArgs {
            unstable_threshold: None,
            failed_threshold: Some(20.0),
        };
        let merged = thresholds(base, &args);
        assert_eq!(merged.unstable(), 5.0);
        assert_eq!(merged.failed(), 20.0);
    }

    #[test]
    fn flag_thresholds_are_clamped() {
        let args = ThresholdArgs {
            unstable_threshold: Some(-3.0),
            failed_threshold: Some(250.0),
        };
        let merged = thresholds(ThresholdConfig::default(), &args);
        assert_eq!(merged.unstable(), 0.0);
        assert_eq!(merged.failed(), 100.0);
    }

    #[test]
    fn named_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let args = ConfigArgs {
            config: dir.path().join("nope.yaml"),
        };
        assert!(load(&args).is_err());
    }
}
