use super::common::{load, write_json};
use crate::cli::args::UploadArgs;
use crate::exit_codes;
use anyhow::Context;
use ecurun_core::clock::now_millis;
use ecurun_core::config::{RunConfig, UploadConfig};
use ecurun_core::report::atx::{AtxUpload, AtxUploader};
use ecurun_core::tool::bridge::BridgeConnector;
use ecurun_core::UploadError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub async fn run(args: UploadArgs) -> anyhow::Result<i32> {
    let cfg = load(&args.config)?;
    let mut upload = upload_config(&cfg, args.base_url, args.project_id)?;
    upload.allow_missing |= args.allow_missing;
    let started_at = args.started_at.unwrap_or_else(now_millis);

    upload_reports(&cfg, upload, &args.dirs, started_at, args.output.as_deref()).await
}

/// Upload section from the config with flag overrides applied.
pub fn upload_config(
    cfg: &RunConfig,
    base_url: Option<String>,
    project_id: Option<String>,
) -> anyhow::Result<UploadConfig> {
    let mut upload = match (cfg.upload.clone(), base_url) {
        (Some(mut upload), Some(url)) => {
            upload.base_url = url;
            upload
        }
        (Some(upload), None) => upload,
        (None, Some(url)) => UploadConfig::new(url),
        (None, None) => {
            anyhow::bail!("no reporting service configured: pass --base-url or add an upload section")
        }
    };
    if project_id.is_some() {
        upload.project_id = project_id;
    }
    anyhow::ensure!(!upload.base_url().trim().is_empty(), "upload base url must not be empty");
    Ok(upload)
}

pub async fn upload_reports(
    cfg: &RunConfig,
    upload: UploadConfig,
    dirs: &[PathBuf],
    started_at: i64,
    output: Option<&Path>,
) -> anyhow::Result<i32> {
    let connector = Arc::new(BridgeConnector::new(cfg.tool.clone()));
    let result = AtxUploader::new(connector, upload).upload(dirs, started_at).await;

    let upload: AtxUpload = match result {
        Ok(upload) => upload,
        Err(UploadError::MissingReport { .. } | UploadError::EmptyResults) => {
            return Ok(exit_codes::FAILED);
        }
        Err(e) => return Err(e).context("upload failed"),
    };

    if let Some(out) = output {
        write_json(&upload.reports, out)?;
    }
    if upload.is_success() {
        Ok(exit_codes::SUCCESS)
    } else {
        Ok(exit_codes::FAILED)
    }
}
