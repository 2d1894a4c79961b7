use super::common::{load, write_json};
use super::upload::{upload_config, upload_reports};
use crate::cli::args::RunArgs;
use crate::exit_codes;
use anyhow::Context;
use ecurun_core::clock::now_millis;
use ecurun_core::config::RunConfig;
use ecurun_core::engine::{Heartbeat, Interrupt};
use ecurun_core::model::{ExecutionSession, TargetKind};
use ecurun_core::report::archive::{archive_reports, ArchiveOptions};
use ecurun_core::tool::bridge::BridgeConnector;
use ecurun_core::tool::OpenOptions;
use ecurun_core::{ExecutionError, ExecutionOutcome, Supervisor};
use std::future::Future;
use std::sync::Arc;

pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    let cfg = load(&args.config)?;
    let session = session(&args, &cfg)?;
    let started_at = now_millis();

    let (trigger, interrupt) = Interrupt::pair();
    let supervisor = Supervisor::new(Arc::new(BridgeConnector::new(cfg.tool.clone())))
        .with_open_options(OpenOptions {
            exec_in_current_pkg_dir: args.exec_in_pkg_dir,
            filter_expression: args.filter.clone(),
        })
        .with_heartbeat(Arc::new(|hb: Heartbeat| {
            tracing::debug!(tick = hb.tick, "execution heartbeat");
        }));

    // The first Ctrl-C aborts the execution, a second one gives up on recovery.
    let result = tokio::select! {
        result = supervisor.run_session(&session, interrupt) => result,
        _ = async {
            ctrl_c().await;
            tracing::warn!("interrupt received, aborting test execution");
            trigger.fire();
            ctrl_c().await;
        } => {
            tracing::error!("interrupted again, abandoning test execution");
            return Ok(exit_codes::FAILED);
        }
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(ExecutionError::Validation { findings, .. }) => {
            for finding in &findings {
                eprintln!("{finding}");
            }
            return Ok(exit_codes::FAILED);
        }
        Err(e) => return Err(e).context("test execution failed"),
    };

    if let Some(out) = &args.output {
        write_json(&outcome, out)?;
    }
    let mut code = exit_codes::from_tool_verdict(outcome.verdict());
    if outcome.aborted() {
        tracing::warn!(verdict = outcome.verdict(), "execution was aborted");
    }

    let archiving = archive(&args, &cfg, &outcome);
    let Some(archived) = until_interrupted("archiving", archiving, ctrl_c()).await else {
        return Ok(exit_codes::FAILED);
    };
    code = exit_codes::worst(code, archived);

    if args.upload {
        let upload = upload_config(&cfg, None, None)?;
        let dirs = [outcome.report_dir().to_path_buf()];
        let upload = upload_reports(&cfg, upload, &dirs, started_at, None);
        let Some(uploaded) = until_interrupted("upload", upload, ctrl_c()).await else {
            return Ok(exit_codes::FAILED);
        };
        code = exit_codes::worst(code, uploaded?);
    }
    Ok(code)
}

/// Resolves on the next Ctrl-C, or never if the signal cannot be watched.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Runs `work` unless `interrupt` resolves first, in which case `work` is dropped.
async fn until_interrupted<T>(
    phase: &str,
    work: impl Future<Output = T>,
    interrupt: impl Future<Output = ()>,
) -> Option<T> {
    tokio::select! {
        output = work => Some(output),
        _ = interrupt => {
            tracing::error!("interrupt received, {phase} cancelled");
            None
        }
    }
}

/// Session from the config with flag overrides applied.
fn session(args: &RunArgs, cfg: &RunConfig) -> anyhow::Result<ExecutionSession> {
    let kind = TargetKind::from_path(&args.target).with_context(|| {
        format!(
            "unsupported test file {}: expected a .pkg or .prj file",
            args.target.display()
        )
    })?;
    let mode = args.mode.map(Into::into).unwrap_or(cfg.execution.mode);
    Ok(ExecutionSession::new(&args.target, kind)
        .with_mode(mode)
        .with_timeout(args.timeout.unwrap_or(cfg.execution.timeout_secs))
        .with_check(cfg.execution.check_test_file && !args.no_check))
}

async fn archive(args: &RunArgs, cfg: &RunConfig, outcome: &ExecutionOutcome) -> i32 {
    let Some(target) = args.archive.clone().or_else(|| cfg.publish.archive_dir.clone()) else {
        return exit_codes::SUCCESS;
    };
    let mut options = ArchiveOptions::new(target);
    options.keep_all = cfg.publish.keep_all;
    options.allow_missing = cfg.publish.allow_missing;
    let dirs = [outcome.report_dir().to_path_buf()];

    match tokio::task::spawn_blocking(move || archive_reports(&dirs, &options)).await {
        Ok(Ok(_)) => exit_codes::SUCCESS,
        Ok(Err(e)) => {
            tracing::error!("archiving reports failed: {e}");
            exit_codes::FAILED
        }
        Err(e) => {
            tracing::error!("archiving task failed: {e}");
            exit_codes::FAILED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::{ConfigArgs, ModeArg};
    use ecurun_core::model::JobExecutionMode;
    use std::path::PathBuf;

    fn args(target: &str) -> RunArgs {
        RunArgs {
            target: PathBuf::from(target),
            config: ConfigArgs {
                config: PathBuf::from("ecurun.yaml"),
            },
            timeout: None,
            no_check: false,
            mode: None,
            filter: None,
            exec_in_pkg_dir: false,
            archive: None,
            upload: false,
            output: None,
        }
    }

    #[test]
    fn session_uses_config_defaults() {
        let session = session(&args("suite/Lights.PKG"), &RunConfig::default()).unwrap();
        assert_eq!(session.kind, TargetKind::Package);
        assert_eq!(session.timeout_secs, 3600);
        assert!(session.check_before_run);
        assert_eq!(session.mode, JobExecutionMode::Sequential);
    }

    #[test]
    fn flags_override_session_settings() {
        let mut a = args("suite/Regression.prj");
        a.timeout = Some(0);
        a.no_check = true;
        a.mode = Some(ModeArg::Parallel);
        let session = session(&a, &RunConfig::default()).unwrap();
        assert_eq!(session.kind, TargetKind::Project);
        assert_eq!(session.timeout_secs, 0);
        assert!(!session.check_before_run);
        assert_eq!(session.mode, JobExecutionMode::Parallel);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(session(&args("suite/notes.txt"), &RunConfig::default()).is_err());
    }

    #[tokio::test]
    async fn interrupt_cancels_pending_phase() {
        let cancelled = until_interrupted("upload", std::future::pending::<i32>(), async {}).await;
        assert_eq!(cancelled, None);
    }

    #[tokio::test]
    async fn finished_phase_wins_over_quiet_interrupt() {
        let work = async { exit_codes::UNSTABLE };
        let done = until_interrupted("archiving", work, std::future::pending()).await;
        assert_eq!(done, Some(exit_codes::UNSTABLE));
    }
}
