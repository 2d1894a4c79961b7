//! Drives one session to completion:
//! open -> (validate) -> run -> poll -> {complete | abort} -> collect -> settle -> close.
//!
//! Every phase works on its own connection, dropped before the phase returns.
//! The opened target is closed on every exit path once opening succeeded.

use super::interrupt::Interrupt;
use super::progress::{Heartbeat, HeartbeatSink};
use crate::clock::Deadline;
use crate::errors::{ExecutionError, ToolError};
use crate::model::{CheckFinding, ExecutionOutcome, ExecutionSession, Severity};
use crate::tool::{ExecutionToken, OpenOptions, TargetHandle, ToolClient, ToolConnector};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A heartbeat is logged on every n-th poll, starting with the first.
pub const HEARTBEAT_EVERY: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollEnd {
    Completed,
    TimedOut,
    Interrupted,
}

pub struct Supervisor {
    connector: Arc<dyn ToolConnector>,
    open_options: OpenOptions,
    poll_interval: Duration,
    heartbeat: Option<HeartbeatSink>,
}

impl Supervisor {
    pub fn new(connector: Arc<dyn ToolConnector>) -> Self {
        Self {
            connector,
            open_options: OpenOptions::default(),
            poll_interval: POLL_INTERVAL,
            heartbeat: None,
        }
    }

    pub fn with_open_options(mut self, options: OpenOptions) -> Self {
        self.open_options = options;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_heartbeat(mut self, sink: HeartbeatSink) -> Self {
        self.heartbeat = Some(sink);
        self
    }

    /// Runs `session` and returns its outcome.
    ///
    /// Timeouts and interrupts do not fail the run: the execution is aborted and
    /// whatever the tool reports is returned with `aborted = true`.
    pub async fn run_session(
        &self,
        session: &ExecutionSession,
        interrupt: Interrupt,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let span = tracing::info_span!(
            "session",
            target = %session.target.display(),
            kind = session.kind.label()
        );
        self.run_session_inner(session, interrupt)
            .instrument(span)
            .await
    }

    async fn run_session_inner(
        &self,
        session: &ExecutionSession,
        interrupt: Interrupt,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let handle = self.open_phase(session).await?;
        let outcome = self.run_phase(session, &handle, interrupt).await;
        self.close_target(&handle).await;
        outcome
    }

    async fn connect(&self) -> Result<Box<dyn ToolClient>, ExecutionError> {
        self.connector.connect().await.map_err(|e| {
            tracing::error!(tool = %self.connector.describe(), "cannot connect to test tool: {e}");
            ExecutionError::Connection(e)
        })
    }

    async fn open_phase(&self, session: &ExecutionSession) -> Result<TargetHandle, ExecutionError> {
        let label = session.kind.label();
        tracing::info!("- Opening {label}...");
        let mut client = self.connect().await?;
        let handle = client
            .open(&session.target, &self.open_options)
            .await
            .map_err(|source| {
                tracing::error!("-> Opening {label} failed: {source}");
                ExecutionError::Open {
                    target: session.target.clone(),
                    source,
                }
            })?;
        tracing::info!("-> {} opened successfully.", capitalize(label));

        if session.check_before_run {
            if let Err(err) = self.validate(client.as_mut(), session, &handle).await {
                drop(client);
                self.close_target(&handle).await;
                return Err(err);
            }
        }
        Ok(handle)
    }

    async fn validate(
        &self,
        client: &mut dyn ToolClient,
        session: &ExecutionSession,
        handle: &TargetHandle,
    ) -> Result<(), ExecutionError> {
        let label = session.kind.label();
        tracing::info!("- Checking {label}...");
        let findings = client.validate(handle).await.map_err(|source| {
            tracing::error!("-> Checking {label} failed: {source}");
            ExecutionError::Open {
                target: session.target.clone(),
                source,
            }
        })?;

        if findings.is_empty() {
            tracing::info!("-> {} validated successfully!", capitalize(label));
            return Ok(());
        }
        log_findings(&findings);
        if findings.iter().any(CheckFinding::is_error) {
            return Err(ExecutionError::Validation {
                target: session.target.clone(),
                findings,
            });
        }
        Ok(())
    }

    async fn run_phase(
        &self,
        session: &ExecutionSession,
        handle: &TargetHandle,
        mut interrupt: Interrupt,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let label = session.kind.label();
        if interrupt.is_fired() {
            tracing::warn!("-> Build interrupted! Skipping {label} execution.");
            return Err(ExecutionError::Interrupted {
                target: session.target.clone(),
                source: ToolError::unavailable("interrupted before the execution started"),
            });
        }
        tracing::info!("- Running {label}...");
        let mut client = self.connect().await?;
        let execution_failed = |source: ToolError| {
            tracing::error!("-> Running {label} failed: {source}");
            ExecutionError::Execution {
                target: session.target.clone(),
                source,
            }
        };

        let execution = client
            .execute(handle, session.mode)
            .await
            .map_err(execution_failed)?;
        let deadline = Deadline::after_secs(session.timeout_secs);

        let end = self
            .poll(client.as_mut(), session, &execution, &deadline, &mut interrupt)
            .await
            .map_err(execution_failed)?;

        if end == PollEnd::Interrupted {
            drop(client);
            return self.recover(session).await;
        }

        let outcome = collect(
            client.as_mut(),
            session,
            &execution,
            end == PollEnd::TimedOut,
        )
        .await
        .map_err(execution_failed)?;
        settle(client.as_mut(), session.timeout_secs).await;
        Ok(outcome)
    }

    async fn poll(
        &self,
        client: &mut dyn ToolClient,
        session: &ExecutionSession,
        execution: &ExecutionToken,
        deadline: &Deadline,
        interrupt: &mut Interrupt,
    ) -> Result<PollEnd, ToolError> {
        let mut tick: u64 = 0;
        loop {
            if !client.poll_state(execution).await?.is_running() {
                return Ok(PollEnd::Completed);
            }
            if tick % HEARTBEAT_EVERY == 0 {
                tracing::info!(tick, "-- tick...");
                if let Some(sink) = &self.heartbeat {
                    sink(Heartbeat { tick });
                }
            }
            if deadline.is_expired() {
                tracing::warn!(
                    "-> Test execution timeout of {} seconds reached! Aborting {} now...",
                    deadline.timeout_secs(),
                    session.kind.label()
                );
                client.abort(execution).await?;
                return Ok(PollEnd::TimedOut);
            }
            tokio::select! {
                biased;
                _ = interrupt.fired() => return Ok(PollEnd::Interrupted),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
            tick += 1;
        }
    }

    /// Abort-and-collect on a fresh connection after the host interrupted polling.
    async fn recover(&self, session: &ExecutionSession) -> Result<ExecutionOutcome, ExecutionError> {
        tracing::warn!("-> Build interrupted! Aborting test execution...");
        let attempt = async {
            let mut client = self.connector.connect().await?;
            let execution = client.current_execution().await?;
            client.abort(&execution).await?;
            let outcome = collect(client.as_mut(), session, &execution, true).await?;
            settle(client.as_mut(), session.timeout_secs).await;
            Ok::<_, ToolError>(outcome)
        };
        attempt.await.map_err(|source| {
            tracing::error!("-> Recovering interrupted execution failed: {source}");
            ExecutionError::Interrupted {
                target: session.target.clone(),
                source,
            }
        })
    }

    /// Closes the target on a fresh connection. Failures are logged only.
    async fn close_target(&self, handle: &TargetHandle) -> bool {
        let label = handle.kind.label();
        tracing::info!("- Closing {label}...");
        let closed = async {
            let mut client = self.connector.connect().await?;
            Ok::<bool, ToolError>(client.close(handle).await?)
        }
        .await;
        match closed {
            Ok(true) => {
                tracing::info!("-> {} closed successfully.", capitalize(label));
                true
            }
            Ok(false) => {
                tracing::error!("-> Closing {label} failed!");
                false
            }
            Err(e) => {
                tracing::error!("-> Closing {label} failed: {e}");
                false
            }
        }
    }
}

async fn collect(
    client: &mut dyn ToolClient,
    session: &ExecutionSession,
    execution: &ExecutionToken,
    aborted: bool,
) -> Result<ExecutionOutcome, ToolError> {
    let report = client.result(execution).await?;
    tracing::info!(
        "-> {} execution completed with result: {}",
        capitalize(session.kind.label()),
        report.verdict
    );
    let report_dir = report.report_dir();
    tracing::info!("-> Test report directory: {}", report_dir.display());
    Ok(ExecutionOutcome::new(report.verdict, report_dir, aborted))
}

/// Asks the tool to go idle within the run's timeout budget. Never fails the run.
async fn settle(client: &mut dyn ToolClient, timeout_secs: u64) {
    match client.wait_idle(timeout_secs).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("-> Post-execution timeout of {timeout_secs} seconds reached!")
        }
        Err(e) => tracing::warn!("-> Waiting for the tool to become idle failed: {e}"),
    }
}

fn log_findings(findings: &[CheckFinding]) {
    for finding in findings {
        match finding.severity {
            Severity::Note => tracing::info!("{finding}"),
            Severity::Warning => tracing::warn!("{finding}"),
            Severity::Error => tracing::error!("{finding}"),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::capitalize;

    #[test]
    fn capitalizes_labels() {
        assert_eq!(capitalize("project"), "Project");
        assert_eq!(capitalize(""), "");
    }
}
