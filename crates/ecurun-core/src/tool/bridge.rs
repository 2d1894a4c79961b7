//! Tool connector backed by a bridge process speaking newline-delimited JSON-RPC 2.0.
//!
//! Each connection spawns `<bridge> [args..] --prog-id <id> --timeout <secs>`; the
//! bridge attaches to the running tool instance identified by `prog_id`. The
//! child is killed when the connection is dropped.

use super::{
    DocumentRequest, ExecutionReport, ExecutionState, ExecutionToken, OpenOptions, TargetHandle,
    ToolClient, ToolConnector,
};
use crate::config::ToolConfig;
use crate::errors::ToolError;
use crate::model::{CheckFinding, JobExecutionMode, TargetKind};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

#[derive(Debug, Clone)]
pub struct BridgeConnector {
    config: ToolConfig,
}

impl BridgeConnector {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ToolConnector for BridgeConnector {
    async fn connect(&self) -> Result<Box<dyn ToolClient>, ToolError> {
        let client = BridgeClient::spawn(&self.config)?;
        Ok(Box::new(client))
    }

    fn describe(&self) -> String {
        format!(
            "{} via {}",
            self.config.prog_id(),
            self.config.bridge_command().display()
        )
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

pub struct BridgeClient {
    // Held so the bridge is killed together with the connection.
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    request_timeout: Option<Duration>,
}

impl BridgeClient {
    pub fn spawn(config: &ToolConfig) -> Result<Self, ToolError> {
        let command = config.bridge_command();
        let mut child = Command::new(command)
            .args(&config.bridge_args)
            .arg("--prog-id")
            .arg(config.prog_id())
            .arg("--timeout")
            .arg(config.timeout_secs.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ToolError::unavailable(format!(
                    "cannot start bridge {}: {e}",
                    command.display()
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolError::unavailable("bridge stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolError::unavailable("bridge stdout not captured"))?;

        tracing::debug!(prog_id = config.prog_id(), bridge = %command.display(), "bridge started");

        Ok(Self {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            request_timeout: (config.timeout_secs > 0)
                .then(|| Duration::from_secs(config.timeout_secs)),
        })
    }

    async fn call<T: DeserializeOwned>(&mut self, method: &str, params: Value) -> Result<T, ToolError> {
        let timeout = self.request_timeout;
        self.call_with_timeout(method, params, timeout).await
    }

    async fn call_with_timeout<T: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> Result<T, ToolError> {
        self.next_id += 1;
        let id = self.next_id;
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let mut line = serde_json::to_string(&request)
            .map_err(|e| ToolError::protocol(format!("cannot encode {method}: {e}")))?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let response = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.read_response(id))
                .await
                .map_err(|_| {
                    ToolError::unavailable(format!(
                        "no answer to {method} within {} seconds",
                        limit.as_secs()
                    ))
                })??,
            None => self.read_response(id).await?,
        };

        if let Some(err) = response.error {
            return Err(ToolError::remote(err.code, err.message));
        }
        serde_json::from_value(response.result.unwrap_or(Value::Null))
            .map_err(|e| ToolError::protocol(format!("unexpected result for {method}: {e}")))
    }

    async fn read_response(&mut self, id: u64) -> Result<RpcResponse, ToolError> {
        loop {
            let Some(line) = self.stdout.next_line().await? else {
                return Err(ToolError::unavailable("bridge closed its output"));
            };
            if line.trim().is_empty() {
                continue;
            }
            let response: RpcResponse = serde_json::from_str(&line)
                .map_err(|e| ToolError::protocol(format!("invalid bridge message: {e}")))?;
            match response.id {
                Some(got) if got == id => return Ok(response),
                Some(got) => {
                    tracing::debug!(expected = id, got, "skipping stale bridge response");
                }
                None => tracing::debug!(message = %line, "bridge notification"),
            }
        }
    }
}

#[async_trait]
impl ToolClient for BridgeClient {
    async fn open(&mut self, target: &Path, options: &OpenOptions) -> Result<TargetHandle, ToolError> {
        let kind = TargetKind::from_path(target).ok_or_else(|| {
            ToolError::remote(-1, format!("unsupported test file: {}", target.display()))
        })?;
        self.call::<Value>(
            "open",
            json!({
                "path": target.to_string_lossy(),
                "kind": kind.label(),
                "options": options,
            }),
        )
        .await?;
        Ok(TargetHandle {
            path: target.to_path_buf(),
            kind,
        })
    }

    async fn validate(&mut self, target: &TargetHandle) -> Result<Vec<CheckFinding>, ToolError> {
        self.call("validate", json!({ "target": target })).await
    }

    async fn execute(
        &mut self,
        target: &TargetHandle,
        mode: JobExecutionMode,
    ) -> Result<ExecutionToken, ToolError> {
        self.call(
            "execute",
            json!({ "target": target, "mode": mode.value() }),
        )
        .await
    }

    async fn current_execution(&mut self) -> Result<ExecutionToken, ToolError> {
        self.call("currentExecution", json!({})).await
    }

    async fn poll_state(&mut self, execution: &ExecutionToken) -> Result<ExecutionState, ToolError> {
        self.call("pollState", json!({ "execution": execution })).await
    }

    async fn abort(&mut self, execution: &ExecutionToken) -> Result<(), ToolError> {
        self.call::<Value>("abort", json!({ "execution": execution }))
            .await
            .map(|_| ())
    }

    async fn result(&mut self, execution: &ExecutionToken) -> Result<ExecutionReport, ToolError> {
        self.call("result", json!({ "execution": execution })).await
    }

    async fn wait_idle(&mut self, timeout_secs: u64) -> Result<bool, ToolError> {
        // The tool enforces the idle timeout itself.
        self.call_with_timeout("waitIdle", json!({ "timeout": timeout_secs }), None)
            .await
    }

    async fn close(&mut self, target: &TargetHandle) -> Result<bool, ToolError> {
        self.call("close", json!({ "target": target })).await
    }

    async fn generate_document(&mut self, request: &DocumentRequest) -> Result<(), ToolError> {
        self.call_with_timeout::<Value>("generateDocument", json!(request), None)
            .await
            .map(|_| ())
    }
}
