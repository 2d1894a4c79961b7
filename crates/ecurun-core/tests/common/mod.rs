//! Scripted in-memory test tool shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ecurun_core::model::{CheckFinding, JobExecutionMode};
use ecurun_core::tool::{
    DocumentRequest, ExecutionReport, ExecutionState, ExecutionToken, OpenOptions, TargetHandle,
    ToolClient, ToolConnector,
};
use ecurun_core::ToolError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Open(PathBuf),
    Validate,
    Execute(JobExecutionMode),
    CurrentExecution,
    PollState,
    Abort,
    Result,
    WaitIdle(u64),
    Close,
    GenerateDocument(PathBuf),
}

pub type DocumentHook = Arc<dyn Fn(usize, &DocumentRequest) -> Result<(), ToolError> + Send + Sync>;

pub fn hook(
    f: impl Fn(usize, &DocumentRequest) -> Result<(), ToolError> + Send + Sync + 'static,
) -> Option<DocumentHook> {
    Some(Arc::new(f))
}

/// How the fake tool behaves.
#[derive(Clone)]
pub struct Script {
    /// Number of `RUNNING` answers before the execution finishes; `None` runs forever.
    pub running_polls: Option<usize>,
    pub refuse_connect: bool,
    /// Connections beyond this many are refused.
    pub max_connects: Option<usize>,
    pub fail_open: bool,
    pub findings: Vec<CheckFinding>,
    pub idle: bool,
    pub close_ok: bool,
    pub verdict: String,
    pub report_db: PathBuf,
    /// Called on every document request with its zero-based index.
    pub on_document: Option<DocumentHook>,
    /// Called whenever a target is opened.
    pub on_open: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            running_polls: Some(3),
            refuse_connect: false,
            max_connects: None,
            fail_open: false,
            findings: Vec::new(),
            idle: true,
            close_ok: true,
            verdict: "SUCCESS".into(),
            report_db: PathBuf::from("/reports/Smoke_2024/Smoke.trf"),
            on_document: None,
            on_open: None,
        }
    }
}

struct State {
    script: Script,
    calls: Vec<Call>,
    polls: usize,
    documents: usize,
}

#[derive(Clone)]
pub struct FakeTool {
    state: Arc<Mutex<State>>,
}

impl FakeTool {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(State {
                script,
                calls: Vec::new(),
                polls: 0,
                documents: 0,
            })),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn connects(&self) -> usize {
        self.count(|c| *c == Call::Connect)
    }

    pub fn aborts(&self) -> usize {
        self.count(|c| *c == Call::Abort)
    }

    pub fn polls(&self) -> usize {
        self.count(|c| *c == Call::PollState)
    }

    pub fn documents(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::GenerateDocument(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ToolConnector for FakeTool {
    async fn connect(&self) -> Result<Box<dyn ToolClient>, ToolError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Connect);
        let connects = state.calls.iter().filter(|c| **c == Call::Connect).count();
        let over_limit = state.script.max_connects.is_some_and(|max| connects > max);
        if state.script.refuse_connect || over_limit {
            return Err(ToolError::unavailable("tool not running"));
        }
        Ok(Box::new(FakeClient {
            state: self.state.clone(),
        }))
    }

    fn describe(&self) -> String {
        "fake".into()
    }
}

struct FakeClient {
    state: Arc<Mutex<State>>,
}

impl FakeClient {
    fn record(&self, call: Call) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

fn token() -> ExecutionToken {
    ExecutionToken("exec-1".into())
}

#[async_trait]
impl ToolClient for FakeClient {
    async fn open(&mut self, target: &Path, _options: &OpenOptions) -> Result<TargetHandle, ToolError> {
        let state = self.record(Call::Open(target.to_path_buf()));
        if let Some(on_open) = &state.script.on_open {
            on_open();
        }
        if state.script.fail_open {
            return Err(ToolError::remote(-32000, "cannot load target"));
        }
        Ok(TargetHandle {
            path: target.to_path_buf(),
            kind: ecurun_core::model::TargetKind::from_path(target)
                .unwrap_or(ecurun_core::model::TargetKind::Package),
        })
    }

    async fn validate(&mut self, _target: &TargetHandle) -> Result<Vec<CheckFinding>, ToolError> {
        let state = self.record(Call::Validate);
        Ok(state.script.findings.clone())
    }

    async fn execute(
        &mut self,
        _target: &TargetHandle,
        mode: JobExecutionMode,
    ) -> Result<ExecutionToken, ToolError> {
        self.record(Call::Execute(mode));
        Ok(token())
    }

    async fn current_execution(&mut self) -> Result<ExecutionToken, ToolError> {
        self.record(Call::CurrentExecution);
        Ok(token())
    }

    async fn poll_state(&mut self, _execution: &ExecutionToken) -> Result<ExecutionState, ToolError> {
        let mut state = self.record(Call::PollState);
        state.polls += 1;
        let running = match state.script.running_polls {
            Some(n) => state.polls <= n,
            None => true,
        };
        Ok(if running {
            ExecutionState::Running
        } else {
            ExecutionState::Finished
        })
    }

    async fn abort(&mut self, _execution: &ExecutionToken) -> Result<(), ToolError> {
        self.record(Call::Abort);
        Ok(())
    }

    async fn result(&mut self, _execution: &ExecutionToken) -> Result<ExecutionReport, ToolError> {
        let state = self.record(Call::Result);
        Ok(ExecutionReport {
            verdict: state.script.verdict.clone(),
            report_db: state.script.report_db.clone(),
        })
    }

    async fn wait_idle(&mut self, timeout_secs: u64) -> Result<bool, ToolError> {
        let state = self.record(Call::WaitIdle(timeout_secs));
        Ok(state.script.idle)
    }

    async fn close(&mut self, _target: &TargetHandle) -> Result<bool, ToolError> {
        let state = self.record(Call::Close);
        Ok(state.script.close_ok)
    }

    async fn generate_document(&mut self, request: &DocumentRequest) -> Result<(), ToolError> {
        let mut state = self.record(Call::GenerateDocument(request.report_file.clone()));
        let index = state.documents;
        state.documents += 1;
        let hook = state.script.on_document.clone();
        drop(state);
        match hook {
            Some(hook) => hook(index, request),
            None => Ok(()),
        }
    }
}

/// Writes a report database with the given project (and package) name.
pub fn write_trf(path: &Path, project: &str, package: Option<&str>) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch("CREATE TABLE prj (name TEXT); CREATE TABLE pkg (name TEXT);")
        .unwrap();
    conn.execute("INSERT INTO prj (name) VALUES (?1)", [project])
        .unwrap();
    if let Some(package) = package {
        conn.execute("INSERT INTO pkg (name) VALUES (?1)", [package])
            .unwrap();
    }
}

/// Package report database as written for single-package executions.
pub fn write_package_trf(path: &Path, package: &str) {
    write_trf(path, "$$$_PACKAGE_$$$", Some(package));
}
