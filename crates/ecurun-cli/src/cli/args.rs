use clap::{Args, Parser, Subcommand, ValueEnum};
use ecurun_core::model::JobExecutionMode;
use std::path::PathBuf;

pub const DEFAULT_CONFIG: &str = "ecurun.yaml";

#[derive(Parser)]
#[command(
    name = "ecurun",
    version,
    about = "Run ECU-TEST packages and projects, then archive, upload and rate their reports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Execute a package (.pkg) or project (.prj) under supervision
    Run(RunArgs),
    /// Copy report files into a local archive with a reports.json index
    Archive(ArchiveArgs),
    /// Upload report files to the reporting service
    Upload(UploadArgs),
    /// Generate JUnit results from reports and rate them against thresholds
    Unit(UnitArgs),
    /// Rate explicit pass/fail/skip counts against thresholds
    Verdict(VerdictArgs),
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Config file; a missing default file means built-in defaults
    #[arg(long, short = 'c', env = "ECURUN_CONFIG", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Test file to execute
    pub target: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Execution timeout in seconds; 0 waits indefinitely
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Skip the static check before executing
    #[arg(long)]
    pub no_check: bool,

    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Restrict the project's packages with a filter expression
    #[arg(long)]
    pub filter: Option<String>,

    /// Run packages relative to their own directory
    #[arg(long)]
    pub exec_in_pkg_dir: bool,

    /// Archive the report directory after the run
    #[arg(long)]
    pub archive: Option<PathBuf>,

    /// Upload the reports after the run (needs an `upload` config section)
    #[arg(long)]
    pub upload: bool,

    /// Write the outcome as JSON to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    None,
    Sequential,
    Parallel,
}

impl From<ModeArg> for JobExecutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::None => JobExecutionMode::NoExecution,
            ModeArg::Sequential => JobExecutionMode::Sequential,
            ModeArg::Parallel => JobExecutionMode::Parallel,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ArchiveArgs {
    /// Report directories to archive
    #[arg(required = true)]
    pub dirs: Vec<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Archive target; defaults to `publish.archive_dir`
    #[arg(long, short = 't')]
    pub target: Option<PathBuf>,

    #[arg(long)]
    pub keep_all: bool,

    #[arg(long)]
    pub allow_missing: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct UploadArgs {
    /// Report directories to upload
    #[arg(required = true)]
    pub dirs: Vec<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Overrides `upload.base_url`
    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long)]
    pub project_id: Option<String>,

    #[arg(long)]
    pub allow_missing: bool,

    /// Start of the report date window (epoch ms); defaults to now
    #[arg(long)]
    pub started_at: Option<i64>,

    /// Write the linked report tree as JSON to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct UnitArgs {
    /// Report directories to convert
    #[arg(required = true)]
    pub dirs: Vec<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    #[arg(long)]
    pub allow_missing: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct VerdictArgs {
    #[arg(long, default_value_t = 0)]
    pub passed: u64,

    #[arg(long, default_value_t = 0)]
    pub failed: u64,

    #[arg(long, default_value_t = 0)]
    pub skipped: u64,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// An empty result set is OK instead of FAILED
    #[arg(long)]
    pub allow_missing: bool,

    /// Print the decision as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ThresholdArgs {
    /// Failed percentage above which the result is UNSTABLE
    #[arg(long)]
    pub unstable_threshold: Option<f64>,

    /// Failed percentage above which the result is FAILED
    #[arg(long)]
    pub failed_threshold: Option<f64>,
}
