use super::common::load;
use crate::cli::args::ArchiveArgs;
use crate::exit_codes;
use anyhow::Context;
use ecurun_core::report::archive::{archive_reports, ArchiveOptions};
use ecurun_core::ArchiveError;

pub fn run(args: ArchiveArgs) -> anyhow::Result<i32> {
    let cfg = load(&args.config)?;
    let target = args
        .target
        .or(cfg.publish.archive_dir)
        .context("no archive target: pass --target or set publish.archive_dir")?;

    let mut options = ArchiveOptions::new(target);
    options.keep_all = args.keep_all || cfg.publish.keep_all;
    options.allow_missing = args.allow_missing || cfg.publish.allow_missing;

    match archive_reports(&args.dirs, &options) {
        Ok(summary) => {
            if let Some(index) = &summary.index {
                println!("{}", index.display());
            }
            Ok(exit_codes::SUCCESS)
        }
        Err(ArchiveError::MissingReport { .. } | ArchiveError::EmptyResults) => {
            Ok(exit_codes::FAILED)
        }
        Err(e) => Err(e.into()),
    }
}
