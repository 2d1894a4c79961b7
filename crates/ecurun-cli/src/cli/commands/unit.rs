use super::common::{load, thresholds};
use crate::cli::args::UnitArgs;
use crate::exit_codes;
use anyhow::Context;
use ecurun_core::report::unit::UnitPublisher;
use ecurun_core::tool::bridge::BridgeConnector;
use std::sync::Arc;

pub async fn run(args: UnitArgs) -> anyhow::Result<i32> {
    let cfg = load(&args.config)?;
    let thresholds = thresholds(cfg.publish.thresholds, &args.thresholds);
    let connector = Arc::new(BridgeConnector::new(cfg.tool.clone()));

    let report = UnitPublisher::new(connector, thresholds)
        .with_allow_missing(args.allow_missing || cfg.publish.allow_missing)
        .publish(&args.dirs)
        .await
        .context("UNIT publishing failed")?;

    println!("{}", report.verdict);
    Ok(exit_codes::from_verdict(report.verdict))
}
