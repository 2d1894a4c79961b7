use super::common::thresholds;
use crate::cli::args::VerdictArgs;
use crate::exit_codes;
use ecurun_core::{decide, failed_percentage, CountSummary, ThresholdConfig, Verdict};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Decision {
    verdict: Verdict,
    failed_percentage: f64,
    counts: CountSummary,
    thresholds: ThresholdConfig,
}

pub fn run(args: VerdictArgs) -> anyhow::Result<i32> {
    let counts = CountSummary::new(args.passed, args.failed, args.skipped);
    let thresholds = thresholds(ThresholdConfig::default(), &args.thresholds);
    let verdict = decide(&counts, &thresholds, args.allow_missing);

    if args.json {
        let decision = Decision {
            verdict,
            failed_percentage: failed_percentage(counts.failed, counts.total),
            counts,
            thresholds,
        };
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        println!("{verdict}");
    }
    Ok(exit_codes::from_verdict(verdict))
}
