//! Threshold-based build verdicts from pass/fail/skip counts.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Three-way build status. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Ok,
    Unstable,
    Failed,
}

impl Verdict {
    /// Combines two verdicts; a status can only get worse.
    pub fn degrade(self, other: Verdict) -> Verdict {
        self.max(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Unstable => "UNSTABLE",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts for one test-result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSummary {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
}

// Sums saturate at `u64::MAX`.
impl CountSummary {
    pub fn new(passed: u64, failed: u64, skipped: u64) -> Self {
        Self {
            total: passed.saturating_add(failed).saturating_add(skipped),
            passed,
            failed,
            skipped,
        }
    }

    pub fn merge(&mut self, other: &CountSummary) {
        self.total = self.total.saturating_add(other.total);
        self.passed = self.passed.saturating_add(other.passed);
        self.failed = self.failed.saturating_add(other.failed);
        self.skipped = self.skipped.saturating_add(other.skipped);
    }
}

/// Unstable/failed percentages, each clamped to `[0, 100]`.
///
/// `failed` is expected to be at least `unstable`, but that is a configuration
/// concern and is deliberately not checked here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ThresholdConfig {
    unstable: f64,
    failed: f64,
}

impl ThresholdConfig {
    pub fn new(unstable: f64, failed: f64) -> Self {
        Self {
            unstable: clamp_percentage(unstable),
            failed: clamp_percentage(failed),
        }
    }

    pub fn unstable(&self) -> f64 {
        self.unstable
    }

    pub fn failed(&self) -> f64 {
        self.failed
    }
}

impl<'de> Deserialize<'de> for ThresholdConfig {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            unstable: f64,
            #[serde(default)]
            failed: f64,
        }
        let raw = Raw::deserialize(d)?;
        Ok(Self::new(raw.unstable, raw.failed))
    }
}

fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        0.0
    } else if value > 100.0 {
        100.0
    } else {
        value
    }
}

/// Percentage of failed results, rounded half-up to one decimal. `0` when `total == 0`.
pub fn failed_percentage(failed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_half_up_one_decimal((failed as f64 / total as f64 * 100.0).min(100.0))
}

// Rounds on the shortest decimal representation so 0.15 stays 0.2 instead of
// drifting through its binary approximation.
fn round_half_up_one_decimal(value: f64) -> f64 {
    let repr = format!("{value}");
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    let mut frac = frac_part.bytes().map(|b| u64::from(b - b'0'));
    let tenths = frac.next().unwrap_or(0);
    let round_up = frac.next().is_some_and(|d| d >= 5);
    let whole: u64 = int_part.parse().unwrap_or(0);
    let scaled = whole * 10 + tenths + u64::from(round_up);
    scaled as f64 / 10.0
}

/// Decides the verdict for one result set.
///
/// An empty set with missing results disallowed fails before any percentage is computed.
pub fn decide(counts: &CountSummary, thresholds: &ThresholdConfig, allow_missing: bool) -> Verdict {
    if counts.total == 0 && !allow_missing {
        tracing::error!("Empty test results are not allowed, setting build status to FAILURE!");
        return Verdict::Failed;
    }

    let percentage = failed_percentage(counts.failed, counts.total);
    if percentage > thresholds.failed() {
        tracing::info!(
            "-> {:.1}% of failed test results exceed failed threshold of {:.1}%, setting build status to FAILURE!",
            percentage,
            thresholds.failed()
        );
        Verdict::Failed
    } else if percentage > thresholds.unstable() {
        tracing::info!(
            "-> {:.1}% of failed test results exceed unstable threshold of {:.1}%, setting build status to UNSTABLE!",
            percentage,
            thresholds.unstable()
        );
        Verdict::Unstable
    } else {
        Verdict::Ok
    }
}
