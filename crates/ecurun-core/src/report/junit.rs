//! Pass/fail/skip counts from JUnit XML reports.
//!
//! Only `<testcase>` elements are inspected: a case with a `<failure>` or
//! `<error>` child failed, one with `<skipped>` was skipped, anything else
//! passed. Suite-level attributes are ignored.

use crate::errors::DiscoveryError;
use crate::verdict::CountSummary;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn testcase_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<testcase\b[^>]*?(?:/>|>(.*?)</testcase\s*>)").unwrap())
}

fn outcome_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(failure|error|skipped)\b").unwrap())
}

pub fn count_results(xml: &str) -> CountSummary {
    let (mut passed, mut failed, mut skipped) = (0, 0, 0);
    for case in testcase_pattern().captures_iter(xml) {
        let body = case.get(1).map_or("", |m| m.as_str());
        let outcomes: Vec<&str> = outcome_pattern()
            .captures_iter(body)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        if outcomes.iter().any(|o| *o == "failure" || *o == "error") {
            failed += 1;
        } else if outcomes.contains(&"skipped") {
            skipped += 1;
        } else {
            passed += 1;
        }
    }
    CountSummary::new(passed, failed, skipped)
}

pub fn read_counts(path: &Path) -> Result<CountSummary, DiscoveryError> {
    let xml = std::fs::read_to_string(path).map_err(|e| DiscoveryError::io(path, e))?;
    Ok(count_results(&xml))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuites>
  <testsuite name="Lights" tests="5" failures="1" errors="1" skipped="1">
    <testcase name="front" classname="Lights"/>
    <testcase name="rear" classname="Lights">
      <system-out>ok</system-out>
    </testcase>
    <testcase name="brake" classname="Lights">
      <failure message="expected 1, got 0">trace</failure>
    </testcase>
    <testcase name="fog" classname="Lights"><error message="timeout"/></testcase>
    <testcase name="hazard" classname="Lights">
      <skipped/>
    </testcase>
  </testsuite>
</testsuites>
"#;

    #[test]
    fn counts_testcases_by_outcome() {
        let c = count_results(REPORT);
        assert_eq!(c, CountSummary::new(2, 2, 1));
        assert_eq!(c.total, 5);
    }

    #[test]
    fn empty_suite_has_no_results() {
        let c = count_results(r#"<testsuite name="x" tests="0"></testsuite>"#);
        assert_eq!(c.total, 0);
    }

    #[test]
    fn testcases_element_is_not_a_testcase() {
        let c = count_results("<testcases><testcase name=\"a\"/></testcases>");
        assert_eq!(c.total, 1);
    }
}
