//! Process exit codes. Part of the public contract for CI pipelines.

use ecurun_core::Verdict;

pub const SUCCESS: i32 = 0;
pub const FAILED: i32 = 1; // Failed verdict, rejected upload or blocking validation errors
pub const CONFIG_ERROR: i32 = 2; // Bad config, unreachable tool or I/O failure
pub const UNSTABLE: i32 = 3;

pub fn from_verdict(verdict: Verdict) -> i32 {
    match verdict {
        Verdict::Ok => SUCCESS,
        Verdict::Unstable => UNSTABLE,
        Verdict::Failed => FAILED,
    }
}

/// Maps the tool's own verdict string onto an exit code.
///
/// Unknown verdicts count as failures.
pub fn from_tool_verdict(verdict: &str) -> i32 {
    match verdict.trim().to_ascii_uppercase().as_str() {
        "SUCCESS" | "NONE" => SUCCESS,
        "INCONCLUSIVE" => UNSTABLE,
        _ => FAILED,
    }
}

/// The worse of two result codes; `CONFIG_ERROR` outranks everything.
pub fn worst(a: i32, b: i32) -> i32 {
    fn rank(code: i32) -> u8 {
        match code {
            SUCCESS => 0,
            UNSTABLE => 1,
            FAILED => 2,
            _ => 3,
        }
    }
    if rank(b) > rank(a) {
        b
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_codes() {
        assert_eq!(from_verdict(Verdict::Ok), 0);
        assert_eq!(from_verdict(Verdict::Unstable), 3);
        assert_eq!(from_verdict(Verdict::Failed), 1);
    }

    #[test]
    fn tool_verdict_codes() {
        assert_eq!(from_tool_verdict("SUCCESS"), SUCCESS);
        assert_eq!(from_tool_verdict("none"), SUCCESS);
        assert_eq!(from_tool_verdict("INCONCLUSIVE"), UNSTABLE);
        assert_eq!(from_tool_verdict("ERROR"), FAILED);
        assert_eq!(from_tool_verdict("FAILED"), FAILED);
        assert_eq!(from_tool_verdict(""), FAILED);
    }

    #[test]
    fn worst_code_wins() {
        assert_eq!(worst(SUCCESS, UNSTABLE), UNSTABLE);
        assert_eq!(worst(FAILED, UNSTABLE), FAILED);
        assert_eq!(worst(UNSTABLE, CONFIG_ERROR), CONFIG_ERROR);
        assert_eq!(worst(SUCCESS, SUCCESS), SUCCESS);
    }
}
