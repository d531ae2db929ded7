mod aggregate;
mod paths;
mod score;

pub use aggregate::{Aggregator, RawResults};
pub use paths::{Path, ScannedPaths};
pub use score::ScoreCalculator;

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    TruePositive,
    TrueNegative,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestKind::TruePositive => "true-positive",
            TestKind::TrueNegative => "true-negative",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDetails {
    pub payload: String,
    pub test_case: String,
    pub test_set: String,
    pub encoder: String,
    pub placeholder: String,
    pub response_status_code: u16,
    pub additional_info: Vec<String>,
    pub kind: TestKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedDetails {
    pub payload: String,
    pub test_case: String,
    pub test_set: String,
    pub encoder: String,
    pub placeholder: String,
    pub reasons: Vec<String>,
    pub kind: TestKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryTableRow {
    pub test_set: String,
    pub test_case: String,
    pub percentage: f64,
    pub sent: usize,
    pub blocked: usize,
    pub bypassed: usize,
    pub unresolved: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RequestStats {
    pub all_requests_number: usize,
    pub blocked_requests_number: usize,
    pub bypassed_requests_number: usize,
    pub unresolved_requests_number: usize,
    pub failed_requests_number: usize,
    pub resolved_requests_number: usize,
}

impl RequestStats {
    pub fn is_empty(&self) -> bool {
        self.all_requests_number == 0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestsSummary {
    pub summary_table: Vec<SummaryTableRow>,
    pub blocked: Vec<TestDetails>,
    pub bypasses: Vec<TestDetails>,
    pub unresolved: Vec<TestDetails>,
    pub failed: Vec<FailedDetails>,

    pub req_stats: RequestStats,
    pub api_sec_req_stats: RequestStats,
    pub app_sec_req_stats: RequestStats,

    pub unresolved_requests_percentage: f64,
    pub resolved_blocked_requests_percentage: f64,
    pub resolved_bypassed_requests_percentage: f64,
    pub failed_requests_percentage: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Score {
    pub true_positive: f64,
    pub true_negative: f64,
    pub average: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub api_sec: Score,
    pub app_sec: Score,
    pub average: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub is_grpc_available: bool,
    pub is_graphql_available: bool,

    pub paths: ScannedPaths,

    pub test_cases_fingerprint: String,

    pub true_positive_tests: TestsSummary,
    pub true_negative_tests: TestsSummary,

    pub score: ScoreSummary,
}

impl Statistics {
    // Strips raw payload strings from the detail lists, for reports
    // that must not embed attack traffic verbatim.
    pub fn redact_payloads(&mut self) {
        for summary in [&mut self.true_positive_tests, &mut self.true_negative_tests] {
            for details in summary
                .blocked
                .iter_mut()
                .chain(summary.bypasses.iter_mut())
                .chain(summary.unresolved.iter_mut())
            {
                details.payload.clear();
            }
            for details in &mut summary.failed {
                details.payload.clear();
            }
        }
    }
}

// Percentage of part in total, truncated to two decimal places. A zero
// total yields 0 rather than NaN.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let value = part as f64 * 100.0 / total as f64;
    (value * 100.0).trunc() / 100.0
}

// Test sets targeting structured API protocols count toward the ApiSec
// category; everything else is AppSec.
pub fn is_api_test(test_set: &str, placeholder: &str) -> bool {
    matches!(placeholder, "grpc" | "graphql") || test_set.contains("api")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_zero_total() {
        assert_eq!(percentage(5, 0), 0.0);
    }

    #[test]
    fn test_percentage_truncates() {
        // 1/3 = 33.333... -> 33.33
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.66);
    }

    #[test]
    fn test_percentage_bounds() {
        assert_eq!(percentage(0, 10), 0.0);
        assert_eq!(percentage(10, 10), 100.0);
    }

    #[test]
    fn test_api_test_detection() {
        assert!(is_api_test("owasp-api", "url-param"));
        assert!(is_api_test("community", "grpc"));
        assert!(is_api_test("community", "graphql"));
        assert!(!is_api_test("owasp", "url-param"));
        assert!(!is_api_test("false-pos", "request-body"));
    }
}
