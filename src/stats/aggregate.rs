use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    FailedDetails, RequestStats, SummaryTableRow, TestDetails, TestKind, TestsSummary, is_api_test,
    percentage,
};

// Flat outcome lists as collected by the sweep, before any grouping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawResults {
    pub blocked: Vec<TestDetails>,
    pub bypassed: Vec<TestDetails>,
    pub unresolved: Vec<TestDetails>,
    pub failed: Vec<FailedDetails>,
}

pub struct Aggregator {
    ignore_unresolved: bool,
    non_blocked_as_passed: bool,
}

#[derive(Default)]
struct RowCounts {
    blocked: usize,
    bypassed: usize,
    unresolved: usize,
    failed: usize,
}

impl Aggregator {
    pub fn new(ignore_unresolved: bool, non_blocked_as_passed: bool) -> Self {
        Self {
            ignore_unresolved,
            non_blocked_as_passed,
        }
    }

    pub fn summarize(&self, results: &RawResults, kind: TestKind) -> TestsSummary {
        let blocked: Vec<TestDetails> = filter_kind(&results.blocked, kind);
        let mut bypassed: Vec<TestDetails> = filter_kind(&results.bypassed, kind);
        let mut unresolved: Vec<TestDetails> = filter_kind(&results.unresolved, kind);
        let failed: Vec<FailedDetails> = results
            .failed
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect();

        // Strict evaluation mode: anything not explicitly blocked counts
        // as having passed through the firewall.
        if self.non_blocked_as_passed {
            bypassed.append(&mut unresolved);
        }

        let mut rows: BTreeMap<(String, String), RowCounts> = BTreeMap::new();
        for details in &blocked {
            row_entry(&mut rows, &details.test_set, &details.test_case).blocked += 1;
        }
        for details in &bypassed {
            row_entry(&mut rows, &details.test_set, &details.test_case).bypassed += 1;
        }
        for details in &unresolved {
            row_entry(&mut rows, &details.test_set, &details.test_case).unresolved += 1;
        }
        for details in &failed {
            row_entry(&mut rows, &details.test_set, &details.test_case).failed += 1;
        }

        let summary_table: Vec<SummaryTableRow> = rows
            .into_iter()
            .map(|((test_set, test_case), counts)| {
                let sent = counts.blocked + counts.bypassed + counts.unresolved + counts.failed;
                let succeeded = match kind {
                    TestKind::TruePositive => counts.blocked,
                    TestKind::TrueNegative => counts.bypassed,
                };
                let denominator = if self.ignore_unresolved {
                    sent - counts.unresolved
                } else {
                    sent
                };

                SummaryTableRow {
                    test_set,
                    test_case,
                    percentage: percentage(succeeded, denominator),
                    sent,
                    blocked: counts.blocked,
                    bypassed: counts.bypassed,
                    unresolved: counts.unresolved,
                    failed: counts.failed,
                }
            })
            .collect();

        let req_stats = request_stats(&blocked, &bypassed, &unresolved, &failed, None);
        let api_sec_req_stats =
            request_stats(&blocked, &bypassed, &unresolved, &failed, Some(true));
        let app_sec_req_stats =
            request_stats(&blocked, &bypassed, &unresolved, &failed, Some(false));

        TestsSummary {
            unresolved_requests_percentage: percentage(
                req_stats.unresolved_requests_number,
                req_stats.all_requests_number,
            ),
            resolved_blocked_requests_percentage: percentage(
                req_stats.blocked_requests_number,
                req_stats.resolved_requests_number,
            ),
            resolved_bypassed_requests_percentage: percentage(
                req_stats.bypassed_requests_number,
                req_stats.resolved_requests_number,
            ),
            failed_requests_percentage: percentage(
                req_stats.failed_requests_number,
                req_stats.all_requests_number,
            ),
            summary_table,
            blocked,
            bypasses: bypassed,
            unresolved,
            failed,
            req_stats,
            api_sec_req_stats,
            app_sec_req_stats,
        }
    }
}

fn filter_kind(details: &[TestDetails], kind: TestKind) -> Vec<TestDetails> {
    details.iter().filter(|d| d.kind == kind).cloned().collect()
}

fn row_entry<'a>(
    rows: &'a mut BTreeMap<(String, String), RowCounts>,
    test_set: &str,
    test_case: &str,
) -> &'a mut RowCounts {
    rows.entry((test_set.to_string(), test_case.to_string()))
        .or_default()
}

// Counters over the given outcome lists, optionally restricted to the
// API-protocol or application subset.
fn request_stats(
    blocked: &[TestDetails],
    bypassed: &[TestDetails],
    unresolved: &[TestDetails],
    failed: &[FailedDetails],
    api_subset: Option<bool>,
) -> RequestStats {
    let keep = |test_set: &str, placeholder: &str| match api_subset {
        None => true,
        Some(want_api) => is_api_test(test_set, placeholder) == want_api,
    };

    let count = |details: &[TestDetails]| {
        details
            .iter()
            .filter(|d| keep(&d.test_set, &d.placeholder))
            .count()
    };

    let blocked_number = count(blocked);
    let bypassed_number = count(bypassed);
    let unresolved_number = count(unresolved);
    let failed_number = failed
        .iter()
        .filter(|d| keep(&d.test_set, &d.placeholder))
        .count();

    let all = blocked_number + bypassed_number + unresolved_number + failed_number;

    RequestStats {
        all_requests_number: all,
        blocked_requests_number: blocked_number,
        bypassed_requests_number: bypassed_number,
        unresolved_requests_number: unresolved_number,
        failed_requests_number: failed_number,
        resolved_requests_number: all - unresolved_number - failed_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(test_set: &str, test_case: &str, kind: TestKind) -> TestDetails {
        TestDetails {
            payload: "<script>alert(1)</script>".to_string(),
            test_case: test_case.to_string(),
            test_set: test_set.to_string(),
            encoder: "plain".to_string(),
            placeholder: "url-param".to_string(),
            response_status_code: 403,
            additional_info: Vec::new(),
            kind,
        }
    }

    fn failed(test_set: &str, test_case: &str, kind: TestKind) -> FailedDetails {
        FailedDetails {
            payload: "<script>alert(1)</script>".to_string(),
            test_case: test_case.to_string(),
            test_set: test_set.to_string(),
            encoder: "plain".to_string(),
            placeholder: "url-param".to_string(),
            reasons: vec!["connection timed out".to_string()],
            kind,
        }
    }

    fn repeat<T: Clone>(item: T, n: usize) -> Vec<T> {
        std::iter::repeat_with(|| item.clone()).take(n).collect()
    }

    #[test]
    fn test_row_count_invariant() {
        let results = RawResults {
            blocked: repeat(details("owasp", "xss", TestKind::TruePositive), 4),
            bypassed: repeat(details("owasp", "xss", TestKind::TruePositive), 3),
            unresolved: repeat(details("owasp", "xss", TestKind::TruePositive), 2),
            failed: repeat(failed("owasp", "xss", TestKind::TruePositive), 1),
        };

        let summary = Aggregator::new(false, false).summarize(&results, TestKind::TruePositive);

        assert_eq!(summary.summary_table.len(), 1);
        let row = &summary.summary_table[0];
        assert_eq!(row.sent, 10);
        assert_eq!(
            row.sent,
            row.blocked + row.bypassed + row.unresolved + row.failed
        );
        assert_eq!(row.percentage, 40.0);
    }

    #[test]
    fn test_rows_sum_matches_group_stats() {
        let results = RawResults {
            blocked: vec![
                details("owasp", "xss", TestKind::TruePositive),
                details("owasp", "sqli", TestKind::TruePositive),
            ],
            bypassed: vec![details("community", "rce", TestKind::TruePositive)],
            unresolved: vec![details("owasp", "xss", TestKind::TruePositive)],
            failed: vec![failed("owasp", "sqli", TestKind::TruePositive)],
        };

        let summary = Aggregator::new(false, false).summarize(&results, TestKind::TruePositive);

        let sent_total: usize = summary.summary_table.iter().map(|row| row.sent).sum();
        assert_eq!(sent_total, summary.req_stats.all_requests_number);
        assert_eq!(
            summary.req_stats.resolved_requests_number,
            summary.req_stats.all_requests_number
                - summary.req_stats.unresolved_requests_number
                - summary.req_stats.failed_requests_number
        );
    }

    #[test]
    fn test_non_blocked_as_passed_reclassifies_unresolved() {
        let results = RawResults {
            blocked: repeat(details("owasp", "xss", TestKind::TruePositive), 6),
            bypassed: Vec::new(),
            unresolved: repeat(details("owasp", "xss", TestKind::TruePositive), 4),
            failed: Vec::new(),
        };

        let summary = Aggregator::new(false, true).summarize(&results, TestKind::TruePositive);

        let row = &summary.summary_table[0];
        assert_eq!(row.sent, 10);
        assert_eq!(row.blocked, 6);
        assert_eq!(row.bypassed, 4);
        assert_eq!(row.unresolved, 0);
        assert!(summary.unresolved.is_empty());
        assert_eq!(summary.bypasses.len(), 4);
    }

    #[test]
    fn test_ignore_unresolved_shrinks_row_denominator() {
        let results = RawResults {
            blocked: repeat(details("owasp", "xss", TestKind::TruePositive), 5),
            bypassed: repeat(details("owasp", "xss", TestKind::TruePositive), 3),
            unresolved: repeat(details("owasp", "xss", TestKind::TruePositive), 2),
            failed: Vec::new(),
        };

        let relaxed = Aggregator::new(true, false).summarize(&results, TestKind::TruePositive);
        let strict = Aggregator::new(false, false).summarize(&results, TestKind::TruePositive);

        // 5 of 8 resolved vs 5 of 10 sent
        assert_eq!(relaxed.summary_table[0].percentage, 62.5);
        assert_eq!(strict.summary_table[0].percentage, 50.0);
        // Absolute counts are reported either way.
        assert_eq!(relaxed.summary_table[0].unresolved, 2);
    }

    #[test]
    fn test_true_negative_success_is_bypass() {
        let results = RawResults {
            blocked: repeat(details("false-pos", "texts", TestKind::TrueNegative), 1),
            bypassed: repeat(details("false-pos", "texts", TestKind::TrueNegative), 9),
            unresolved: Vec::new(),
            failed: Vec::new(),
        };

        let summary = Aggregator::new(false, false).summarize(&results, TestKind::TrueNegative);

        assert_eq!(summary.summary_table[0].percentage, 90.0);
        assert_eq!(summary.resolved_bypassed_requests_percentage, 90.0);
    }

    #[test]
    fn test_group_percentages_in_bounds() {
        let results = RawResults {
            blocked: repeat(details("owasp", "xss", TestKind::TruePositive), 3),
            bypassed: repeat(details("owasp", "xss", TestKind::TruePositive), 2),
            unresolved: repeat(details("owasp", "xss", TestKind::TruePositive), 4),
            failed: repeat(failed("owasp", "xss", TestKind::TruePositive), 1),
        };

        let summary = Aggregator::new(false, false).summarize(&results, TestKind::TruePositive);

        for value in [
            summary.unresolved_requests_percentage,
            summary.resolved_blocked_requests_percentage,
            summary.resolved_bypassed_requests_percentage,
            summary.failed_requests_percentage,
        ] {
            assert!((0.0..=100.0).contains(&value));
        }
        assert_eq!(summary.unresolved_requests_percentage, 40.0);
        assert_eq!(summary.resolved_blocked_requests_percentage, 60.0);
        assert_eq!(summary.failed_requests_percentage, 10.0);
    }

    #[test]
    fn test_kinds_are_partitioned() {
        let results = RawResults {
            blocked: vec![
                details("owasp", "xss", TestKind::TruePositive),
                details("false-pos", "texts", TestKind::TrueNegative),
            ],
            bypassed: Vec::new(),
            unresolved: Vec::new(),
            failed: Vec::new(),
        };

        let aggregator = Aggregator::new(false, false);
        let tp = aggregator.summarize(&results, TestKind::TruePositive);
        let tn = aggregator.summarize(&results, TestKind::TrueNegative);

        assert_eq!(tp.req_stats.all_requests_number, 1);
        assert_eq!(tn.req_stats.all_requests_number, 1);
        assert_eq!(tp.summary_table[0].test_set, "owasp");
        assert_eq!(tn.summary_table[0].test_set, "false-pos");
    }

    #[test]
    fn test_api_and_app_subsets_split_counters() {
        let mut api = details("owasp-api", "grpc-injection", TestKind::TruePositive);
        api.placeholder = "grpc".to_string();
        let app = details("owasp", "xss", TestKind::TruePositive);

        let results = RawResults {
            blocked: vec![api, app],
            bypassed: Vec::new(),
            unresolved: Vec::new(),
            failed: Vec::new(),
        };

        let summary = Aggregator::new(false, false).summarize(&results, TestKind::TruePositive);

        assert_eq!(summary.api_sec_req_stats.all_requests_number, 1);
        assert_eq!(summary.app_sec_req_stats.all_requests_number, 1);
        assert_eq!(summary.req_stats.all_requests_number, 2);
    }
}
