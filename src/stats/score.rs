use super::{RequestStats, Score, ScoreSummary, TestsSummary, percentage};

pub struct ScoreCalculator;

impl ScoreCalculator {
    // Reduces the two summary groups into ApiSec/AppSec category scores
    // and the overall average. A category without any applicable test
    // cases is excluded from the average instead of dragging it to zero.
    pub fn calculate(
        true_positive: &TestsSummary,
        true_negative: &TestsSummary,
    ) -> ScoreSummary {
        let api_sec = category_score(
            &true_positive.api_sec_req_stats,
            &true_negative.api_sec_req_stats,
        );
        let app_sec = category_score(
            &true_positive.app_sec_req_stats,
            &true_negative.app_sec_req_stats,
        );

        let api_has_data = !true_positive.api_sec_req_stats.is_empty()
            || !true_negative.api_sec_req_stats.is_empty();
        let app_has_data = !true_positive.app_sec_req_stats.is_empty()
            || !true_negative.app_sec_req_stats.is_empty();

        let average = mean(
            [
                api_has_data.then_some(api_sec.average),
                app_has_data.then_some(app_sec.average),
            ]
            .into_iter()
            .flatten(),
        );

        ScoreSummary {
            api_sec,
            app_sec,
            average,
        }
    }
}

fn category_score(true_positive: &RequestStats, true_negative: &RequestStats) -> Score {
    // Success for attack traffic is a block, for benign traffic a pass.
    let tp_rate = percentage(
        true_positive.blocked_requests_number,
        true_positive.resolved_requests_number,
    );
    let tn_rate = percentage(
        true_negative.bypassed_requests_number,
        true_negative.resolved_requests_number,
    );

    let average = mean(
        [
            (!true_positive.is_empty()).then_some(tp_rate),
            (!true_negative.is_empty()).then_some(tn_rate),
        ]
        .into_iter()
        .flatten(),
    );

    Score {
        true_positive: tp_rate,
        true_negative: tn_rate,
        average,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    let value = (sum / count as f64).clamp(0.0, 100.0);
    (value * 100.0).trunc() / 100.0
}
