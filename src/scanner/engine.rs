use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use tracing::{debug, info};

use crate::analyzer::{Resolution, ResponseClassifier};
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::db::Database;
use crate::http::{HttpClient, RequestOutcome};
use crate::stats::{FailedDetails, TestDetails, TestKind};

use super::{Encoder, Placeholder};

#[derive(Debug, Clone)]
struct Job {
    payload: String,
    encoder: Encoder,
    placeholder: Placeholder,
    test_set: String,
    test_case: String,
    kind: TestKind,
}

// Executes the main sweep: every payload of every test case, through
// every encoder and placeholder combination, against the target.
#[derive(Clone)]
pub struct PayloadScanner {
    client: Arc<HttpClient>,
    classifier: Arc<ResponseClassifier>,
    db: Arc<Database>,
    config: Arc<Config>,
    jobs: Arc<Vec<Job>>,
}

impl PayloadScanner {
    pub fn new(config: Arc<Config>, db: Arc<Database>) -> Result<Self> {
        let client = HttpClient::new(&config)?;
        let classifier = ResponseClassifier::from_config(&config)?;
        let jobs = build_jobs(&db)?;

        Ok(Self {
            client: Arc::new(client),
            classifier: Arc::new(classifier),
            db,
            config,
            jobs: Arc::new(jobs),
        })
    }

    pub async fn run(&self, cancel: &CancelToken) -> Result<()> {
        let mut jobs: Vec<Job> = self.jobs.as_ref().clone();

        // Protocol test sets are only attempted when the availability
        // probe succeeded.
        if !self.db.is_graphql_available() {
            let before = jobs.len();
            jobs.retain(|job| job.placeholder != Placeholder::Graphql);
            let dropped = before - jobs.len();
            if dropped > 0 {
                info!(skipped = dropped, "GraphQL endpoint unavailable, skipping its test cases");
            }
        }

        let pb = self.create_progress_bar(jobs.len());
        let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));

        let handles: Vec<_> = (0..self.config.workers)
            .map(|_| {
                let scanner = self.clone();
                let queue = queue.clone();
                let cancel = cancel.clone();
                let pb = pb.clone();
                tokio::spawn(async move { scanner.worker(queue, cancel, pb).await })
            })
            .collect();

        join_all(handles).await;

        if cancel.is_cancelled() {
            pb.abandon_with_message("Scan cancelled");
        } else {
            pb.finish_with_message("Scan complete");
        }

        Ok(())
    }

    async fn worker(
        self,
        queue: Arc<Mutex<VecDeque<Job>>>,
        cancel: CancelToken,
        pb: ProgressBar,
    ) {
        loop {
            if cancel.is_cancelled() {
                break;
            }

            let job = queue.lock().expect("job queue lock").pop_front();
            let Some(job) = job else { break };

            self.execute(&job).await;
            pb.inc(1);

            let jitter = if self.config.random_delay > 0 {
                rand::thread_rng().gen_range(0..=self.config.random_delay)
            } else {
                0
            };
            let delay = self.config.send_delay + jitter;
            if delay > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
                    _ = cancel.cancelled() => break,
                }
            }
        }
    }

    async fn execute(&self, job: &Job) {
        let encoded = job.encoder.apply(&job.payload);
        let request = job
            .placeholder
            .build(&self.config.url, &self.config.graphql_url, &encoded);
        self.db.register_path(&request.method, &request.report_path);

        debug!(
            test_set = %job.test_set,
            test_case = %job.test_case,
            placeholder = job.placeholder.name(),
            encoder = job.encoder.name(),
            "sending payload"
        );

        match self.client.execute(&request).await {
            RequestOutcome::Response(response) => {
                match self.classifier.classify(response.status, &response.body) {
                    Resolution::Blocked => self.db.record_blocked(self.details(job, response.status, Vec::new())),
                    Resolution::Bypassed => self.db.record_bypassed(self.details(job, response.status, Vec::new())),
                    Resolution::Unresolved => self.db.record_unresolved(self.details(
                        job,
                        response.status,
                        vec!["response matched neither block nor pass criteria".to_string()],
                    )),
                }
            }
            RequestOutcome::ConnReset => match self.classifier.classify_conn_reset() {
                Some(Resolution::Blocked) => self.db.record_blocked(self.details(
                    job,
                    0,
                    vec!["connection reset by peer".to_string()],
                )),
                _ => self.db.record_failed(self.failure(
                    job,
                    vec!["connection reset by peer".to_string()],
                )),
            },
            RequestOutcome::Failed(reasons) => self.db.record_failed(self.failure(job, reasons)),
        }
    }

    fn details(&self, job: &Job, status: u16, additional_info: Vec<String>) -> TestDetails {
        TestDetails {
            payload: job.payload.clone(),
            test_case: job.test_case.clone(),
            test_set: job.test_set.clone(),
            encoder: job.encoder.name().to_string(),
            placeholder: job.placeholder.name().to_string(),
            response_status_code: status,
            additional_info,
            kind: job.kind,
        }
    }

    fn failure(&self, job: &Job, reasons: Vec<String>) -> FailedDetails {
        FailedDetails {
            payload: job.payload.clone(),
            test_case: job.test_case.clone(),
            test_set: job.test_set.clone(),
            encoder: job.encoder.name().to_string(),
            placeholder: job.placeholder.name().to_string(),
            reasons,
            kind: job.kind,
        }
    }

    pub(super) fn client(&self) -> &HttpClient {
        &self.client
    }

    pub(super) fn classifier(&self) -> &ResponseClassifier {
        &self.classifier
    }

    pub(super) fn config(&self) -> &Config {
        &self.config
    }

    fn create_progress_bar(&self, total: usize) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        pb
    }
}

fn build_jobs(db: &Database) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();

    for case in db.test_cases() {
        let encoders: Vec<Encoder> = case
            .encoders
            .iter()
            .map(|name| Encoder::parse(name))
            .collect::<Result<_>>()
            .with_context(|| format!("test case {}/{}", case.test_set, case.name))?;
        let placeholders: Vec<Placeholder> = case
            .placeholders
            .iter()
            .map(|name| Placeholder::parse(name))
            .collect::<Result<_>>()
            .with_context(|| format!("test case {}/{}", case.test_set, case.name))?;

        for payload in &case.payloads {
            for &encoder in &encoders {
                for &placeholder in &placeholders {
                    jobs.push(Job {
                        payload: payload.clone(),
                        encoder,
                        placeholder,
                        test_set: case.test_set.clone(),
                        test_case: case.name.clone(),
                        kind: case.kind,
                    });
                }
            }
        }
    }

    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TestCase;

    fn scanner_with(cases: Vec<TestCase>) -> Result<PayloadScanner> {
        let config = Arc::new(Config {
            url: "http://localhost:8080".to_string(),
            ..Config::default()
        });
        let db = Arc::new(Database::new(cases).unwrap());
        PayloadScanner::new(config, db)
    }

    fn case(encoders: Vec<&str>, placeholders: Vec<&str>) -> TestCase {
        TestCase {
            payloads: vec!["<script>alert(1)</script>".to_string(), "' OR 1=1".to_string()],
            encoders: encoders.into_iter().map(String::from).collect(),
            placeholders: placeholders.into_iter().map(String::from).collect(),
            test_set: "owasp".to_string(),
            name: "mixed".to_string(),
            kind: TestKind::TruePositive,
        }
    }

    #[test]
    fn test_jobs_cover_full_cartesian_product() {
        let scanner = scanner_with(vec![case(
            vec!["plain", "url"],
            vec!["url-param", "request-body"],
        )])
        .unwrap();
        // 2 payloads x 2 encoders x 2 placeholders
        assert_eq!(scanner.jobs.len(), 8);
    }

    #[test]
    fn test_unknown_encoder_fails_construction() {
        assert!(scanner_with(vec![case(vec!["rot13"], vec!["url-param"])]).is_err());
    }

    #[test]
    fn test_unknown_placeholder_fails_construction() {
        assert!(scanner_with(vec![case(vec!["plain"], vec!["grpc"])]).is_err());
    }
}
