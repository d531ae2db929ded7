use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use sha2::{Digest, Sha256};

use super::TestCase;
use crate::stats::{
    Aggregator, FailedDetails, Path, RawResults, ScannedPaths, ScoreCalculator, Statistics,
    TestDetails, TestKind,
};

// Read-only index over the loaded corpus plus the append-only result
// collection filled by the sweep workers.
pub struct Database {
    test_cases: Vec<TestCase>,
    fingerprint: String,

    results: Mutex<RawResults>,
    paths: Mutex<Vec<Path>>,

    grpc_available: AtomicBool,
    graphql_available: AtomicBool,
}

impl Database {
    pub fn new(test_cases: Vec<TestCase>) -> Result<Self> {
        let mut seen = HashSet::new();
        for case in &test_cases {
            if !seen.insert((case.test_set.clone(), case.name.clone())) {
                anyhow::bail!(
                    "duplicate test case identity: {}/{}",
                    case.test_set,
                    case.name
                );
            }
        }

        let fingerprint = fingerprint(&test_cases);

        Ok(Self {
            test_cases,
            fingerprint,
            results: Mutex::new(RawResults::default()),
            paths: Mutex::new(Vec::new()),
            grpc_available: AtomicBool::new(false),
            graphql_available: AtomicBool::new(false),
        })
    }

    pub fn test_cases(&self) -> &[TestCase] {
        &self.test_cases
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn request_count(&self) -> usize {
        self.test_cases.iter().map(TestCase::request_count).sum()
    }

    pub fn record_blocked(&self, details: TestDetails) {
        self.results.lock().expect("results lock").blocked.push(details);
    }

    pub fn record_bypassed(&self, details: TestDetails) {
        self.results.lock().expect("results lock").bypassed.push(details);
    }

    pub fn record_unresolved(&self, details: TestDetails) {
        self.results
            .lock()
            .expect("results lock")
            .unresolved
            .push(details);
    }

    pub fn record_failed(&self, details: FailedDetails) {
        self.results.lock().expect("results lock").failed.push(details);
    }

    pub fn register_path(&self, method: &str, path: &str) {
        self.paths
            .lock()
            .expect("paths lock")
            .push(Path::new(method, path));
    }

    pub fn set_grpc_available(&self, available: bool) {
        self.grpc_available.store(available, Ordering::Relaxed);
    }

    pub fn set_graphql_available(&self, available: bool) {
        self.graphql_available.store(available, Ordering::Relaxed);
    }

    pub fn is_grpc_available(&self) -> bool {
        self.grpc_available.load(Ordering::Relaxed)
    }

    pub fn is_graphql_available(&self) -> bool {
        self.graphql_available.load(Ordering::Relaxed)
    }

    // Rolls whatever has been recorded so far into the terminal result
    // object. Safe to call after a cancelled sweep; partial results
    // produce a partial but valid Statistics.
    pub fn statistics(&self, ignore_unresolved: bool, non_blocked_as_passed: bool) -> Statistics {
        let results = self.results.lock().expect("results lock").clone();

        let aggregator = Aggregator::new(ignore_unresolved, non_blocked_as_passed);
        let true_positive_tests = aggregator.summarize(&results, TestKind::TruePositive);
        let true_negative_tests = aggregator.summarize(&results, TestKind::TrueNegative);

        let score = ScoreCalculator::calculate(&true_positive_tests, &true_negative_tests);

        let mut seen = HashSet::new();
        let mut paths = ScannedPaths::new(
            self.paths
                .lock()
                .expect("paths lock")
                .iter()
                .filter(|p| seen.insert((p.method.clone(), p.path.clone())))
                .cloned()
                .collect(),
        );
        paths.sort();

        Statistics {
            is_grpc_available: self.is_grpc_available(),
            is_graphql_available: self.is_graphql_available(),
            paths,
            test_cases_fingerprint: self.fingerprint.clone(),
            true_positive_tests,
            true_negative_tests,
            score,
        }
    }
}

// Stable hash over the corpus content. Cases are sorted by identity
// first, so the fingerprint never depends on load order.
fn fingerprint(test_cases: &[TestCase]) -> String {
    let mut sorted: Vec<&TestCase> = test_cases.iter().collect();
    sorted.sort_by(|a, b| (&a.test_set, &a.name).cmp(&(&b.test_set, &b.name)));

    let mut hasher = Sha256::new();
    for case in sorted {
        hasher.update(case.test_set.as_bytes());
        hasher.update([0]);
        hasher.update(case.name.as_bytes());
        hasher.update([0]);
        for field in [&case.payloads, &case.encoders, &case.placeholders] {
            for value in field {
                hasher.update(value.as_bytes());
                hasher.update([0]);
            }
            hasher.update([0xff]);
        }
        hasher.update(case.kind.to_string().as_bytes());
        hasher.update([0]);
    }

    hex::encode(hasher.finalize())
}
