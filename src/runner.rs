use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::db::{Database, load_test_cases};
use crate::scanner::{PayloadScanner, WafPreCheck};
use crate::stats::Statistics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadCorpus,
    BuildDatabase,
    CapabilityProbe,
    WafPreCheck,
    AvailabilityProbes,
    MainSweep,
    Aggregate,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::LoadCorpus => "load corpus",
            Stage::BuildDatabase => "build database",
            Stage::CapabilityProbe => "capability probe",
            Stage::WafPreCheck => "WAF pre-check",
            Stage::AvailabilityProbes => "availability probes",
            Stage::MainSweep => "main sweep",
            Stage::Aggregate => "aggregate",
        }
    }
}

// Decision of a skippable gate, separated from stage execution so each
// gate is testable on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Skip(&'static str),
}

pub fn waf_precheck_gate(config: &Config) -> GateDecision {
    if config.skip_waf_block_check {
        GateDecision::Skip("disabled by configuration")
    } else {
        GateDecision::Proceed
    }
}

pub fn grpc_gate(config: &Config) -> GateDecision {
    if config.grpc_configured() {
        GateDecision::Proceed
    } else {
        GateDecision::Skip("gRPC port not configured")
    }
}

pub fn graphql_gate(config: &Config) -> GateDecision {
    if config.graphql_configured() {
        GateDecision::Proceed
    } else {
        GateDecision::Skip("GraphQL URL not configured")
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("loading test cases: {0}")]
    CorpusLoad(#[source] anyhow::Error),

    #[error("couldn't create test cases DB: {0}")]
    DatabaseBuild(#[source] anyhow::Error),

    #[error("couldn't create scanner: {0}")]
    ScannerInit(#[source] anyhow::Error),

    #[error("couldn't check if JavaScript is required to interact with the endpoint: {0}")]
    CapabilityProbe(#[source] anyhow::Error),

    #[error("JavaScript is required to interact with the endpoint")]
    JavaScriptRequired,

    #[error("error occurred while scanning: {0}")]
    Sweep(#[source] anyhow::Error),
}

// Sequences a full evaluation run. Stages either advance, skip with a
// recorded reason, or abort the whole run; per-request failures inside
// the sweep never surface here.
pub struct Runner {
    config: Arc<Config>,
}

impl Runner {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self, cancel: CancelToken) -> Result<Statistics, ScanError> {
        info!(stage = Stage::LoadCorpus.name(), "test cases loading started");
        let corpus = load_test_cases(&self.config).map_err(ScanError::CorpusLoad)?;
        info!(
            stage = Stage::LoadCorpus.name(),
            test_cases = corpus.len(),
            "test cases loading finished"
        );

        let db = Arc::new(Database::new(corpus).map_err(ScanError::DatabaseBuild)?);
        info!(
            stage = Stage::BuildDatabase.name(),
            fp = db.fingerprint(),
            "test cases fingerprint"
        );

        let scanner = PayloadScanner::new(self.config.clone(), db.clone())
            .map_err(ScanError::ScannerInit)?;

        // The request model cannot execute scripts; a JS-gated target
        // would make every later verdict meaningless.
        match scanner.check_if_javascript_required().await {
            Ok(true) => return Err(ScanError::JavaScriptRequired),
            Ok(false) => info!(stage = Stage::CapabilityProbe.name(), "JavaScript not required"),
            Err(err) => return Err(ScanError::CapabilityProbe(err)),
        }

        match waf_precheck_gate(&self.config) {
            GateDecision::Proceed => match scanner.waf_block_check().await {
                WafPreCheck::Blocked { status } => {
                    info!(stage = Stage::WafPreCheck.name(), status, "WAF pre-check: probe blocked");
                }
                WafPreCheck::NotBlocked { status } => {
                    warn!(
                        stage = Stage::WafPreCheck.name(),
                        status,
                        "WAF pre-check: malicious probe was not blocked, bypass results may be meaningless"
                    );
                }
                WafPreCheck::Unreachable { reason } => {
                    warn!(
                        stage = Stage::WafPreCheck.name(),
                        %reason,
                        "WAF pre-check: target unreachable"
                    );
                }
            },
            GateDecision::Skip(reason) => {
                info!(stage = Stage::WafPreCheck.name(), status = reason, "WAF pre-check skipped");
            }
        }

        match grpc_gate(&self.config) {
            GateDecision::Proceed => {
                let available = scanner.check_grpc_availability().await;
                db.set_grpc_available(available);
                info!(stage = Stage::AvailabilityProbes.name(), available, "gRPC availability");
            }
            GateDecision::Skip(reason) => {
                db.set_grpc_available(false);
                info!(stage = Stage::AvailabilityProbes.name(), status = reason, "gRPC probe skipped");
            }
        }

        match graphql_gate(&self.config) {
            GateDecision::Proceed => {
                let available = scanner.check_graphql_availability().await;
                db.set_graphql_available(available);
                info!(stage = Stage::AvailabilityProbes.name(), available, "GraphQL availability");
            }
            GateDecision::Skip(reason) => {
                db.set_graphql_available(false);
                info!(stage = Stage::AvailabilityProbes.name(), status = reason, "GraphQL probe skipped");
            }
        }

        info!(
            stage = Stage::MainSweep.name(),
            workers = self.config.workers,
            requests = db.request_count(),
            "scan started"
        );
        scanner.run(&cancel).await.map_err(ScanError::Sweep)?;
        if cancel.is_cancelled() {
            info!(stage = Stage::MainSweep.name(), "scan cancelled, aggregating partial results");
        }

        info!(stage = Stage::Aggregate.name(), "computing statistics");
        Ok(db.statistics(
            self.config.ignore_unresolved,
            self.config.non_blocked_as_passed,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waf_precheck_gate() {
        let on = Config {
            url: "http://t.local".to_string(),
            ..Config::default()
        };
        assert_eq!(waf_precheck_gate(&on), GateDecision::Proceed);

        let off = Config {
            skip_waf_block_check: true,
            ..on
        };
        assert_eq!(
            waf_precheck_gate(&off),
            GateDecision::Skip("disabled by configuration")
        );
    }

    #[test]
    fn test_protocol_gates_follow_configuration() {
        let bare = Config::default();
        assert!(matches!(grpc_gate(&bare), GateDecision::Skip(_)));
        assert!(matches!(graphql_gate(&bare), GateDecision::Skip(_)));

        let full = Config {
            grpc_port: 9000,
            graphql_url: "http://t.local/graphql".to_string(),
            ..Config::default()
        };
        assert_eq!(grpc_gate(&full), GateDecision::Proceed);
        assert_eq!(graphql_gate(&full), GateDecision::Proceed);
    }

    #[test]
    fn test_runner_rejects_invalid_config() {
        assert!(Runner::new(Config::default()).is_err());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::LoadCorpus.name(), "load corpus");
        assert_eq!(Stage::MainSweep.name(), "main sweep");
    }
}
