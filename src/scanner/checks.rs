use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use regex::RegexSet;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::http::{PayloadRequest, RequestOutcome};

use super::PayloadScanner;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

// A probe any sane WAF ruleset should block.
const WAF_CHECK_PAYLOAD: &str = "UNION SELECT username, password FROM users--<script>alert(1)</script>";

// Markers of JS-only challenge pages served instead of real content.
const JS_REQUIRED_MARKERS: &[&str] = &[
    r"(?i)enable javascript",
    r"(?i)javascript is (required|disabled)",
    r"(?i)jschl_vc",
    r"(?i)__cf_chl",
    r"(?i)challenge-platform",
    r"(?i)_Incapsula_Resource",
];

#[derive(Debug)]
pub enum WafPreCheck {
    Blocked { status: u16 },
    NotBlocked { status: u16 },
    Unreachable { reason: String },
}

impl PayloadScanner {
    // Fetches the target once and looks for a script-only challenge
    // page. A transport failure here means the target cannot be
    // evaluated at all, so it surfaces as an error.
    pub async fn check_if_javascript_required(&self) -> Result<bool> {
        let request = plain_get(&self.config().url);

        let body = match self.client().execute(&request).await {
            RequestOutcome::Response(response) => response.body,
            RequestOutcome::ConnReset => {
                return Err(anyhow!("connection reset while probing the endpoint"));
            }
            RequestOutcome::Failed(reasons) => {
                return Err(anyhow!(reasons.join(": "))).context("couldn't reach the endpoint");
            }
        };

        let markers = RegexSet::new(JS_REQUIRED_MARKERS).expect("valid marker patterns");
        Ok(markers.is_match(&body))
    }

    // Sends a known-malicious probe and classifies the answer. The
    // caller decides what a non-blocking target means for the run.
    pub async fn waf_block_check(&self) -> WafPreCheck {
        let base = self.config().url.trim_end_matches('/');
        let request = PayloadRequest {
            method: "GET".to_string(),
            url: format!(
                "{base}/?id={}",
                urlencoding::encode(WAF_CHECK_PAYLOAD)
            ),
            report_path: "/".to_string(),
            headers: Vec::new(),
            body: None,
            content_type: None,
        };

        match self.client().execute(&request).await {
            RequestOutcome::Response(response) => {
                use crate::analyzer::Resolution;
                match self.classifier().classify(response.status, &response.body) {
                    Resolution::Blocked => WafPreCheck::Blocked {
                        status: response.status,
                    },
                    _ => WafPreCheck::NotBlocked {
                        status: response.status,
                    },
                }
            }
            RequestOutcome::ConnReset => match self.classifier().classify_conn_reset() {
                Some(_) => WafPreCheck::Blocked { status: 0 },
                None => WafPreCheck::Unreachable {
                    reason: "connection reset by peer".to_string(),
                },
            },
            RequestOutcome::Failed(reasons) => WafPreCheck::Unreachable {
                reason: reasons.join(": "),
            },
        }
    }

    // A raw TCP connect is enough to tell whether anything listens on
    // the gRPC port.
    pub async fn check_grpc_availability(&self) -> bool {
        let Some(host) = target_host(&self.config().url) else {
            return false;
        };
        let address = format!("{host}:{}", self.config().grpc_port);

        match timeout(PROBE_TIMEOUT, TcpStream::connect(&address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                debug!(%address, error = %err, "gRPC availability probe failed");
                false
            }
            Err(_) => {
                debug!(%address, "gRPC availability probe timed out");
                false
            }
        }
    }

    pub async fn check_graphql_availability(&self) -> bool {
        let request = PayloadRequest {
            method: "POST".to_string(),
            url: self.config().graphql_url.clone(),
            report_path: String::new(),
            headers: Vec::new(),
            body: Some(r#"{"query":"{__typename}"}"#.to_string()),
            content_type: Some("application/json"),
        };

        match self.client().execute(&request).await {
            RequestOutcome::Response(response) => (200..300).contains(&response.status),
            _ => false,
        }
    }
}

fn plain_get(url: &str) -> PayloadRequest {
    PayloadRequest {
        method: "GET".to_string(),
        url: url.to_string(),
        report_path: "/".to_string(),
        headers: Vec::new(),
        body: None,
        content_type: None,
    }
}

fn target_host(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
}
