use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REPORT_PATH: &str = "reports";
pub const DEFAULT_TEST_CASES_PATH: &str = "testcases";
pub const DEFAULT_WAF_NAME: &str = "generic";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    // Target settings
    pub url: String,
    pub grpc_port: u16,
    pub graphql_url: String,

    // Test cases settings
    pub test_cases_path: String,
    pub test_set: String,
    pub test_case: String,

    // HTTP client settings
    pub tls_verify: bool,
    pub proxy: String,
    pub add_header: String,
    pub max_redirects: usize,
    pub idle_conn_timeout: u64,
    pub http_headers: HashMap<String, String>,

    // Performance settings
    pub workers: usize,
    pub random_delay: u64,
    pub send_delay: u64,

    // Analysis settings
    pub skip_waf_block_check: bool,
    pub block_status_codes: Vec<u16>,
    pub pass_status_codes: Vec<u16>,
    pub block_regex: String,
    pub pass_regex: String,
    pub non_blocked_as_passed: bool,
    pub ignore_unresolved: bool,
    pub block_conn_reset: bool,

    // Report settings
    pub waf_name: String,
    pub include_payloads: bool,
    pub report_path: String,
    pub report_name: String,

    // Args echoed into reports, captured at construction time
    pub args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            grpc_port: 0,
            graphql_url: String::new(),
            test_cases_path: DEFAULT_TEST_CASES_PATH.to_string(),
            test_set: String::new(),
            test_case: String::new(),
            tls_verify: false,
            proxy: String::new(),
            add_header: String::new(),
            max_redirects: 50,
            idle_conn_timeout: 2,
            http_headers: HashMap::new(),
            workers: 5,
            random_delay: 400,
            send_delay: 400,
            skip_waf_block_check: false,
            block_status_codes: vec![403],
            pass_status_codes: vec![200, 404],
            block_regex: String::new(),
            pass_regex: String::new(),
            non_blocked_as_passed: false,
            ignore_unresolved: false,
            block_conn_reset: false,
            waf_name: DEFAULT_WAF_NAME.to_string(),
            include_payloads: false,
            report_path: DEFAULT_REPORT_PATH.to_string(),
            report_name: String::new(),
            args: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            anyhow::bail!("target URL is not set");
        }
        if self.workers == 0 {
            anyhow::bail!("workers must be greater than zero");
        }
        if !self.block_regex.is_empty() {
            regex::Regex::new(&self.block_regex).context("invalid block regex")?;
        }
        if !self.pass_regex.is_empty() {
            regex::Regex::new(&self.pass_regex).context("invalid pass regex")?;
        }
        Ok(())
    }

    pub fn grpc_configured(&self) -> bool {
        self.grpc_port != 0
    }

    pub fn graphql_configured(&self) -> bool {
        !self.graphql_url.is_empty()
    }
}
