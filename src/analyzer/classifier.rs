use anyhow::{Context, Result};
use regex::Regex;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Blocked,
    Bypassed,
    Unresolved,
}

// Decides whether an observed response counts as blocked or passed,
// based on the configured status-code sets and body regexes. A response
// matching both or neither of the block and pass criteria stays
// unresolved.
pub struct ResponseClassifier {
    block_status_codes: Vec<u16>,
    pass_status_codes: Vec<u16>,
    block_regex: Option<Regex>,
    pass_regex: Option<Regex>,
    block_conn_reset: bool,
}

impl ResponseClassifier {
    pub fn from_config(config: &Config) -> Result<Self> {
        let block_regex = compile(&config.block_regex).context("invalid block regex")?;
        let pass_regex = compile(&config.pass_regex).context("invalid pass regex")?;

        Ok(Self {
            block_status_codes: config.block_status_codes.clone(),
            pass_status_codes: config.pass_status_codes.clone(),
            block_regex,
            pass_regex,
            block_conn_reset: config.block_conn_reset,
        })
    }

    pub fn classify(&self, status: u16, body: &str) -> Resolution {
        let blocked = self.block_status_codes.contains(&status)
            || self
                .block_regex
                .as_ref()
                .is_some_and(|re| re.is_match(body));

        let passed = self.pass_status_codes.contains(&status)
            || self.pass_regex.as_ref().is_some_and(|re| re.is_match(body));

        match (blocked, passed) {
            (true, true) => Resolution::Unresolved,
            (true, false) => Resolution::Blocked,
            (false, true) => Resolution::Bypassed,
            (false, false) => Resolution::Unresolved,
        }
    }

    // A reset connection is a block signal for some WAF deployments that
    // drop malicious traffic at the TCP level.
    pub fn classify_conn_reset(&self) -> Option<Resolution> {
        self.block_conn_reset.then_some(Resolution::Blocked)
    }
}

fn compile(pattern: &str) -> Result<Option<Regex>, regex::Error> {
    if pattern.is_empty() {
        return Ok(None);
    }
    Regex::new(pattern).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(config: Config) -> ResponseClassifier {
        ResponseClassifier::from_config(&config).expect("valid classifier config")
    }

    #[test]
    fn test_block_status_code() {
        let c = classifier(Config::default());
        assert_eq!(c.classify(403, ""), Resolution::Blocked);
    }

    #[test]
    fn test_pass_status_codes() {
        let c = classifier(Config::default());
        assert_eq!(c.classify(200, ""), Resolution::Bypassed);
        assert_eq!(c.classify(404, ""), Resolution::Bypassed);
    }

    #[test]
    fn test_unmatched_status_is_unresolved() {
        let c = classifier(Config::default());
        assert_eq!(c.classify(500, ""), Resolution::Unresolved);
        assert_eq!(c.classify(301, ""), Resolution::Unresolved);
    }

    #[test]
    fn test_block_regex_wins_over_pass_status() {
        let c = classifier(Config {
            block_regex: "[Ff]orbidden by WAF".to_string(),
            ..Config::default()
        });
        // 500 matches neither status list, the body decides.
        assert_eq!(
            c.classify(500, "request forbidden by WAF rules"),
            Resolution::Blocked
        );
    }

    #[test]
    fn test_block_and_pass_both_matching_is_unresolved() {
        let c = classifier(Config {
            block_regex: "denied".to_string(),
            ..Config::default()
        });
        // Status 200 passes, body matches the block regex.
        assert_eq!(c.classify(200, "access denied"), Resolution::Unresolved);
    }

    #[test]
    fn test_pass_regex() {
        let c = classifier(Config {
            pass_regex: "welcome".to_string(),
            ..Config::default()
        });
        assert_eq!(c.classify(500, "welcome back"), Resolution::Bypassed);
    }

    #[test]
    fn test_conn_reset_flag() {
        let strict = classifier(Config {
            block_conn_reset: true,
            ..Config::default()
        });
        assert_eq!(strict.classify_conn_reset(), Some(Resolution::Blocked));

        let relaxed = classifier(Config::default());
        assert_eq!(relaxed.classify_conn_reset(), None);
    }
}
