use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::stats::TestKind;

// Benign corpora live in test sets named with this prefix; everything
// else is attack traffic.
const FALSE_POSITIVE_SET_PREFIX: &str = "false-pos";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub payloads: Vec<String>,
    pub encoders: Vec<String>,
    pub placeholders: Vec<String>,
    pub test_set: String,
    pub name: String,
    pub kind: TestKind,
}

impl TestCase {
    pub fn request_count(&self) -> usize {
        self.payloads.len() * self.encoders.len() * self.placeholders.len()
    }
}

#[derive(Debug, Deserialize)]
struct TestCaseFile {
    payload: Vec<String>,
    encoder: Vec<String>,
    placeholder: Vec<String>,
}

// Loads every YAML test case under `<test_cases_path>/<test_set>/`,
// honoring the configured test-set and test-case filters. An empty or
// fully filtered-out corpus is an error.
pub fn load_test_cases(config: &Config) -> Result<Vec<TestCase>> {
    let root = Path::new(&config.test_cases_path);
    let entries = fs::read_dir(root)
        .with_context(|| format!("Failed to read test cases dir: {}", root.display()))?;

    let mut test_cases = Vec::new();

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let test_set = entry.file_name().to_string_lossy().to_string();
        if !config.test_set.is_empty() && config.test_set != test_set {
            continue;
        }

        let kind = if test_set.starts_with(FALSE_POSITIVE_SET_PREFIX) {
            TestKind::TrueNegative
        } else {
            TestKind::TruePositive
        };

        for file in fs::read_dir(entry.path())? {
            let file = file?;
            let path = file.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "yml" || ext == "yaml");
            if !is_yaml {
                continue;
            }

            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default();
            if !config.test_case.is_empty() && config.test_case != name {
                continue;
            }

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read test case: {}", path.display()))?;
            let parsed: TestCaseFile = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse test case: {}", path.display()))?;

            if parsed.payload.is_empty() || parsed.encoder.is_empty() || parsed.placeholder.is_empty()
            {
                anyhow::bail!("test case {} has an empty payload/encoder/placeholder list", path.display());
            }

            test_cases.push(TestCase {
                payloads: parsed.payload,
                encoders: parsed.encoder,
                placeholders: parsed.placeholder,
                test_set: test_set.clone(),
                name,
                kind,
            });
        }
    }

    if test_cases.is_empty() {
        anyhow::bail!(
            "no test cases found in {} matching the configured filters",
            root.display()
        );
    }

    Ok(test_cases)
}
