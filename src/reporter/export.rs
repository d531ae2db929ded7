use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tera::{Context as TeraContext, Tera};

use crate::stats::Statistics;

#[derive(Serialize, Deserialize)]
struct ExportData {
    waf_name: String,
    scan_time: String,
    args: Vec<String>,
    statistics: Statistics,
}

pub struct JsonExporter;

impl JsonExporter {
    pub fn export(
        stat: &Statistics,
        waf_name: &str,
        args: &[String],
        path: &Path,
    ) -> Result<()> {
        let output = ExportData {
            waf_name: waf_name.to_string(),
            scan_time: Utc::now().to_rfc3339(),
            args: args.to_vec(),
            statistics: stat.clone(),
        };

        let json = serde_json::to_string_pretty(&output)?;
        fs::write(path, json).with_context(|| format!("Failed to write to {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<(String, Statistics)> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let data: ExportData = serde_json::from_str(&content)?;
        Ok((data.waf_name, data.statistics))
    }
}

pub struct HtmlExporter;

impl HtmlExporter {
    pub fn export(
        stat: &Statistics,
        waf_name: &str,
        args: &[String],
        path: &Path,
    ) -> Result<()> {
        let mut tera = Tera::default();
        tera.add_raw_template("report", Self::get_template())?;

        let mut context = TeraContext::new();
        context.insert("waf_name", waf_name);
        context.insert(
            "scan_time",
            &Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        context.insert("args", &args.join(" "));
        context.insert("fingerprint", &stat.test_cases_fingerprint);
        context.insert("grpc_available", &stat.is_grpc_available);
        context.insert("graphql_available", &stat.is_graphql_available);
        context.insert("tp_tests", &stat.true_positive_tests);
        context.insert("tn_tests", &stat.true_negative_tests);
        context.insert("score", &stat.score);
        context.insert("paths", &stat.paths.0);

        let html = tera.render("report", &context)?;
        fs::write(path, html).with_context(|| format!("Failed to write to {}", path.display()))?;
        Ok(())
    }

    fn get_template() -> &'static str {
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>WAF evaluation report - {{ waf_name }}</title>
    <style>
        body { font-family: -apple-system, sans-serif; margin: 2rem; color: #222; }
        h1 { border-bottom: 2px solid #444; padding-bottom: .3rem; }
        table { border-collapse: collapse; margin: 1rem 0; }
        th, td { border: 1px solid #bbb; padding: .35rem .7rem; text-align: left; }
        th { background: #eee; }
        .score { font-size: 1.4rem; font-weight: bold; }
        .meta { color: #666; font-size: .9rem; }
    </style>
</head>
<body>
    <h1>WAF evaluation report: {{ waf_name }}</h1>
    <p class="meta">Generated {{ scan_time }}{% if args %} &mdash; <code>{{ args }}</code>{% endif %}</p>
    <p class="meta">Corpus fingerprint: <code>{{ fingerprint }}</code></p>
    <p class="meta">gRPC: {{ grpc_available }}, GraphQL: {{ graphql_available }}</p>

    <p class="score">ApiSec: {{ score.api_sec.average }} &mdash; AppSec: {{ score.app_sec.average }} &mdash; Average: {{ score.average }}</p>

    <h2>True-positive tests</h2>
    <table>
        <tr><th>Test set</th><th>Test case</th><th>Percentage, %</th><th>Sent</th><th>Blocked</th><th>Bypassed</th><th>Unresolved</th><th>Failed</th></tr>
        {% for row in tp_tests.summary_table %}
        <tr>
            <td>{{ row.test_set }}</td><td>{{ row.test_case }}</td><td>{{ row.percentage }}</td>
            <td>{{ row.sent }}</td><td>{{ row.blocked }}</td><td>{{ row.bypassed }}</td>
            <td>{{ row.unresolved }}</td><td>{{ row.failed }}</td>
        </tr>
        {% endfor %}
    </table>

    <h2>True-negative tests</h2>
    <table>
        <tr><th>Test set</th><th>Test case</th><th>Percentage, %</th><th>Sent</th><th>Blocked</th><th>Bypassed</th><th>Unresolved</th><th>Failed</th></tr>
        {% for row in tn_tests.summary_table %}
        <tr>
            <td>{{ row.test_set }}</td><td>{{ row.test_case }}</td><td>{{ row.percentage }}</td>
            <td>{{ row.sent }}</td><td>{{ row.blocked }}</td><td>{{ row.bypassed }}</td>
            <td>{{ row.unresolved }}</td><td>{{ row.failed }}</td>
        </tr>
        {% endfor %}
    </table>

    {% if paths %}
    <h2>Scanned paths</h2>
    <table>
        <tr><th>Method</th><th>Path</th></tr>
        {% for path in paths %}
        <tr><td>{{ path.method }}</td><td>{{ path.path }}</td></tr>
        {% endfor %}
    </table>
    {% endif %}
</body>
</html>"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("wafscan-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_json_round_trip() {
        let stat = Statistics {
            test_cases_fingerprint: "abc123".to_string(),
            ..Statistics::default()
        };

        let path = temp_file("export.json");
        JsonExporter::export(&stat, "generic", &["--url".to_string()], &path).unwrap();

        let (waf_name, loaded) = JsonExporter::load(&path).unwrap();
        assert_eq!(waf_name, "generic");
        assert_eq!(loaded.test_cases_fingerprint, "abc123");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_html_export_renders() {
        let stat = Statistics::default();

        let path = temp_file("export.html");
        HtmlExporter::export(&stat, "generic", &[], &path).unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("WAF evaluation report: generic"));

        std::fs::remove_file(&path).unwrap();
    }
}
