use colored::Colorize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

use crate::stats::{Score, Statistics, TestsSummary};

pub struct ConsoleReporter;

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "Test set")]
    test_set: String,
    #[tabled(rename = "Test case")]
    test_case: String,
    #[tabled(rename = "Percentage, %")]
    percentage: String,
    #[tabled(rename = "Sent")]
    sent: usize,
    #[tabled(rename = "Blocked")]
    blocked: usize,
    #[tabled(rename = "Bypassed")]
    bypassed: usize,
    #[tabled(rename = "Unresolved")]
    unresolved: usize,
    #[tabled(rename = "Failed")]
    failed: usize,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn print(&self, waf_name: &str, stat: &Statistics) {
        println!("\n{} {}", "WAF:".bold(), waf_name);
        println!("{} {}", "Corpus fingerprint:".bold(), stat.test_cases_fingerprint);
        println!(
            "{} gRPC: {}, GraphQL: {}",
            "Protocols:".bold(),
            availability(stat.is_grpc_available),
            availability(stat.is_graphql_available),
        );

        self.print_group("True-positive tests (attacks)", &stat.true_positive_tests);
        self.print_group("True-negative tests (benign)", &stat.true_negative_tests);

        println!("\n{}", "Scores".bold().underline());
        self.print_score("ApiSec", &stat.score.api_sec);
        self.print_score("AppSec", &stat.score.app_sec);
        println!("  {}: {}", "Average".bold(), format_score(stat.score.average));

        if !stat.paths.is_empty() {
            println!("\n{}", "Scanned paths".bold().underline());
            for path in stat.paths.iter() {
                println!("  {:6} {}", path.method, path.path);
            }
        }
        println!();
    }

    fn print_group(&self, title: &str, summary: &TestsSummary) {
        println!("\n{}", title.bold().underline());

        if summary.summary_table.is_empty() {
            println!("  no requests sent");
            return;
        }

        let rows: Vec<TableRow> = summary
            .summary_table
            .iter()
            .map(|row| TableRow {
                test_set: row.test_set.clone(),
                test_case: row.test_case.clone(),
                percentage: format!("{:.2}", row.percentage),
                sent: row.sent,
                blocked: row.blocked,
                bypassed: row.bypassed,
                unresolved: row.unresolved,
                failed: row.failed,
            })
            .collect();

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()))
            .to_string();
        println!("{}", table);

        println!(
            "  blocked: {:.2}%  bypassed: {:.2}%  unresolved: {:.2}%  failed: {:.2}%",
            summary.resolved_blocked_requests_percentage,
            summary.resolved_bypassed_requests_percentage,
            summary.unresolved_requests_percentage,
            summary.failed_requests_percentage,
        );
    }

    fn print_score(&self, label: &str, score: &Score) {
        println!(
            "  {}: {} (true-positive {:.2}, true-negative {:.2})",
            label.bold(),
            format_score(score.average),
            score.true_positive,
            score.true_negative,
        );
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn availability(available: bool) -> String {
    if available {
        "available".green().to_string()
    } else {
        "unavailable".yellow().to_string()
    }
}

fn format_score(value: f64) -> String {
    let text = format!("{value:.2}");
    if value >= 80.0 {
        text.green().to_string()
    } else if value >= 50.0 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}
