use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wafscan::cancel::CancelToken;
use wafscan::cli::{Cli, Commands};
use wafscan::config::Config;
use wafscan::reporter::{ConsoleReporter, HtmlExporter, JsonExporter};
use wafscan::runner::Runner;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            url,
            grpc_port,
            graphql_url,
            config,
            test_cases,
            test_set,
            test_case,
            workers,
            send_delay,
            random_delay,
            block_status,
            pass_status,
            block_regex,
            pass_regex,
            block_conn_reset,
            non_blocked_as_passed,
            ignore_unresolved,
            skip_waf_block_check,
            tls_verify,
            proxy,
            header,
            waf_name,
            include_payloads,
            report_path,
            report_name,
            format,
            verbose,
        } => {
            init_tracing(verbose);

            let mut cfg = match &config {
                Some(path) => Config::from_file(Path::new(path))?,
                None => Config::default(),
            };

            cfg.url = url;
            apply(&mut cfg.grpc_port, grpc_port);
            apply(&mut cfg.graphql_url, graphql_url);
            apply(&mut cfg.test_cases_path, test_cases);
            apply(&mut cfg.test_set, test_set);
            apply(&mut cfg.test_case, test_case);
            apply(&mut cfg.workers, workers);
            apply(&mut cfg.send_delay, send_delay);
            apply(&mut cfg.random_delay, random_delay);
            apply(&mut cfg.block_status_codes, block_status);
            apply(&mut cfg.pass_status_codes, pass_status);
            apply(&mut cfg.block_regex, block_regex);
            apply(&mut cfg.pass_regex, pass_regex);
            apply(&mut cfg.proxy, proxy);
            apply(&mut cfg.add_header, header);
            apply(&mut cfg.waf_name, waf_name);
            apply(&mut cfg.report_path, report_path);
            apply(&mut cfg.report_name, report_name);
            cfg.include_payloads |= include_payloads;
            cfg.block_conn_reset |= block_conn_reset;
            cfg.non_blocked_as_passed |= non_blocked_as_passed;
            cfg.ignore_unresolved |= ignore_unresolved;
            cfg.skip_waf_block_check |= skip_waf_block_check;
            cfg.tls_verify |= tls_verify;
            cfg.args = std::env::args().collect();

            let runner = Runner::new(cfg)?;

            let cancel = CancelToken::new();
            let interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("scan cancelled by operator");
                    interrupt.cancel();
                }
            });

            let stat = runner.run(cancel).await?;

            let config = runner.config();
            ConsoleReporter::new().print(&config.waf_name, &stat);

            let mut stat = stat;
            if !config.include_payloads {
                stat.redact_payloads();
            }

            if format.iter().any(|f| f == "json" || f == "html") {
                fs::create_dir_all(&config.report_path).with_context(|| {
                    format!("Failed to create report dir: {}", config.report_path)
                })?;
            }
            for f in &format {
                match f.as_str() {
                    "json" => {
                        let path = report_file(config, "json");
                        JsonExporter::export(&stat, &config.waf_name, &config.args, &path)?;
                        info!(report = %path.display(), "JSON report saved");
                    }
                    "html" => {
                        let path = report_file(config, "html");
                        HtmlExporter::export(&stat, &config.waf_name, &config.args, &path)?;
                        info!(report = %path.display(), "HTML report saved");
                    }
                    "none" => {}
                    other => anyhow::bail!("unknown report format: {other}"),
                }
            }
        }

        Commands::Report {
            input,
            format,
            output,
        } => {
            init_tracing(false);

            let (waf_name, stat) = JsonExporter::load(Path::new(&input))?;
            match format.as_str() {
                "console" => ConsoleReporter::new().print(&waf_name, &stat),
                "html" => {
                    let output = output.context("--output is required for html format")?;
                    HtmlExporter::export(&stat, &waf_name, &[], Path::new(&output))?;
                }
                other => anyhow::bail!("unknown report format: {other}"),
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "wafscan=debug" } else { "wafscan=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

fn apply<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn report_file(config: &Config, extension: &str) -> PathBuf {
    let name = if config.report_name.is_empty() {
        format!(
            "waf-evaluation-report-{}",
            chrono::Local::now().format("%Y-%B-%d-%H-%M-%S")
        )
    } else {
        config.report_name.clone()
    };
    Path::new(&config.report_path).join(format!("{name}.{extension}"))
}
