use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wafscan")]
#[command(version, about = "WAF effectiveness scanner with labeled payload corpora and scoring")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Scan {
        #[arg(short, long)]
        url: String,

        #[arg(long)]
        grpc_port: Option<u16>,

        #[arg(long)]
        graphql_url: Option<String>,

        #[arg(long)]
        config: Option<String>,

        #[arg(long)]
        test_cases: Option<String>,

        #[arg(long)]
        test_set: Option<String>,

        #[arg(long)]
        test_case: Option<String>,

        #[arg(short, long)]
        workers: Option<usize>,

        #[arg(long)]
        send_delay: Option<u64>,

        #[arg(long)]
        random_delay: Option<u64>,

        #[arg(long, value_delimiter = ',')]
        block_status: Option<Vec<u16>>,

        #[arg(long, value_delimiter = ',')]
        pass_status: Option<Vec<u16>>,

        #[arg(long)]
        block_regex: Option<String>,

        #[arg(long)]
        pass_regex: Option<String>,

        #[arg(long)]
        block_conn_reset: bool,

        #[arg(long)]
        non_blocked_as_passed: bool,

        #[arg(long)]
        ignore_unresolved: bool,

        #[arg(long)]
        skip_waf_block_check: bool,

        #[arg(long)]
        tls_verify: bool,

        #[arg(long)]
        proxy: Option<String>,

        #[arg(long)]
        header: Option<String>,

        #[arg(long)]
        waf_name: Option<String>,

        #[arg(long)]
        include_payloads: bool,

        #[arg(long)]
        report_path: Option<String>,

        #[arg(long)]
        report_name: Option<String>,

        #[arg(short, long, value_delimiter = ',', default_value = "json")]
        format: Vec<String>,

        #[arg(short, long)]
        verbose: bool,
    },

    Report {
        #[arg(short, long)]
        input: String,

        #[arg(short, long, default_value = "console")]
        format: String,

        #[arg(short, long)]
        output: Option<String>,
    },
}
