//! CLI entry point for the cpe-inventory scanner.

use std::path::Path;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use cpe_inventory::config::InventoryConfig;
use cpe_inventory::orchestrator::{ScanOrchestrator, ScanSettings};
use cpe_inventory::report::{report_path, InventoryReport};
use cpe_inventory::telnet::TelnetConnector;

#[derive(Parser)]
#[command(name = "cpe-inventory")]
#[command(about = "Telnet inventory scanner for customer-premises routers")]
struct Cli {
    /// Subnet to scan (CIDR notation, e.g., 192.168.0.0/24). Repeatable;
    /// replaces the configured subnet list.
    #[arg(short, long = "subnet")]
    subnets: Vec<String>,

    /// Maximum concurrent sessions per subnet.
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Per-operation timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Management port.
    #[arg(long)]
    port: Option<u16>,

    /// Directory receiving the report file.
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Config file prefix (default: cpe-inventory).
    #[arg(short, long, default_value = "cpe-inventory")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.json_logs {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    let config = apply_overrides(InventoryConfig::load(&cli.config)?, &cli);
    config.validate()?;
    let subnets = config.parsed_subnets()?;

    // The report must exist before any device is contacted.
    let run_time = chrono::Local::now();
    let path = report_path(Path::new(&config.output_dir), &run_time);
    let mut report = InventoryReport::create(&path, &config.device_label, run_time)?;
    tracing::info!(path = %path.display(), "Report created");

    let settings = ScanSettings {
        port: config.port,
        timeout: config.timeout(),
        max_concurrency: config.max_concurrent_sessions,
    };
    let orchestrator = ScanOrchestrator::new(TelnetConnector, config.credentials(), settings);
    let summary = orchestrator.run(&subnets, &mut report).await?;

    tracing::info!(
        path = %path.display(),
        accepted = summary.accepted,
        duplicates = summary.duplicates,
        failed = summary.failed,
        completed_at = %run_time.format("%Y-%m-%d %H:%M:%S"),
        "Inventory written"
    );

    Ok(())
}

fn apply_overrides(mut config: InventoryConfig, cli: &Cli) -> InventoryConfig {
    if !cli.subnets.is_empty() {
        config.subnets = cli.subnets.clone();
    }
    if let Some(n) = cli.max_concurrent {
        config.max_concurrent_sessions = n;
    }
    if let Some(secs) = cli.timeout_secs {
        config.timeout_secs = secs;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    config
}
