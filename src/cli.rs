use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "auditoria-monitor")]
#[command(version)]
#[command(about = "Auto-refreshing monitoring dashboard for AUDITORIA360")]
pub struct Args {
    /// Path to a TOML configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Base URL of the remote monitoring API (mock data when omitted)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Refresh interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Port for the dashboard web server
    #[arg(long)]
    pub port: Option<u16>,

    /// Address the web server binds to
    #[arg(long)]
    pub bind: Option<String>,

    /// Serve only the basic health status page
    #[arg(long)]
    pub basic: bool,

    /// Fetch and render once, print the page to stdout and exit
    #[arg(long)]
    pub once: bool,

    /// Seed for the mock data generator
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log filter directive (e.g. "debug" or "auditoria_monitor=trace")
    #[arg(long)]
    pub log: Option<String>,
}
