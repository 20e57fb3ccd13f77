use std::sync::Arc;

use clap::Parser;
use colored::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use auditoria_monitor::cli::Args;
use auditoria_monitor::web::{self, AppState};
use auditoria_monitor::{
    AutoRefresh, BasicMonitor, MonitorConfig, MonitoringApi, MonitoringDashboard, Page, Renderers,
};

/// `--log` wins, then `RUST_LOG`, then the config file's `log.filter`.
fn init_tracing(args: &Args, config: &MonitorConfig) {
    let filter = match &args.log {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match MonitorConfig::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(2);
        }
    };
    config.apply_overrides(&args);
    init_tracing(&args, &config);

    let api = Arc::new(MonitoringApi::try_new(config.api.clone())?);
    let renderers = Renderers::new(config.display.utc_offset_minutes);
    let page = if args.basic {
        Page::basic(renderers)
    } else {
        Page::dashboard(renderers)
    }
    .into_shared();
    info!(source = %api.source(), basic = args.basic, "monitor configured");

    if args.once {
        BasicMonitor::start(Arc::clone(&api), Arc::clone(&page)).await;
        if !args.basic {
            MonitoringDashboard::render_once(Arc::clone(&api), Arc::clone(&page)).await;
        }
        let html = {
            let page = page.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            web::render_document(&page, &config.display.title)
        };
        println!("{html}");
        return Ok(());
    }

    let interval = config.refresh.interval();
    let status_monitor = BasicMonitor::start(Arc::clone(&api), Arc::clone(&page)).await;
    let mut status_refresh = AutoRefresh::new(interval).with_overlap(config.refresh.overlap);
    status_refresh.start(status_monitor.refresh_callback());

    let mut dashboard = if args.basic {
        None
    } else {
        let refresh = AutoRefresh::new(interval).with_overlap(config.refresh.overlap);
        Some(MonitoringDashboard::start(Arc::clone(&api), Arc::clone(&page), refresh).await)
    };

    let listener = web::bind(&config.server).await?;
    web::print_banner(listener.local_addr()?, api.source(), api.base_url());

    let state = AppState::new(Arc::clone(&page), Arc::clone(&api), config.display.title.as_str())
        .with_api_max_age(interval);
    tokio::select! {
        result = web::serve(listener, state) => {
            if let Err(e) = result {
                error!(error = %e, "web server stopped");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }

    if let Some(dashboard) = dashboard.as_mut() {
        dashboard.shutdown();
    }
    status_refresh.stop();
    Ok(())
}
