//! Dashboard controllers.
//!
//! [`BasicMonitor`] keeps the health-status list and the "last updated"
//! stamp current. [`MonitoringDashboard`] loads metrics then alerts and hands
//! that cycle to an [`AutoRefresh`], mirroring its countdown into the page.
//!
//! Fetch failures never propagate out of a controller: they are logged and,
//! when the page has an `error-banner` container, shown there until the next
//! fully successful cycle.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::api::MonitoringApi;
use crate::error::MonitorError;
use crate::refresh::{callback, AutoRefresh, RefreshCallback};
use crate::render::page::{
    ALERTS_CONTAINER, ERROR_BANNER, METRICS_CONTAINER, REFRESH_COUNTDOWN, STATUS_CONTAINER, TIMESTAMP,
};
use crate::render::{Content, Item, Page, SharedPage};

pub const STATUS_STAGGER_MS: u32 = 100;
pub const METRIC_STAGGER_MS: u32 = 100;
pub const ALERT_STAGGER_MS: u32 = 200;

fn with_page<R>(page: &SharedPage, f: impl FnOnce(&mut Page) -> R) -> R {
    let mut guard = page.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard)
}

/// Which fetch a banner reports. The id is stable; the label is for people.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Status,
    Metrics,
    Alerts,
}

impl Topic {
    fn id(self) -> &'static str {
        match self {
            Topic::Status => "status",
            Topic::Metrics => "metrics",
            Topic::Alerts => "alerts",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Topic::Status => "status dos serviços",
            Topic::Metrics => "métricas",
            Topic::Alerts => "alertas",
        }
    }
}

/// Log a failed fetch and surface it in the error banner, if the page has one.
fn report_failure(page: &SharedPage, topic: Topic, err: &MonitorError) {
    error!(error = %err, topic = topic.id(), "monitoring fetch failed");
    with_page(page, |p| {
        if let Some(banner) = p.container_mut(ERROR_BANNER) {
            banner.set_content(Content::Banner {
                topic: topic.id().to_string(),
                message: format!("Falha ao carregar {}: {err}", topic.label()),
            });
        }
    });
}

/// Clear the banner, but only when it reports one of `topics`. Controllers
/// sharing a page never clear each other's failures.
fn clear_banner(page: &SharedPage, topics: &[Topic]) {
    with_page(page, |p| {
        if let Some(banner) = p.container_mut(ERROR_BANNER) {
            let ours = match banner.content() {
                Content::Banner { topic, .. } => topics.iter().any(|t| t.id() == topic),
                _ => false,
            };
            if ours {
                banner.clear();
            }
        }
    });
}

// ---------------------------------------------------------------------------
// BasicMonitor
// ---------------------------------------------------------------------------

/// Health-status list plus the "last updated" stamp.
pub struct BasicMonitor {
    api: Arc<MonitoringApi>,
    page: SharedPage,
}

impl BasicMonitor {
    /// Build the monitor and run the first load before returning.
    pub async fn start(api: Arc<MonitoringApi>, page: SharedPage) -> Arc<Self> {
        let monitor = Arc::new(Self { api, page });
        monitor.refresh().await;
        monitor
    }

    pub fn page(&self) -> &SharedPage {
        &self.page
    }

    /// Fetch health checks and re-render. Returns whether the fetch succeeded.
    pub async fn refresh(&self) -> bool {
        match self.api.get_health_checks().await {
            Ok(checks) => {
                debug!(count = checks.len(), "health checks loaded");
                with_page(&self.page, |p| {
                    let stamp = Utc::now()
                        .with_timezone(&p.renderers().alerts.offset())
                        .format("%d/%m/%Y %H:%M:%S")
                        .to_string();
                    if let Some(c) = p.container_mut(STATUS_CONTAINER) {
                        c.set_content(Content::Status(Item::stagger_all(checks, STATUS_STAGGER_MS)));
                    }
                    if let Some(c) = p.container_mut(TIMESTAMP) {
                        c.set_text(format!("Atualizado em {stamp}"));
                    }
                });
                clear_banner(&self.page, &[Topic::Status]);
                true
            }
            Err(e) => {
                report_failure(&self.page, Topic::Status, &e);
                false
            }
        }
    }

    pub fn refresh_callback(self: &Arc<Self>) -> RefreshCallback {
        let monitor = Arc::clone(self);
        callback(move || {
            let monitor = Arc::clone(&monitor);
            async move {
                monitor.refresh().await;
            }
        })
    }
}

// ---------------------------------------------------------------------------
// MonitoringDashboard
// ---------------------------------------------------------------------------

struct DashboardCycle {
    api: Arc<MonitoringApi>,
    page: SharedPage,
}

impl DashboardCycle {
    async fn load_metrics(&self) -> Result<usize, MonitorError> {
        let metrics = self.api.get_metrics().await?;
        let count = metrics.len();
        with_page(&self.page, |p| {
            if let Some(c) = p.container_mut(METRICS_CONTAINER) {
                c.set_content(Content::Metrics(Item::stagger_all(metrics, METRIC_STAGGER_MS)));
            }
        });
        Ok(count)
    }

    async fn load_alerts(&self) -> Result<usize, MonitorError> {
        let alerts = self.api.get_alerts().await?;
        let count = alerts.len();
        with_page(&self.page, |p| {
            if let Some(c) = p.container_mut(ALERTS_CONTAINER) {
                c.set_content(Content::Alerts(Item::stagger_all(alerts, ALERT_STAGGER_MS)));
            }
        });
        Ok(count)
    }

    /// Metrics first, then alerts. Each failure is reported on its own; the
    /// banner is cleared only when both succeed.
    async fn run(&self) -> bool {
        let mut ok = true;
        match self.load_metrics().await {
            Ok(count) => debug!(count, "metrics loaded"),
            Err(e) => {
                report_failure(&self.page, Topic::Metrics, &e);
                ok = false;
            }
        }
        match self.load_alerts().await {
            Ok(count) => debug!(count, "alerts loaded"),
            Err(e) => {
                report_failure(&self.page, Topic::Alerts, &e);
                ok = false;
            }
        }
        if ok {
            clear_banner(&self.page, &[Topic::Metrics, Topic::Alerts]);
        }
        ok
    }
}

/// Metrics and alerts panels on an auto-refresh cycle.
pub struct MonitoringDashboard {
    cycle: Arc<DashboardCycle>,
    refresh_cb: RefreshCallback,
    auto_refresh: AutoRefresh,
}

impl MonitoringDashboard {
    /// Load once, wire the countdown into `refresh-countdown`, then start
    /// the refresh cycle.
    pub async fn start(api: Arc<MonitoringApi>, page: SharedPage, mut auto_refresh: AutoRefresh) -> Self {
        let cycle = Arc::new(DashboardCycle { api, page });
        cycle.run().await;

        let countdown_page = Arc::clone(&cycle.page);
        auto_refresh.on_countdown(move |secs| {
            with_page(&countdown_page, |p| {
                if let Some(c) = p.container_mut(REFRESH_COUNTDOWN) {
                    c.set_text(format!("{secs}s"));
                }
            });
        });

        let cb_cycle = Arc::clone(&cycle);
        let refresh_cb = callback(move || {
            let cycle = Arc::clone(&cb_cycle);
            async move {
                cycle.run().await;
            }
        });
        auto_refresh.start(Arc::clone(&refresh_cb));
        info!(interval_ms = auto_refresh.interval().as_millis() as u64, "monitoring dashboard started");

        Self {
            cycle,
            refresh_cb,
            auto_refresh,
        }
    }

    /// One metrics-then-alerts load with no timers, for one-shot rendering.
    pub async fn render_once(api: Arc<MonitoringApi>, page: SharedPage) -> bool {
        DashboardCycle { api, page }.run().await
    }

    pub fn page(&self) -> &SharedPage {
        &self.cycle.page
    }

    pub async fn load_metrics(&self) -> Result<usize, MonitorError> {
        self.cycle.load_metrics().await
    }

    pub async fn load_alerts(&self) -> Result<usize, MonitorError> {
        self.cycle.load_alerts().await
    }

    pub fn auto_refresh(&self) -> &AutoRefresh {
        &self.auto_refresh
    }

    /// Out-of-band refresh; the countdown restarts from the full interval.
    pub fn refresh_now(&mut self) {
        self.auto_refresh.refresh_now(Arc::clone(&self.refresh_cb));
    }

    pub fn pause(&mut self) {
        self.auto_refresh.pause();
    }

    pub fn resume(&mut self) -> bool {
        self.auto_refresh.resume(Arc::clone(&self.refresh_cb))
    }

    pub fn set_interval(&mut self, interval: std::time::Duration) {
        self.auto_refresh.set_interval(interval);
    }

    /// Stop the refresh cycle. In-flight fetches still complete.
    pub fn shutdown(&mut self) {
        self.auto_refresh.stop();
        info!("monitoring dashboard stopped");
    }
}
