//! Auto-refreshing monitoring dashboard for the AUDITORIA360 platform.
//!
//! Data flows one way: [`api::MonitoringApi`] fetches typed records, the
//! [`dashboard`] controllers hand them to the [`render`] layer, which keeps a
//! shared [`render::Page`] of named containers current. [`refresh::AutoRefresh`]
//! re-runs the controllers on a timer, and [`web`] serves the page.

pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod refresh;
pub mod render;
pub mod web;

pub use api::{DataSource, MonitoringApi, RequestOptions};
pub use config::MonitorConfig;
pub use dashboard::{BasicMonitor, MonitoringDashboard};
pub use error::{MonitorError, Result};
pub use model::{Alert, AlertLevel, HealthCheck, Metric, MetricType, StatusClass};
pub use refresh::{AutoRefresh, OverlapPolicy, RefreshState};
pub use render::{Page, Renderers, SharedPage};
