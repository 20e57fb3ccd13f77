//! # Monitoring API
//!
//! Single point of contact for monitoring data. Renderers and controllers
//! only ever see typed vectors; whether those came from a remote backend or
//! from the built-in generator is decided here.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let api = MonitoringApi::new(config.api.clone());
//! let metrics = api.get_metrics().await?;
//! let raw: serde_json::Value = api
//!     .request("/reports", RequestOptions::default().header("Authorization", token))
//!     .await?;
//! ```

pub mod client;
pub mod mock;

pub use client::{DataSource, MonitoringApi, RequestOptions};
pub use mock::MockGenerator;
