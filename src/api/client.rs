//! HTTP client for the monitoring backend, with a mock fallback.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::mock::MockGenerator;
use crate::config::ApiConfig;
use crate::error::{MonitorError, Result};
use crate::model::{Alert, HealthCheck, Metric};

pub const METRICS_ENDPOINT: &str = "/metrics";
pub const ALERTS_ENDPOINT: &str = "/alerts";
pub const HEALTH_ENDPOINT: &str = "/health";

/// Where the domain methods get their records from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Mock,
    Remote,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Mock => write!(f, "mock"),
            DataSource::Remote => write!(f, "remote"),
        }
    }
}

/// Per-call options for [`MonitoringApi::request`].
///
/// Headers given here are merged over `Content-Type: application/json`;
/// a caller-supplied `Content-Type` replaces the default.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Option<Method>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A successful batch and when it arrived.
#[derive(Debug)]
struct Batch<T> {
    at: Instant,
    items: Vec<T>,
}

impl<T: Clone> Batch<T> {
    fn new(items: &[T]) -> Self {
        Self {
            at: Instant::now(),
            items: items.to_vec(),
        }
    }

    fn fresh(slot: &Option<Self>, max_age: Duration) -> Option<Vec<T>> {
        slot.as_ref()
            .filter(|b| b.at.elapsed() <= max_age)
            .map(|b| b.items.clone())
    }
}

/// Most recent successful batch of each kind.
#[derive(Debug, Default)]
struct Latest {
    metrics: Option<Batch<Metric>>,
    alerts: Option<Batch<Alert>>,
    checks: Option<Batch<HealthCheck>>,
}

/// Monitoring data client.
///
/// With a `base_url` the domain methods call the backend; without one they
/// return synthesized data. [`request`](Self::request) always goes to the
/// network. Every successful domain call is also kept as the latest batch of
/// its kind, so the web layer can republish exactly what the page shows.
pub struct MonitoringApi {
    config: ApiConfig,
    client: reqwest::Client,
    mock: Mutex<MockGenerator>,
    latest: Mutex<Latest>,
}

/// Trailing slashes removed; a blank URL means "no backend".
fn normalize_base_url(base_url: Option<String>) -> Option<String> {
    base_url
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
}

impl MonitoringApi {
    /// Build the client, surfacing HTTP client initialisation failures.
    ///
    /// # Errors
    /// `MonitorError::Client` when reqwest cannot set up its TLS backend.
    pub fn try_new(config: ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| MonitorError::Client(e.to_string()))?;
        Ok(Self::with_client(config, client))
    }

    /// Like [`try_new`](Self::try_new), falling back to a default client.
    ///
    /// # Panics
    /// The fallback is `reqwest::Client::default()`, which panics in the
    /// same broken-TLS environments that make the builder fail. Use
    /// [`try_new`](Self::try_new) where that must be reported.
    pub fn new(config: ApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_default();
        Self::with_client(config, client)
    }

    fn with_client(mut config: ApiConfig, client: reqwest::Client) -> Self {
        config.base_url = normalize_base_url(config.base_url.take());
        let mock = match config.mock_seed {
            Some(seed) => MockGenerator::seeded(seed),
            None => MockGenerator::from_entropy(),
        };

        Self {
            config,
            client,
            mock: Mutex::new(mock),
            latest: Mutex::new(Latest::default()),
        }
    }

    /// Mock-backed client with a fixed seed.
    pub fn mock(seed: u64) -> Self {
        Self::new(ApiConfig {
            mock_seed: Some(seed),
            ..ApiConfig::default()
        })
    }

    /// Remote-backed client targeting `base_url`.
    pub fn remote(base_url: impl Into<String>) -> Self {
        Self::new(ApiConfig {
            base_url: Some(base_url.into()),
            ..ApiConfig::default()
        })
    }

    pub fn source(&self) -> DataSource {
        if self.config.base_url.is_some() {
            DataSource::Remote
        } else {
            DataSource::Mock
        }
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or("")
    }

    /// Last metrics batch any caller received, if it is at most `max_age` old.
    pub fn latest_metrics(&self, max_age: Duration) -> Option<Vec<Metric>> {
        Batch::fresh(&self.lock_latest().metrics, max_age)
    }

    pub fn latest_alerts(&self, max_age: Duration) -> Option<Vec<Alert>> {
        Batch::fresh(&self.lock_latest().alerts, max_age)
    }

    pub fn latest_health_checks(&self, max_age: Duration) -> Option<Vec<HealthCheck>> {
        Batch::fresh(&self.lock_latest().checks, max_age)
    }

    pub async fn get_metrics(&self) -> Result<Vec<Metric>> {
        let metrics = match self.source() {
            DataSource::Mock => self.with_mock(MockGenerator::metrics),
            DataSource::Remote => self.fetch_collection(METRICS_ENDPOINT, "metrics").await?,
        };
        self.lock_latest().metrics = Some(Batch::new(&metrics));
        Ok(metrics)
    }

    /// An empty vector means "no active alerts", not a failure.
    pub async fn get_alerts(&self) -> Result<Vec<Alert>> {
        let alerts = match self.source() {
            DataSource::Mock => self.with_mock(MockGenerator::alerts),
            DataSource::Remote => self.fetch_collection(ALERTS_ENDPOINT, "alerts").await?,
        };
        self.lock_latest().alerts = Some(Batch::new(&alerts));
        Ok(alerts)
    }

    pub async fn get_health_checks(&self) -> Result<Vec<HealthCheck>> {
        let checks = match self.source() {
            DataSource::Mock => self.with_mock(MockGenerator::health_checks),
            DataSource::Remote => self.fetch_collection(HEALTH_ENDPOINT, "checks").await?,
        };
        self.lock_latest().checks = Some(Batch::new(&checks));
        Ok(checks)
    }

    /// Issue a request against `base_url + endpoint` and decode the JSON body.
    ///
    /// # Returns
    /// - `Err(MonitorError::InvalidHeader)`: a caller header is not valid HTTP.
    /// - `Err(MonitorError::Connect)`: no response (refused, timeout, bad URL).
    /// - `Err(MonitorError::Http)`: the server replied with a non-2xx status.
    /// - `Err(MonitorError::Decode)`: the body is not the expected JSON.
    ///
    /// # Panics
    /// This function never panics.
    pub async fn request<T: DeserializeOwned>(&self, endpoint: &str, options: RequestOptions) -> Result<T> {
        let url = format!("{}{}", self.base_url(), endpoint);
        let headers = merge_headers(&options.headers)?;
        let method = options.method.unwrap_or(Method::GET);
        debug!(%method, url = %url, "monitoring request");

        let mut builder = self.client.request(method, &url).headers(headers);
        if let Some(body) = &options.body {
            builder = builder.body(body.to_string());
        }

        let resp = builder.send().await.map_err(|e| MonitorError::Connect {
            url: url.clone(),
            detail: e.to_string(),
        })?;

        if !resp.status().is_success() {
            return Err(MonitorError::Http {
                status: resp.status().as_u16(),
                url,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| MonitorError::Decode {
            url: url.clone(),
            detail: e.to_string(),
        })?;

        serde_json::from_slice(&bytes).map_err(|e| MonitorError::Decode {
            url,
            detail: e.to_string(),
        })
    }

    async fn fetch_collection<T: DeserializeOwned>(&self, endpoint: &str, key: &str) -> Result<Vec<T>> {
        let value: Value = self.request(endpoint, RequestOptions::default()).await?;
        collection_from_value(value, key).map_err(|e| MonitorError::Decode {
            url: format!("{}{}", self.base_url(), endpoint),
            detail: e.to_string(),
        })
    }

    fn lock_latest(&self) -> std::sync::MutexGuard<'_, Latest> {
        self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_mock<T>(&self, f: impl FnOnce(&mut MockGenerator) -> Vec<T>) -> Vec<T> {
        match self.mock.lock() {
            Ok(mut generator) => f(&mut *generator),
            Err(poisoned) => f(&mut *poisoned.into_inner()),
        }
    }
}

/// Merge caller headers over the JSON content type.
fn merge_headers(extra: &[(String, String)]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| MonitorError::InvalidHeader(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| MonitorError::InvalidHeader(format!("{name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Normalise a collection response to a vector.
///
/// Accepts a bare array, `null`, or an object carrying the array under `key`
/// so the dashboard keeps working across backend envelope changes.
fn collection_from_value<T: DeserializeOwned>(value: Value, key: &str) -> std::result::Result<Vec<T>, serde_json::Error> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => serde_json::from_value(value),
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Null) => Ok(Vec::new()),
            Some(inner) => serde_json::from_value(inner),
            None => Err(<serde_json::Error as serde::de::Error>::custom(format!(
                "expected an array or an object with `{key}`"
            ))),
        },
        other => serde_json::from_value(other),
    }
}
