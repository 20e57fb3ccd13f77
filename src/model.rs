//! Monitoring records: metrics, alerts and health checks.
//!
//! Records are produced fresh on every fetch cycle and thrown away once the
//! page has been re-rendered. Decoding is lenient: unknown enum values land
//! in an `Unknown` variant and missing strings default to empty, so one odd
//! record never sinks a whole batch.

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Status classes
// ---------------------------------------------------------------------------

/// Visual severity class shared by metric cards and status rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    Ok,
    Warning,
    Error,
}

impl StatusClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Ok => "ok",
            StatusClass::Warning => "warning",
            StatusClass::Error => "error",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            StatusClass::Ok => "✅",
            StatusClass::Warning => "⚠️",
            StatusClass::Error => "❌",
        }
    }

    /// Classify a free-form health status string, case-insensitively.
    ///
    /// Unrecognized values fail open to [`StatusClass::Ok`].
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "ok" | "healthy" | "operational" | "operacional" | "connected" => StatusClass::Ok,
            "warning" | "degraded" => StatusClass::Warning,
            "error" | "unhealthy" | "offline" => StatusClass::Error,
            _ => StatusClass::Ok,
        }
    }
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

/// Severity tag carried by a [`Metric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Success,
    Warning,
    Danger,
    Error,
    Info,
    #[default]
    #[serde(other)]
    Unknown,
}

impl MetricType {
    pub fn status_class(&self) -> StatusClass {
        match self {
            MetricType::Success => StatusClass::Ok,
            MetricType::Warning => StatusClass::Warning,
            MetricType::Danger | MetricType::Error => StatusClass::Error,
            MetricType::Info | MetricType::Unknown => StatusClass::Ok,
        }
    }
}

/// One labelled KPI shown as a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Stable across refresh cycles; used as the `data-metric-id` attribute.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub value: String,
    #[serde(rename = "type", default)]
    pub kind: MetricType,
    /// Human-readable sub-label under the value.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub icon: String,
}

impl Metric {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        value: impl Into<String>,
        kind: MetricType,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            value: value.into(),
            kind,
            status: String::new(),
            icon: String::new(),
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }
}

/// Backends disagree on whether KPI values are strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Critical,
    Error,
    Warning,
    Info,
    #[default]
    #[serde(other)]
    Unknown,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "critical",
            AlertLevel::Error => "error",
            AlertLevel::Warning => "warning",
            AlertLevel::Info => "info",
            AlertLevel::Unknown => "unknown",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "🔴",
            AlertLevel::Error => "❌",
            AlertLevel::Warning => "⚠️",
            AlertLevel::Info => "ℹ️",
            AlertLevel::Unknown => "🔔",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notable condition surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub level: AlertLevel,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    /// ISO-8601 instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Alert {
    pub fn new(level: AlertLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: None,
            level,
            title: title.into(),
            message: message.into(),
            timestamp: None,
            source: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Identity used for the `data-alert-id` attribute.
    ///
    /// The explicit `id` when present, otherwise `<level>-<slugified title>`.
    pub fn key(&self) -> String {
        if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
            return id.to_string();
        }
        let slug: String = self
            .title
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        format!("{}-{}", self.level, slug.trim_matches('-'))
    }
}

// ---------------------------------------------------------------------------
// HealthCheck
// ---------------------------------------------------------------------------

/// Per-service status record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthCheck {
    pub fn new(service: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            status: status.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status_class(&self) -> StatusClass {
        StatusClass::from_status(&self.status)
    }
}
