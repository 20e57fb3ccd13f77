//! In-process page model: named containers holding typed content.
//!
//! Controllers replace a container's content wholesale on every refresh;
//! renderer helpers mutate individual items in place. Markup is produced on
//! demand by [`Container::inner_html`], so the web layer always serves the
//! latest state.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::{html_escape, Renderers, Stagger};
use crate::model::{Alert, HealthCheck, Metric};

pub const STATUS_CONTAINER: &str = "status-container";
pub const TIMESTAMP: &str = "timestamp";
pub const METRICS_CONTAINER: &str = "metrics-container";
pub const ALERTS_CONTAINER: &str = "alerts-container";
pub const REFRESH_COUNTDOWN: &str = "refresh-countdown";
pub const ERROR_BANNER: &str = "error-banner";

/// Containers the basic status page provides.
pub const BASIC_LAYOUT: &[&str] = &[STATUS_CONTAINER, TIMESTAMP, ERROR_BANNER];

/// Containers the full dashboard provides.
pub const DASHBOARD_LAYOUT: &[&str] = &[
    METRICS_CONTAINER,
    ALERTS_CONTAINER,
    REFRESH_COUNTDOWN,
    STATUS_CONTAINER,
    TIMESTAMP,
    ERROR_BANNER,
];

pub type SharedPage = Arc<Mutex<Page>>;

/// A rendered record plus its entry animation.
#[derive(Debug, Clone, PartialEq)]
pub struct Item<T> {
    pub record: T,
    pub stagger: Option<Stagger>,
}

impl<T> Item<T> {
    pub fn plain(record: T) -> Self {
        Self { record, stagger: None }
    }

    pub fn staggered(record: T, stagger: Stagger) -> Self {
        Self {
            record,
            stagger: Some(stagger),
        }
    }

    /// Wrap a batch, giving item `i` a delay of `i * step_ms`.
    pub fn stagger_all(records: Vec<T>, step_ms: u32) -> Vec<Self> {
        records
            .into_iter()
            .enumerate()
            .map(|(i, r)| Self::staggered(r, Stagger::nth(i, step_ms)))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Content {
    #[default]
    Empty,
    Text(String),
    /// Error notice shown in place of silent console logging. `topic` names
    /// the failing fetch so only its owner clears it.
    Banner { topic: String, message: String },
    Metrics(Vec<Item<Metric>>),
    Alerts(Vec<Item<Alert>>),
    Status(Vec<Item<HealthCheck>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    id: String,
    content: Content,
}

impl Container {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Content::Empty,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut Content {
        &mut self.content
    }

    pub fn set_content(&mut self, content: Content) {
        self.content = content;
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.content = Content::Text(text.into());
    }

    pub fn clear(&mut self) {
        self.content = Content::Empty;
    }

    pub fn inner_html(&self, renderers: &Renderers) -> String {
        match &self.content {
            Content::Empty => String::new(),
            Content::Text(t) => html_escape(t),
            Content::Banner { topic, message } => format!(
                "<div class=\"error-banner-message\" role=\"alert\" data-topic=\"{}\">⚠️ {}</div>",
                html_escape(topic),
                html_escape(message)
            ),
            Content::Metrics(items) => renderers.metrics.render_items(items),
            Content::Alerts(items) => renderers.alerts.render_items(items),
            Content::Status(items) => renderers.status.render_items(items),
        }
    }
}

/// The set of containers a page exposes, addressed by element id.
#[derive(Debug, Clone)]
pub struct Page {
    containers: BTreeMap<String, Container>,
    renderers: Renderers,
}

impl Page {
    pub fn new(ids: &[&str], renderers: Renderers) -> Self {
        let containers = ids
            .iter()
            .map(|id| (id.to_string(), Container::new(*id)))
            .collect();
        Self { containers, renderers }
    }

    pub fn dashboard(renderers: Renderers) -> Self {
        Self::new(DASHBOARD_LAYOUT, renderers)
    }

    pub fn basic(renderers: Renderers) -> Self {
        Self::new(BASIC_LAYOUT, renderers)
    }

    pub fn into_shared(self) -> SharedPage {
        Arc::new(Mutex::new(self))
    }

    pub fn has(&self, id: &str) -> bool {
        self.containers.contains_key(id)
    }

    pub fn container(&self, id: &str) -> Option<&Container> {
        self.containers.get(id)
    }

    /// `None` when the page has no such container; callers skip the step.
    pub fn container_mut(&mut self, id: &str) -> Option<&mut Container> {
        self.containers.get_mut(id)
    }

    pub fn renderers(&self) -> &Renderers {
        &self.renderers
    }

    pub fn container_html(&self, id: &str) -> Option<String> {
        self.containers.get(id).map(|c| c.inner_html(&self.renderers))
    }

    /// Every container's markup, keyed by id.
    pub fn fragments(&self) -> Fragments {
        Fragments(
            self.containers
                .iter()
                .map(|(id, c)| (id.clone(), c.inner_html(&self.renderers)))
                .collect(),
        )
    }
}

/// Container id → inner markup, serialized as a JSON object.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct Fragments(pub BTreeMap<String, String>);

impl Fragments {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    pub fn retain_only(mut self, id: &str) -> Self {
        self.0.retain(|k, _| k == id);
        self
    }
}
