//! Metric cards.

use super::page::{Container, Content, Item};
use super::{html_escape, Stagger};
use crate::model::Metric;

/// Renders [`Metric`]s as `metric-card` elements keyed by `data-metric-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricRenderer;

impl MetricRenderer {
    pub fn render_metric(&self, metric: &Metric) -> String {
        card(metric, None)
    }

    /// One card per metric, in input order.
    pub fn render_metrics(&self, metrics: &[Metric]) -> String {
        metrics.iter().map(|m| card(m, None)).collect()
    }

    pub fn render_items(&self, items: &[Item<Metric>]) -> String {
        items.iter().map(|i| card(&i.record, i.stagger.as_ref())).collect()
    }

    /// Update the value (and optionally the sub-label) of one rendered card.
    ///
    /// Returns `false` when the container does not hold metrics or no card
    /// carries `id`.
    pub fn update_metric(&self, container: &mut Container, id: &str, value: &str, status: Option<&str>) -> bool {
        let Content::Metrics(items) = container.content_mut() else {
            return false;
        };
        match items.iter_mut().find(|i| i.record.id == id) {
            Some(item) => {
                item.record.value = value.to_string();
                if let Some(status) = status {
                    item.record.status = status.to_string();
                }
                true
            }
            None => false,
        }
    }
}

fn card(metric: &Metric, stagger: Option<&Stagger>) -> String {
    let (fade, style) = Stagger::attrs(stagger);
    format!(
        concat!(
            "<div class=\"metric-card {class}{fade}\" data-metric-id=\"{id}\"{style}>",
            "<div class=\"metric-icon\">{icon}</div>",
            "<div class=\"metric-content\">",
            "<h3 class=\"metric-title\">{title}</h3>",
            "<div class=\"metric-value\">{value}</div>",
            "<div class=\"metric-status\">{status}</div>",
            "</div>",
            "</div>",
        ),
        class = metric.kind.status_class(),
        fade = fade,
        id = html_escape(&metric.id),
        style = style,
        icon = html_escape(&metric.icon),
        title = html_escape(&metric.title),
        value = html_escape(&metric.value),
        status = html_escape(&metric.status),
    )
}
