//! Per-service health rows.

use super::page::{Container, Content, Item};
use super::{html_escape, Stagger};
use crate::model::HealthCheck;

/// Renders [`HealthCheck`]s as `status` rows keyed by `data-service`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusRenderer;

impl StatusRenderer {
    pub fn render_status(&self, checks: &[HealthCheck]) -> String {
        checks.iter().map(|c| row(c, None)).collect()
    }

    pub fn render_status_item(&self, check: &HealthCheck) -> String {
        row(check, None)
    }

    pub fn render_items(&self, items: &[Item<HealthCheck>]) -> String {
        items.iter().map(|i| row(&i.record, i.stagger.as_ref())).collect()
    }

    /// Replace the status (and optionally the message) of the row for `service`.
    ///
    /// Rows are matched on the service name exactly, the same value written
    /// to `data-service`; rendered text is never inspected.
    pub fn update_status(&self, container: &mut Container, service: &str, status: &str, message: Option<&str>) -> bool {
        let Content::Status(items) = container.content_mut() else {
            return false;
        };
        match items.iter_mut().find(|i| i.record.service == service) {
            Some(item) => {
                item.record.status = status.to_string();
                if let Some(message) = message {
                    item.record.message = Some(message.to_string());
                }
                true
            }
            None => false,
        }
    }
}

fn row(check: &HealthCheck, stagger: Option<&Stagger>) -> String {
    let class = check.status_class();
    let (fade, style) = Stagger::attrs(stagger);
    let detail = check
        .message
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(&check.status);
    format!(
        concat!(
            "<div class=\"status {class}{fade}\" data-service=\"{service_attr}\"{style}>",
            "<span class=\"status-icon\">{icon}</span>",
            "<span class=\"status-text\">{service}: {detail}</span>",
            "</div>",
        ),
        class = class,
        fade = fade,
        service_attr = html_escape(&check.service),
        style = style,
        icon = class.icon(),
        service = html_escape(&check.service),
        detail = html_escape(detail),
    )
}
