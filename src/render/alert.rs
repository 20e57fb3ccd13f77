//! Alert list and the healthy "no alerts" shell.

use chrono::FixedOffset;

use super::page::{Container, Content, Item};
use super::{format_timestamp_pt_br, html_escape, offset_from_minutes, Stagger};
use crate::model::Alert;

/// Markup shown instead of an empty list. Part of the UI contract.
pub const NO_ALERTS_HTML: &str = concat!(
    "<div class=\"no-alerts\">",
    "<span class=\"no-alerts-icon\">✅</span>",
    "<p>No active alerts</p>",
    "<small>System healthy</small>",
    "</div>",
);

#[derive(Debug, Clone)]
pub struct AlertRenderer {
    offset: FixedOffset,
}

impl Default for AlertRenderer {
    fn default() -> Self {
        Self::new(-180)
    }
}

impl AlertRenderer {
    pub fn new(utc_offset_minutes: i32) -> Self {
        Self {
            offset: offset_from_minutes(utc_offset_minutes),
        }
    }

    /// Offset timestamps are shifted into before display.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn render_alert(&self, alert: &Alert) -> String {
        self.item(alert, None)
    }

    /// The list shell with every alert, or [`NO_ALERTS_HTML`] when empty.
    pub fn render_alerts(&self, alerts: &[Alert]) -> String {
        if alerts.is_empty() {
            return NO_ALERTS_HTML.to_string();
        }
        let items: String = alerts.iter().map(|a| self.item(a, None)).collect();
        list_shell(&items)
    }

    pub fn render_items(&self, items: &[Item<Alert>]) -> String {
        if items.is_empty() {
            return NO_ALERTS_HTML.to_string();
        }
        let inner: String = items.iter().map(|i| self.item(&i.record, i.stagger.as_ref())).collect();
        list_shell(&inner)
    }

    /// Insert an alert at the top of the list. A container showing the
    /// healthy shell switches to the list.
    pub fn add_alert(&self, container: &mut Container, alert: Alert) -> bool {
        if matches!(container.content(), Content::Empty) {
            container.set_content(Content::Alerts(Vec::new()));
        }
        match container.content_mut() {
            Content::Alerts(items) => {
                items.insert(0, Item::plain(alert));
                true
            }
            _ => false,
        }
    }

    /// Remove every alert whose [`Alert::key`] equals `key`.
    pub fn remove_alert(&self, container: &mut Container, key: &str) -> bool {
        let Content::Alerts(items) = container.content_mut() else {
            return false;
        };
        let before = items.len();
        items.retain(|i| i.record.key() != key);
        items.len() != before
    }

    pub fn clear_alerts(&self, container: &mut Container) {
        container.set_content(Content::Alerts(Vec::new()));
    }

    fn item(&self, alert: &Alert, stagger: Option<&Stagger>) -> String {
        let (fade, style) = Stagger::attrs(stagger);
        let time = format_timestamp_pt_br(alert.timestamp.as_deref(), self.offset);
        let source = alert.source.as_deref().unwrap_or("");
        format!(
            concat!(
                "<div class=\"alert alert-{level}{fade}\" data-alert-id=\"{key}\"{style}>",
                "<span class=\"alert-icon\">{icon}</span>",
                "<div class=\"alert-content\">",
                "<div class=\"alert-title\">{title}</div>",
                "<div class=\"alert-message\">{message}</div>",
                "<div class=\"alert-meta\">",
                "<span class=\"alert-time\">{time}</span>",
                "<span class=\"alert-source\">{source}</span>",
                "</div>",
                "</div>",
                "</div>",
            ),
            level = alert.level,
            fade = fade,
            key = html_escape(&alert.key()),
            style = style,
            icon = alert.level.icon(),
            title = html_escape(&alert.title),
            message = html_escape(&alert.message),
            time = html_escape(&time),
            source = html_escape(source),
        )
    }
}

fn list_shell(items: &str) -> String {
    format!("<div class=\"alerts-list\">{items}</div>")
}
