//! # Rendering
//!
//! Typed record → markup functions. Every interpolated string goes through
//! [`html_escape`]; there is no placeholder substitution step that could
//! leave a `{{field}}` behind or splice unescaped input into the page.
//!
//! The mutating helpers (`update_metric`, `add_alert`, ...) receive the
//! target [`Container`] explicitly and address items by identity key.

pub mod alert;
pub mod metric;
pub mod page;
pub mod status;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};

pub use alert::AlertRenderer;
pub use metric::MetricRenderer;
pub use page::{Container, Content, Fragments, Item, Page, SharedPage};
pub use status::StatusRenderer;

/// CSS class added to items that animate in.
pub const FADE_IN_CLASS: &str = "fade-in";

/// Staggered entry animation for the n-th rendered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stagger {
    pub delay_ms: u32,
}

impl Stagger {
    /// Delay of `index * step_ms`.
    pub fn nth(index: usize, step_ms: u32) -> Self {
        Self {
            delay_ms: (index as u32).saturating_mul(step_ms),
        }
    }

    /// Extra class list suffix and style attribute for the item wrapper.
    pub(crate) fn attrs(stagger: Option<&Stagger>) -> (String, String) {
        match stagger {
            None => (String::new(), String::new()),
            Some(s) => (
                format!(" {FADE_IN_CLASS}"),
                format!(" style=\"animation-delay: {:.1}s\"", f64::from(s.delay_ms) / 1000.0),
            ),
        }
    }
}

/// The three renderers bundled, as a page needs them.
#[derive(Debug, Clone)]
pub struct Renderers {
    pub metrics: MetricRenderer,
    pub alerts: AlertRenderer,
    pub status: StatusRenderer,
}

impl Renderers {
    pub fn new(utc_offset_minutes: i32) -> Self {
        Self {
            metrics: MetricRenderer,
            alerts: AlertRenderer::new(utc_offset_minutes),
            status: StatusRenderer,
        }
    }
}

impl Default for Renderers {
    fn default() -> Self {
        Self::new(-180)
    }
}

/// Escape text for use in element content and double-quoted attributes.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Fixed offset from minutes east of UTC, falling back to UTC when out of range.
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes.saturating_mul(60))
        .unwrap_or_else(|| Utc.fix())
}

/// Format an ISO-8601 timestamp the way pt-BR users read it: `dd/mm/yyyy HH:MM:SS`.
///
/// Missing or blank input yields an empty string. Zoned timestamps are shifted
/// into `offset`; naive ones are shown as given. Unparseable input is returned
/// unchanged.
pub fn format_timestamp_pt_br(raw: Option<&str>, offset: FixedOffset) -> String {
    let raw = match raw.map(str::trim) {
        None | Some("") => return String::new(),
        Some(r) => r,
    };
    const PT_BR: &str = "%d/%m/%Y %H:%M:%S";

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&offset).format(PT_BR).to_string();
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return naive.format(PT_BR).to_string();
        }
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(
            html_escape(r#"<b class="x">Tom & 'Jerry'</b>"#),
            "&lt;b class=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn escape_leaves_plain_text_and_emoji() {
        assert_eq!(html_escape("Memória ✅"), "Memória ✅");
    }

    #[test]
    fn stagger_nth_multiplies() {
        assert_eq!(Stagger::nth(0, 100).delay_ms, 0);
        assert_eq!(Stagger::nth(3, 200).delay_ms, 600);
    }

    #[test]
    fn stagger_attrs_format_seconds() {
        let (class, style) = Stagger::attrs(Some(&Stagger::nth(2, 100)));
        assert_eq!(class, " fade-in");
        assert_eq!(style, " style=\"animation-delay: 0.2s\"");
        let (class, style) = Stagger::attrs(None);
        assert!(class.is_empty() && style.is_empty());
    }

    #[test]
    fn timestamp_missing_is_empty() {
        let off = offset_from_minutes(-180);
        assert_eq!(format_timestamp_pt_br(None, off), "");
        assert_eq!(format_timestamp_pt_br(Some("  "), off), "");
    }

    #[test]
    fn timestamp_zoned_shifts_to_offset() {
        let off = offset_from_minutes(-180);
        assert_eq!(
            format_timestamp_pt_br(Some("2026-10-15T13:05:09Z"), off),
            "15/10/2026 10:05:09"
        );
    }

    #[test]
    fn timestamp_naive_is_kept_as_is() {
        let off = offset_from_minutes(-180);
        assert_eq!(
            format_timestamp_pt_br(Some("2026-01-02T03:04:05"), off),
            "02/01/2026 03:04:05"
        );
    }

    #[test]
    fn timestamp_garbage_is_returned_unchanged() {
        let off = offset_from_minutes(0);
        assert_eq!(format_timestamp_pt_br(Some("yesterday"), off), "yesterday");
    }

    #[test]
    fn offset_out_of_range_falls_back_to_utc() {
        assert_eq!(offset_from_minutes(100_000).local_minus_utc(), 0);
    }
}
