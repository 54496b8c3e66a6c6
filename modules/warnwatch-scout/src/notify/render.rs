//! Human-readable renderings of an alert: plain text for the console and the
//! text part of an email, HTML for the email's rich part.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use super::{AlertBatch, EntityAlert};

const RULE_WIDTH: usize = 60;
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn alert_subject(entity: &str) -> String {
    format!("New WARN Notice Alert: {entity}")
}

/// Plain-text report for one entity: a header, then each notice as
/// `column: value` lines.
pub fn render_entity_plain(alert: &EntityAlert, checked_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "New WARN notice(s) detected for {}", alert.entity);
    let _ = writeln!(out, "Date: {}", checked_at.format(DATE_FORMAT));
    let _ = writeln!(out, "Count: {} new notice(s)", alert.notices.len());
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    for (i, notice) in alert.notices.iter().enumerate() {
        let _ = writeln!(out, "\nNotice #{}:", i + 1);
        for (column, value) in notice.iter() {
            let _ = writeln!(out, "  {column}: {value}");
        }
    }
    out
}

/// Plain-text report for every entity with new notices.
pub fn render_plain(batch: &AlertBatch) -> String {
    let mut out = String::new();
    for alert in batch.alerts.iter().filter(|a| !a.notices.is_empty()) {
        out.push_str(&render_entity_plain(alert, batch.checked_at));
        out.push('\n');
    }
    out
}

/// HTML report for one entity: one two-column table per notice.
pub fn render_html(alert: &EntityAlert, checked_at: DateTime<Utc>) -> String {
    let mut out = String::from("<html><body>\n");
    let _ = writeln!(out, "<h2>{}</h2>", html_escape(&alert_subject(&alert.entity)));
    let _ = writeln!(
        out,
        "<p><strong>Date:</strong> {}</p>",
        checked_at.format(DATE_FORMAT)
    );
    let _ = writeln!(
        out,
        "<p><strong>Count:</strong> {} new notice(s)</p>",
        alert.notices.len()
    );
    out.push_str("<hr>\n");

    for (i, notice) in alert.notices.iter().enumerate() {
        let _ = writeln!(out, "<h3>Notice #{}</h3>", i + 1);
        out.push_str("<table border=\"1\" cellpadding=\"5\">\n");
        for (column, value) in notice.iter() {
            let _ = writeln!(
                out,
                "<tr><td><strong>{}</strong></td><td>{}</td></tr>",
                html_escape(column),
                html_escape(&value.to_string())
            );
        }
        out.push_str("</table><br>\n");
    }

    out.push_str("</body></html>\n");
    out
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
