use std::sync::LazyLock;

use regex::Regex;

/// Matches the `href` of `<a>` anchors only; `<link>`/`<area>` are ignored.
static ANCHOR_HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});

const SPREADSHEET_EXT: &str = ".xlsx";
const REPORT_MARKER: &str = "warn";

/// An anchor target: the href as written plus its resolved URL.
struct Link {
    raw: String,
    url: url::Url,
}

/// Resolve a raw href against the page URL, fragment stripped.
fn resolve_href(raw: &str, base: Option<&url::Url>) -> Option<url::Url> {
    let mut parsed = if raw.starts_with("http://") || raw.starts_with("https://") {
        url::Url::parse(raw).ok()?
    } else {
        base?.join(raw).ok()?
    };
    parsed.set_fragment(None);
    Some(parsed)
}

/// All anchor links in page order, resolved and deduplicated.
fn extract_links(html: &str, base_url: &str) -> Vec<Link> {
    let base = url::Url::parse(base_url).ok();
    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();

    for cap in ANCHOR_HREF_RE.captures_iter(html) {
        let raw = cap[1].trim();
        if let Some(url) = resolve_href(raw, base.as_ref()) {
            if seen.insert(url.to_string()) {
                links.push(Link {
                    raw: raw.to_string(),
                    url,
                });
            }
        }
    }

    links
}

fn is_spreadsheet(link: &Link) -> bool {
    link.url.path().to_lowercase().ends_with(SPREADSHEET_EXT)
}

/// Only the href as written counts; a relative link inherits the page path,
/// which on the filings page already mentions "warn".
fn mentions_report(link: &Link) -> bool {
    link.raw.to_lowercase().contains(REPORT_MARKER)
}

/// Locate the report download on the filings page. Prefers `.xlsx` anchors
/// whose href mentions "warn"; otherwise the first `.xlsx` anchor of any kind.
pub fn find_spreadsheet_link(html: &str, page_url: &str) -> Option<String> {
    let sheets: Vec<Link> = extract_links(html, page_url)
        .into_iter()
        .filter(is_spreadsheet)
        .collect();

    sheets
        .iter()
        .find(|link| mentions_report(link))
        .or_else(|| sheets.first())
        .map(|link| link.url.to_string())
}
