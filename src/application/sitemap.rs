//! Sitemap entries contributed by routes and their XML rendering.

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// One `<url>` of the sitemap.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapEntry {
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
    pub priority: f32,
}

/// Joins a site base URL, a base path and a route path.
///
/// Each boundary contributes exactly one `/`, whatever slashes the inputs carry.
pub fn canonical_url(base_url: &str, base_path: &str, path: &str) -> String {
    let mut url = base_url.trim_end_matches('/').to_string();
    for segment in [base_path, path] {
        let segment = segment.trim_matches('/');
        if !segment.is_empty() {
            url.push('/');
            url.push_str(segment);
        }
    }
    url
}

pub fn sitemap_xml(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        xml.push_str(&sitemap_entry(entry));
    }
    xml.push_str("</urlset>\n");
    xml
}

fn sitemap_entry(entry: &SitemapEntry) -> String {
    let loc = escape_xml(&entry.url);
    let lastmod = entry.last_modified.format(&Rfc3339).unwrap_or_default();
    if lastmod.is_empty() {
        format!(
            "  <url><loc>{loc}</loc><priority>{:.1}</priority></url>\n",
            entry.priority
        )
    } else {
        format!(
            "  <url><loc>{loc}</loc><lastmod>{lastmod}</lastmod><priority>{:.1}</priority></url>\n",
            entry.priority
        )
    }
}

fn escape_xml(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
