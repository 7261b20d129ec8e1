//! Sitemap generation over the current content snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{CmsError, Result};
use crate::helpers::{date_xml, entity_url, full_url_for, html_escape};
use crate::store::CmsBackend;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// One sitemap entry, derived per entity on request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapItem {
    #[serde(rename = "type")]
    pub content_type: String,
    pub slug: String,
    pub last_modified: Option<DateTime<Utc>>,
}

impl SitemapItem {
    pub fn url_path(&self) -> String {
        entity_url(&self.content_type, &self.slug)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSitemapRequest {
    pub base_address: String,
}

/// Lists entities from the backend and renders them as a URL set
#[derive(Debug, Clone)]
pub struct SitemapGenerator {
    backend: Arc<CmsBackend>,
}

impl SitemapGenerator {
    pub fn new(backend: Arc<CmsBackend>) -> Self {
        Self { backend }
    }

    /// Every entity of every type, from the published snapshot
    pub fn get_items(&self) -> Vec<SitemapItem> {
        self.backend
            .snapshot()
            .entities()
            .map(|entity| SitemapItem {
                content_type: entity.content_type.clone(),
                slug: entity.slug.clone(),
                last_modified: entity.last_modified(),
            })
            .collect()
    }

    pub fn generate_sitemap(
        &self,
        request: &GenerateSitemapRequest,
        items: &[SitemapItem],
    ) -> Result<String> {
        render_sitemap(&request.base_address, items)
    }
}

/// Render a sitemap document; pure function of its inputs
pub fn render_sitemap(base_address: &str, items: &[SitemapItem]) -> Result<String> {
    validate_base_address(base_address)?;

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!("<urlset xmlns=\"{}\">\n", SITEMAP_NS));

    for item in items {
        xml.push_str("  <url>\n");
        xml.push_str(&format!(
            "    <loc>{}</loc>\n",
            html_escape(&full_url_for(base_address.trim(), &item.url_path()))
        ));
        if let Some(last_modified) = &item.last_modified {
            xml.push_str(&format!("    <lastmod>{}</lastmod>\n", date_xml(last_modified)));
        }
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    Ok(xml)
}

/// Require an absolute http(s) address with a host
fn validate_base_address(base_address: &str) -> Result<()> {
    let address = base_address.trim();
    if address.is_empty() {
        return Err(CmsError::Configuration(
            "sitemap base address is not configured".to_string(),
        ));
    }

    let rest = address
        .strip_prefix("https://")
        .or_else(|| address.strip_prefix("http://"))
        .ok_or_else(|| {
            CmsError::Configuration(format!(
                "sitemap base address must start with http:// or https://: {}",
                address
            ))
        })?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    if host.is_empty() || host.contains(char::is_whitespace) || address.contains(['?', '#']) {
        return Err(CmsError::Configuration(format!(
            "sitemap base address is malformed: {}",
            address
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::parse_date_string;

    fn item(content_type: &str, slug: &str) -> SitemapItem {
        SitemapItem {
            content_type: content_type.into(),
            slug: slug.into(),
            last_modified: None,
        }
    }

    #[test]
    fn test_single_url() {
        let xml = render_sitemap("https://example.com", &[item("blog", "hello")]).unwrap();
        assert_eq!(xml.matches("<url>").count(), 1);
        assert!(xml.contains("<loc>https://example.com/blog/hello</loc>"));
        assert!(xml.contains(SITEMAP_NS));
        assert!(!xml.contains("<lastmod>"));
    }

    #[test]
    fn test_trailing_slash_and_lastmod() {
        let mut entry = item("docs", "intro");
        entry.last_modified = parse_date_string("2024-05-01");
        let xml = render_sitemap("https://example.com/site/", &[entry]).unwrap();
        assert!(xml.contains("<loc>https://example.com/site/docs/intro</loc>"));
        assert!(xml.contains("<lastmod>2024-05-01T00:00:00Z</lastmod>"));
    }

    #[test]
    fn test_empty_item_list() {
        let xml = render_sitemap("http://localhost:4000", &[]).unwrap();
        assert!(xml.contains("<urlset"));
        assert!(!xml.contains("<url>"));
    }

    #[test]
    fn test_invalid_base_address() {
        for address in ["", "   ", "example.com", "ftp://example.com", "https://", "https:///x"] {
            assert!(
                matches!(
                    render_sitemap(address, &[item("blog", "a")]),
                    Err(CmsError::Configuration(_))
                ),
                "{:?} should be rejected",
                address
            );
        }
    }

    #[test]
    fn test_loc_is_escaped() {
        let xml = render_sitemap("https://example.com", &[item("blog", "tom&jerry's")]).unwrap();
        assert!(xml.contains("<loc>https://example.com/blog/tom&amp;jerry&#39;s</loc>"));
    }
}
