//! Print the sitemap for the current content

use anyhow::Result;
use std::sync::Arc;

use crate::sitemap::{GenerateSitemapRequest, SitemapGenerator};
use crate::Cms;

pub fn run(cms: &Cms, base_address: Option<&str>) -> Result<()> {
    let generator = SitemapGenerator::new(Arc::new(cms.backend()?));
    let request = GenerateSitemapRequest {
        base_address: base_address
            .unwrap_or(&cms.config.site.sitemap_base_address)
            .to_string(),
    };

    let items = generator.get_items();
    tracing::debug!("Generating sitemap with {} items", items.len());
    print!("{}", generator.generate_sitemap(&request, &items)?);
    Ok(())
}
