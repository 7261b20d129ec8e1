//! Build the store once and report what it contains

use anyhow::Result;

use crate::Cms;

/// Build every folder; fails on any parse error, or on broken links when `strict`
pub fn run(cms: &Cms, strict: bool) -> Result<()> {
    let backend = cms.backend()?;
    let snapshot = backend.snapshot();

    for collection in snapshot.collections() {
        println!("  {}: {} entities", collection.schema().name, collection.len());
    }

    let broken = snapshot.broken_links();
    if !broken.is_empty() {
        println!("Broken links ({}):", broken.len());
        for link in broken {
            println!("  {}/{} -> [[{}]]", link.content_type, link.slug, link.target);
        }
        if strict {
            anyhow::bail!("{} unresolved internal links", broken.len());
        }
    }

    println!(
        "Checked {} entities in {} folders",
        snapshot.entity_count(),
        backend.folders().len()
    );
    Ok(())
}
