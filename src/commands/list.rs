//! List content types and entities

use anyhow::Result;

use crate::Cms;

/// List registered types, or the entities of one type
pub fn run(cms: &Cms, content_type: Option<&str>) -> Result<()> {
    let backend = cms.backend()?;
    let snapshot = backend.snapshot();

    match content_type {
        None => {
            println!("Content types ({}):", backend.registry().len());
            for collection in snapshot.collections() {
                let schema = collection.schema();
                println!(
                    "  {} ({} entities, {} properties)",
                    schema.name,
                    collection.len(),
                    schema.properties.len()
                );
            }
        }
        Some(name) => {
            let collection = snapshot.collection(name).map_err(|_| {
                anyhow::anyhow!(
                    "Unknown type: {}. Available: {}",
                    name,
                    backend.registry().type_names().join(", ")
                )
            })?;
            println!("{} ({}):", name, collection.len());
            for entity in collection.entities() {
                let path = entity.section_path();
                println!(
                    "  {} - {} [{}]",
                    entity.id(),
                    entity.title().unwrap_or("(untitled)"),
                    if path.is_empty() { "/" } else { path.as_str() }
                );
            }
        }
    }

    Ok(())
}
