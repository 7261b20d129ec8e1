use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use cms_backend::config::PaginationConfig;
use cms_backend::content::{ContentFolder, MarkdownParser, SourceDocument};
use cms_backend::schema::{ContentTypeRegistry, ContentTypeSchema, PropertyDefinition, PropertyKind};
use cms_backend::store::{
    Condition, CountPropertyValuesRequest, EntityFilter, GetEntitiesRequest, GetEntityRequest,
    GetSectionsRequest, SortOrder,
};
use cms_backend::{Cms, CmsBackend, CmsError, ParseError, QueryError};
use cms_backend::store::Snapshot;
use proptest::prelude::*;
use proptest::sample::subsequence;
use serde_json::json;
use tempfile::TempDir;

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

fn blog_type() -> ContentTypeSchema {
    ContentTypeSchema::new("blog")
        .property(PropertyDefinition::required("title", PropertyKind::String))
        .property(PropertyDefinition::optional("tags", PropertyKind::StringArray))
        .property(PropertyDefinition::optional("rating", PropertyKind::Number))
}

fn blog_backend(root: &Path) -> CmsBackend {
    CmsBackend::builder()
        .add_content_type(blog_type())
        .unwrap()
        .with_default_types()
        .unwrap()
        .add_content_folder(ContentFolder::new("blog", root).with_default_type("blog"))
        .build()
        .unwrap()
}

#[test]
fn count_tags_example() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.md", "---\ntitle: A\ntags: [x, y]\n---\n");
    write(dir.path(), "b.md", "---\ntitle: B\ntags: [x]\n---\n");
    let backend = blog_backend(dir.path());

    let rows = backend
        .count_property_values(&CountPropertyValuesRequest {
            content_type: "blog".into(),
            property: "tags".into(),
            filter: EntityFilter::default(),
        })
        .unwrap();
    assert_eq!(
        serde_json::to_value(&rows).unwrap(),
        json!([{"value": "x", "count": 2}, {"value": "y", "count": 1}])
    );
}

#[test]
fn get_entity_single_and_ambiguous() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.md", "---\ntitle: A\ntags: [x, y]\n---\n");
    write(dir.path(), "b.md", "---\ntitle: B\ntags: [x]\n---\n");
    let backend = blog_backend(dir.path());

    let single = backend
        .get_entity(&GetEntityRequest {
            content_type: "blog".into(),
            filter: EntityFilter::default().with(Condition::contains("tags", "y")),
        })
        .unwrap();
    assert_eq!(single["id"], "a");

    let ambiguous = backend.get_entity(&GetEntityRequest {
        content_type: "blog".into(),
        filter: EntityFilter::default().with(Condition::contains("tags", "x")),
    });
    assert!(matches!(
        ambiguous,
        Err(QueryError::AmbiguousResult { count: 2, .. })
    ));
}

#[test]
fn parsed_properties_match_the_document() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "guides/setup.md",
        "---\ntitle: Setup\ntags: [ops]\nrating: 4.5\ncreatedAt: 2024-02-03\n---\n# Setup\n\nSee [[intro]].\n",
    );
    write(dir.path(), "intro.md", "---\ntitle: Introduction\n---\nHello\n");
    let backend = blog_backend(dir.path());

    let record = backend
        .get_entity(&GetEntityRequest {
            content_type: "blog".into(),
            filter: EntityFilter::by_slug("setup"),
        })
        .unwrap();
    assert_eq!(record["title"], "Setup");
    assert_eq!(record["tags"], json!(["ops"]));
    assert_eq!(record["rating"], json!(4.5));
    assert_eq!(record["path"], "guides");
    assert_eq!(record["createdAt"], "2024-02-03T00:00:00Z");
    let content = record["content"].as_str().unwrap();
    assert!(content.contains("<h1>Setup</h1>"));
    assert!(content.contains(r#"<a href="/blog/intro">Introduction</a>"#));
    assert!(backend.snapshot().broken_links().is_empty());
}

#[test]
fn missing_required_property_fails_the_build() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "ok.md", "---\ntitle: Fine\n---\n");
    write(dir.path(), "nested/bad.md", "---\ntags: [x]\n---\n");

    let result = CmsBackend::builder()
        .add_content_type(blog_type())
        .unwrap()
        .add_content_folder(ContentFolder::new("blog", dir.path()).with_default_type("blog"))
        .build();
    match result {
        Err(CmsError::Parse { path, source }) => {
            assert!(path.ends_with("nested/bad.md"));
            assert_eq!(
                source,
                ParseError::MissingProperty {
                    content_type: "blog".into(),
                    property: "title".into(),
                }
            );
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn sections_follow_folders() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "getting-started/install.md", "---\ntitle: Install\n---\n");
    write(dir.path(), "getting-started/cli/usage.md", "---\ntitle: Usage\n---\n");
    write(dir.path(), "reference/api.md", "---\ntitle: API\n---\n");
    let backend = blog_backend(dir.path());

    let sections = backend
        .get_sections(&GetSectionsRequest {
            content_type: "blog".into(),
            root_path: None,
        })
        .unwrap();
    assert_eq!(
        serde_json::to_value(&sections).unwrap(),
        json!([
            {
                "path": "getting-started",
                "label": "Getting started",
                "entityCount": 1,
                "totalCount": 2,
                "children": [
                    {"path": "getting-started/cli", "label": "Cli", "entityCount": 1, "totalCount": 1, "children": []}
                ]
            },
            {"path": "reference", "label": "Reference", "entityCount": 1, "totalCount": 1, "children": []}
        ])
    );
}

#[test]
fn cms_loads_configuration_and_builds() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "cms.yml",
        r#"
content_dir: content
folders:
  - name: articles
    path: articles
    default_type: article
site:
  sitemap_base_address: https://example.com
"#,
    );
    write(
        dir.path(),
        "content/articles/hello.md",
        "---\ntitle: Hello\ndescription: First post\nprojects: [cms]\n---\nBody\n",
    );

    let cms = Cms::new(dir.path().join("cms.yml")).unwrap();
    let backend = cms.backend().unwrap();
    assert_eq!(
        backend.registry().type_names(),
        vec!["project", "article", "documentation"]
    );
    assert_eq!(backend.snapshot().entity_count(), 1);
}

#[test]
fn concurrent_readers_see_whole_snapshots() {
    const DOCS: usize = 8;
    const RELOADS: u32 = 10;

    let dir = TempDir::new().unwrap();
    let schema = ContentTypeSchema::new("note")
        .property(PropertyDefinition::required("title", PropertyKind::String))
        .property(PropertyDefinition::required("version", PropertyKind::Number));
    let write_version = |version: u32| {
        for i in 0..DOCS {
            write(
                dir.path(),
                &format!("n{}.md", i),
                &format!("---\ntitle: Note {}\nversion: {}\n---\n", i, version),
            );
        }
    };
    write_version(0);

    let backend = Arc::new(
        CmsBackend::builder()
            .add_content_type(schema)
            .unwrap()
            .add_content_folder(ContentFolder::new("notes", dir.path()).with_default_type("note"))
            .build()
            .unwrap(),
    );

    let request = GetEntitiesRequest {
        content_type: "note".into(),
        page_size: Some(DOCS),
        ..Default::default()
    };

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let backend = backend.clone();
            let request = request.clone();
            scope.spawn(move || {
                for _ in 0..200 {
                    let page = backend.get_entities(&request).unwrap();
                    assert_eq!(page.items.len(), DOCS);
                    let versions: HashSet<String> = page
                        .items
                        .iter()
                        .map(|r| r["version"].to_string())
                        .collect();
                    assert_eq!(versions.len(), 1, "mixed snapshot: {:?}", versions);
                }
            });
        }

        for version in 1..=RELOADS {
            write_version(version);
            backend.reload().unwrap();
        }
    });

    assert_eq!(backend.snapshot().generation(), 1 + RELOADS as u64);
}

fn documents(entries: &[(Option<u8>, Vec<&str>)]) -> Vec<(SourceDocument, Option<String>)> {
    entries
        .iter()
        .enumerate()
        .map(|(i, (rating, tags))| {
            let mut header = format!("title: Entry {}\ntags: [{}]\n", i, tags.join(", "));
            if let Some(rating) = rating {
                header.push_str(&format!("rating: {}\n", rating));
            }
            (
                SourceDocument::new(format!("e{:02}.md", i), &format!("---\n{}---\n", header)),
                Some("blog".to_string()),
            )
        })
        .collect()
}

fn snapshot(entries: &[(Option<u8>, Vec<&str>)]) -> Snapshot {
    let mut registry = ContentTypeRegistry::new();
    registry.register(blog_type()).unwrap();
    Snapshot::from_documents(&registry, documents(entries), &MarkdownParser::default(), 1).unwrap()
}

fn entry_strategy() -> impl Strategy<Value = Vec<(Option<u8>, Vec<&'static str>)>> {
    prop::collection::vec(
        (
            prop::option::of(0u8..4),
            subsequence(vec!["a", "b", "c"], 0..=3),
        ),
        0..25,
    )
}

fn rated_snapshot(ratings: &[f64]) -> Snapshot {
    let mut registry = ContentTypeRegistry::new();
    registry.register(blog_type()).unwrap();
    let documents = ratings
        .iter()
        .enumerate()
        .map(|(i, rating)| {
            (
                SourceDocument::new(
                    format!("r{:02}.md", i),
                    &format!("---\ntitle: Entry {}\nrating: {}\n---\n", i, rating),
                ),
                Some("blog".to_string()),
            )
        })
        .collect();
    Snapshot::from_documents(&registry, documents, &MarkdownParser::default(), 1).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn pagination_over_fractional_ratings_visits_every_entry(
        ratings in prop::collection::vec(-1.0e6f64..1.0e6, 0..20),
        page_size in 1usize..4,
        descending in any::<bool>(),
    ) {
        let snapshot = rated_snapshot(&ratings);
        let pagination = PaginationConfig::default();
        let sort = if descending {
            SortOrder::desc("rating")
        } else {
            SortOrder::asc("rating")
        };
        let mut request = GetEntitiesRequest {
            content_type: "blog".into(),
            sort: Some(sort),
            page_size: Some(page_size),
            ..Default::default()
        };

        let mut seen = Vec::new();
        let mut keys = Vec::new();
        for _ in 0..=ratings.len() {
            let page = snapshot.get_entities(&request, &pagination).unwrap();
            seen.extend(page.items.iter().map(|r| r["id"].as_str().unwrap().to_string()));
            keys.extend(page.items.iter().map(|r| r["rating"].as_f64().unwrap()));
            if !page.has_more {
                break;
            }
            request.page_token = page.next_page_token;
        }

        let unique: HashSet<_> = seen.iter().cloned().collect();
        prop_assert_eq!(unique.len(), seen.len());
        prop_assert_eq!(seen.len(), ratings.len());
        if descending {
            prop_assert!(keys.windows(2).all(|w| w[0] >= w[1]));
        } else {
            prop_assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn pagination_is_exhaustive_and_disjoint(
        entries in entry_strategy(),
        page_size in 1usize..7,
        sort in prop::option::of(prop_oneof![
            Just(SortOrder::asc("rating")),
            Just(SortOrder::desc("rating")),
            Just(SortOrder::desc("title")),
        ]),
    ) {
        let snapshot = snapshot(&entries);
        let pagination = PaginationConfig::default();
        let mut request = GetEntitiesRequest {
            content_type: "blog".into(),
            sort,
            page_size: Some(page_size),
            ..Default::default()
        };

        let mut seen = Vec::new();
        for _ in 0..=entries.len() {
            let page = snapshot.get_entities(&request, &pagination).unwrap();
            prop_assert_eq!(page.total, entries.len());
            prop_assert!(page.items.len() <= page_size);
            seen.extend(page.items.iter().map(|r| r["id"].as_str().unwrap().to_string()));
            if !page.has_more {
                prop_assert!(page.next_page_token.is_none());
                break;
            }
            request.page_token = page.next_page_token;
        }

        let unique: HashSet<_> = seen.iter().cloned().collect();
        prop_assert_eq!(unique.len(), seen.len());
        prop_assert_eq!(seen.len(), entries.len());
    }

    #[test]
    fn counts_sum_to_matching_pairs(entries in entry_strategy(), rating in 0u8..4) {
        let snapshot = snapshot(&entries);

        let all = snapshot
            .count_property_values(&CountPropertyValuesRequest {
                content_type: "blog".into(),
                property: "tags".into(),
                filter: EntityFilter::default(),
            })
            .unwrap();
        let pairs: usize = entries.iter().map(|(_, tags)| tags.len()).sum();
        prop_assert_eq!(all.iter().map(|r| r.count).sum::<usize>(), pairs);
        prop_assert!(all.windows(2).all(|w| w[0].count >= w[1].count));

        let filtered = snapshot
            .count_property_values(&CountPropertyValuesRequest {
                content_type: "blog".into(),
                property: "tags".into(),
                filter: EntityFilter::default().with(Condition::equals("rating", rating as f64)),
            })
            .unwrap();
        let pairs: usize = entries
            .iter()
            .filter(|(r, _)| *r == Some(rating))
            .map(|(_, tags)| tags.len())
            .sum();
        prop_assert_eq!(filtered.iter().map(|r| r.count).sum::<usize>(), pairs);
    }
}
