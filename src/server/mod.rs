//! HTTP façade over the content backend, with optional reload on change

mod error;

pub use error::ApiError;

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode};
use serde_json::{json, Value as JsonValue};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::content::Record;
use crate::sitemap::{GenerateSitemapRequest, SitemapGenerator};
use crate::store::{
    CmsBackend, CountPropertyRow, CountPropertyValuesRequest, GetEntitiesRequest,
    GetEntityRequest, GetSectionsRequest, PaginatedResult, SectionItem,
};
use crate::Cms;

/// Server state
pub struct AppState {
    backend: Arc<CmsBackend>,
    sitemap: SitemapGenerator,
    base_address: String,
}

impl AppState {
    pub fn new(backend: Arc<CmsBackend>, base_address: &str) -> Self {
        Self {
            sitemap: SitemapGenerator::new(backend.clone()),
            backend,
            base_address: base_address.to_string(),
        }
    }
}

/// Build the router with CORS and request tracing
pub fn router(state: Arc<AppState>, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/api/docs/single", post(get_entity))
        .route("/api/docs/list", post(get_entities))
        .route("/api/docs/property-values-count", post(count_property_values))
        .route("/api/docs/sections", post(get_sections))
        .route("/sitemap.xml", get(sitemap))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors))
        .with_state(state)
}

/// CORS restricted to the configured origins, credentials allowed
fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors
        .hosts
        .iter()
        .filter_map(|host| match HeaderValue::from_str(host.trim_end_matches('/')) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", host);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::list([Method::GET, Method::POST, Method::OPTIONS]))
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Start the HTTP server
pub async fn start(
    cms: &Cms,
    backend: Arc<CmsBackend>,
    ip: &str,
    port: u16,
    watch: bool,
) -> Result<()> {
    let state = Arc::new(AppState::new(
        backend.clone(),
        &cms.config.site.sitemap_base_address,
    ));
    let app = router(state, &cms.config.cors);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    if watch {
        println!("Watching content folders for changes...");
    }
    println!("Press Ctrl+C to stop.");

    if watch {
        // Reload rebuilds from the folders the backend was built with
        tracing::info!(
            "Changes to {} take effect after a restart",
            cms.config_path.display()
        );
        let paths = watch_paths(&backend);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_reload(backend, paths) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Directories whose changes can be picked up by `CmsBackend::reload`
fn watch_paths(backend: &CmsBackend) -> Vec<PathBuf> {
    backend.folders().iter().map(|f| f.path.clone()).collect()
}

/// Watch content folders and rebuild the snapshot on change; blocks the calling thread
fn watch_and_reload(backend: Arc<CmsBackend>, paths: Vec<PathBuf>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    // Debounce to avoid multiple rapid rebuilds
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    for path in &paths {
        if !path.exists() {
            continue;
        }
        let mode = if path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        debouncer.watcher().watch(path, mode)?;
        tracing::debug!("Watching: {:?}", path);
    }

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|e| {
                        let path = e.path.to_string_lossy();
                        !path.contains(".git")
                            && !path.contains(".DS_Store")
                            && !path.ends_with('~')
                    })
                    .collect();

                if relevant.is_empty() {
                    continue;
                }

                for event in &relevant {
                    tracing::info!("File changed: {}", event.path.display());
                }

                // A failed rebuild keeps the previous snapshot published
                match backend.reload() {
                    Ok(snapshot) => tracing::info!(
                        "Reloaded {} entities (snapshot {})",
                        snapshot.entity_count(),
                        snapshot.generation()
                    ),
                    Err(e) => tracing::warn!("Reload failed: {}", e),
                }
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

async fn get_entity(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GetEntityRequest>,
) -> std::result::Result<Json<Record>, ApiError> {
    Ok(Json(state.backend.get_entity(&request)?))
}

async fn get_entities(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GetEntitiesRequest>,
) -> std::result::Result<Json<PaginatedResult<Record>>, ApiError> {
    Ok(Json(state.backend.get_entities(&request)?))
}

async fn count_property_values(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CountPropertyValuesRequest>,
) -> std::result::Result<Json<Vec<CountPropertyRow>>, ApiError> {
    Ok(Json(state.backend.count_property_values(&request)?))
}

async fn get_sections(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GetSectionsRequest>,
) -> std::result::Result<Json<Vec<SectionItem>>, ApiError> {
    Ok(Json(state.backend.get_sections(&request)?))
}

async fn sitemap(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let items = state.sitemap.get_items();
    let request = GenerateSitemapRequest {
        base_address: state.base_address.clone(),
    };
    let xml = state.sitemap.generate_sitemap(&request, &items)?;
    Ok(([(header::CONTENT_TYPE, "text/xml")], xml))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<JsonValue> {
    let snapshot = state.backend.snapshot();
    Json(json!({
        "status": "ok",
        "generation": snapshot.generation(),
        "entities": snapshot.entity_count(),
        "builtAt": snapshot.built_at().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentFolder;
    use crate::schema::{ContentTypeSchema, PropertyDefinition, PropertyKind};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app(dir: &TempDir, base_address: &str) -> Router {
        fs::write(
            dir.path().join("hello.md"),
            "---\ntitle: Hello\ntags: [x, y]\n---\nHi",
        )
        .unwrap();
        fs::write(dir.path().join("world.md"), "---\ntitle: World\ntags: [x]\n---\n").unwrap();

        let backend = CmsBackend::builder()
            .add_content_type(
                ContentTypeSchema::new("blog")
                    .property(PropertyDefinition::required("title", PropertyKind::String))
                    .property(PropertyDefinition::optional(
                        "tags",
                        PropertyKind::StringArray,
                    )),
            )
            .unwrap()
            .add_content_folder(ContentFolder::new("blog", dir.path()).with_default_type("blog"))
            .build()
            .unwrap();
        let cors = CorsConfig {
            hosts: vec!["https://example.com".into()],
        };
        router(Arc::new(AppState::new(Arc::new(backend), base_address)), &cors)
    }

    async fn post_json(app: Router, uri: &str, body: JsonValue) -> (StatusCode, JsonValue) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_watch_paths_are_content_folders_only() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("cms.yml"),
            "content_dir: content\nfolders:\n  - name: notes\n    path: notes\n    default_type: article\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("content/notes")).unwrap();

        let cms = crate::Cms::new(dir.path().join("cms.yml")).unwrap();
        let backend = cms.backend().unwrap();
        let paths = watch_paths(&backend);
        assert_eq!(paths, vec![dir.path().join("content").join("notes")]);
        assert!(!paths.contains(&cms.config_path));
    }

    #[tokio::test]
    async fn test_single_and_not_found() {
        let dir = TempDir::new().unwrap();
        let (status, body) = post_json(
            app(&dir, ""),
            "/api/docs/single",
            json!({"type": "blog", "filter": {"slug": "hello"}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Hello");
        assert_eq!(body["url"], "/blog/hello");

        let (status, body) = post_json(
            app(&dir, ""),
            "/api/docs/single",
            json!({"type": "blog", "filter": {"slug": "nope"}}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn test_single_ambiguous() {
        let dir = TempDir::new().unwrap();
        let (status, _) = post_json(
            app(&dir, ""),
            "/api/docs/single",
            json!({"type": "blog", "filter": {"conditions": [{"property": "tags", "value": "x"}]}}),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let dir = TempDir::new().unwrap();
        let (status, body) = post_json(
            app(&dir, ""),
            "/api/docs/list",
            json!({"type": "blog", "pageSize": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["hasMore"], true);
        assert!(body["nextPageToken"].is_string());

        let (status, body) = post_json(
            app(&dir, ""),
            "/api/docs/property-values-count",
            json!({"type": "blog", "property": "tags"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"value": "x", "count": 2}, {"value": "y", "count": 1}])
        );
    }

    #[tokio::test]
    async fn test_unknown_type_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let (status, _) = post_json(
            app(&dir, ""),
            "/api/docs/sections",
            json!({"type": "recipe"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sitemap_xml() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir, "https://example.com")
            .oneshot(Request::builder().uri("/sitemap.xml").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/xml");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let xml = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(xml.contains("<loc>https://example.com/blog/hello</loc>"));
        assert!(xml.contains("<loc>https://example.com/blog/world</loc>"));
    }

    #[tokio::test]
    async fn test_sitemap_without_base_address_fails() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir, "")
            .oneshot(Request::builder().uri("/sitemap.xml").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir, "")
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "https://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://example.com"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }
}
