//! Perkstreak local companion server.
//!
//! Serves the tracker's static files and keeps two files in sync for OBS:
//! the progress summary (`progress.json`) and the rendered overlay page
//! (`streamer-overlay.html`). The tracker pushes to it on a best-effort
//! basis; nothing here is required for the tracker itself to work.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::State;
use axum::handler::HandlerWithoutStateExt;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Map, Value, json};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use perkstreak_server::tracker::overlay::{
    OverlayUpdate, ProgressSummary, UPDATE_OVERLAY_PATH, UPDATE_PROGRESS_PATH,
};

pub mod page;

pub const PROGRESS_PATH: &str = "/api/progress";

/// Totals reported before the tracker has pushed anything.
pub const DEFAULT_KILLER_TOTAL: usize = 40;
pub const DEFAULT_SURVIVOR_TOTAL: usize = 48;

#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Directory served for every non-API path.
    pub root: PathBuf,
    pub progress_file: PathBuf,
    pub overlay_file: PathBuf,
}

impl OverlayConfig {
    /// Relative file paths are resolved against `root`, so the overlay page
    /// is reachable through the static file service.
    pub fn new(root: impl Into<PathBuf>, progress_file: &Path, overlay_file: &Path) -> Self {
        let root = root.into();
        Self {
            progress_file: root.join(progress_file),
            overlay_file: root.join(overlay_file),
            root,
        }
    }

    /// URL path of the overlay page, if it lives under `root`.
    pub fn overlay_url_path(&self) -> Option<String> {
        let rel = self.overlay_file.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(format!("/{}", parts.join("/")))
    }
}

pub struct AppState {
    pub config: OverlayConfig,
    /// Serializes file writes so concurrent pushes never interleave.
    write_lock: tokio::sync::Mutex<()>,
}

impl AppState {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }
}

type ApiError = (StatusCode, Json<Value>);

pub fn build_router(state: AppState) -> Router {
    let files = ServeDir::new(&state.config.root).not_found_service(not_found.into_service());

    Router::new()
        .route(PROGRESS_PATH, get(api_progress))
        .route(UPDATE_PROGRESS_PATH, post(api_update_progress))
        .route(UPDATE_OVERLAY_PATH, post(api_update_overlay))
        .fallback_service(files)
        .with_state(Arc::new(state))
        // The tracker page is the only expected caller. Pages from other
        // origins must not be able to read or overwrite local progress.
        .layer(local_only_cors())
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html("<h1>404 Not Found</h1>"))
}

fn default_progress() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("killerCompleted".into(), json!(0));
    map.insert("killerTotal".into(), json!(DEFAULT_KILLER_TOTAL));
    map.insert("survivorCompleted".into(), json!(0));
    map.insert("survivorTotal".into(), json!(DEFAULT_SURVIVOR_TOTAL));
    map
}

fn internal_error<E: std::fmt::Display>(ctx: &'static str) -> impl FnOnce(E) -> ApiError {
    move |e| {
        warn!(error = %e, "{ctx}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": format!("{ctx}: {e}") })),
        )
    }
}

/// Read the saved summary, shallow-merged over the defaults. A missing file
/// is not an error.
pub async fn read_progress(path: &Path) -> anyhow::Result<Map<String, Value>> {
    let mut merged = default_progress();
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(merged),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_str::<Value>(&text)? {
        Value::Object(saved) => merged.extend(saved),
        other => anyhow::bail!("expected a JSON object, found {other}"),
    }
    Ok(merged)
}

async fn api_progress(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let merged = read_progress(&state.config.progress_file)
        .await
        .map_err(internal_error("progress.read"))?;
    Ok(Json(Value::Object(merged)))
}

async fn api_update_progress(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let pretty = serde_json::to_string_pretty(&body).map_err(internal_error("progress.encode"))?;
    {
        let _guard = state.write_lock.lock().await;
        tokio::fs::write(&state.config.progress_file, pretty)
            .await
            .map_err(internal_error("progress.write"))?;
    }
    let killer = body.get("killerCompleted").cloned().unwrap_or_default();
    let survivor = body.get("survivorCompleted").cloned().unwrap_or_default();
    info!(%killer, %survivor, "progress updated");
    Ok(Json(
        json!({ "success": true, "message": "Progress updated successfully" }),
    ))
}

async fn api_update_overlay(
    State(state): State<Arc<AppState>>,
    Json(update): Json<OverlayUpdate>,
) -> Result<Json<Value>, ApiError> {
    let html = page::render_overlay(&update);
    {
        let _guard = state.write_lock.lock().await;
        tokio::fs::write(&state.config.overlay_file, html)
            .await
            .map_err(internal_error("overlay.write"))?;
    }
    info!(
        at = %chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "overlay updated"
    );
    Ok(Json(
        json!({ "success": true, "message": "Overlay updated successfully" }),
    ))
}

/// Write a starter overlay page unless one already exists. An existing page
/// may be hand-customized and is left alone. Returns whether a file was
/// written.
pub async fn ensure_overlay_file(config: &OverlayConfig) -> anyhow::Result<bool> {
    if tokio::fs::try_exists(&config.overlay_file).await? {
        info!(path = %config.overlay_file.display(), "overlay file preserved");
        return Ok(false);
    }
    let initial = OverlayUpdate {
        progress: ProgressSummary {
            killer_total: DEFAULT_KILLER_TOTAL,
            survivor_total: DEFAULT_SURVIVOR_TOTAL,
            ..ProgressSummary::default()
        },
        ..OverlayUpdate::default()
    };
    tokio::fs::write(&config.overlay_file, page::render_overlay(&initial)).await?;
    info!(path = %config.overlay_file.display(), "overlay file created");
    Ok(true)
}

pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    config: OverlayConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<SocketAddr> {
    let app = build_router(AppState::new(config));
    let addr = listener.local_addr()?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(addr)
}

fn local_only_cors() -> CorsLayer {
    use axum::http::Method;
    use axum::http::header;

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _req| {
            is_allowed_local_origin(origin)
        }))
}

fn is_allowed_local_origin(origin: &HeaderValue) -> bool {
    let Ok(s) = origin.to_str() else {
        return false;
    };
    is_http_origin_for_host(s, "localhost") || is_http_origin_for_host(s, "127.0.0.1")
}

fn is_http_origin_for_host(origin: &str, host: &str) -> bool {
    for scheme in ["http://", "https://"] {
        if let Some(rest) = origin.strip_prefix(scheme) {
            if let Some(after) = rest.strip_prefix(host) {
                // scheme://host[:port] only
                return after.is_empty() || after.starts_with(':');
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, header};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn setup() -> (TempDir, OverlayConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = OverlayConfig::new(
            dir.path(),
            Path::new("progress.json"),
            Path::new("streamer-overlay.html"),
        );
        (dir, config)
    }

    fn app(config: &OverlayConfig) -> Router {
        build_router(AppState::new(config.clone()))
    }

    async fn body_string(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn post_json(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn progress_defaults_without_file() {
        let (_dir, config) = setup();
        let resp = app(&config).oneshot(get("/api/progress")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["killerCompleted"], 0);
        assert_eq!(json["killerTotal"], 40);
        assert_eq!(json["survivorTotal"], 48);
    }

    #[tokio::test]
    async fn progress_merges_saved_file() {
        let (_dir, config) = setup();
        std::fs::write(
            &config.progress_file,
            r#"{"killerCompleted":3,"killerTotal":2,"extra":"kept"}"#,
        )
        .unwrap();
        let resp = app(&config).oneshot(get("/api/progress")).await.unwrap();
        let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["killerCompleted"], 3);
        assert_eq!(json["killerTotal"], 2);
        assert_eq!(json["survivorTotal"], 48);
        assert_eq!(json["extra"], "kept");
    }

    #[tokio::test]
    async fn corrupt_progress_file_is_a_server_error() {
        let (_dir, config) = setup();
        std::fs::write(&config.progress_file, "{not json").unwrap();
        let resp = app(&config).oneshot(get("/api/progress")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert!(json["error"].as_str().unwrap().starts_with("progress.read"));
    }

    #[tokio::test]
    async fn update_progress_writes_pretty_json() {
        let (_dir, config) = setup();
        let resp = app(&config)
            .oneshot(post_json(
                UPDATE_PROGRESS_PATH,
                r#"{"killerCompleted":5,"killerTotal":40,"survivorCompleted":1,"survivorTotal":48}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["success"], true);

        let saved = std::fs::read_to_string(&config.progress_file).unwrap();
        assert!(saved.contains("\n  \"killerCompleted\": 5"));

        let resp = app(&config).oneshot(get("/api/progress")).await.unwrap();
        let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["survivorCompleted"], 1);
    }

    #[tokio::test]
    async fn update_progress_accepts_summary_without_counts() {
        let (_dir, config) = setup();
        let resp = app(&config)
            .oneshot(post_json(UPDATE_PROGRESS_PATH, r#"{"completedKillers":[]}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app(&config).oneshot(get("/api/progress")).await.unwrap();
        let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["killerTotal"], 40);
        assert_eq!(json["completedKillers"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let (_dir, config) = setup();
        let resp = app(&config)
            .oneshot(post_json(UPDATE_PROGRESS_PATH, "{oops"))
            .await
            .unwrap();
        assert!(resp.status().is_client_error());
        assert!(!config.progress_file.exists());
    }

    #[tokio::test]
    async fn update_overlay_renders_page() {
        let (_dir, config) = setup();
        let body = r#"{
            "killerCompleted": 2, "killerTotal": 4,
            "survivorCompleted": 0, "survivorTotal": 3,
            "currentKiller": {"name": "The Wraith", "perks": ["Bloodhound"]},
            "settings": {"showKillers": true, "showSurvivors": false,
                         "showCurrentCharacter": true, "compactMode": false},
            "lastUpdated": "2026-01-01T00:00:00Z"
        }"#;
        let resp = app(&config)
            .oneshot(post_json(UPDATE_OVERLAY_PATH, body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let html = std::fs::read_to_string(&config.overlay_file).unwrap();
        assert!(html.contains("2/4"));
        assert!(html.contains("The Wraith"));
        assert!(html.contains("Bloodhound"));
        assert!(!html.contains(r#"id="survivor-card""#));
    }

    #[tokio::test]
    async fn serves_static_files_and_index() {
        let (dir, config) = setup();
        std::fs::write(dir.path().join("index.html"), "<h1>tracker</h1>").unwrap();
        let resp = app(&config).oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "<h1>tracker</h1>");

        let resp = app(&config).oneshot(get("/missing.css")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_string(resp).await.contains("404 Not Found"));
    }

    #[tokio::test]
    async fn cors_allows_only_local_origins() {
        let (_dir, config) = setup();
        let request = |origin: &str| {
            Request::builder()
                .uri("/api/progress")
                .header(header::ORIGIN, origin)
                .body(Body::empty())
                .unwrap()
        };

        let resp = app(&config)
            .oneshot(request("http://localhost:5173"))
            .await
            .unwrap();
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );

        let resp = app(&config)
            .oneshot(request("https://localhost.evil.example"))
            .await
            .unwrap();
        assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn existing_overlay_file_is_preserved() {
        let (_dir, config) = setup();
        assert!(ensure_overlay_file(&config).await.unwrap());
        let first = std::fs::read_to_string(&config.overlay_file).unwrap();
        assert!(first.contains("0/40"));

        std::fs::write(&config.overlay_file, "custom").unwrap();
        assert!(!ensure_overlay_file(&config).await.unwrap());
        assert_eq!(std::fs::read_to_string(&config.overlay_file).unwrap(), "custom");
    }

    #[test]
    fn overlay_url_path_is_relative_to_root() {
        let (_dir, config) = setup();
        assert_eq!(
            config.overlay_url_path().as_deref(),
            Some("/streamer-overlay.html")
        );
    }
}
