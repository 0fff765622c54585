// Urban Density - Map Server
// Runs the pipeline once, then serves the exported document and the choropleth page

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use urban_density::{
    run, to_json, Category, ClassifiedZip, MapConfig, PipelineConfig, RunReport, Summary,
};

#[derive(Parser)]
#[command(name = "urban-density-server")]
#[command(version)]
#[command(about = "Serve classified zip codes and the density map", long_about = None)]
struct Args {
    /// Configuration file (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Mapbox access token for the map page
    #[arg(long, env = "MAPBOX_ACCESS_TOKEN", hide_env_values = true)]
    mapbox_token: Option<String>,
}

/// Shared application state. Built once at startup, never mutated.
struct AppState {
    /// Exported JSON document, served byte for byte
    document: String,
    records: Vec<ClassifiedZip>,
    summary: Summary,
    report: RunReport,
    map: MapConfig,
}

type SharedState = Arc<AppState>;

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

#[derive(Serialize)]
struct SummaryResponse<'a> {
    summary: &'a Summary,
    report: &'a RunReport,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/zips - The exported document, unmodified
async fn get_document(State(state): State<SharedState>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        state.document.clone(),
    )
        .into_response()
}

/// GET /api/zips/:geoid - One classified zip code
async fn get_zip(State(state): State<SharedState>, Path(geoid): Path<String>) -> Response {
    match state.records.iter().find(|r| r.id == geoid) {
        Some(zip) => (StatusCode::OK, Json(ApiResponse::ok(zip))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Unknown GEOID: {}", geoid))),
        )
            .into_response(),
    }
}

/// GET /api/categories/:category - Zip codes of one category
async fn get_category(
    State(state): State<SharedState>,
    Path(category): Path<String>,
) -> Response {
    match category.parse::<Category>() {
        Ok(category) => {
            let zips: Vec<&ClassifiedZip> = state
                .records
                .iter()
                .filter(|r| r.category == category)
                .collect();
            (StatusCode::OK, Json(ApiResponse::ok(zips))).into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e))).into_response(),
    }
}

/// GET /api/summary - Category counts, density statistics, run report
async fn get_summary(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.as_ref();
    Json(ApiResponse::ok(SummaryResponse {
        summary: &state.summary,
        report: &state.report,
    }))
    .into_response()
}

/// GET /api/map-config - Tile source and viewport for the map page
async fn get_map_config(State(state): State<SharedState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.map.clone()))
}

/// GET / - Serve the map page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

fn app(state: SharedState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/zips", get(get_document))
        .route("/zips/:geoid", get(get_zip))
        .route("/categories/:category", get(get_category))
        .route("/summary", get(get_summary))
        .route("/map-config", get(get_map_config))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new("web"))
        .layer(CorsLayer::permissive())
}

fn build_state(config: &PipelineConfig) -> Result<AppState> {
    let output = run(config).context("Pipeline failed")?;
    let document = to_json(&output.records)?;

    Ok(AppState {
        document,
        summary: Summary::from_records(&output.records),
        records: output.records,
        report: output.report,
        map: config.map.clone(),
    })
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut config = PipelineConfig::load_or_default(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(token) = args.mapbox_token {
        config.map.access_token = token;
    }

    println!("🌐 Urban Density - Map Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let state = build_state(&config)?;
    println!("✓ {}", state.summary.summary());
    if state.map.access_token.is_empty() {
        warn!("no Mapbox access token configured; the map page will not load tiles");
    }

    let addr = config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, "listening");
    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/zips", addr);
    println!("   Map: http://{}", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app(Arc::new(state)))
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;
    use urban_density::parse_json;

    fn zip(id: &str, density: Option<f64>, category: Category) -> ClassifiedZip {
        ClassifiedZip {
            id: id.to_string(),
            area_sq_m: 1_000_000,
            population: density.map(|d| d as u64),
            median_year_built: Some(1970),
            density_per_sq_km: density,
            category,
        }
    }

    fn state() -> SharedState {
        let records = vec![
            zip("00601", Some(150.0), Category::SuburbanEarly),
            zip("00602", Some(4000.0), Category::Urban),
            zip("00603", None, Category::Exurban),
        ];
        Arc::new(AppState {
            document: to_json(&records).unwrap(),
            summary: Summary::from_records(&records),
            records,
            report: RunReport::default(),
            map: MapConfig::default(),
        })
    }

    async fn get_body(uri: &str) -> (StatusCode, String) {
        let response = app(state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_document_is_served_unmodified() {
        let (status, body) = get_body("/api/zips").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, state().document);
        assert_eq!(parse_json(&body).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_zip_lookup() {
        let (status, body) = get_body("/api/zips/00602").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"CAT\":\"URBAN\""));

        let (status, _) = get_body("/api/zips/99999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_category_filter() {
        let (status, body) = get_body("/api/categories/suburban_early").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("00601"));
        assert!(!body.contains("00602"));

        let (status, _) = get_body("/api/categories/rural").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_summary_and_health() {
        let (status, body) = get_body("/api/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"total_records\":3"));

        let (status, body) = get_body("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("OK"));
    }

    #[tokio::test]
    async fn test_map_config() {
        let (_, body) = get_body("/api/map-config").await;
        assert!(body.contains("GEOID_Data"));
    }
}
