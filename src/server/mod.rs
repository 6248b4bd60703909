//! Recommendation web page and JSON API.

mod page;

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};

use axum::{
    extract::{Query, State},
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    response::Html,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::catalog::PopularBook;
use crate::recommend::{RecommendationResult, Recommender, DEFAULT_RECOMMENDATIONS};

pub use page::{escape_html, render_page};

/// Upper bound on `n` accepted by the JSON API.
pub const MAX_RECOMMENDATIONS: usize = 50;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8501;

/// Runtime options for the HTTP server.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    /// Network interface to bind to.
    pub host: IpAddr,
    /// Listening port.
    pub port: u16,
    /// Recommendations shown on the page and returned when `n` is omitted.
    pub count: usize,
    /// Optional static asset directory served as a fallback.
    pub assets_dir: Option<PathBuf>,
    /// Allowed CORS origins for remote front ends.
    pub allow_origins: Vec<String>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            count: DEFAULT_RECOMMENDATIONS,
            assets_dir: None,
            allow_origins: Vec::new(),
        }
    }
}

impl ServerOptions {
    /// Convenience accessor for `(host, port)` tuples.
    pub fn socket_parts(&self) -> (IpAddr, u16) {
        (self.host, self.port)
    }
}

/// Errors that can occur while running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the TCP listener failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The server loop terminated with an error.
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

type AppState = Arc<ServerState>;

struct ServerState {
    recommender: Arc<Recommender>,
    count: usize,
}

/// Binds the listener and serves until Ctrl-C.
pub async fn serve(recommender: Arc<Recommender>, options: ServerOptions) -> Result<(), ServerError> {
    let (host, port) = options.socket_parts();
    let addr = SocketAddr::from((host, port));
    let app = router(recommender.clone(), &options);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    tracing::info!(
        %addr,
        titles = recommender.tables().titles.len(),
        popular = recommender.popular().len(),
        count = options.count,
        assets_dir = ?options.assets_dir,
        allow_origins = ?options.allow_origins,
        "book recommender listening"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Builds the application router around a loaded recommender.
pub fn router(recommender: Arc<Recommender>, options: &ServerOptions) -> Router {
    let state = Arc::new(ServerState {
        recommender,
        count: options.count,
    });
    let cors = build_cors_layer(&options.allow_origins);

    let mut router = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/recommend", get(recommend_handler))
        .route("/api/popular", get(popular_handler));

    if let Some(dir) = options.assets_dir.clone() {
        router = router.fallback_service(ServeDir::new(dir));
    }

    if let Some(layer) = cors {
        router = router.layer(layer);
    }

    router.with_state(state).layer(TraceLayer::new_for_http())
}

fn build_cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let mut allowed = Vec::new();
    for origin in origins {
        let normalized = normalize_origin(origin);
        match normalized
            .as_deref()
            .and_then(|value| HeaderValue::from_str(value).ok())
        {
            Some(value) => allowed.push(value),
            None => {
                tracing::warn!(%origin, ?normalized, "ignoring invalid CORS origin");
            }
        }
    }

    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([ACCEPT, CONTENT_TYPE]),
    )
}

fn normalize_origin(origin: &str) -> Option<String> {
    let trimmed = origin.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

async fn index_handler(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Html<String> {
    Html(render_page(
        &state.recommender,
        params.book.as_deref(),
        state.count,
    ))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        titles: state.recommender.tables().titles.len(),
        popular: state.recommender.popular().len(),
    })
}

async fn recommend_handler(
    State(state): State<AppState>,
    Query(params): Query<RecommendParams>,
) -> Json<RecommendResponse> {
    let n = params.clamped_count(state.count);
    let query = params.book.unwrap_or_default();
    let found = state.recommender.lookup(&query, n);
    tracing::debug!(
        %query,
        n,
        matched = ?found.matched,
        results = found.results.len(),
        "recommend"
    );
    Json(RecommendResponse {
        query,
        matched: found.matched,
        results: found.results,
    })
}

async fn popular_handler(State(state): State<AppState>) -> Json<PopularResponse> {
    Json(PopularResponse {
        books: state.recommender.popular().to_vec(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct PageParams {
    #[serde(default)]
    book: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
struct RecommendParams {
    #[serde(default)]
    book: Option<String>,
    #[serde(default)]
    n: Option<usize>,
}

impl RecommendParams {
    fn clamped_count(&self, default: usize) -> usize {
        self.n.unwrap_or(default).min(MAX_RECOMMENDATIONS)
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    titles: usize,
    popular: usize,
}

#[derive(Debug, Serialize)]
struct RecommendResponse {
    query: String,
    matched: Option<String>,
    results: Vec<RecommendationResult>,
}

#[derive(Debug, Serialize)]
struct PopularResponse {
    books: Vec<PopularBook>,
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => tracing::error!(?err, "failed to listen for shutdown signal"),
    }
}
