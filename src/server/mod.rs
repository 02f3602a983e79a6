#![forbid(unsafe_code)]

//! JSON HTTP API over a shared [`Catalog`].
//!
//! Every response uses the envelope `{"ok": true, "data": ...}` or
//! `{"ok": false, "message": "..."}`. Mutating endpoints allocate ids on the
//! server and save through the catalog's persistence backend.

mod handlers;

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::{Arc, OnceLock},
};

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    response::Html,
    routing::{get, post},
    Router,
};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{fmt, EnvFilter};

use crate::store::Catalog;

/// Runtime options used to boot the HTTP server.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    /// Network interface to bind to.
    pub host: IpAddr,
    /// Listening port.
    pub port: u16,
    /// Optional static asset directory for a browser front end.
    pub assets_dir: Option<PathBuf>,
    /// Allowed CORS origins; `*` allows any.
    pub allow_origins: Vec<String>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
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
    /// Binding or serving failed.
    #[error("server i/o error: {0}")]
    Io(#[from] std::io::Error),
}

type AppState = Arc<ServerState>;

struct ServerState {
    catalog: Arc<Catalog>,
    // Held across "pick next id" and "insert" so concurrent adds never
    // race for the same id.
    allocation: Mutex<()>,
}

/// Starts the server and runs until ctrl-c.
pub async fn serve(catalog: Arc<Catalog>, options: ServerOptions) -> Result<(), ServerError> {
    install_tracing_subscriber("info");

    let (host, port) = options.socket_parts();
    let app = build_router(catalog, &options);
    let addr = SocketAddr::from((host, port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        %addr,
        assets_dir = ?options.assets_dir,
        allow_origins = ?options.allow_origins,
        "catalog api listening"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Builds the full router. Exposed so tests can drive it without a socket.
pub fn build_router(catalog: Arc<Catalog>, options: &ServerOptions) -> Router {
    let state = Arc::new(ServerState {
        catalog,
        allocation: Mutex::new(()),
    });
    let cors = build_cors_layer(&options.allow_origins);

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/series", get(handlers::list_series))
        .route("/api/techs", get(handlers::list_techs))
        .route("/api/models", get(handlers::list_models))
        .route("/api/model", get(handlers::model_detail))
        .route("/api/search", get(handlers::search))
        .route("/api/stats", get(handlers::stats))
        .route("/api/graph", get(handlers::graph))
        .route("/api/model/add", post(handlers::add_model))
        .route("/api/model/link", post(handlers::link_model))
        .route("/api/tech/add", post(handlers::add_tech))
        .route("/api/series/add", post(handlers::add_series));

    if let Some(dir) = options.assets_dir.clone() {
        let service = ServeDir::new(dir).append_index_html_on_directories(true);
        router = router.fallback_service(service);
    } else {
        router = router.route("/", get(inline_index));
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

    let allow_origin = if origins.iter().any(|origin| origin.trim() == "*") {
        AllowOrigin::any()
    } else {
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
        AllowOrigin::list(allowed)
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
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

async fn inline_index() -> Html<&'static str> {
    Html(
        r#"<!doctype html>
<html lang="zh-CN">
  <head>
    <meta charset="utf-8" />
    <title>dynasty catalog</title>
    <style>
      body { font-family: system-ui, sans-serif; margin: 3rem; line-height: 1.5; }
      code { background: #f4f4f4; padding: 0.1rem 0.3rem; border-radius: 4px; }
    </style>
  </head>
  <body>
    <main>
      <h1>dynasty catalog API</h1>
      <p>
        Try <code>/api/stats</code>, <code>/api/models</code> or
        <code>/api/graph</code>. Pass <code>--assets /path/to/site</code>
        to <code>dynasty serve</code> to serve a front end from here.
      </p>
    </main>
  </body>
</html>"#,
    )
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => tracing::error!(?err, "failed to listen for shutdown signal"),
    }
}

/// Installs a global `tracing` subscriber writing to stderr, once.
///
/// `RUST_LOG` wins over `default_filter` when set.
pub fn install_tracing_subscriber(default_filter: &str) {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
