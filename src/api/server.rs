//! Rooms API server
//!
//! HTTP JSON API over one in-memory workspace. Edits stay in memory until
//! `POST /api/v1/save` writes the workbook.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::auth::SessionStore;
use crate::config::Settings;
use crate::core::Workspace;
use crate::error::AllocResult;

/// Shared application state
pub struct AppState {
    pub version: String,
    pub settings: Settings,
    pub workspace: RwLock<Workspace>,
    pub sessions: RwLock<SessionStore>,
}

impl AppState {
    pub fn new(settings: Settings, workspace: Workspace) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            sessions: RwLock::new(SessionStore::from_settings(&settings)),
            workspace: RwLock::new(workspace),
            settings,
        }
    }

    /// Open the configured workbook
    pub fn open(settings: Settings) -> AllocResult<Self> {
        settings.ensure_dirs()?;
        let workspace = Workspace::open(&settings)?;
        Ok(Self::new(settings, workspace))
    }
}

/// All routes. Everything under `/api/v1` except login sits behind the
/// session check.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route("/api/v1/logout", post(handlers::logout))
        .route("/api/v1/session", get(handlers::session))
        // Occupants
        .route(
            "/api/v1/occupants",
            get(handlers::list_occupants).post(handlers::add_occupant),
        )
        .route(
            "/api/v1/occupants/:status/:name",
            put(handlers::update_occupant).delete(handlers::delete_occupant),
        )
        .route("/api/v1/occupants/move", post(handlers::move_occupant))
        .route("/api/v1/occupants/assign", post(handlers::assign_occupant))
        // Rooms
        .route(
            "/api/v1/rooms",
            get(handlers::list_rooms).post(handlers::add_room),
        )
        .route("/api/v1/rooms/suggest", get(handlers::suggest))
        .route(
            "/api/v1/rooms/:building/:office",
            put(handlers::update_room).delete(handlers::delete_room),
        )
        .route(
            "/api/v1/rooms/:building/:office/capacity",
            put(handlers::set_capacity),
        )
        // Occupancy and reports
        .route("/api/v1/occupancy", get(handlers::occupancy))
        .route("/api/v1/reports/summary", get(handlers::report_summary))
        .route("/api/v1/reports/buildings", get(handlers::report_buildings))
        .route(
            "/api/v1/reports/utilization",
            get(handlers::report_utilization),
        )
        .route("/api/v1/reports/occupants", get(handlers::report_occupants))
        // Persistence
        .route("/api/v1/save", post(handlers::save))
        .route("/api/v1/reload", post(handlers::reload))
        .route("/api/v1/backup", post(handlers::create_backup))
        .route("/api/v1/backups", get(handlers::list_backups))
        .route(
            "/api/v1/backups/:name/restore",
            post(handlers::restore_backup),
        )
        .route("/api/v1/export/csv", post(handlers::export_csv))
        .route("/api/v1/export/excel", post(handlers::export_excel))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::require_session,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        .route("/api/v1/login", post(handlers::login))
        .merge(protected)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the API server until Ctrl+C or SIGTERM
pub async fn run_api_server(settings: Settings) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    let state = Arc::new(AppState::open(settings)?);
    let app = build_router(state.clone());

    info!("🏢 Rooms API Server starting on http://{}", addr);
    info!(
        "   Workbook: {}",
        state.settings.data_file.display()
    );
    if !state.settings.auth_enabled {
        tracing::warn!("   Authentication is disabled");
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Rooms API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
