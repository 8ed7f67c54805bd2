use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::CredentialCheck;
use crate::repository::Repository;

pub mod routes;

/// Header carrying the admin secret on mutating requests
pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// Server state
pub struct AppState {
    pub repo: Repository,
    pub gate: Arc<dyn CredentialCheck>,
    pub recent_sections: usize,
    pub recent_questions: usize,
}

/// JSON API routes, without static files
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sections", get(routes::list_sections).post(routes::create_section))
        .route(
            "/sections/{id}",
            get(routes::get_section)
                .put(routes::update_section)
                .delete(routes::delete_section),
        )
        .route(
            "/sections/{id}/questions",
            get(routes::list_questions).post(routes::create_question),
        )
        .route(
            "/questions/{id}",
            get(routes::get_question)
                .put(routes::update_question)
                .delete(routes::delete_question),
        )
        .route("/search", get(routes::search))
        .route("/recent", get(routes::recent))
        .route("/stats", get(routes::get_stats))
        .route("/session", post(routes::apply_action))
        .with_state(state)
}

pub async fn start_server(
    port: u16,
    state: AppState,
    static_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut app = router(Arc::new(state));
    if let Some(dir) = static_dir {
        tracing::info!("Serving static UI from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }
    let app = app
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
