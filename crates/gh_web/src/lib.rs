//! JSON API over story storage and the deduplicator.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use gh_core::Result;
use tower_http::cors::CorsLayer;
use tracing::info;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/stories", get(handlers::list_stories))
        .route("/api/stories/:id", get(handlers::get_story))
        .route("/api/stories/:id/view", post(handlers::view_story))
        .route("/api/stories/:id/like", post(handlers::like_story))
        .route("/api/stories/:id/share", post(handlers::share_story))
        .route(
            "/api/stories/:id/comments",
            get(handlers::list_comments).post(handlers::add_comment),
        )
        .route("/api/comments/:id/report", post(handlers::report_comment))
        .route("/api/dedup", post(handlers::dedup))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_app(state)).await?;
    Ok(())
}

pub mod prelude {
    pub use super::{create_app, serve, AppState};
    pub use gh_core::{Error, Result};
}
