//! S3 API implementation

pub mod auth;
pub mod classify;
mod errors;
pub mod handlers;
mod xml;

pub use errors::S3Error;

use crate::config::Settings;
use axum::routing::get;
use axum::Router;
use handlers::{delete_object, get_object, get_root, head_object, head_root, put_object, AppState};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the S3 router.
///
/// Only two route shapes exist: the bucket root `/` (virtual-host style
/// HEAD/GET) and the catch-all `/*path`, which path-style requests use for
/// everything and virtual-host requests use for object keys. Bucket and key
/// are derived per request from the Host header and path, not from route
/// captures.
pub fn router(settings: Arc<Settings>) -> Router {
    let state = Arc::new(AppState { settings });

    Router::new()
        .route("/", get(get_root).head(head_root))
        .route(
            "/*path",
            get(get_object)
                .head(head_object)
                .put(put_object)
                .delete(delete_object),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
