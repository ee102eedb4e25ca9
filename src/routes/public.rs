use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Listing and reading routes. `{feed}` is `news` or `circulars`; anything else is
/// rejected by the path extractor.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(|| async { "ok" }))
        // GET /{feed}?page=&search=&category=
        // The listing view. Failures are part of the view, never an HTTP error.
        .route("/{feed}", get(handlers::list_articles))
        .route("/{feed}/reload", post(handlers::reload_articles))
        // GET /{feed}/carousel?width=
        .route("/{feed}/carousel", get(handlers::get_carousel))
        .route("/{feed}/carousel/next", post(handlers::carousel_next))
        .route("/{feed}/carousel/prev", post(handlers::carousel_prev))
        .route("/{feed}/carousel/page/{page}", post(handlers::carousel_jump))
        // GET /{feed}/{id}
        .route("/{feed}/{id}", get(handlers::get_article))
}
