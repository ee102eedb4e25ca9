use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Nested under `/admin` behind the admin gate. Each handler additionally checks the
/// permission of its action; the backend re-checks the bearer token regardless.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/counts (GetContact)
        .route("/counts", get(handlers::get_counts))
        // News and circulars (AddNewsPaper)
        .route("/news", post(handlers::create_news))
        .route(
            "/news/{id}",
            put(handlers::update_news).delete(handlers::delete_news),
        )
        // Clients (GetAllUsers)
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/users/{id}/permissions", put(handlers::update_permissions))
        // Board of directors (any admin)
        .route("/board", post(handlers::create_board_member))
        // Image uploads for news (AddNewsPaper)
        .route("/files", post(handlers::upload_file))
}
