use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Session Router Module
///
/// The only routes that write the session.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/session", get(handlers::get_session))
        // The sidebar entries offered to the current session.
        .route("/session/navigation", get(handlers::get_navigation))
}
