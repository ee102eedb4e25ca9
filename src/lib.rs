use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core: listing state, session and gate.
pub mod auth;
pub mod carousel;
pub mod listing;
pub mod session;

// Collaborators: remote backend, durable store, configuration.
pub mod backend;
pub mod config;
pub mod dates;
pub mod error;
pub mod models;
pub mod storage;

// Portal shell.
pub mod handlers;
pub mod routes;
use routes::{admin, public, session as session_routes};

use auth::CurrentSession;
use backend::{ArticleSource, Feed, UserSource};
use carousel::{Carousel, CarouselTicker};
use listing::{ListingController, ListingOptions};
use models::{NewsArticle, UserAccount};

// --- Public Re-exports ---

pub use backend::{BackendState, HttpBackend, PortalBackend};
pub use config::AppConfig;
pub use error::PortalError;
pub use session::SessionService;
pub use storage::{FileStore, MemoryStore, StoreState};

/// ApiDoc
///
/// OpenAPI document of the portal shell, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_articles, handlers::reload_articles, handlers::get_article,
        handlers::get_carousel, handlers::carousel_next, handlers::carousel_prev,
        handlers::carousel_jump, handlers::login, handlers::logout, handlers::get_session,
        handlers::get_navigation, handlers::get_counts, handlers::create_news,
        handlers::update_news, handlers::delete_news, handlers::list_users,
        handlers::get_user, handlers::create_user, handlers::update_user,
        handlers::update_permissions, handlers::delete_user,
        handlers::create_board_member, handlers::upload_file
    ),
    components(
        schemas(
            models::NewsArticle, models::UserAccount, models::LoginRequest,
            models::NewsInput, models::UserInput, models::PermissionUpdate,
            models::DashboardCounts, models::UploadedFile, session::Session, session::SessionState,
            auth::NavItem, auth::AdminAction, backend::Feed, carousel::Carousel,
            listing::FilterState, listing::SearchMode, listing::ListingStatus,
            handlers::CarouselView, handlers::ArticleDetail, handlers::SessionView,
        )
    ),
    tags(
        (name = "chamber-portal", description = "Chamber portal shell API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Everything the shell shares across requests. The listing controllers and carousel
/// tickers live as long as the process, so a view keeps its page and filter between
/// requests the way an open browser tab does.
#[derive(Clone)]
pub struct AppState {
    pub backend: BackendState,
    pub sessions: SessionService,
    pub config: AppConfig,
    pub news: Arc<ListingController<NewsArticle>>,
    pub circulars: Arc<ListingController<NewsArticle>>,
    pub users: Arc<ListingController<UserAccount>>,
    // First page of each feed, never paged, behind the home carousels.
    pub news_front_page: Arc<ListingController<NewsArticle>>,
    pub circulars_front_page: Arc<ListingController<NewsArticle>>,
    pub news_carousel: Arc<CarouselTicker>,
    pub circulars_carousel: Arc<CarouselTicker>,
}

impl AppState {
    /// Builds the controllers and starts both carousel tickers. Must be called from
    /// within a tokio runtime.
    pub fn new(config: AppConfig, backend: BackendState, sessions: SessionService) -> Self {
        let article_listing = |feed: Feed| {
            Arc::new(ListingController::new(
                Arc::new(ArticleSource::new(backend.clone(), feed)),
                ListingOptions::from_config(feed.label(), &config),
            ))
        };
        let news = article_listing(Feed::News);
        let circulars = article_listing(Feed::Circulars);
        let news_front_page = article_listing(Feed::News);
        let circulars_front_page = article_listing(Feed::Circulars);

        let users = Arc::new(ListingController::new(
            Arc::new(UserSource::new(backend.clone())),
            ListingOptions::from_config("users", &config),
        ));

        let ticker = || {
            Arc::new(CarouselTicker::spawn(
                Carousel::for_width(0, u32::MAX),
                config.carousel_interval,
            ))
        };
        let news_carousel = ticker();
        let circulars_carousel = ticker();

        Self {
            backend,
            sessions,
            config,
            news,
            circulars,
            users,
            news_front_page,
            circulars_front_page,
            news_carousel,
            circulars_carousel,
        }
    }

    pub fn articles(&self, feed: Feed) -> &ListingController<NewsArticle> {
        match feed {
            Feed::News => &self.news,
            Feed::Circulars => &self.circulars,
        }
    }

    /// The page-1 listing a carousel shows, independent of the paged listing.
    pub fn front_page(&self, feed: Feed) -> &ListingController<NewsArticle> {
        match feed {
            Feed::News => &self.news_front_page,
            Feed::Circulars => &self.circulars_front_page,
        }
    }

    pub fn carousel(&self, feed: Feed) -> &CarouselTicker {
        match feed {
            Feed::News => &self.news_carousel,
            Feed::Circulars => &self.circulars_carousel,
        }
    }

    /// An article mutation can change either feed.
    pub async fn refresh_articles(&self) {
        tokio::join!(
            self.news.refresh(),
            self.circulars.refresh(),
            self.news_front_page.refresh(),
            self.circulars_front_page.refresh(),
        );
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for SessionService {
    fn from_ref(app_state: &AppState) -> SessionService {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for BackendState {
    fn from_ref(app_state: &AppState) -> BackendState {
        app_state.backend.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// admin_gate
///
/// Keeps the admin routes out of reach of sessions the admin area is not offered to:
/// anonymous visitors get 401, non-admin sessions 403. Each admin handler then checks
/// the permission of its own action. The backend still authorizes every call.
async fn admin_gate(session: CurrentSession, request: Request, next: Next) -> Response {
    match session.get() {
        None => PortalError::Unauthorized("no session".to_string()).into_response(),
        Some(_) if !auth::can_enter_admin(session.get()) => {
            PortalError::not_offered().into_response()
        }
        Some(_) => next.run(request).await,
    }
}

/// create_router
///
/// Assembles the shell routes, the admin gate and the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(session_routes::session_routes())
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                admin_gate,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one shell request, correlated by `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
