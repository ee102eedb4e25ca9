use crate::{
    AppState,
    auth::{self, AdminAction, CurrentSession, NavItem},
    backend::Feed,
    carousel::Carousel,
    dates,
    error::PortalError,
    listing::{ALL_CATEGORIES, FilterState, ListRecord, ListingController, ListingView},
    models::{
        BoardMemberInput, DashboardCounts, FileUpload, LoginRequest, NewsArticle, NewsInput,
        PermissionUpdate, RecordId, UploadedFile, UserAccount, UserInput,
    },
    session::{Session, SessionState},
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        multipart::{Field, Multipart, MultipartError},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// --- Query & Response Structs ---

/// ListingParams
///
/// The desired state of a listing view. Absent filter values reset the filter, so a
/// request always describes the whole view.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingParams {
    /// Page to show. Out-of-range values leave the current page in place.
    pub page: Option<u32>,
    pub search: Option<String>,
    /// `all` or an exact category/type value.
    pub category: Option<String>,
}

/// CarouselParams
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CarouselParams {
    /// Viewport width in px; picks the number of items per carousel page.
    pub width: Option<u32>,
}

/// UploadParams
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadParams {
    /// Backend file category, e.g. `image`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// CarouselView
///
/// The carousel position plus the items currently on screen.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarouselView {
    pub carousel: Carousel,
    pub page_count: usize,
    pub items: Vec<NewsArticle>,
}

/// ArticleDetail
///
/// A single article with its date already formatted for display.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetail {
    pub article: NewsArticle,
    pub display_date: Option<String>,
}

/// SessionView
///
/// What the front end needs to render the header and the admin sidebar.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub state: SessionState,
    pub session: Option<Session>,
    pub is_admin: bool,
    pub navigation: Vec<NavItem>,
}

impl SessionView {
    fn of(session: Option<Session>) -> Self {
        let state = if session.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        };
        Self {
            state,
            is_admin: auth::is_admin(session.as_ref()),
            navigation: auth::visible_nav(session.as_ref()),
            session,
        }
    }
}

// --- Helpers ---

async fn apply_params<R: ListRecord>(
    controller: &ListingController<R>,
    params: ListingParams,
) -> ListingView<R> {
    controller.initialize().await;
    controller
        .set_filter(FilterState {
            search_term: params.search.unwrap_or_default(),
            category: params.category.unwrap_or_else(|| ALL_CATEGORIES.to_string()),
        })
        .await;
    if let Some(page) = params.page {
        if page != controller.page_number().await {
            controller.go_to_page(page).await;
        }
    }
    controller.view().await
}

fn ensure_offered(session: &CurrentSession, action: AdminAction) -> Result<(), PortalError> {
    if action.is_offered(session.get()) {
        Ok(())
    } else {
        tracing::debug!(?action, "admin action not offered to this session");
        Err(PortalError::not_offered())
    }
}

fn validate_news(input: &NewsInput) -> Result<(), PortalError> {
    if input.title.trim().is_empty() || input.content.trim().is_empty() {
        return Err(PortalError::Invalid("العنوان والمحتوى مطلوبان".to_string()));
    }
    Ok(())
}

fn validate_user(input: &UserInput) -> Result<(), PortalError> {
    if input.name.trim().is_empty() || input.email.trim().is_empty() {
        return Err(PortalError::Invalid("الاسم والبريد الإلكتروني مطلوبان".to_string()));
    }
    Ok(())
}

fn bad_form(err: MultipartError) -> PortalError {
    PortalError::Invalid(err.body_text())
}

async fn read_file(field: Field<'_>) -> Result<Option<FileUpload>, PortalError> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.map_err(bad_form)?;
    // Browsers send an empty part when no file was picked.
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(FileUpload {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    }))
}

async fn carousel_view(state: &AppState, feed: Feed, width: Option<u32>) -> CarouselView {
    let controller = state.front_page(feed);
    let ticker = state.carousel(feed);

    controller.initialize().await;
    let items = controller.items().await;
    ticker.set_total_items(items.len()).await;
    if let Some(width) = width {
        ticker.resize(width).await;
    }

    let carousel = ticker.snapshot().await;
    CarouselView {
        page_count: carousel.page_count(),
        items: carousel.visible(&items).to_vec(),
        carousel,
    }
}

// --- Public Handlers ---

/// list_articles
///
/// [Public Route] One page of news or circulars, narrowed by search and category.
/// Load failures are reported inside the view (`status = failed`), never as an HTTP error.
#[utoipa::path(
    get,
    path = "/{feed}",
    params(("feed" = Feed, Path, description = "news or circulars"), ListingParams),
    responses((status = 200, description = "Listing view", body = ListingView<NewsArticle>))
)]
pub async fn list_articles(
    State(state): State<AppState>,
    Path(feed): Path<Feed>,
    Query(params): Query<ListingParams>,
) -> Json<ListingView<NewsArticle>> {
    Json(apply_params(state.articles(feed), params).await)
}

/// reload_articles
///
/// [Public Route] Fetches the current page again, e.g. after a retryable failure.
#[utoipa::path(
    post,
    path = "/{feed}/reload",
    params(("feed" = Feed, Path, description = "news or circulars")),
    responses((status = 200, description = "Listing view", body = ListingView<NewsArticle>))
)]
pub async fn reload_articles(
    State(state): State<AppState>,
    Path(feed): Path<Feed>,
) -> Json<ListingView<NewsArticle>> {
    let controller = state.articles(feed);
    controller.reload().await;
    Json(controller.view().await)
}

/// get_article
///
/// [Public Route] A single news item or circular.
#[utoipa::path(
    get,
    path = "/{feed}/{id}",
    params(
        ("feed" = Feed, Path, description = "news or circulars"),
        ("id" = String, Path, description = "Article ID")
    ),
    responses(
        (status = 200, description = "Found", body = ArticleDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_article(
    State(state): State<AppState>,
    Path((_feed, id)): Path<(Feed, String)>,
) -> Result<Json<ArticleDetail>, PortalError> {
    let article = state.backend.get_article(&RecordId(id)).await?;
    let display_date = article.created_at.as_deref().map(dates::display_or_raw);
    Ok(Json(ArticleDetail {
        article,
        display_date,
    }))
}

/// get_carousel
///
/// [Public Route] The home page carousel over the first page of a feed.
#[utoipa::path(
    get,
    path = "/{feed}/carousel",
    params(("feed" = Feed, Path, description = "news or circulars"), CarouselParams),
    responses((status = 200, description = "Carousel", body = CarouselView))
)]
pub async fn get_carousel(
    State(state): State<AppState>,
    Path(feed): Path<Feed>,
    Query(params): Query<CarouselParams>,
) -> Json<CarouselView> {
    Json(carousel_view(&state, feed, params.width).await)
}

/// carousel_next
///
/// [Public Route] Manual forward step. Restarts the auto-advance period.
#[utoipa::path(
    post,
    path = "/{feed}/carousel/next",
    params(("feed" = Feed, Path, description = "news or circulars")),
    responses((status = 200, description = "Carousel", body = CarouselView))
)]
pub async fn carousel_next(
    State(state): State<AppState>,
    Path(feed): Path<Feed>,
) -> Json<CarouselView> {
    state.carousel(feed).advance().await;
    Json(carousel_view(&state, feed, None).await)
}

/// carousel_prev
///
/// [Public Route] Manual backward step. Restarts the auto-advance period.
#[utoipa::path(
    post,
    path = "/{feed}/carousel/prev",
    params(("feed" = Feed, Path, description = "news or circulars")),
    responses((status = 200, description = "Carousel", body = CarouselView))
)]
pub async fn carousel_prev(
    State(state): State<AppState>,
    Path(feed): Path<Feed>,
) -> Json<CarouselView> {
    state.carousel(feed).retreat().await;
    Json(carousel_view(&state, feed, None).await)
}

/// carousel_jump
///
/// [Public Route] End of a drag: jump to a zero-based page. Out-of-range pages are ignored.
#[utoipa::path(
    post,
    path = "/{feed}/carousel/page/{page}",
    params(
        ("feed" = Feed, Path, description = "news or circulars"),
        ("page" = usize, Path, description = "Zero-based carousel page")
    ),
    responses((status = 200, description = "Carousel", body = CarouselView))
)]
pub async fn carousel_jump(
    State(state): State<AppState>,
    Path((feed, page)): Path<(Feed, usize)>,
) -> Json<CarouselView> {
    state.carousel(feed).jump_to(page).await;
    Json(carousel_view(&state, feed, None).await)
}

// --- Session Handlers ---

/// login
///
/// [Session Route] Authenticates against the backend and persists the credential.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = SessionView),
        (status = 401, description = "Rejected credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<LoginRequest>,
) -> Result<Json<SessionView>, PortalError> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(PortalError::Invalid(
            "يرجى إدخال اسم المستخدم وكلمة المرور".to_string(),
        ));
    }
    let session = state
        .sessions
        .login(state.backend.as_ref(), &credentials)
        .await?;
    Ok(Json(SessionView::of(Some(session))))
}

/// logout
///
/// [Session Route] Removes the persisted credential. Always ends anonymous.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 204, description = "Logged out"))
)]
pub async fn logout(State(state): State<AppState>) -> Result<StatusCode, PortalError> {
    state.sessions.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// get_session
#[utoipa::path(
    get,
    path = "/session",
    responses((status = 200, description = "Current session", body = SessionView))
)]
pub async fn get_session(session: CurrentSession) -> Json<SessionView> {
    Json(SessionView::of(session.0))
}

/// get_navigation
///
/// [Session Route] The admin sidebar entries offered to this session.
#[utoipa::path(
    get,
    path = "/session/navigation",
    responses((status = 200, description = "Offered navigation", body = [NavItem]))
)]
pub async fn get_navigation(session: CurrentSession) -> Json<Vec<NavItem>> {
    Json(auth::visible_nav(session.get()))
}

// --- Admin Handlers ---

/// get_counts
///
/// [Admin Route] Totals for the dashboard summary cards.
#[utoipa::path(
    get,
    path = "/admin/counts",
    responses(
        (status = 200, description = "Dashboard counts", body = DashboardCounts),
        (status = 403, description = "Not offered")
    )
)]
pub async fn get_counts(
    session: CurrentSession,
    State(state): State<AppState>,
) -> Result<Json<DashboardCounts>, PortalError> {
    ensure_offered(&session, AdminAction::ViewDashboard)?;
    Ok(Json(state.backend.dashboard_counts().await?))
}

/// create_news
///
/// [Admin Route] Publishes a news item or circular, then refreshes the listings.
#[utoipa::path(
    post,
    path = "/admin/news",
    request_body = NewsInput,
    responses(
        (status = 201, description = "Created"),
        (status = 400, description = "Missing title or content"),
        (status = 403, description = "Not offered")
    )
)]
pub async fn create_news(
    session: CurrentSession,
    State(state): State<AppState>,
    Json(input): Json<NewsInput>,
) -> Result<StatusCode, PortalError> {
    ensure_offered(&session, AdminAction::ManageNews)?;
    validate_news(&input)?;
    state.backend.create_article(&input).await?;
    state.refresh_articles().await;
    Ok(StatusCode::CREATED)
}

/// update_news
#[utoipa::path(
    put,
    path = "/admin/news/{id}",
    params(("id" = String, Path, description = "Article ID")),
    request_body = NewsInput,
    responses((status = 204, description = "Updated"), (status = 403, description = "Not offered"))
)]
pub async fn update_news(
    session: CurrentSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<NewsInput>,
) -> Result<StatusCode, PortalError> {
    ensure_offered(&session, AdminAction::ManageNews)?;
    validate_news(&input)?;
    state.backend.update_article(&RecordId(id), &input).await?;
    state.refresh_articles().await;
    Ok(StatusCode::NO_CONTENT)
}

/// delete_news
#[utoipa::path(
    delete,
    path = "/admin/news/{id}",
    params(("id" = String, Path, description = "Article ID")),
    responses((status = 204, description = "Deleted"), (status = 403, description = "Not offered"))
)]
pub async fn delete_news(
    session: CurrentSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, PortalError> {
    ensure_offered(&session, AdminAction::ManageNews)?;
    state.backend.delete_article(&RecordId(id)).await?;
    state.refresh_articles().await;
    Ok(StatusCode::NO_CONTENT)
}

/// list_users
///
/// [Admin Route] The clients listing, with the same paging and filtering as the public lists.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(ListingParams),
    responses(
        (status = 200, description = "Listing view", body = ListingView<UserAccount>),
        (status = 403, description = "Not offered")
    )
)]
pub async fn list_users(
    session: CurrentSession,
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
) -> Result<Json<ListingView<UserAccount>>, PortalError> {
    ensure_offered(&session, AdminAction::ManageUsers)?;
    Ok(Json(apply_params(&state.users, params).await))
}

/// get_user
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses((status = 200, description = "Found", body = UserAccount))
)]
pub async fn get_user(
    session: CurrentSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserAccount>, PortalError> {
    ensure_offered(&session, AdminAction::ManageUsers)?;
    Ok(Json(state.backend.get_user(&RecordId(id)).await?))
}

/// create_user
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = UserInput,
    responses((status = 201, description = "Created"), (status = 400, description = "Missing name or email"))
)]
pub async fn create_user(
    session: CurrentSession,
    State(state): State<AppState>,
    Json(input): Json<UserInput>,
) -> Result<StatusCode, PortalError> {
    ensure_offered(&session, AdminAction::ManageUsers)?;
    validate_user(&input)?;
    state.backend.create_user(&input).await?;
    state.users.refresh().await;
    Ok(StatusCode::CREATED)
}

/// update_user
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    request_body = UserInput,
    responses((status = 204, description = "Updated"))
)]
pub async fn update_user(
    session: CurrentSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UserInput>,
) -> Result<StatusCode, PortalError> {
    ensure_offered(&session, AdminAction::ManageUsers)?;
    validate_user(&input)?;
    state.backend.update_user(&RecordId(id), &input).await?;
    state.users.refresh().await;
    Ok(StatusCode::NO_CONTENT)
}

/// update_permissions
///
/// [Admin Route] Replaces a user's permission list after checkbox toggles.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/permissions",
    params(("id" = String, Path, description = "User ID")),
    request_body = PermissionUpdate,
    responses((status = 204, description = "Updated"))
)]
pub async fn update_permissions(
    session: CurrentSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<PermissionUpdate>,
) -> Result<StatusCode, PortalError> {
    ensure_offered(&session, AdminAction::ManageUsers)?;
    state
        .backend
        .update_permissions(&RecordId(id), &update)
        .await?;
    state.users.refresh().await;
    Ok(StatusCode::NO_CONTENT)
}

/// delete_user
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses((status = 204, description = "Deleted"))
)]
pub async fn delete_user(
    session: CurrentSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, PortalError> {
    ensure_offered(&session, AdminAction::ManageUsers)?;
    state.backend.delete_user(&RecordId(id)).await?;
    state.users.refresh().await;
    Ok(StatusCode::NO_CONTENT)
}

/// create_board_member
///
/// [Admin Route] Adds a board-of-directors member from a multipart form with `name`,
/// `possion` (or `position`) and an optional `image`.
#[utoipa::path(
    post,
    path = "/admin/board",
    responses(
        (status = 201, description = "Created"),
        (status = 400, description = "Missing name or position"),
        (status = 403, description = "Not offered")
    )
)]
pub async fn create_board_member(
    session: CurrentSession,
    State(state): State<AppState>,
    mut form: Multipart,
) -> Result<StatusCode, PortalError> {
    ensure_offered(&session, AdminAction::ManageBoard)?;

    let mut member = BoardMemberInput::default();
    while let Some(field) = form.next_field().await.map_err(bad_form)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("name") => member.name = field.text().await.map_err(bad_form)?,
            Some("possion" | "position") => {
                member.position = field.text().await.map_err(bad_form)?
            }
            Some("image") => member.image = read_file(field).await?,
            _ => {}
        }
    }
    if member.name.trim().is_empty() || member.position.trim().is_empty() {
        return Err(PortalError::Invalid("الاسم والمنصب مطلوبان".to_string()));
    }

    state.backend.add_board_member(&member).await?;
    Ok(StatusCode::CREATED)
}

/// upload_file
///
/// [Admin Route] Forwards the multipart `file` field to the backend's file store and
/// returns where it was stored.
#[utoipa::path(
    post,
    path = "/admin/files",
    params(UploadParams),
    responses(
        (status = 201, description = "Stored", body = UploadedFile),
        (status = 400, description = "Missing file or type"),
        (status = 403, description = "Not offered")
    )
)]
pub async fn upload_file(
    session: CurrentSession,
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut form: Multipart,
) -> Result<(StatusCode, Json<UploadedFile>), PortalError> {
    ensure_offered(&session, AdminAction::ManageNews)?;

    let kind = params
        .kind
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| PortalError::Invalid("نوع الملف مطلوب".to_string()))?;

    let mut file = None;
    while let Some(field) = form.next_field().await.map_err(bad_form)? {
        if field.name() == Some("file") {
            file = read_file(field).await?;
        }
    }
    let file = file.ok_or_else(|| PortalError::Invalid("الملف مطلوب".to_string()))?;

    let stored = state.backend.upload_file(&kind, &file).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}
