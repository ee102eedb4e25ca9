use async_trait::async_trait;
use reqwest::{
    Client, Method, RequestBuilder, Response, header,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    config::AppConfig,
    error::PortalError,
    listing::PageSource,
    models::{
        BoardMemberInput, DashboardCounts, FileUpload, LoginRequest, LoginResponse, NewsArticle,
        NewsInput, Page, PageQuery, PermissionUpdate, RecordId, UploadedFile, UserAccount,
        UserInput,
    },
    session::SessionService,
};

/// Feed
///
/// The two article collections. Both are served by the `NewsPaper` endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    News,
    Circulars,
}

impl Feed {
    pub fn label(self) -> &'static str {
        match self {
            Feed::News => "news",
            Feed::Circulars => "circulars",
        }
    }

    fn list_path(self, page: u32) -> String {
        match self {
            Feed::News => format!("/api/NewsPaper/Get-All/{}", page),
            Feed::Circulars => format!("/api/NewsPaper/Get-All-Circulars/{}", page),
        }
    }
}

/// PortalBackend Trait
///
/// Everything the portal asks of the remote REST backend. Handlers and page sources
/// only see this trait, so tests swap in an in-process fake.
#[async_trait]
pub trait PortalBackend: Send + Sync {
    // --- Articles ---
    async fn list_articles(&self, feed: Feed, query: &PageQuery) -> Result<Page<NewsArticle>, PortalError>;
    // News and circulars share one lookup endpoint.
    async fn get_article(&self, id: &RecordId) -> Result<NewsArticle, PortalError>;
    async fn create_article(&self, input: &NewsInput) -> Result<(), PortalError>;
    async fn update_article(&self, id: &RecordId, input: &NewsInput) -> Result<(), PortalError>;
    async fn delete_article(&self, id: &RecordId) -> Result<(), PortalError>;

    // --- Users ---
    async fn list_users(&self, query: &PageQuery) -> Result<Page<UserAccount>, PortalError>;
    async fn get_user(&self, id: &RecordId) -> Result<UserAccount, PortalError>;
    async fn create_user(&self, input: &UserInput) -> Result<(), PortalError>;
    async fn update_user(&self, id: &RecordId, input: &UserInput) -> Result<(), PortalError>;
    async fn update_permissions(&self, id: &RecordId, update: &PermissionUpdate) -> Result<(), PortalError>;
    async fn delete_user(&self, id: &RecordId) -> Result<(), PortalError>;

    // --- Board & Files ---
    async fn add_board_member(&self, member: &BoardMemberInput) -> Result<(), PortalError>;
    // `kind` is the backend's `type` query value, e.g. `image`.
    async fn upload_file(&self, kind: &str, file: &FileUpload) -> Result<UploadedFile, PortalError>;

    // --- Auth & Dashboard ---
    async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, PortalError>;
    async fn dashboard_counts(&self) -> Result<DashboardCounts, PortalError>;
}

/// BackendState
///
/// The backend as shared by the shell state and the page sources.
pub type BackendState = Arc<dyn PortalBackend>;

/// HttpBackend
///
/// `PortalBackend` over HTTP with `reqwest`. Reads the bearer token from the session
/// service on every request, so a login or logout takes effect immediately.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    timeout_ms: u64,
    sessions: SessionService,
}

// Single-article lookups answer either with the bare record or wrapped like a page.
#[derive(Deserialize)]
#[serde(untagged)]
enum ArticleBody {
    Bare(NewsArticle),
    Wrapped {
        #[serde(alias = "newsPaper")]
        data: NewsArticle,
    },
}

impl HttpBackend {
    pub fn new(config: &AppConfig, sessions: SessionService) -> Result<Self, PortalError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PortalError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.request_timeout.as_millis() as u64,
            sessions,
        })
    }

    /// JSON request. Every call except multipart uploads goes through here.
    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.authorized(method, path)
            .await
            .header(header::CONTENT_TYPE, "application/json")
    }

    // Multipart bodies set their own content type with the boundary.
    async fn authorized(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, url);

        if let Some(token) = self.sessions.raw_token().await {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Sends and converts every non-2xx response into a `PortalError`.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, PortalError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                PortalError::Timeout(self.timeout_ms)
            } else {
                PortalError::from(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = PortalError::from_status(status.as_u16(), &body);
        tracing::warn!(status = status.as_u16(), error = %err, "backend rejected request");
        Err(err)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, PortalError> {
        tracing::debug!(path, "GET");
        let builder = self.request(Method::GET, path).await.query(query);
        let response = self.send(builder).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Mutations: the backend answers with JSON or plain text, neither of which is used.
    async fn execute<B: Serialize + ?Sized>(&self, method: Method, path: &str, body: Option<&B>) -> Result<(), PortalError> {
        tracing::debug!(path, method = %method, "mutation");
        let mut builder = self.request(method, path).await;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder).await?;
        Ok(())
    }
}

fn file_part(file: &FileUpload) -> Result<Part, PortalError> {
    let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
    match &file.content_type {
        Some(content_type) => part
            .mime_str(content_type)
            .map_err(|e| PortalError::Invalid(e.to_string())),
        None => Ok(part),
    }
}

// Upload answers are JSON, a bare location string, or empty.
fn uploaded_file(bytes: &[u8]) -> UploadedFile {
    if let Ok(file) = serde_json::from_slice::<UploadedFile>(bytes) {
        return file;
    }
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim().trim_matches('"');
    UploadedFile {
        url: Some(text.to_string()).filter(|t| !t.is_empty()),
        file_name: None,
    }
}

// Server-query mode adds the filter as query parameters; local-page mode sends none.
fn filter_params(query: &PageQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(search) = &query.search {
        params.push(("search", search.clone()));
    }
    if let Some(category) = &query.category {
        params.push(("category", category.clone()));
    }
    params
}

#[async_trait]
impl PortalBackend for HttpBackend {
    async fn list_articles(&self, feed: Feed, query: &PageQuery) -> Result<Page<NewsArticle>, PortalError> {
        let page: Page<NewsArticle> = self
            .get_json(&feed.list_path(query.page.max(1)), &filter_params(query))
            .await?;
        Ok(page.normalized())
    }

    async fn get_article(&self, id: &RecordId) -> Result<NewsArticle, PortalError> {
        let body: ArticleBody = self
            .get_json(&format!("/api/NewsPaper/Get-All-Circulars-ByID/{}", id), &[])
            .await?;
        Ok(match body {
            ArticleBody::Bare(article) | ArticleBody::Wrapped { data: article } => article,
        })
    }

    async fn create_article(&self, input: &NewsInput) -> Result<(), PortalError> {
        self.execute(Method::POST, "/api/NewsPaper/Add", Some(input)).await
    }

    async fn update_article(&self, id: &RecordId, input: &NewsInput) -> Result<(), PortalError> {
        // The backend takes updates as POST.
        self.execute(Method::POST, &format!("/api/NewsPaper/Update/{}", id), Some(input))
            .await
    }

    async fn delete_article(&self, id: &RecordId) -> Result<(), PortalError> {
        self.execute::<()>(Method::DELETE, &format!("/api/NewsPaper/Delete/{}", id), None)
            .await
    }

    async fn list_users(&self, query: &PageQuery) -> Result<Page<UserAccount>, PortalError> {
        let page: Page<UserAccount> = self
            .get_json(
                &format!("/api/Users/Get-All/{}", query.page.max(1)),
                &filter_params(query),
            )
            .await?;
        Ok(page.normalized())
    }

    async fn get_user(&self, id: &RecordId) -> Result<UserAccount, PortalError> {
        self.get_json(&format!("/api/Users/{}", id), &[]).await
    }

    async fn create_user(&self, input: &UserInput) -> Result<(), PortalError> {
        self.execute(Method::POST, "/api/Users", Some(input)).await
    }

    async fn update_user(&self, id: &RecordId, input: &UserInput) -> Result<(), PortalError> {
        self.execute(Method::PUT, &format!("/api/Users/{}", id), Some(input))
            .await
    }

    async fn update_permissions(&self, id: &RecordId, update: &PermissionUpdate) -> Result<(), PortalError> {
        self.execute(Method::PUT, &format!("/api/Users/{}/Permissions", id), Some(update))
            .await
    }

    async fn delete_user(&self, id: &RecordId) -> Result<(), PortalError> {
        self.execute::<()>(Method::DELETE, &format!("/api/Users/{}", id), None)
            .await
    }

    async fn add_board_member(&self, member: &BoardMemberInput) -> Result<(), PortalError> {
        tracing::debug!("POST /api/Admin/Add-BOD");
        let mut form = Form::new()
            .text("name", member.name.clone())
            .text("possion", member.position.clone());
        if let Some(image) = &member.image {
            form = form.part("image", file_part(image)?);
        }
        let builder = self
            .authorized(Method::POST, "/api/Admin/Add-BOD")
            .await
            .multipart(form);
        self.send(builder).await?;
        Ok(())
    }

    async fn upload_file(&self, kind: &str, file: &FileUpload) -> Result<UploadedFile, PortalError> {
        tracing::debug!(kind, size = file.bytes.len(), "POST /api/Files/upload");
        let form = Form::new().part("file", file_part(file)?);
        let builder = self
            .authorized(Method::POST, "/api/Files/upload")
            .await
            .query(&[("type", kind)])
            .multipart(form);
        let response = self.send(builder).await?;
        let bytes = response.bytes().await?;
        Ok(uploaded_file(&bytes))
    }

    async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, PortalError> {
        tracing::debug!("POST /api/Login");
        let builder = self
            .request(Method::POST, "/api/Login")
            .await
            .json(credentials);
        let response = self.send(builder).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn dashboard_counts(&self) -> Result<DashboardCounts, PortalError> {
        self.get_json("/api/Admin/Count", &[]).await
    }
}

// --- Page Sources ---

/// ArticleSource
///
/// One article feed as a listing page source.
pub struct ArticleSource {
    backend: BackendState,
    feed: Feed,
}

impl ArticleSource {
    pub fn new(backend: BackendState, feed: Feed) -> Self {
        Self { backend, feed }
    }
}

#[async_trait]
impl PageSource<NewsArticle> for ArticleSource {
    async fn fetch_page(&self, query: PageQuery) -> Result<Page<NewsArticle>, PortalError> {
        self.backend.list_articles(self.feed, &query).await
    }
}

/// UserSource
///
/// The admin users listing as a page source.
pub struct UserSource {
    backend: BackendState,
}

impl UserSource {
    pub fn new(backend: BackendState) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl PageSource<UserAccount> for UserSource {
    async fn fetch_page(&self, query: PageQuery) -> Result<Page<UserAccount>, PortalError> {
        self.backend.list_users(&query).await
    }
}
