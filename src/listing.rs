//! Remote listing controller.
//!
//! One controller owns the state a list view renders: the current page fetched from a
//! [`PageSource`], the server-driven pagination counters, and the local search/category
//! filter. Pages come either from the remote backend or from [`StaticPages`], which
//! slices an already loaded array the way the site did before it had a backend.
//!
//! Overlapping fetches are resolved by sequence number: every request takes the next
//! number and only the response carrying the latest one is applied.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{future::Future, marker::PhantomData, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::{
    config::AppConfig,
    error::PortalError,
    models::{NewsArticle, Page, PageQuery, UserAccount},
};

/// Category value meaning "no category filter".
pub const ALL_CATEGORIES: &str = "all";

// --- Records ---

/// ListRecord
///
/// What the controller needs to know about a listed item to filter it.
pub trait ListRecord: Clone + Send + Sync + 'static {
    fn display_title(&self) -> &str;

    /// Text fields searched in addition to the title.
    fn searchable_text(&self) -> Vec<&str>;

    /// The `category` and `type` values, in that order, when present.
    fn category_values(&self) -> Vec<&str>;
}

impl ListRecord for NewsArticle {
    fn display_title(&self) -> &str {
        &self.title
    }

    fn searchable_text(&self) -> Vec<&str> {
        [self.content.as_deref(), self.description.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }

    fn category_values(&self) -> Vec<&str> {
        [self.category.as_deref(), self.kind.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }
}

impl ListRecord for UserAccount {
    fn display_title(&self) -> &str {
        &self.name
    }

    fn searchable_text(&self) -> Vec<&str> {
        [
            self.email.as_deref(),
            self.phone.as_deref(),
            self.company.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn category_values(&self) -> Vec<&str> {
        self.kind.as_deref().into_iter().collect()
    }
}

// --- Filtering ---

/// SearchMode
///
/// `LocalPage` narrows only the page currently loaded and never re-queries the backend.
/// This is how the site has always behaved, so it is the default. `ServerQuery` sends
/// the search term and category to the source and reloads from page 1 when they change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    LocalPage,
    ServerQuery,
}

/// FilterState
///
/// Search term plus category. Pure: applying it never touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub search_term: String,
    pub category: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            category: ALL_CATEGORIES.to_string(),
        }
    }
}

impl FilterState {
    /// Case-insensitive substring match over title and searchable text, combined with
    /// an exact, case-sensitive match of `category` or `type`.
    pub fn matches<R: ListRecord>(&self, record: &R) -> bool {
        self.matches_search(record) && self.matches_category(record)
    }

    fn matches_search<R: ListRecord>(&self, record: &R) -> bool {
        if self.search_term.is_empty() {
            return true;
        }
        let needle = self.search_term.to_lowercase();
        std::iter::once(record.display_title())
            .chain(record.searchable_text())
            .any(|field| field.to_lowercase().contains(&needle))
    }

    fn matches_category<R: ListRecord>(&self, record: &R) -> bool {
        self.category == ALL_CATEGORIES
            || record
                .category_values()
                .iter()
                .any(|value| *value == self.category)
    }

    pub fn apply<R: ListRecord>(&self, items: &[R]) -> Vec<R> {
        items
            .iter()
            .filter(|item| self.matches(*item))
            .cloned()
            .collect()
    }
}

// --- Page Sources ---

/// PageSource
///
/// Produces one page of records. Implemented by the backend adapters, by
/// [`StaticPages`] and by any async closure through [`from_fn`].
#[async_trait]
pub trait PageSource<R>: Send + Sync {
    async fn fetch_page(&self, query: PageQuery) -> Result<Page<R>, PortalError>;
}

/// Adapter turning an async closure into a [`PageSource`].
pub struct FnSource<F, R> {
    fetch: F,
    _record: PhantomData<fn() -> R>,
}

/// Wraps `fetch` so it can be handed to a [`ListingController`].
pub fn from_fn<F, Fut, R>(fetch: F) -> FnSource<F, R>
where
    F: Fn(PageQuery) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<R>, PortalError>> + Send + 'static,
    R: Send + 'static,
{
    FnSource {
        fetch,
        _record: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, R> PageSource<R> for FnSource<F, R>
where
    F: Fn(PageQuery) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<R>, PortalError>> + Send + 'static,
    R: Send + 'static,
{
    async fn fetch_page(&self, query: PageQuery) -> Result<Page<R>, PortalError> {
        (self.fetch)(query).await
    }
}

/// StaticPages
///
/// Legacy mode: the whole collection is already in memory and pages are slices of
/// `items_per_page` records. Search and category are honoured when present in the
/// query, which makes it a faithful local stand-in for a server-query backend.
#[derive(Debug, Clone)]
pub struct StaticPages<R> {
    items: Vec<R>,
    items_per_page: usize,
}

impl<R: ListRecord> StaticPages<R> {
    pub fn new(items: Vec<R>, items_per_page: usize) -> Self {
        Self {
            items,
            items_per_page: items_per_page.max(1),
        }
    }

    /// Uses the configured legacy page size.
    pub fn from_config(items: Vec<R>, config: &AppConfig) -> Self {
        Self::new(items, config.items_per_page)
    }

    pub fn slice(&self, query: &PageQuery) -> Page<R> {
        let filter = FilterState {
            search_term: query.search.clone().unwrap_or_default(),
            category: query
                .category
                .clone()
                .unwrap_or_else(|| ALL_CATEGORIES.to_string()),
        };
        let matching = filter.apply(&self.items);

        let total_pages = matching.len().div_ceil(self.items_per_page).max(1);
        let page = (query.page.max(1) as usize).min(total_pages);
        let start = (page - 1) * self.items_per_page;
        let end = (start + self.items_per_page).min(matching.len());

        Page::new(
            matching[start.min(end)..end].to_vec(),
            page as u32,
            total_pages as u32,
            matching.len() as u64,
        )
    }
}

#[async_trait]
impl<R: ListRecord> PageSource<R> for StaticPages<R> {
    async fn fetch_page(&self, query: PageQuery) -> Result<Page<R>, PortalError> {
        Ok(self.slice(&query))
    }
}

// --- Controller ---

/// ListingOptions
///
/// Per-controller settings, normally derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ListingOptions {
    /// Name used in log lines ("news", "circulars", "users").
    pub label: String,
    pub search_mode: SearchMode,
    pub request_timeout: Duration,
}

impl ListingOptions {
    pub fn from_config(label: &str, config: &AppConfig) -> Self {
        Self {
            label: label.to_string(),
            search_mode: config.search_mode,
            request_timeout: config.request_timeout,
        }
    }
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self::from_config("listing", &AppConfig::default())
    }
}

/// ListingStatus
///
/// What the view should show. `Empty` is a successful load with nothing to display and
/// is distinct from `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Idle,
    Loading,
    Ready,
    Empty,
    Failed,
}

/// ListingView
///
/// Snapshot of a controller, ready to be serialized for a front end.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingView<R> {
    pub status: ListingStatus,
    /// The filtered items of the current page.
    pub items: Vec<R>,
    pub page_number: u32,
    pub total_pages: u32,
    pub total_count: u64,
    /// Number of items on the loaded page before filtering.
    pub loaded_count: usize,
    pub filter: FilterState,
    pub categories: Vec<String>,
    pub search_mode: SearchMode,
    pub error: Option<String>,
    pub retryable: bool,
}

#[derive(Debug)]
struct ListingState<R> {
    items: Vec<R>,
    page_number: u32,
    total_pages: u32,
    total_count: u64,
    filter: FilterState,
    loading: bool,
    loaded: bool,
    initialized: bool,
    error: Option<String>,
    retryable: bool,
    // Sequence number of the most recently issued request.
    latest_seq: u64,
}

impl<R> Default for ListingState<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page_number: 1,
            total_pages: 1,
            total_count: 0,
            filter: FilterState::default(),
            loading: false,
            loaded: false,
            initialized: false,
            error: None,
            retryable: false,
            latest_seq: 0,
        }
    }
}

/// ListingController
///
/// See the module docs. All methods take `&self`; the controller is meant to be shared
/// behind an `Arc` by whatever renders it.
pub struct ListingController<R> {
    source: Arc<dyn PageSource<R>>,
    options: ListingOptions,
    state: Arc<RwLock<ListingState<R>>>,
}

impl<R: ListRecord> ListingController<R> {
    pub fn new(source: Arc<dyn PageSource<R>>, options: ListingOptions) -> Self {
        Self {
            source,
            options,
            state: Arc::new(RwLock::new(ListingState::default())),
        }
    }

    /// Fetches page 1 on first activation. Later calls are no-ops; use
    /// [`reload`](Self::reload) to fetch again.
    pub async fn initialize(&self) {
        {
            let mut state = self.state.write().await;
            if state.initialized {
                return;
            }
            state.initialized = true;
        }
        self.fetch(1).await;
    }

    /// Loads page `n`. Out-of-range requests (`n < 1` or `n > total_pages`) are ignored
    /// and return `false`.
    pub async fn go_to_page(&self, n: u32) -> bool {
        let total_pages = self.state.read().await.total_pages;
        if n < 1 || n > total_pages {
            tracing::debug!(
                listing = %self.options.label,
                requested = n,
                total_pages,
                "ignoring out-of-range page request"
            );
            return false;
        }
        self.fetch(n).await;
        true
    }

    /// Fetches the current page again, e.g. after a failure or an admin mutation.
    pub async fn reload(&self) {
        let page = {
            let mut state = self.state.write().await;
            state.initialized = true;
            state.page_number
        };
        self.fetch(page).await;
    }

    /// Reloads only a controller that has already been shown, e.g. after a mutation.
    pub async fn refresh(&self) {
        if self.state.read().await.initialized {
            self.reload().await;
        }
    }

    /// Updates the search term. Local-page mode never fetches; server-query mode
    /// reloads from page 1 once the controller has been initialized.
    pub async fn set_search_term(&self, term: impl Into<String>) {
        let term = term.into();
        self.update_filter(|filter| filter.search_term = term).await;
    }

    /// Updates the category filter. Same fetch rules as [`set_search_term`](Self::set_search_term).
    pub async fn set_category(&self, category: impl Into<String>) {
        let category = category.into();
        self.update_filter(|filter| filter.category = category).await;
    }

    /// Replaces search term and category together. Server-query mode fetches at most once.
    pub async fn set_filter(&self, filter: FilterState) {
        self.update_filter(|current| *current = filter).await;
    }

    async fn update_filter(&self, change: impl FnOnce(&mut FilterState)) {
        let refetch = {
            let mut state = self.state.write().await;
            let mut filter = state.filter.clone();
            change(&mut filter);
            if filter == state.filter {
                return;
            }
            state.filter = filter;
            self.refetch_on_filter(&state)
        };
        if refetch {
            self.fetch(1).await;
        }
    }

    fn refetch_on_filter(&self, state: &ListingState<R>) -> bool {
        self.options.search_mode == SearchMode::ServerQuery && state.initialized
    }

    /// The loaded page narrowed by the current filter. In server-query mode the source
    /// already applied the filter and the page is returned as is.
    pub async fn filtered_items(&self) -> Vec<R> {
        let state = self.state.read().await;
        self.filtered(&state)
    }

    fn filtered(&self, state: &ListingState<R>) -> Vec<R> {
        match self.options.search_mode {
            SearchMode::LocalPage => state.filter.apply(&state.items),
            SearchMode::ServerQuery => state.items.clone(),
        }
    }

    /// `"all"` followed by the distinct categories of the loaded page, in first-seen order.
    pub async fn available_categories(&self) -> Vec<String> {
        let state = self.state.read().await;
        categories_of(&state.items)
    }

    pub async fn page_number(&self) -> u32 {
        self.state.read().await.page_number
    }

    pub async fn total_pages(&self) -> u32 {
        self.state.read().await.total_pages
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    /// Items of the loaded page, unfiltered.
    pub async fn items(&self) -> Vec<R> {
        self.state.read().await.items.clone()
    }

    pub async fn view(&self) -> ListingView<R> {
        let state = self.state.read().await;
        let items = self.filtered(&state);

        let status = if state.loading {
            ListingStatus::Loading
        } else if state.error.is_some() {
            ListingStatus::Failed
        } else if !state.loaded {
            ListingStatus::Idle
        } else if items.is_empty() {
            ListingStatus::Empty
        } else {
            ListingStatus::Ready
        };

        ListingView {
            status,
            items,
            page_number: state.page_number,
            total_pages: state.total_pages,
            total_count: state.total_count,
            loaded_count: state.items.len(),
            filter: state.filter.clone(),
            categories: categories_of(&state.items),
            search_mode: self.options.search_mode,
            error: state.error.clone(),
            retryable: state.retryable,
        }
    }

    async fn fetch(&self, page: u32) {
        let (seq, query) = {
            let mut state = self.state.write().await;
            state.latest_seq += 1;
            state.loading = true;
            (state.latest_seq, self.query_for(page, &state.filter))
        };

        tracing::debug!(listing = %self.options.label, page, seq, "fetching page");

        // Detached, so a caller that stops waiting still settles the loading flag.
        let task = tokio::spawn(settle_fetch(
            self.state.clone(),
            self.source.clone(),
            self.options.clone(),
            seq,
            query,
        ));

        if let Err(e) = task.await {
            tracing::error!(listing = %self.options.label, page, seq, error = %e, "fetch task failed");
            let mut state = self.state.write().await;
            if state.latest_seq == seq {
                state.loading = false;
                state.items.clear();
                state.error = Some(PortalError::Decode(e.to_string()).user_message());
                state.retryable = true;
            }
        }
    }

    fn query_for(&self, page: u32, filter: &FilterState) -> PageQuery {
        match self.options.search_mode {
            SearchMode::LocalPage => PageQuery::page(page),
            SearchMode::ServerQuery => PageQuery {
                page,
                search: Some(filter.search_term.clone()).filter(|s| !s.is_empty()),
                category: Some(filter.category.clone()).filter(|c| c != ALL_CATEGORIES),
            },
        }
    }
}

// Runs one request under the timeout and applies it if it is still the latest.
async fn settle_fetch<R: ListRecord>(
    state: Arc<RwLock<ListingState<R>>>,
    source: Arc<dyn PageSource<R>>,
    options: ListingOptions,
    seq: u64,
    query: PageQuery,
) {
    let page = query.page;
    let timeout = options.request_timeout;
    let outcome = match tokio::time::timeout(timeout, source.fetch_page(query)).await {
        Ok(result) => result,
        Err(_) => Err(PortalError::Timeout(timeout.as_millis() as u64)),
    };

    let mut state = state.write().await;
    if seq != state.latest_seq {
        tracing::debug!(
            listing = %options.label,
            page,
            seq,
            latest = state.latest_seq,
            "discarding superseded response"
        );
        return;
    }
    state.loading = false;

    match outcome {
        Ok(fetched) => {
            let fetched = fetched.normalized();
            tracing::debug!(
                listing = %options.label,
                page = fetched.page_number,
                total_pages = fetched.total_pages,
                items = fetched.items.len(),
                "page loaded"
            );
            state.items = fetched.items;
            state.page_number = fetched.page_number;
            state.total_pages = fetched.total_pages;
            state.total_count = fetched.total_count;
            state.loaded = true;
            state.error = None;
            state.retryable = false;
        }
        Err(err) => {
            tracing::warn!(listing = %options.label, page, error = %err, "page load failed");
            // Pagination counters stay put so the pager does not jump.
            state.items.clear();
            state.error = Some(err.user_message());
            state.retryable = err.is_retryable();
        }
    }
}

fn categories_of<R: ListRecord>(items: &[R]) -> Vec<String> {
    let mut categories = vec![ALL_CATEGORIES.to_string()];
    for item in items {
        if let Some(first) = item.category_values().first() {
            if !categories.iter().any(|c| c == first) {
                categories.push(first.to_string());
            }
        }
    }
    categories
}
