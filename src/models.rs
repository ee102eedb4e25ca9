use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Identifiers ---

/// RecordId
///
/// Stable identifier of a listed record. The backend sends numeric ids for news and
/// circulars and string ids for user accounts, so both are accepted and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(from = "RawRecordId")]
pub struct RecordId(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRecordId {
    Number(i64),
    Text(String),
}

impl From<RawRecordId> for RecordId {
    fn from(raw: RawRecordId) -> Self {
        match raw {
            RawRecordId::Number(n) => RecordId(n.to_string()),
            RawRecordId::Text(s) => RecordId(s),
        }
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId(value.to_string())
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId(value.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Listed Records ---

/// NewsArticle
///
/// A news item as returned by the `NewsPaper` endpoints. Circulars share the exact same
/// shape and are only shown under a different label.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewsArticle {
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub id: RecordId,
    #[serde(default)]
    pub title: String,
    pub content: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,

    // 'type' is a reserved keyword, so the wire name is kept through a rename.
    #[serde(rename = "type")]
    pub kind: Option<String>,

    /// ISO-8601 or `DD/MM/YYYY`; see `dates::parse_record_date`.
    #[serde(alias = "date")]
    pub created_at: Option<String>,

    #[serde(alias = "image")]
    pub image_url: Option<String>,
}

/// Circular
///
/// An announcement. Modeled identically to a news article.
pub type Circular = NewsArticle;

/// UserAccount
///
/// A row of the admin users/clients listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserAccount {
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub id: RecordId,
    #[serde(default, alias = "userName", alias = "fullName")]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,

    #[serde(rename = "type")]
    pub kind: Option<String>,

    pub role: Option<String>,

    #[serde(default, alias = "permission")]
    pub permissions: Vec<String>,

    pub created_at: Option<String>,
}

// --- Pagination ---

/// Page
///
/// One server response fragment. `page_size` is never sent reliably, so navigation
/// bounds come only from `total_pages` and `total_count`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<R> {
    /// News and circular listings name this array `newsPaper`; the users listing `users`.
    #[serde(default = "Vec::new", alias = "newsPaper", alias = "users")]
    pub items: Vec<R>,
    #[serde(default = "first_page")]
    pub page_number: u32,
    #[serde(default = "first_page")]
    pub total_pages: u32,
    #[serde(default)]
    pub total_count: u64,
}

fn first_page() -> u32 {
    1
}

impl<R> Page<R> {
    pub fn new(items: Vec<R>, page_number: u32, total_pages: u32, total_count: u64) -> Self {
        Self {
            items,
            page_number,
            total_pages,
            total_count,
        }
    }

    /// Clamps the counters into their documented ranges. A backend that omits
    /// `totalCount` gets the size of the returned page instead.
    pub fn normalized(mut self) -> Self {
        self.page_number = self.page_number.max(1);
        self.total_pages = self.total_pages.max(1);
        if self.total_count == 0 && !self.items.is_empty() {
            self.total_count = self.items.len() as u64;
        }
        self
    }
}

/// PageQuery
///
/// What a page source is asked for. `search` and `category` are only filled in
/// server-query mode; in local-page mode the backend never sees them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub search: Option<String>,
    pub category: Option<String>,
}

impl PageQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }
}

// --- Authentication ---

/// LoginRequest
///
/// Credentials posted to `/api/Login`. The login form's "username" field is sent as `email`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// LoginResponse
///
/// Body of a successful login. Only `token` is guaranteed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub role: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "optional_id")]
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>)]
    pub user_id: Option<RecordId>,
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<RecordId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<RawRecordId>::deserialize(deserializer).map(|raw| raw.map(RecordId::from))
}

// --- Admin Payloads ---

/// NewsInput
///
/// Create/update payload for a news article or circular.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewsInput {
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// UserInput
///
/// Create/update payload for an admin-managed user. `password` is only forwarded to
/// the backend, never persisted or logged here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// PermissionUpdate
///
/// The full permission list of a user after the admin toggled checkboxes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PermissionUpdate {
    pub permissions: Vec<String>,
}

// --- Uploads ---

/// FileUpload
///
/// A file received by the shell and forwarded to the backend as a multipart part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// BoardMemberInput
///
/// A new board-of-directors member. Sent to `/api/Admin/Add-BOD` as multipart fields
/// `name`, `possion` (the backend's spelling) and an optional `image`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardMemberInput {
    pub name: String,
    pub position: String,
    pub image: Option<FileUpload>,
}

/// UploadedFile
///
/// What the backend answers to `/api/Files/upload`. Only the stored location is used.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UploadedFile {
    #[serde(default, alias = "fileUrl", alias = "path", alias = "filePath")]
    pub url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

// --- Dashboard ---

/// DashboardCounts
///
/// Aggregate totals shown on the admin dashboard (`GET /api/Admin/Count`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardCounts {
    #[serde(default)]
    pub news_paper: u64,
    #[serde(default)]
    pub users: u64,
    #[serde(default)]
    pub circulars: u64,
}
