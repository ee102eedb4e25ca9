#![allow(dead_code)]

use async_trait::async_trait;
use chamber_portal::{
    PortalError,
    backend::{Feed, PortalBackend},
    models::{
        BoardMemberInput, DashboardCounts, FileUpload, LoginRequest, LoginResponse, NewsArticle,
        NewsInput, Page, PageQuery, PermissionUpdate, RecordId, UploadedFile, UserAccount,
        UserInput,
    },
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use std::sync::Mutex;

// --- Tokens ---

/// Signs `claims` the way the backend would. The portal never checks the signature.
pub fn make_jwt(claims: &Value) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(b"backend-secret"),
    )
    .unwrap()
}

pub fn admin_token(permissions: &[&str]) -> String {
    make_jwt(&serde_json::json!({
        "Role": "Admin",
        "Permission": permissions,
        "unique_name": "مدير النظام",
        "Email": "admin@bisha.org",
        "sub": "42",
        "exp": 4_102_444_800u64,
    }))
}

pub fn article(id: i64, title: &str) -> NewsArticle {
    NewsArticle {
        id: RecordId::from(id),
        title: title.to_string(),
        category: Some("اقتصاد".to_string()),
        created_at: Some("2024-03-05T10:00:00".to_string()),
        ..NewsArticle::default()
    }
}

// --- Fake Backend ---

/// In-process `PortalBackend`. Records every mutation so tests can assert on it.
#[derive(Default)]
pub struct FakeBackend {
    pub news: Vec<NewsArticle>,
    pub circulars: Vec<NewsArticle>,
    pub users: Vec<UserAccount>,
    pub counts: DashboardCounts,
    /// Token handed out by `login`; `None` answers 401.
    pub login_token: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn recorded(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn paged<R: Clone>(items: &[R], query: &PageQuery) -> Page<R> {
        const SIZE: usize = 3;
        let total_pages = items.len().div_ceil(SIZE).max(1);
        let start = ((query.page.max(1) as usize - 1) * SIZE).min(items.len());
        let end = (start + SIZE).min(items.len());
        Page::new(
            items[start..end].to_vec(),
            query.page.max(1),
            total_pages as u32,
            items.len() as u64,
        )
    }
}

#[async_trait]
impl PortalBackend for FakeBackend {
    async fn list_articles(&self, feed: Feed, query: &PageQuery) -> Result<Page<NewsArticle>, PortalError> {
        self.record(format!("list {} {}", feed.label(), query.page));
        let items = match feed {
            Feed::News => &self.news,
            Feed::Circulars => &self.circulars,
        };
        Ok(Self::paged(items, query))
    }

    async fn get_article(&self, id: &RecordId) -> Result<NewsArticle, PortalError> {
        self.news
            .iter()
            .chain(self.circulars.iter())
            .find(|a| &a.id == id)
            .cloned()
            .ok_or_else(|| PortalError::from_status(404, r#"{"message":"الخبر غير موجود"}"#))
    }

    async fn create_article(&self, input: &NewsInput) -> Result<(), PortalError> {
        self.record(format!("create article {}", input.title));
        Ok(())
    }

    async fn update_article(&self, id: &RecordId, input: &NewsInput) -> Result<(), PortalError> {
        self.record(format!("update article {} {}", id, input.title));
        Ok(())
    }

    async fn delete_article(&self, id: &RecordId) -> Result<(), PortalError> {
        self.record(format!("delete article {}", id));
        Ok(())
    }

    async fn list_users(&self, query: &PageQuery) -> Result<Page<UserAccount>, PortalError> {
        self.record(format!("list users {}", query.page));
        Ok(Self::paged(&self.users, query))
    }

    async fn get_user(&self, id: &RecordId) -> Result<UserAccount, PortalError> {
        self.users
            .iter()
            .find(|u| &u.id == id)
            .cloned()
            .ok_or_else(|| PortalError::from_status(404, ""))
    }

    async fn create_user(&self, input: &UserInput) -> Result<(), PortalError> {
        self.record(format!("create user {}", input.email));
        Ok(())
    }

    async fn update_user(&self, id: &RecordId, input: &UserInput) -> Result<(), PortalError> {
        self.record(format!("update user {} {}", id, input.email));
        Ok(())
    }

    async fn update_permissions(&self, id: &RecordId, update: &PermissionUpdate) -> Result<(), PortalError> {
        self.record(format!("permissions {} {}", id, update.permissions.join(",")));
        Ok(())
    }

    async fn delete_user(&self, id: &RecordId) -> Result<(), PortalError> {
        self.record(format!("delete user {}", id));
        Ok(())
    }

    async fn add_board_member(&self, member: &BoardMemberInput) -> Result<(), PortalError> {
        let image = member
            .image
            .as_ref()
            .map(|f| format!(" {} {}", f.file_name, f.bytes.len()))
            .unwrap_or_default();
        self.record(format!("board {} {}{}", member.name, member.position, image));
        Ok(())
    }

    async fn upload_file(&self, kind: &str, file: &FileUpload) -> Result<UploadedFile, PortalError> {
        self.record(format!("upload {} {}", kind, file.file_name));
        Ok(UploadedFile {
            url: Some(format!("/uploads/{}", file.file_name)),
            file_name: Some(file.file_name.clone()),
        })
    }

    async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, PortalError> {
        self.record(format!("login {}", credentials.email));
        match &self.login_token {
            Some(token) => Ok(LoginResponse {
                token: token.clone(),
                ..LoginResponse::default()
            }),
            None => Err(PortalError::from_status(
                401,
                r#"{"message":"اسم المستخدم أو كلمة المرور غير صحيحة"}"#,
            )),
        }
    }

    async fn dashboard_counts(&self) -> Result<DashboardCounts, PortalError> {
        Ok(self.counts.clone())
    }
}
