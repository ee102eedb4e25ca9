mod common;

use chamber_portal::{
    PortalError,
    auth::{self, AdminAction, PermissionSet},
    models::LoginRequest,
    session::{DECODED_TOKEN_KEY, RAW_TOKEN_KEY, Session, SessionService, SessionState, decode},
    storage::{KeyValueStore, MemoryStore, StoreState},
};
use async_trait::async_trait;
use common::{FakeBackend, admin_token, make_jwt};
use std::sync::Arc;

fn credentials() -> LoginRequest {
    LoginRequest {
        email: "admin@bisha.org".to_string(),
        password: "secret".to_string(),
    }
}

fn session_with(role: &str, permissions: &[&str]) -> Session {
    Session {
        role: role.to_string(),
        permissions: permissions.iter().copied().collect(),
        ..Session::default()
    }
}

// --- Decoding ---

#[test]
fn test_decode_rejects_absent_and_malformed_input() {
    assert_eq!(decode(None), None);
    assert_eq!(decode(Some("")), None);
    assert_eq!(decode(Some("not-json")), None);
    assert_eq!(decode(Some("a.b.c")), None);
    assert_eq!(decode(Some("{\"unrelated\": true}")), None);
}

#[test]
fn test_decode_reads_jwt_claims() {
    let session = decode(Some(&admin_token(&["GetContact", "AddNewsPaper"]))).unwrap();

    assert_eq!(session.role, "Admin");
    assert!(session.permissions.contains("GetContact"));
    assert!(session.permissions.contains("AddNewsPaper"));
    assert!(!session.permissions.contains("GetAllUsers"));
    assert_eq!(session.name.as_deref(), Some("مدير النظام"));
    assert_eq!(session.email.as_deref(), Some("admin@bisha.org"));
    assert_eq!(session.user_id.as_deref(), Some("42"));
}

#[test]
fn test_decode_accepts_dotnet_claim_names_and_single_permission() {
    let token = make_jwt(&serde_json::json!({
        "http://schemas.microsoft.com/ws/2008/06/identity/claims/role": "Admin",
        "Permission": "GetAllUsers",
        "nameid": 7,
        "sub": "s-7",
    }));

    let session = decode(Some(&token)).unwrap();

    assert_eq!(session.role, "Admin");
    assert_eq!(session.permissions.len(), 1);
    assert!(session.permissions.contains("GetAllUsers"));
    assert_eq!(session.user_id.as_deref(), Some("s-7"));
}

#[test]
fn test_decode_ignores_expiry_and_audience() {
    // Expiry is only discovered when the backend rejects the token.
    let token = make_jwt(&serde_json::json!({
        "Role": "Admin",
        "Permission": ["GetContact"],
        "exp": 1_000_000_000u64,
        "aud": "bisha-portal",
    }));

    let session = decode(Some(&token)).unwrap();

    assert_eq!(session.role, "Admin");
    assert!(session.permissions.contains("GetContact"));
}

#[test]
fn test_decode_reads_persisted_json() {
    let original = session_with("Admin", &["GetContact"]);
    let persisted = serde_json::to_string(&original).unwrap();

    assert_eq!(decode(Some(&persisted)), Some(original));
}

// --- Gate ---

#[test]
fn test_has_permission_without_session_is_false() {
    assert!(!auth::has_permission(None, "GetContact"));
    assert!(!auth::has_permission(None, ""));
}

#[test]
fn test_permission_names_match_exactly() {
    let session = session_with("Admin", &["GetContact", "ExportReports"]);

    assert!(auth::has_permission(Some(&session), "GetContact"));
    assert!(auth::has_permission(Some(&session), "ExportReports"));
    assert!(!auth::has_permission(Some(&session), "getcontact"));
}

#[test]
fn test_is_admin_is_case_sensitive() {
    assert!(auth::is_admin(Some(&session_with("Admin", &[]))));
    assert!(!auth::is_admin(Some(&session_with("admin", &[]))));
    assert!(!auth::is_admin(Some(&session_with("user", &[]))));
    assert!(!auth::is_admin(None));
}

#[test]
fn test_visible_nav_follows_permissions() {
    let session = session_with("Admin", &["AddNewsPaper"]);

    let hrefs: Vec<&str> = auth::visible_nav(Some(&session))
        .iter()
        .map(|item| item.href)
        .collect();

    assert_eq!(hrefs, vec!["/admin/news"]);
}

#[test]
fn test_visible_nav_empty_for_non_admin() {
    let session = session_with("user", &["GetContact", "AddNewsPaper", "GetAllUsers"]);
    assert!(auth::visible_nav(Some(&session)).is_empty());
    assert!(auth::visible_nav(None).is_empty());
}

#[test]
fn test_admin_actions_offered() {
    let session = session_with("Admin", &["GetContact"]);

    assert!(AdminAction::ViewDashboard.is_offered(Some(&session)));
    assert!(AdminAction::ViewContact.is_offered(Some(&session)));
    assert!(!AdminAction::ManageNews.is_offered(Some(&session)));
    assert!(!AdminAction::ManageUsers.is_offered(None));
}

#[test]
fn test_board_is_offered_to_every_admin() {
    assert_eq!(AdminAction::ManageBoard.required_permission(), None);
    assert!(AdminAction::ManageBoard.is_offered(Some(&session_with("Admin", &[]))));
    assert!(!AdminAction::ManageBoard.is_offered(Some(&session_with("user", &[]))));
}

#[test]
fn test_permission_set_toggle() {
    let mut set: PermissionSet = ["GetContact"].into_iter().collect();

    assert!(!set.toggle("GetContact"));
    assert!(set.toggle("GetAllUsers"));

    assert_eq!(set.names(), vec!["GetAllUsers"]);
    assert_eq!(
        serde_json::to_value(&set).unwrap(),
        serde_json::json!(["GetAllUsers"])
    );
}

// --- Lifecycle ---

fn service() -> (SessionService, StoreState) {
    let store = Arc::new(MemoryStore::new()) as StoreState;
    (SessionService::new(store.clone()), store)
}

#[tokio::test]
async fn test_login_then_logout_leaves_store_empty() {
    let backend = FakeBackend {
        login_token: Some(admin_token(&["GetContact"])),
        ..FakeBackend::default()
    };
    let (sessions, store) = service();

    let session = sessions.login(&backend, &credentials()).await.unwrap();
    assert_eq!(session.role, "Admin");
    assert_eq!(sessions.state().await, SessionState::Authenticated);
    assert!(store.get(RAW_TOKEN_KEY).await.unwrap().is_some());
    assert!(store.get(DECODED_TOKEN_KEY).await.unwrap().is_some());

    sessions.logout().await.unwrap();

    assert_eq!(sessions.state().await, SessionState::Anonymous);
    assert!(sessions.current().await.is_none());
    assert!(store.get(RAW_TOKEN_KEY).await.unwrap().is_none());
    assert!(store.get(DECODED_TOKEN_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_rejected_login_stays_anonymous() {
    let backend = FakeBackend::default();
    let (sessions, store) = service();

    let result = sessions.login(&backend, &credentials()).await;

    assert!(matches!(result, Err(PortalError::Unauthorized(_))));
    assert_eq!(sessions.state().await, SessionState::Anonymous);
    assert!(store.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_opaque_token_falls_back_to_login_response() {
    let backend = FakeBackend {
        login_token: Some("opaque-token".to_string()),
        ..FakeBackend::default()
    };
    let (sessions, _store) = service();

    let session = sessions.login(&backend, &credentials()).await.unwrap();

    assert_eq!(session.role, "user");
    assert!(session.permissions.is_empty());
    assert_eq!(session.email.as_deref(), Some("admin@bisha.org"));
    assert_eq!(sessions.raw_token().await.as_deref(), Some("opaque-token"));
}

#[tokio::test]
async fn test_restore_resumes_persisted_session() {
    let backend = FakeBackend {
        login_token: Some(admin_token(&["GetAllUsers"])),
        ..FakeBackend::default()
    };
    let (first, store) = service();
    first.login(&backend, &credentials()).await.unwrap();

    let second = SessionService::new(store);
    let restored = second.restore().await.unwrap().unwrap();

    assert_eq!(restored.role, "Admin");
    assert!(restored.permissions.contains("GetAllUsers"));
    assert_eq!(second.raw_token().await, first.raw_token().await);
}

#[tokio::test]
async fn test_restore_clears_half_written_session() {
    let (sessions, store) = service();
    store.set(RAW_TOKEN_KEY, "orphan").await.unwrap();

    assert!(sessions.restore().await.unwrap().is_none());
    assert!(store.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_restore_clears_unreadable_session() {
    let (sessions, store) = service();
    store.set(RAW_TOKEN_KEY, "not-a-jwt").await.unwrap();
    store.set(DECODED_TOKEN_KEY, "{broken").await.unwrap();

    assert!(sessions.restore().await.unwrap().is_none());
    assert_eq!(sessions.state().await, SessionState::Anonymous);
    assert!(store.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_store_failure_does_not_authenticate() {
    let backend = FakeBackend {
        login_token: Some(admin_token(&["GetContact"])),
        ..FakeBackend::default()
    };
    let sessions = SessionService::new(Arc::new(MemoryStore::new_failing()));

    let result = sessions.login(&backend, &credentials()).await;

    assert!(matches!(result, Err(PortalError::Storage(_))));
    assert_eq!(sessions.state().await, SessionState::Anonymous);
}

/// Accepts the raw token but fails every later write, including the rollback.
#[derive(Default)]
struct HalfBrokenStore {
    inner: MemoryStore,
}

#[async_trait]
impl KeyValueStore for HalfBrokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PortalError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PortalError> {
        if key == RAW_TOKEN_KEY {
            self.inner.set(key, value).await
        } else {
            Err(PortalError::Storage("disk full".to_string()))
        }
    }

    async fn remove(&self, _key: &str) -> Result<(), PortalError> {
        Err(PortalError::Storage("disk full".to_string()))
    }

    async fn keys(&self) -> Result<Vec<String>, PortalError> {
        self.inner.keys().await
    }
}

#[tokio::test]
async fn test_failed_rollback_still_reports_the_write_error() {
    let backend = FakeBackend {
        login_token: Some(admin_token(&["GetContact"])),
        ..FakeBackend::default()
    };
    let sessions = SessionService::new(Arc::new(HalfBrokenStore::default()));

    let result = sessions.login(&backend, &credentials()).await;

    assert!(matches!(result, Err(PortalError::Storage(m)) if m == "disk full"));
    assert_eq!(sessions.state().await, SessionState::Anonymous);
    assert!(sessions.raw_token().await.is_none());
}
