use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    auth::PermissionSet,
    backend::PortalBackend,
    error::PortalError,
    models::{LoginRequest, LoginResponse},
    storage::StoreState,
};

/// Storage key of the raw credential, sent back as a bearer token.
pub const RAW_TOKEN_KEY: &str = "auth_token";
/// Storage key of the decoded session.
pub const DECODED_TOKEN_KEY: &str = "DecodedToken";

/// Session
///
/// The decoded form of the stored login credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Session {
    pub role: String,
    #[ts(type = "string[]")]
    #[schema(value_type = Vec<String>)]
    pub permissions: PermissionSet,
    pub name: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<String>,
}

/// SessionState
///
/// No "refreshing" state exists: expiry is only discovered when the backend says so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

// --- Decoding ---

// Claim names, in lookup order. The backend's JWT uses the .NET names; the persisted
// decoded form uses this crate's own camelCase names.
const ROLE_CLAIMS: &[&str] = &[
    "role",
    "Role",
    "http://schemas.microsoft.com/ws/2008/06/identity/claims/role",
];
const PERMISSION_CLAIMS: &[&str] = &["permissions", "Permission", "permission", "Permissions"];
const NAME_CLAIMS: &[&str] = &[
    "name",
    "Name",
    "unique_name",
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name",
];
const EMAIL_CLAIMS: &[&str] = &[
    "email",
    "Email",
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress",
];
const USER_ID_CLAIMS: &[&str] = &[
    "userId",
    "UserId",
    "sub",
    "nameid",
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier",
];

type Claims = serde_json::Map<String, Value>;

fn claim<'a>(claims: &'a Claims, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| claims.get(*name))
        .filter(|value| !value.is_null())
}

// A claim may carry one value or an array of values.
fn claim_values(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(values) => values
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn claim_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn session_from_claims(claims: &Claims) -> Option<Session> {
    let role = claim(claims, ROLE_CLAIMS);
    let permissions = claim(claims, PERMISSION_CLAIMS);
    // Something without either claim is not a session.
    if role.is_none() && permissions.is_none() {
        return None;
    }

    Some(Session {
        role: role
            .map(claim_values)
            .and_then(|roles| roles.into_iter().next())
            .unwrap_or_default(),
        permissions: permissions
            .map(claim_values)
            .unwrap_or_default()
            .iter()
            .map(String::as_str)
            .collect(),
        name: claim(claims, NAME_CLAIMS).and_then(claim_text),
        email: claim(claims, EMAIL_CLAIMS).and_then(claim_text),
        user_id: claim(claims, USER_ID_CLAIMS).and_then(claim_text),
    })
}

/// decode
///
/// Turns a stored credential into a session. Accepts either a JWT or the persisted
/// decoded JSON. Absent, empty or malformed input yields `None`; this never fails.
///
/// The JWT signature is not checked: the client never holds the signing key and the
/// backend re-validates the token on every request.
pub fn decode(raw: Option<&str>) -> Option<Session> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let claims = if raw.starts_with('{') {
        serde_json::from_str::<Claims>(raw).ok()?
    } else {
        jwt_claims(raw)?
    };
    session_from_claims(&claims)
}

// The payload is read without checking the signature or the registered claims.
fn jwt_claims(token: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!(error = %e, "stored credential is not a readable JWT");
            None
        }
    }
}

impl Session {
    /// Fallback used when the login token cannot be decoded: whatever the login response
    /// itself says, with no permissions.
    pub fn from_login(response: &LoginResponse, email: &str) -> Self {
        Session {
            role: response.role.clone().unwrap_or_else(|| "user".to_string()),
            permissions: PermissionSet::default(),
            name: response.name.clone().or_else(|| Some(email.to_string())),
            email: Some(email.to_string()),
            user_id: response.user_id.as_ref().map(ToString::to_string),
        }
    }
}

// --- Lifecycle ---

#[derive(Debug, Clone)]
struct ActiveSession {
    raw_token: String,
    session: Session,
}

/// SessionService
///
/// The one place that reads or writes the session. Cheap to clone; all clones share
/// state. Many readers, one writer (login/logout).
#[derive(Clone)]
pub struct SessionService {
    store: StoreState,
    active: Arc<RwLock<Option<ActiveSession>>>,
}

impl SessionService {
    pub fn new(store: StoreState) -> Self {
        Self {
            store,
            active: Arc::new(RwLock::new(None)),
        }
    }

    /// restore
    ///
    /// Loads a previously persisted session. Both keys must be present and one of them
    /// must decode; anything else is cleared and the service stays anonymous.
    pub async fn restore(&self) -> Result<Option<Session>, PortalError> {
        let raw = self.store.get(RAW_TOKEN_KEY).await?;
        let decoded = self.store.get(DECODED_TOKEN_KEY).await?;

        let restored = match (raw, decoded) {
            (Some(raw_token), Some(decoded)) => decode(Some(&decoded))
                .or_else(|| decode(Some(&raw_token)))
                .map(|session| ActiveSession { raw_token, session }),
            (None, None) => return Ok(None),
            _ => None,
        };

        match restored {
            Some(active) => {
                tracing::info!(role = %active.session.role, "restored persisted session");
                let session = active.session.clone();
                *self.active.write().await = Some(active);
                Ok(Some(session))
            }
            None => {
                tracing::warn!("discarding unreadable persisted session");
                self.clear_store().await?;
                Ok(None)
            }
        }
    }

    /// login
    ///
    /// Authenticates against the backend and persists the raw token plus its decoded
    /// form. Returns the new session.
    pub async fn login(
        &self,
        backend: &dyn PortalBackend,
        credentials: &LoginRequest,
    ) -> Result<Session, PortalError> {
        let response = backend.login(credentials).await?;
        if response.token.trim().is_empty() {
            return Err(PortalError::Unauthorized(
                "اسم المستخدم أو كلمة المرور غير صحيحة".to_string(),
            ));
        }

        let mut session = decode(Some(&response.token))
            .unwrap_or_else(|| Session::from_login(&response, &credentials.email));
        if session.name.is_none() {
            session.name = response.name.clone().or_else(|| Some(credentials.email.clone()));
        }
        if session.email.is_none() {
            session.email = Some(credentials.email.clone());
        }

        self.establish(response.token, session).await
    }

    /// Persists and activates a session whose token was obtained elsewhere.
    pub async fn establish(&self, raw_token: String, session: Session) -> Result<Session, PortalError> {
        let decoded = serde_json::to_string(&session)?;

        let mut active = self.active.write().await;
        self.store.set(RAW_TOKEN_KEY, &raw_token).await?;
        if let Err(e) = self.store.set(DECODED_TOKEN_KEY, &decoded).await {
            // Never leave a raw token behind without its decoded form.
            if let Err(rollback) = self.store.remove(RAW_TOKEN_KEY).await {
                tracing::warn!(error = %rollback, "raw token left behind without its decoded form");
            }
            return Err(e);
        }
        *active = Some(ActiveSession {
            raw_token,
            session: session.clone(),
        });

        tracing::info!(role = %session.role, permissions = session.permissions.len(), "session established");
        Ok(session)
    }

    /// logout
    ///
    /// Drops the in-memory session and removes both persisted keys. The in-memory state
    /// is cleared even when the store fails, so the portal is anonymous either way.
    pub async fn logout(&self) -> Result<(), PortalError> {
        let mut active = self.active.write().await;
        *active = None;
        self.clear_store().await?;
        tracing::info!("session cleared");
        Ok(())
    }

    async fn clear_store(&self) -> Result<(), PortalError> {
        let raw = self.store.remove(RAW_TOKEN_KEY).await;
        let decoded = self.store.remove(DECODED_TOKEN_KEY).await;
        raw.and(decoded)
    }

    pub async fn current(&self) -> Option<Session> {
        self.active.read().await.as_ref().map(|a| a.session.clone())
    }

    /// The raw credential to send as `Authorization: Bearer …`.
    pub async fn raw_token(&self) -> Option<String> {
        self.active.read().await.as_ref().map(|a| a.raw_token.clone())
    }

    pub async fn state(&self) -> SessionState {
        if self.active.read().await.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }
}
