//! Permission gate.
//!
//! Everything here is a pure function of the current [`Session`]. It decides what the
//! portal *offers* (navigation entries, admin screens, buttons). It is not an
//! authorization boundary: the backend checks the bearer token on every call and
//! remains the only authority.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeSet, convert::Infallible, fmt};
use utoipa::ToSchema;

use crate::session::{Session, SessionService};

/// Role value that unlocks the admin area. Compared exactly, case-sensitive.
pub const ADMIN_ROLE: &str = "Admin";

// --- Permissions ---

/// Permission
///
/// The permission names the backend is known to issue. Any other name is kept verbatim
/// in `Other` and still matched by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    GetContact,
    AddNewsPaper,
    GetAllUsers,
    Other(String),
}

impl Permission {
    pub fn as_str(&self) -> &str {
        match self {
            Permission::GetContact => "GetContact",
            Permission::AddNewsPaper => "AddNewsPaper",
            Permission::GetAllUsers => "GetAllUsers",
            Permission::Other(name) => name,
        }
    }
}

impl From<&str> for Permission {
    fn from(name: &str) -> Self {
        match name {
            "GetContact" => Permission::GetContact,
            "AddNewsPaper" => Permission::AddNewsPaper,
            "GetAllUsers" => Permission::GetAllUsers,
            other => Permission::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PermissionSet
///
/// The permissions carried by a session. Serialized as a plain list of names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(&Permission::from(name))
    }

    pub fn insert(&mut self, permission: impl Into<Permission>) -> bool {
        self.0.insert(permission.into())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.0.remove(&Permission::from(name))
    }

    /// Flips one permission, as a checkbox on the user-permissions screen does.
    /// Returns whether the permission is now granted.
    pub fn toggle(&mut self, name: &str) -> bool {
        if self.remove(name) {
            false
        } else {
            self.insert(name);
            true
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|p| p.as_str().to_string()).collect()
    }
}

impl<'a> FromIterator<&'a str> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        PermissionSet(iter.into_iter().map(Permission::from).collect())
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(Permission::as_str))
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(names.iter().map(String::as_str).collect())
    }
}

// --- Gate ---

/// False without a session; otherwise exact membership.
pub fn has_permission(session: Option<&Session>, name: &str) -> bool {
    session.is_some_and(|s| s.permissions.contains(name))
}

pub fn is_admin(session: Option<&Session>) -> bool {
    session.is_some_and(|s| s.role == ADMIN_ROLE)
}

/// Whether the admin area is offered at all.
pub fn can_enter_admin(session: Option<&Session>) -> bool {
    is_admin(session)
}

/// AdminAction
///
/// The admin screens and the permission each one requires, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    ViewDashboard,
    ViewContact,
    ManageNews,
    ManageUsers,
    /// Board-of-directors screens are open to every admin.
    ManageBoard,
}

impl AdminAction {
    pub fn required_permission(self) -> Option<Permission> {
        match self {
            AdminAction::ViewDashboard | AdminAction::ViewContact => Some(Permission::GetContact),
            AdminAction::ManageNews => Some(Permission::AddNewsPaper),
            AdminAction::ManageUsers => Some(Permission::GetAllUsers),
            AdminAction::ManageBoard => None,
        }
    }

    /// An action is offered to an admin holding its permission.
    pub fn is_offered(self, session: Option<&Session>) -> bool {
        can_enter_admin(session)
            && self
                .required_permission()
                .is_none_or(|permission| has_permission(session, permission.as_str()))
    }
}

// --- Navigation ---

/// NavItem
///
/// One entry of the admin sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct NavItem {
    #[schema(value_type = String)]
    pub href: &'static str,
    #[schema(value_type = String)]
    pub label: &'static str,
    #[schema(value_type = String)]
    pub permission: &'static str,
}

/// The admin sidebar, in display order.
pub const ADMIN_NAV: [NavItem; 5] = [
    NavItem {
        href: "/admin",
        label: "لوحة التحكم",
        permission: "GetContact",
    },
    NavItem {
        href: "/admin/contact",
        label: "الاطلاع علي الشكاوي",
        permission: "GetContact",
    },
    NavItem {
        href: "/admin/contact/edit",
        label: "تعديل البيانات تواصل معنا",
        permission: "GetContact",
    },
    NavItem {
        href: "/admin/news",
        label: "إدارة الأخبار والاعلانات",
        permission: "AddNewsPaper",
    },
    NavItem {
        href: "/admin/clients",
        label: "إدارة العملاء",
        permission: "GetAllUsers",
    },
];

/// The sidebar entries this session is offered. Empty outside the admin area.
pub fn visible_nav(session: Option<&Session>) -> Vec<NavItem> {
    if !can_enter_admin(session) {
        return Vec::new();
    }
    ADMIN_NAV
        .iter()
        .filter(|item| has_permission(session, item.permission))
        .cloned()
        .collect()
}

// --- Extractor ---

/// CurrentSession
///
/// The session as seen by a shell handler. Never rejects: an anonymous visitor simply
/// gets `None`.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<Session>);

impl CurrentSession {
    pub fn get(&self) -> Option<&Session> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    SessionService: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionService::from_ref(state);
        Ok(CurrentSession(sessions.current().await))
    }
}
