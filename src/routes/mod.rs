/// Router Module Index
///
/// The shell's routes, split by who they are offered to. Only the admin module sits
/// behind the admin gate; none of them is an authorization boundary.

/// Routes for every visitor: listings, single articles, carousels.
pub mod public;

/// Login, logout and the current session.
pub mod session;

/// Back-office routes, offered according to the session's role and permissions.
pub mod admin;
