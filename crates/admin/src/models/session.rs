//! Session-stored types.

use rhema_core::{ProfileRole, UserId};
use serde::{Deserialize, Serialize};

/// Signed-in user as stored in the session.
///
/// Holds identity only. The role is resolved per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
}

/// A signed-in user whose profile role grants back-office access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffUser {
    pub id: UserId,
    pub email: String,
    pub role: ProfileRole,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "admin_user";
}
