//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Consulted by the router guard on every navigation and by views that hide
//! controls the user lacks permission for. The token is the only durable
//! part; user and permissions are re-fetched with [`AuthState::load_user`].

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use tracing::info;

use crate::error::ApiError;
use crate::net::api::ApiClient;
use crate::net::types::User;

/// Permission that grants every other permission.
pub const ADMIN_PERMISSION: &str = "admin";

/// Bearer token plus the user and permission set it resolves to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthState {
    pub token: Option<String>,
    pub user: Option<User>,
    pub permissions: Vec<String>,
}

impl AuthState {
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
    }

    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    pub fn set_permissions(&mut self, permissions: Vec<String>) {
        self.permissions = permissions;
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// True when `permission` is held directly or through `admin`.
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p == permission || p == ADMIN_PERMISSION)
    }

    /// Log out locally: drop token, user and permissions.
    pub fn clear(&mut self) {
        self.token = None;
        self.user = None;
        self.permissions.clear();
    }

    /// Resolve the token into a user via `GET /auth/user`.
    ///
    /// Returns whether a user is now loaded. A `null` session while a token
    /// is held means the token went stale, and the state is cleared.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures. A 401 also clears the state.
    pub async fn load_user(&mut self, api: &ApiClient) -> Result<bool, ApiError> {
        if self.token.is_none() {
            self.user = None;
            self.permissions.clear();
            return Ok(false);
        }
        match api.current_user().await {
            Ok(Some(session)) => {
                self.set_user(Some(session.user));
                self.set_permissions(session.permissions);
                Ok(true)
            }
            Ok(None) => {
                info!("stored token no longer resolves to a user; clearing session");
                self.clear();
                Ok(false)
            }
            Err(ApiError::Unauthorized(message)) => {
                info!(%message, "session rejected; clearing");
                self.clear();
                Err(ApiError::Unauthorized(message))
            }
            Err(e) => Err(e),
        }
    }
}
