// src/auth/mod.rs
//
// Explicit authorization context. Identity mechanics (sessions, tokens) are
// an outside concern; requests carry an `x-user-id` header and this module
// turns it into a typed context the route handlers check against. Nothing in
// the occupancy core reads ambient user state.

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use sha2::{Digest, Sha256};
use sqlx::query_as;

use crate::models::AppUser;
use crate::AppState;

pub const ROLE_ADMIN: &str = "Admin";
pub const USER_ROLES: [&str; 5] = ["Admin", "Manager", "Coordinator", "Camp Boss", "User"];

// Global feature permission codes.
pub const INV_VIEW: &str = "INV_VIEW";
pub const INV_EDIT: &str = "INV_EDIT";
pub const MAINT_EDIT: &str = "MAINT_EDIT";
pub const AMCS_EDIT: &str = "AMCS_EDIT";
pub const FEATURE_PERMISSIONS: [&str; 4] = [INV_VIEW, INV_EDIT, MAINT_EDIT, AMCS_EDIT];

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub allowed_locations: Vec<String>,
    pub permissions: Vec<String>,
}

impl AuthContext {
    pub fn from_user(user: &AppUser) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username.clone(),
            role: user.role.clone(),
            allowed_locations: user.allowed_locations.clone(),
            permissions: user.permissions.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Location-scoped edit permission; admins may edit anywhere.
    pub fn can_edit_location(&self, location: &str) -> bool {
        self.is_admin() || self.allowed_locations.iter().any(|l| l == location)
    }

    /// Global feature permission. Edit access to inventory implies view.
    pub fn can_access_feature(&self, feature: &str) -> bool {
        if self.is_admin() {
            return true;
        }
        if feature == INV_VIEW && self.permissions.iter().any(|p| p == INV_EDIT) {
            return true;
        }
        self.permissions.iter().any(|p| p == feature)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id: i64 = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "missing or malformed x-user-id header".to_string(),
            ))?;

        let user = query_as::<_, AppUser>(r#"SELECT * FROM public.app_users WHERE user_id=$1"#)
            .bind(user_id)
            .fetch_optional(&state.pool)
            .await
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("internal error: {e}"),
                )
            })?
            .ok_or((StatusCode::UNAUTHORIZED, "unknown user".to_string()))?;

        Ok(AuthContext::from_user(&user))
    }
}

/// Salted SHA-256 password digest, hex encoded. Salts are per-user UUIDs.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_password(password: &str, salt: &str, stored_hash: &str) -> bool {
    hash_password(password, salt) == stored_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: &str, locations: &[&str], permissions: &[&str]) -> AuthContext {
        AuthContext {
            user_id: 1,
            username: "t".into(),
            role: role.into(),
            allowed_locations: locations.iter().map(|s| s.to_string()).collect(),
            permissions: permissions.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn admin_can_do_everything() {
        let c = ctx(ROLE_ADMIN, &[], &[]);
        assert!(c.can_edit_location("Site-West"));
        assert!(c.can_access_feature(AMCS_EDIT));
    }

    #[test]
    fn location_permission_is_exact_membership() {
        let c = ctx("Camp Boss", &["Site-West"], &[]);
        assert!(c.can_edit_location("Site-West"));
        assert!(!c.can_edit_location("Site-East"));
    }

    #[test]
    fn inventory_edit_implies_view() {
        let c = ctx("User", &[], &[INV_EDIT]);
        assert!(c.can_access_feature(INV_VIEW));
        assert!(c.can_access_feature(INV_EDIT));
        assert!(!c.can_access_feature(MAINT_EDIT));
    }

    #[test]
    fn password_round_trip() {
        let salt = "2f0c8b1e";
        let hash = hash_password("admin123", salt);
        assert!(verify_password("admin123", salt, &hash));
        assert!(!verify_password("admin124", salt, &hash));
    }
}
