use crate::error::{AppError, AppResult};
use crate::models::UserId;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Who is making the current request. Built once per request by the
/// viewer middleware and read by handlers through `Vc`.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerContext {
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub role: Option<String>,
    pub request_id: String,
}

impl ViewerContext {
    pub fn anonymous(request_id: String) -> Self {
        Self {
            user_id: None,
            username: None,
            role: None,
            request_id,
        }
    }

    pub fn authenticated(user_id: UserId, username: String, role: String, request_id: String) -> Self {
        Self {
            user_id: Some(user_id),
            username: Some(username),
            role: Some(role),
            request_id,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.role.as_deref() == Some(ROLE_ADMIN)
    }

    pub fn require_user(&self) -> AppResult<UserId> {
        self.user_id
            .ok_or_else(|| AppError::Unauthorized("Login required".to_string()))
    }

    pub fn require_admin(&self) -> AppResult<UserId> {
        let user_id = self.require_user()?;
        if !self.is_admin() {
            return Err(AppError::Forbidden("Admin role required".to_string()));
        }
        Ok(user_id)
    }
}
