use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tower_cookies::Cookies;

use crate::{
    error::{AppError, AppResult},
    models::{PublicUser, Role},
    state::AppState,
    utils::verify_token,
};

pub const AUTH_COOKIE: &str = "auth_token";

/// The authenticated caller. The token only identifies the user; the role is
/// re-read from the store on every request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: PublicUser,
}

impl CurrentUser {
    pub fn require_any(&self, allowed: &[Role]) -> AppResult<()> {
        if allowed.contains(&self.user.role) {
            Ok(())
        } else {
            log::warn!("User {} ({}) denied access", self.user.id, self.user.role);
            Err(AppError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            ))
        }
    }

    pub fn require_reviewer(&self) -> AppResult<()> {
        let reviewers: Vec<Role> = Role::ALL.into_iter().filter(Role::can_review).collect();
        self.require_any(&reviewers)
    }

    pub fn require_admin(&self) -> AppResult<()> {
        self.require_any(&[Role::Admin])
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn cookie_token(parts: &Parts) -> Option<String> {
    // Present when CookieManagerLayer wraps the router.
    let cookies = parts.extensions.get::<Cookies>()?;
    cookies.get(AUTH_COOKIE).map(|cookie| cookie.value().to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| cookie_token(parts))
            .ok_or_else(|| AppError::Auth("Authentication required".to_string()))?;

        let claims = verify_token(&token, &state.config.jwt_secret)
            .map_err(|_| AppError::Auth("Session is invalid or has expired".to_string()))?;

        let user_id = claims
            .user_id()
            .ok_or_else(|| AppError::Auth("Session is invalid or has expired".to_string()))?;

        let user = state
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Auth("Session is invalid or has expired".to_string()))?;

        Ok(CurrentUser { user: user.into() })
    }
}
