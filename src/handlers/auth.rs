use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::json;
use tower_cookies::{cookie::SameSite, Cookie, Cookies};

use crate::{
    error::AppResult,
    middleware::{CurrentUser, AUTH_COOKIE},
    models::PublicUser,
    services::auth::{self, EmailRequest, LoginRequest, PasswordReset, SignupRequest},
    state::AppState,
    utils::{auth::TOKEN_TTL_HOURS, create_token},
};

use super::json_body;

#[derive(Serialize)]
pub struct LoginResponse {
    success: bool,
    message: &'static str,
    user: PublicUser,
    token: String,
}

#[derive(Serialize)]
pub struct PasswordResetResponse {
    success: bool,
    #[serde(flatten)]
    reset: PasswordReset,
}

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let user = auth::signup(&state, json_body(payload)?).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Account created successfully!",
            "userId": user.id,
            "user": user,
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let user = auth::login(&state, json_body(payload)?).await?;
    let token = create_token(&user, &state.config.jwt_secret)?;

    // Browser clients ride on the cookie; API clients use the returned token.
    let cookie = Cookie::build((AUTH_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(TOKEN_TTL_HOURS))
        .build();
    cookies.add(cookie);

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful!",
        user,
        token,
    }))
}

pub async fn logout(cookies: Cookies) -> impl IntoResponse {
    cookies.remove(Cookie::build((AUTH_COOKIE, "")).path("/").build());
    Json(json!({ "success": true, "message": "Logged out" }))
}

pub async fn me(current: CurrentUser) -> Json<PublicUser> {
    Json(current.user)
}

pub async fn send_password(
    State(state): State<AppState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> AppResult<Json<PasswordResetResponse>> {
    let reset = auth::issue_new_password(&state, json_body(payload)?).await?;
    Ok(Json(PasswordResetResponse { success: true, reset }))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let message = auth::request_password_reset(&state, json_body(payload)?).await?;
    Ok(Json(json!({ "success": true, "message": message })))
}
