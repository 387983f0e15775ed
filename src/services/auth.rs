use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{user::DEFAULT_COUNTRY, NewUser, PublicUser, Role},
    state::AppState,
    utils::{generate_password, hash_password, verify_password, GENERATED_PASSWORD_LEN},
};

/// Same text for unknown email and wrong password.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const RESET_ACKNOWLEDGEMENT: &str =
    "If an account with this email exists, you will receive a password reset link shortly.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub country: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub message: String,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_password: Option<String>,
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

// Column limits of the users table.
const MAX_NAME_LEN: usize = 255;
const MAX_EMAIL_LEN: usize = 255;
const MAX_COUNTRY_LEN: usize = 100;

/// Hash verified against when the email is unknown, so both login failures
/// spend one bcrypt verification.
fn dummy_hash(cost: u32) -> AppResult<&'static str> {
    static DUMMY: OnceLock<String> = OnceLock::new();
    if let Some(hash) = DUMMY.get() {
        return Ok(hash.as_str());
    }
    let hash = hash_password(&generate_password(GENERATED_PASSWORD_LEN), cost)?;
    Ok(DUMMY.get_or_init(|| hash).as_str())
}

/// Trimmed, non-empty value or nothing.
fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn signup(state: &AppState, request: SignupRequest) -> AppResult<PublicUser> {
    let (Some(name), Some(email), Some(password), Some(role)) = (
        present(request.name),
        present(request.email),
        request.password.filter(|p| !p.is_empty()),
        present(request.role),
    ) else {
        return Err(AppError::validation(
            "Please fill in all required fields including role",
        ));
    };

    let role: Role = role
        .parse()
        .map_err(|_| AppError::validation("Role must be employee, manager, or admin"))?;

    if !is_valid_email(&email) {
        return Err(AppError::validation("Please enter a valid email address"));
    }

    let country = present(request.country).unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
    if name.chars().count() > MAX_NAME_LEN
        || email.chars().count() > MAX_EMAIL_LEN
        || country.chars().count() > MAX_COUNTRY_LEN
    {
        return Err(AppError::validation(
            "Name and email must be at most 255 characters, country at most 100",
        ));
    }

    let new_user = NewUser {
        name,
        email,
        password_hash: hash_password(&password, state.config.bcrypt_cost)?,
        country,
        role,
    };

    // The unique index on users.email decides duplicates.
    let user = state.store.insert_user(&new_user).await?;
    log::info!("User {} created with role {}", user.id, user.role);
    Ok(user.into())
}

pub async fn login(state: &AppState, request: LoginRequest) -> AppResult<PublicUser> {
    let (Some(email), Some(password)) = (
        present(request.email),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation("Please enter both email and password"));
    };

    let Some(user) = state.store.find_user_by_email(&email).await? else {
        let _ = verify_password(&password, dummy_hash(state.config.bcrypt_cost)?);
        return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(&password, &user.password_hash).unwrap_or(false) {
        return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
    }

    log::info!("User {} logged in", user.id);
    Ok(user.into())
}

pub async fn request_password_reset(state: &AppState, request: EmailRequest) -> AppResult<&'static str> {
    let email = present(request.email)
        .ok_or_else(|| AppError::validation("Please provide your email address"))?;

    match state.store.find_user_by_email(&email).await? {
        Some(user) => log::info!("Password reset requested for user {}", user.id),
        None => log::debug!("Password reset requested for unknown email"),
    }

    Ok(RESET_ACKNOWLEDGEMENT)
}

pub async fn issue_new_password(state: &AppState, request: EmailRequest) -> AppResult<PasswordReset> {
    let email = present(request.email)
        .ok_or_else(|| AppError::validation("Please provide email address"))?;

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::not_found("No user found with this email address"))?;

    let password = generate_password(GENERATED_PASSWORD_LEN);
    let password_hash = hash_password(&password, state.config.bcrypt_cost)?;
    if !state.store.update_password(&email, &password_hash).await? {
        return Err(AppError::not_found("No user found with this email address"));
    }
    log::info!("Password replaced for user {}", user.id);

    let user = PublicUser::from(user);
    state.password_delivery.deliver(&user, &password).await?;

    Ok(PasswordReset {
        message: format!("New password generated and sent to {}", user.email),
        user_name: user.name,
        generated_password: state.config.expose_generated_passwords.then_some(password),
    })
}
