use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    models::PublicUser,
    state::AppState,
};

pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<PublicUser>>> {
    current.require_admin()?;

    let users: Vec<PublicUser> = state
        .store
        .list_users()
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();

    log::debug!("Found {} users", users.len());
    Ok(Json(users))
}
