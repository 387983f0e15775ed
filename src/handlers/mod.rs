pub mod auth;
pub mod events;
pub mod expenses;
pub mod receipts;
pub mod users;

use axum::{extract::rejection::JsonRejection, Json};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Turns a malformed JSON body into a validation error with the usual error shape.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}
