use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::{multipart::MultipartRejection, Multipart};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::CurrentUser,
    services::receipts::ParseJob,
    state::AppState,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseJobResponse {
    job_id: Uuid,
    #[serde(flatten)]
    job: ParseJob,
}

pub async fn start_parse(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<impl IntoResponse> {
    let mut multipart = multipart?;
    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.body_text()))?
    {
        if field.name() == Some("receipt") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            if !data.is_empty() {
                image = Some(data);
            }
        }
    }

    let image = image.ok_or_else(|| AppError::validation("No file uploaded"))?;
    log::info!("Receipt parse requested by user {} ({} bytes)", current.user.id, image.len());
    let job_id = state.parse_jobs.submit(state.parser.clone(), image).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "success": true, "jobId": job_id })),
    ))
}

pub async fn parse_status(
    State(state): State<AppState>,
    _current: CurrentUser,
    job_id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<ParseJobResponse>> {
    let Path(job_id) = job_id?;
    let job = state
        .parse_jobs
        .get(job_id)
        .await
        .ok_or_else(|| AppError::not_found("No receipt parse job with that ID"))?;

    Ok(Json(ParseJobResponse { job_id, job }))
}
