use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use axum_extra::extract::{multipart::MultipartRejection, Multipart};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::CurrentUser,
    models::{Expense, ExpenseTotals, ReviewEvent},
    services::expenses::{self, ExpenseForm, ReceiptUpload, StatusUpdate},
    state::AppState,
};

use super::json_body;

pub async fn create_expense(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<Value>> {
    let (form, receipt) = parse_expense_multipart(multipart?).await?;
    let expense = expenses::create_expense(&state, form, receipt).await?;
    log::debug!("Expense {} submitted by user {}", expense.id, current.user.id);

    Ok(Json(json!({ "success": true, "id": expense.id })))
}

pub async fn list_expenses(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> AppResult<Json<Vec<Expense>>> {
    let expenses = expenses::list_expenses(&state, None).await?;
    Ok(Json(expenses))
}

pub async fn list_expenses_by_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(status): Path<String>,
) -> AppResult<Json<Vec<Expense>>> {
    current.require_reviewer()?;

    let expenses = expenses::list_expenses(&state, Some(&status)).await?;
    log::debug!("Found {} expenses with status {}", expenses.len(), status);
    Ok(Json(expenses))
}

pub async fn expense_count(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> AppResult<Json<ExpenseTotals>> {
    Ok(Json(expenses::expense_totals(&state).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    current: CurrentUser,
    expense_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> AppResult<Json<Value>> {
    current.require_reviewer()?;
    let Path(expense_id) = expense_id?;

    let event = expenses::update_status(&state, expense_id, json_body(payload)?).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Expense {} successfully!", event.status),
        "expenseId": expense_id,
        "status": event.status,
        "reviewedBy": event.reviewed_by,
        "reviewedAt": event.reviewed_at,
    })))
}

pub async fn review_history(
    State(state): State<AppState>,
    _current: CurrentUser,
    expense_id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Vec<ReviewEvent>>> {
    let Path(expense_id) = expense_id?;
    Ok(Json(expenses::review_history(&state, expense_id).await?))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    current: CurrentUser,
    expense_id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Value>> {
    current.require_admin()?;
    let Path(expense_id) = expense_id?;

    expenses::delete_expense(&state, expense_id).await?;
    Ok(Json(json!({ "success": true, "message": "Expense deleted successfully" })))
}

async fn parse_expense_multipart(
    mut multipart: Multipart,
) -> AppResult<(ExpenseForm, Option<ReceiptUpload>)> {
    let mut form = ExpenseForm::default();
    let mut receipt = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.body_text()))?
    {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        if name == "receipt" {
            let filename = field.file_name().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            if !data.is_empty() {
                receipt = Some(ReceiptUpload { filename, data });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;

        match name.as_str() {
            "description" => form.description = Some(value),
            "date" => form.date = Some(value),
            "paidBy" => form.paid_by = Some(value),
            "category" => form.category = Some(value),
            "remarks" => form.remarks = Some(value),
            "amount" => form.amount = Some(value),
            "currency" => form.currency = Some(value),
            "status" => form.status = Some(value),
            _ => (),
        }
    }

    Ok((form, receipt))
}
