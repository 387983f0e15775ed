use std::path::{Path, PathBuf};

use axum::body::Bytes;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::fs;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Expense, ExpenseStatus, ExpenseTotals, NewExpense, ReviewEvent},
    state::AppState,
};

const RECEIPT_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "pdf"];

// Column limits of the expenses table.
const MAX_DESCRIPTION_LEN: usize = 255;
const MAX_LABEL_LEN: usize = 100;
const MAX_CURRENCY_LEN: usize = 10;
const MAX_REVIEWER_LEN: usize = 255;

/// NUMERIC(10, 2) holds eight integer digits.
fn max_amount() -> Decimal {
    Decimal::new(99_999_999_99, 2)
}

/// Raw submission as it arrives from the form; everything is validated here.
#[derive(Debug, Default)]
pub struct ExpenseForm {
    pub description: Option<String>,
    pub date: Option<String>,
    pub paid_by: Option<String>,
    pub category: Option<String>,
    pub remarks: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    /// Accepted for compatibility with older clients and ignored.
    pub status: Option<String>,
}

pub struct ReceiptUpload {
    pub filename: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: Option<String>,
    pub reviewed_by: Option<String>,
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(format!("{field} is required")))
}

fn bounded(value: String, field: &str, max: usize) -> AppResult<String> {
    if value.chars().count() > max {
        return Err(AppError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(value)
}

impl ExpenseForm {
    fn validate(self) -> AppResult<NewExpense> {
        let date = required(self.date, "date")?;
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| AppError::validation("date must be formatted as YYYY-MM-DD"))?;

        let amount = required(self.amount, "amount")?;
        let mut amount: Decimal = amount
            .parse()
            .map_err(|_| AppError::validation("amount must be a number"))?;
        amount = amount.round_dp(2);
        amount.rescale(2);
        if amount.abs() > max_amount() {
            return Err(AppError::validation("amount is too large"));
        }

        if self.status.is_some() {
            log::debug!("Ignoring client-supplied status on new expense");
        }

        Ok(NewExpense {
            description: bounded(
                required(self.description, "description")?,
                "description",
                MAX_DESCRIPTION_LEN,
            )?,
            date,
            paid_by: bounded(required(self.paid_by, "paidBy")?, "paidBy", MAX_LABEL_LEN)?,
            category: bounded(required(self.category, "category")?, "category", MAX_LABEL_LEN)?,
            remarks: self.remarks.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            amount,
            currency: bounded(required(self.currency, "currency")?, "currency", MAX_CURRENCY_LEN)?,
            receipt: None,
        })
    }
}

pub async fn create_expense(
    state: &AppState,
    form: ExpenseForm,
    receipt: Option<ReceiptUpload>,
) -> AppResult<Expense> {
    // Validate before touching the disk so a bad form leaves no orphan file.
    let mut new_expense = form.validate()?;
    if let Some(upload) = receipt {
        new_expense.receipt = Some(save_receipt(&state.config.upload_dir, upload).await?);
    }

    match state.store.insert_expense(&new_expense).await {
        Ok(expense) => {
            log::info!("Expense {} submitted ({} {})", expense.id, expense.amount, expense.currency);
            Ok(expense)
        }
        Err(e) => {
            if let Some(name) = &new_expense.receipt {
                let _ = fs::remove_file(state.config.upload_dir.join(name)).await;
            }
            Err(e)
        }
    }
}

/// Writes the upload under `upload_dir` with a generated name and returns that name.
pub async fn save_receipt(upload_dir: &Path, receipt: ReceiptUpload) -> AppResult<String> {
    if receipt.data.is_empty() {
        return Err(AppError::validation("Receipt file is empty"));
    }

    let extension = receipt
        .filename
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !RECEIPT_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::validation("Receipt must be a PNG, JPEG, WEBP or PDF file"));
    }

    if !upload_dir.exists() {
        fs::create_dir_all(upload_dir).await?;
    }

    let file_name = format!("{}.{}", Uuid::new_v4(), extension);
    let file_path: PathBuf = upload_dir.join(&file_name);
    fs::write(&file_path, &receipt.data).await?;
    Ok(file_name)
}

/// Unknown status names match nothing, the same as an exact-match query would.
pub async fn list_expenses(state: &AppState, status: Option<&str>) -> AppResult<Vec<Expense>> {
    match status {
        None => state.store.list_expenses(None).await,
        Some(raw) => match raw.parse::<ExpenseStatus>() {
            Ok(status) => state.store.list_expenses(Some(status)).await,
            Err(_) => Ok(Vec::new()),
        },
    }
}

pub async fn update_status(state: &AppState, expense_id: i64, update: StatusUpdate) -> AppResult<ReviewEvent> {
    let status: ExpenseStatus = update
        .status
        .as_deref()
        .unwrap_or("")
        .parse()
        .map_err(|_| AppError::validation("Status must be pending, approved, or rejected"))?;

    let reviewed_by = update
        .reviewed_by
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    if let Some(name) = reviewed_by {
        bounded(name.to_string(), "reviewedBy", MAX_REVIEWER_LEN)?;
    }

    let event = state
        .store
        .record_review(expense_id, status, reviewed_by)
        .await?
        .ok_or_else(|| AppError::not_found("No expense found with that ID"))?;

    log::info!("Expense {} status updated to {}", expense_id, status);
    state.reviews.publish(event.clone());
    Ok(event)
}

pub async fn delete_expense(state: &AppState, expense_id: i64) -> AppResult<()> {
    let existing = state.store.find_expense(expense_id).await?;
    if !state.store.delete_expense(expense_id).await? {
        return Err(AppError::not_found("Expense not found"));
    }

    if let Some(receipt) = existing.and_then(|e| e.receipt) {
        if let Err(e) = fs::remove_file(state.config.upload_dir.join(&receipt)).await {
            log::warn!("Could not remove receipt {}: {}", receipt, e);
        }
    }
    log::info!("Expense {} deleted", expense_id);
    Ok(())
}

pub async fn expense_totals(state: &AppState) -> AppResult<ExpenseTotals> {
    state.store.expense_totals().await
}

pub async fn review_history(state: &AppState, expense_id: i64) -> AppResult<Vec<ReviewEvent>> {
    if state.store.find_expense(expense_id).await?.is_none() {
        return Err(AppError::not_found("Expense not found"));
    }
    state.store.reviews_for(expense_id).await
}
