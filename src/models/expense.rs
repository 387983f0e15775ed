use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use super::ParseEnumError;

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Pending => "pending",
            ExpenseStatus::Approved => "approved",
            ExpenseStatus::Rejected => "rejected",
        }
    }

    /// Approved and rejected are the outcomes a submitter is told about.
    pub fn is_decision(&self) -> bool {
        !matches!(self, ExpenseStatus::Pending)
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExpenseStatus::Pending),
            "approved" => Ok(ExpenseStatus::Approved),
            "rejected" => Ok(ExpenseStatus::Rejected),
            other => Err(ParseEnumError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ExpenseStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub id: i64,
    pub description: String,
    pub date: NaiveDate,
    #[serde(rename = "paidBy")]
    pub paid_by: String,
    pub category: String,
    pub remarks: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub receipt: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ExpenseStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A validated submission. There is no status field: new expenses are always pending.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub description: String,
    pub date: NaiveDate,
    pub paid_by: String,
    pub category: String,
    pub remarks: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub receipt: Option<String>,
}

/// One entry of an expense's append-only review history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ReviewEvent {
    pub id: i64,
    pub expense_id: i64,
    #[sqlx(try_from = "String")]
    pub status: ExpenseStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ExpenseTotals {
    pub count: i64,
    pub total: Option<Decimal>,
}
