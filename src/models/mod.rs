pub mod expense;
pub mod receipt;
pub mod user;

pub use expense::{
    Expense, ExpenseStatus, ExpenseTotals, NewExpense, ReviewEvent,
};
pub use receipt::{ParsedReceipt, ReceiptItem};
pub use user::{NewUser, PublicUser, Role, User};

use thiserror::Error;

/// Raised when a stored or submitted string is not one of an enum's variants.
#[derive(Debug, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}
