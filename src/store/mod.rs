//! Persistence seams. `PgStore` backs the server; `MemoryStore` implements the
//! same traits for tests and for running without PostgreSQL.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{Expense, ExpenseStatus, ExpenseTotals, NewExpense, NewUser, ReviewEvent, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `AppError::Conflict` when the email is already registered.
    async fn insert_user(&self, user: &NewUser) -> AppResult<User>;

    async fn find_user_by_id(&self, id: i64) -> AppResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Returns false when no user has that email.
    async fn update_password(&self, email: &str, password_hash: &str) -> AppResult<bool>;

    /// All users ordered by name.
    async fn list_users(&self) -> AppResult<Vec<User>>;
}

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Inserts with status pending and no review fields.
    async fn insert_expense(&self, expense: &NewExpense) -> AppResult<Expense>;

    async fn find_expense(&self, id: i64) -> AppResult<Option<Expense>>;

    /// Newest created first, optionally restricted to one status.
    async fn list_expenses(&self, status: Option<ExpenseStatus>) -> AppResult<Vec<Expense>>;

    /// Appends a review event and makes it the expense's current state, atomically.
    /// Returns `None` when the expense does not exist.
    async fn record_review(
        &self,
        expense_id: i64,
        status: ExpenseStatus,
        reviewed_by: Option<&str>,
    ) -> AppResult<Option<ReviewEvent>>;

    /// Returns false when the expense does not exist.
    async fn delete_expense(&self, id: i64) -> AppResult<bool>;

    async fn expense_totals(&self) -> AppResult<ExpenseTotals>;

    /// Review history of one expense, oldest first.
    async fn reviews_for(&self, expense_id: i64) -> AppResult<Vec<ReviewEvent>>;

    /// Review events with an id greater than `after_id`, oldest first.
    async fn reviews_after(&self, after_id: i64) -> AppResult<Vec<ReviewEvent>>;
}

pub trait Store: UserStore + ExpenseStore {}

impl<T: UserStore + ExpenseStore> Store for T {}
