use async_trait::async_trait;

use crate::{
    database::Database,
    error::{AppError, AppResult},
    models::{Expense, ExpenseStatus, ExpenseTotals, NewExpense, NewUser, ReviewEvent, User},
};

use super::{ExpenseStore, UserStore};

const USER_COLUMNS: &str = "id, name, email, password_hash, country, role, created_at";
const EXPENSE_COLUMNS: &str = "id, description, date, paid_by, category, remarks, amount, currency, \
     receipt, status, reviewed_by, reviewed_at, created_at";

#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &NewUser) -> AppResult<User> {
        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash, country, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.country)
        .bind(user.role.as_str())
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> AppResult<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE email = $2")
            .bind(password_hash)
            .bind(email)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY name, id"))
            .fetch_all(&self.db)
            .await?;
        Ok(users)
    }
}

#[async_trait]
impl ExpenseStore for PgStore {
    async fn insert_expense(&self, expense: &NewExpense) -> AppResult<Expense> {
        let expense = sqlx::query_as::<_, Expense>(&format!(
            "INSERT INTO expenses \
             (description, date, paid_by, category, remarks, amount, currency, receipt, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending') RETURNING {EXPENSE_COLUMNS}"
        ))
        .bind(&expense.description)
        .bind(expense.date)
        .bind(&expense.paid_by)
        .bind(&expense.category)
        .bind(&expense.remarks)
        .bind(expense.amount)
        .bind(&expense.currency)
        .bind(&expense.receipt)
        .fetch_one(&self.db)
        .await?;
        Ok(expense)
    }

    async fn find_expense(&self, id: i64) -> AppResult<Option<Expense>> {
        let expense = sqlx::query_as::<_, Expense>(&format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(expense)
    }

    async fn list_expenses(&self, status: Option<ExpenseStatus>) -> AppResult<Vec<Expense>> {
        let mut query_builder = sqlx::QueryBuilder::new(format!("SELECT {EXPENSE_COLUMNS} FROM expenses"));

        if let Some(status) = status {
            query_builder.push(" WHERE status = ");
            query_builder.push_bind(status.as_str());
        }

        query_builder.push(" ORDER BY created_at DESC, id DESC");

        let expenses = query_builder
            .build_query_as::<Expense>()
            .fetch_all(&self.db)
            .await?;
        Ok(expenses)
    }

    async fn record_review(
        &self,
        expense_id: i64,
        status: ExpenseStatus,
        reviewed_by: Option<&str>,
    ) -> AppResult<Option<ReviewEvent>> {
        let mut tx = self.db.begin().await?;

        let event = sqlx::query_as::<_, ReviewEvent>(
            "INSERT INTO expense_reviews (expense_id, status, reviewed_by) \
             SELECT id, $2, $3 FROM expenses WHERE id = $1 \
             RETURNING id, expense_id, status, reviewed_by, reviewed_at",
        )
        .bind(expense_id)
        .bind(status.as_str())
        .bind(reviewed_by)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(event) = event else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            "UPDATE expenses SET status = $1, reviewed_by = $2, reviewed_at = $3 WHERE id = $4",
        )
        .bind(event.status.as_str())
        .bind(&event.reviewed_by)
        .bind(event.reviewed_at)
        .bind(expense_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(event))
    }

    async fn delete_expense(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn expense_totals(&self) -> AppResult<ExpenseTotals> {
        let totals = sqlx::query_as::<_, ExpenseTotals>(
            "SELECT COUNT(*) AS count, SUM(amount) AS total FROM expenses",
        )
        .fetch_one(&self.db)
        .await?;
        Ok(totals)
    }

    async fn reviews_for(&self, expense_id: i64) -> AppResult<Vec<ReviewEvent>> {
        let events = sqlx::query_as::<_, ReviewEvent>(
            "SELECT id, expense_id, status, reviewed_by, reviewed_at FROM expense_reviews \
             WHERE expense_id = $1 ORDER BY id",
        )
        .bind(expense_id)
        .fetch_all(&self.db)
        .await?;
        Ok(events)
    }

    async fn reviews_after(&self, after_id: i64) -> AppResult<Vec<ReviewEvent>> {
        let events = sqlx::query_as::<_, ReviewEvent>(
            "SELECT id, expense_id, status, reviewed_by, reviewed_at FROM expense_reviews \
             WHERE id > $1 ORDER BY id",
        )
        .bind(after_id)
        .fetch_all(&self.db)
        .await?;
        Ok(events)
    }
}
