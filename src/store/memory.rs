use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{Expense, ExpenseStatus, ExpenseTotals, NewExpense, NewUser, ReviewEvent, User},
};

use super::{ExpenseStore, UserStore};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    expenses: BTreeMap<i64, Expense>,
    reviews: Vec<ReviewEvent>,
    next_user_id: i64,
    next_expense_id: i64,
    next_review_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// Store held entirely in process memory. Each call takes the table lock once,
/// so the uniqueness check and insert cannot interleave.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let id = next_id(&mut tables.next_user_id);
        let created = User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            country: user.country.clone(),
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user_by_id(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.values_mut().find(|u| u.email == email) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self.tables.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }
}

#[async_trait]
impl ExpenseStore for MemoryStore {
    async fn insert_expense(&self, expense: &NewExpense) -> AppResult<Expense> {
        let mut tables = self.tables.write().await;
        let id = next_id(&mut tables.next_expense_id);
        let created = Expense {
            id,
            description: expense.description.clone(),
            date: expense.date,
            paid_by: expense.paid_by.clone(),
            category: expense.category.clone(),
            remarks: expense.remarks.clone(),
            amount: expense.amount,
            currency: expense.currency.clone(),
            receipt: expense.receipt.clone(),
            status: ExpenseStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        };
        tables.expenses.insert(id, created.clone());
        Ok(created)
    }

    async fn find_expense(&self, id: i64) -> AppResult<Option<Expense>> {
        Ok(self.tables.read().await.expenses.get(&id).cloned())
    }

    async fn list_expenses(&self, status: Option<ExpenseStatus>) -> AppResult<Vec<Expense>> {
        let tables = self.tables.read().await;
        let mut expenses: Vec<Expense> = tables
            .expenses
            .values()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .cloned()
            .collect();
        expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(expenses)
    }

    async fn record_review(
        &self,
        expense_id: i64,
        status: ExpenseStatus,
        reviewed_by: Option<&str>,
    ) -> AppResult<Option<ReviewEvent>> {
        let mut tables = self.tables.write().await;
        if !tables.expenses.contains_key(&expense_id) {
            return Ok(None);
        }

        let event = ReviewEvent {
            id: next_id(&mut tables.next_review_id),
            expense_id,
            status,
            reviewed_by: reviewed_by.map(str::to_string),
            reviewed_at: Utc::now(),
        };

        if let Some(expense) = tables.expenses.get_mut(&expense_id) {
            expense.status = event.status;
            expense.reviewed_by = event.reviewed_by.clone();
            expense.reviewed_at = Some(event.reviewed_at);
        }
        tables.reviews.push(event.clone());
        Ok(Some(event))
    }

    async fn delete_expense(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.expenses.remove(&id).is_none() {
            return Ok(false);
        }
        tables.reviews.retain(|r| r.expense_id != id);
        Ok(true)
    }

    async fn expense_totals(&self) -> AppResult<ExpenseTotals> {
        let tables = self.tables.read().await;
        let count = tables.expenses.len() as i64;
        let total = if count == 0 {
            None
        } else {
            Some(tables.expenses.values().map(|e| e.amount).sum::<Decimal>())
        };
        Ok(ExpenseTotals { count, total })
    }

    async fn reviews_for(&self, expense_id: i64) -> AppResult<Vec<ReviewEvent>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .iter()
            .filter(|r| r.expense_id == expense_id)
            .cloned()
            .collect())
    }

    async fn reviews_after(&self, after_id: i64) -> AppResult<Vec<ReviewEvent>> {
        let tables = self.tables.read().await;
        Ok(tables.reviews.iter().filter(|r| r.id > after_id).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::NaiveDate;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Jane".into(),
            email: email.into(),
            password_hash: "hash".into(),
            country: "USA".into(),
            role: Role::Employee,
        }
    }

    fn new_expense(description: &str) -> NewExpense {
        NewExpense {
            description: description.into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            paid_by: "Self".into(),
            category: "Travel".into(),
            remarks: None,
            amount: Decimal::new(4250, 2),
            currency: "USD".into(),
            receipt: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_user(&new_user("jane@x.com")).await.unwrap();
        let err = store.insert_user(&new_user("jane@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let store = MemoryStore::new();
        let first = store.insert_expense(&new_expense("first")).await.unwrap();
        let second = store.insert_expense(&new_expense("second")).await.unwrap();

        let ids: Vec<i64> = store.list_expenses(None).await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn reviews_append_and_replace_current_state() {
        let store = MemoryStore::new();
        let expense = store.insert_expense(&new_expense("Taxi")).await.unwrap();

        store.record_review(expense.id, ExpenseStatus::Approved, Some("Mgr A")).await.unwrap();
        let last = store
            .record_review(expense.id, ExpenseStatus::Rejected, None)
            .await
            .unwrap()
            .unwrap();

        let current = store.find_expense(expense.id).await.unwrap().unwrap();
        assert_eq!(current.status, ExpenseStatus::Rejected);
        assert_eq!(current.reviewed_by, None);
        assert_eq!(current.reviewed_at, Some(last.reviewed_at));

        let history = store.reviews_for(expense.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].reviewed_by.as_deref(), Some("Mgr A"));
        assert_eq!(store.reviews_after(history[0].id).await.unwrap(), vec![last]);
    }

    #[tokio::test]
    async fn review_of_missing_expense_is_none() {
        let store = MemoryStore::new();
        let result = store.record_review(99, ExpenseStatus::Approved, None).await.unwrap();
        assert!(result.is_none());
        assert!(store.reviews_after(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn totals_sum_amounts() {
        let store = MemoryStore::new();
        assert_eq!(
            store.expense_totals().await.unwrap(),
            ExpenseTotals { count: 0, total: None }
        );
        store.insert_expense(&new_expense("a")).await.unwrap();
        store.insert_expense(&new_expense("b")).await.unwrap();
        let totals = store.expense_totals().await.unwrap();
        assert_eq!(totals.count, 2);
        assert_eq!(totals.total, Some(Decimal::new(8500, 2)));
    }
}
