use std::collections::HashMap;

use crate::models::{Expense, ExpenseStatus, ReviewEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Approved { expense_id: i64, description: String },
    Rejected { expense_id: i64, description: String },
    RefreshFailed(String),
}

impl Notification {
    fn for_decision(expense_id: i64, description: &str, status: ExpenseStatus) -> Option<Self> {
        let description = description.to_string();
        match status {
            ExpenseStatus::Approved => Some(Notification::Approved { expense_id, description }),
            ExpenseStatus::Rejected => Some(Notification::Rejected { expense_id, description }),
            ExpenseStatus::Pending => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notification::Approved { description, .. } => {
                format!("Your expense \"{}\" has been approved!", description)
            }
            Notification::Rejected { description, .. } => {
                format!("Your expense \"{}\" has been rejected.", description)
            }
            Notification::RefreshFailed(_) => "Failed to refresh expenses".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Known {
    description: String,
    status: ExpenseStatus,
}

/// Tracks the last seen status of each expense and reports decisions.
/// Fed by polled snapshots, pushed review events, or both.
#[derive(Debug, Default)]
pub struct StatusWatcher {
    known: HashMap<i64, Known>,
    primed: bool,
    /// Newest pushed event id per expense.
    latest_events: HashMap<i64, i64>,
    last_event_id: i64,
}

impl StatusWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest pushed event id seen, for resuming a subscription.
    pub fn last_event_id(&self) -> i64 {
        self.last_event_id
    }

    /// Diffs a full snapshot against the previous one. The first snapshot only
    /// establishes the baseline.
    pub fn reconcile(&mut self, snapshot: &[Expense]) -> Vec<Notification> {
        let mut notifications = Vec::new();

        if self.primed {
            for expense in snapshot {
                let changed = self
                    .known
                    .get(&expense.id)
                    .is_some_and(|known| known.status != expense.status);
                if changed && expense.status.is_decision() {
                    notifications.extend(Notification::for_decision(
                        expense.id,
                        &expense.description,
                        expense.status,
                    ));
                }
            }
        }

        self.known = snapshot
            .iter()
            .map(|e| {
                (
                    e.id,
                    Known {
                        description: e.description.clone(),
                        status: e.status,
                    },
                )
            })
            .collect();
        self.primed = true;
        notifications
    }

    /// Applies one pushed event. Events may arrive out of id order; an event
    /// is ignored only when a newer one for the same expense was already applied.
    pub fn apply_event(&mut self, event: &ReviewEvent) -> Option<Notification> {
        self.last_event_id = self.last_event_id.max(event.id);

        let latest = self.latest_events.entry(event.expense_id).or_insert(0);
        if event.id <= *latest {
            return None;
        }
        *latest = event.id;

        let known = self.known.get_mut(&event.expense_id)?;
        if known.status == event.status {
            return None;
        }
        known.status = event.status;
        Notification::for_decision(event.expense_id, &known.description, event.status)
    }
}
