use serde::Serialize;

use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NavItem {
    Dashboard,
    NewExpense,
    Profile,
    Approvals,
    UserManagement,
    ApprovalRules,
}

impl NavItem {
    pub fn href(&self) -> &'static str {
        match self {
            NavItem::Dashboard => "/dashboard",
            NavItem::NewExpense => "/new",
            NavItem::Profile => "/employee",
            NavItem::Approvals => "/manager",
            NavItem::UserManagement => "/admin-user-management",
            NavItem::ApprovalRules => "/admin-approval-rules",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NavItem::Dashboard => "Dashboard",
            NavItem::NewExpense => "New Expense",
            NavItem::Profile => "My Profile",
            NavItem::Approvals => "Approvals",
            NavItem::UserManagement => "User Management",
            NavItem::ApprovalRules => "Approval Rules",
        }
    }
}

/// Each role sees everything the role below it sees, plus its own items.
pub fn nav_items(role: Role) -> Vec<NavItem> {
    let mut items = vec![NavItem::Dashboard, NavItem::NewExpense, NavItem::Profile];
    if role.can_review() {
        items.push(NavItem::Approvals);
    }
    if role == Role::Admin {
        items.extend([NavItem::UserManagement, NavItem::ApprovalRules]);
    }
    items
}
