//! Database row types. These map directly to SQLite rows and stay
//! independent of the wire types in todolist-types.

use chrono::{DateTime, Utc};
use todolist_types::{Priority, Status};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_joined: DateTime<Utc>,
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
}

/// Category joined with its owner.
#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub id: i64,
    pub title: String,
    pub is_deleted: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub owner: UserRow,
}

#[derive(Debug, Clone)]
pub struct GoalRow {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    pub due_date: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

pub struct NewGoal<'a> {
    pub user_id: i64,
    pub category_id: i64,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub status: Status,
    pub priority: Priority,
    pub due_date: DateTime<Utc>,
}

/// Comment joined with its author.
#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub goal_id: i64,
    pub text: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub author: UserRow,
}

// -- Listing --

/// Sortable columns. Each list query accepts only its own subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Created,
    Updated,
    DueDate,
    Priority,
    Status,
}

impl SortKey {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Self::Title),
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "due_date" => Some(Self::DueDate),
            "priority" => Some(Self::Priority),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Created => "created",
            Self::Updated => "updated",
            Self::DueDate => "due_date",
            Self::Priority => "priority",
            Self::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub key: SortKey,
    pub descending: bool,
}

/// Limit/offset window. `limit: None` returns every row from `offset`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Window {
    pub limit: Option<i64>,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    pub user_id: i64,
    pub search: Option<String>,
    pub ordering: Vec<OrderBy>,
    pub window: Window,
}

#[derive(Debug, Clone, Default)]
pub struct GoalFilter {
    pub user_id: i64,
    pub category_ids: Vec<i64>,
    pub statuses: Vec<Status>,
    pub priorities: Vec<Priority>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_until: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub ordering: Vec<OrderBy>,
    pub window: Window,
}

#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub user_id: i64,
    pub goal_id: Option<i64>,
    pub ordering: Vec<OrderBy>,
    pub window: Window,
}
