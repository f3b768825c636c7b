mod categories;
mod comments;
mod goals;
mod sessions;
mod users;

pub use users::is_unique_violation;

use anyhow::Result;
use rusqlite::types::ToSql;
use rusqlite::{Row, params_from_iter};

use crate::models::{OrderBy, UserRow, Window};

/// Column list matching [`user_at`], for a `users` table aliased as `u`.
pub(crate) const USER_COLUMNS: &str =
    "u.id, u.username, u.password, u.first_name, u.last_name, u.email, u.date_joined";

/// Read a user from `row` starting at column `base`.
pub(crate) fn user_at(row: &Row<'_>, base: usize) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(base)?,
        username: row.get(base + 1)?,
        password: row.get(base + 2)?,
        first_name: row.get(base + 3)?,
        last_name: row.get(base + 4)?,
        email: row.get(base + 5)?,
        date_joined: row.get(base + 6)?,
    })
}

/// Dynamically assembled positional parameters.
pub(crate) type Params = Vec<Box<dyn ToSql>>;

pub(crate) fn as_params(params: &Params) -> impl rusqlite::Params + '_ {
    params_from_iter(params.iter().map(|p| p.as_ref()))
}

/// `ORDER BY` for the given keys on table alias `alias`; always ends with the
/// primary key so pages are stable.
pub(crate) fn order_clause(alias: &str, ordering: &[OrderBy]) -> String {
    let mut terms: Vec<String> = ordering
        .iter()
        .map(|o| {
            format!(
                "{}.{} {}",
                alias,
                o.key.column(),
                if o.descending { "DESC" } else { "ASC" }
            )
        })
        .collect();
    terms.push(format!("{}.id ASC", alias));
    format!("ORDER BY {}", terms.join(", "))
}

pub(crate) fn window_clause(window: Window) -> String {
    format!("LIMIT {} OFFSET {}", window.limit.unwrap_or(-1), window.offset.max(0))
}

/// `?, ?, ?` for an `IN (...)` list of `n` values.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
