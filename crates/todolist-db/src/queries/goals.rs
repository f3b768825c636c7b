use anyhow::Result;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use todolist_types::{Priority, Status};

use super::{OptionalExt, Params, as_params, order_clause, placeholders, window_clause};
use crate::Database;
use crate::models::{GoalFilter, GoalRow, NewGoal};

const GOAL_COLUMNS: &str = "g.id, g.user_id, g.category_id, g.title, g.description, g.status, \
                            g.priority, g.due_date, g.created, g.updated";

/// A goal is visible while it is not archived and its category is not deleted.
pub(crate) fn visible_goal() -> String {
    format!("g.status != {} AND c.is_deleted = 0", Status::Archived.code())
}

fn goal_from_row(row: &Row<'_>) -> rusqlite::Result<GoalRow> {
    let status: i64 = row.get(5)?;
    let priority: i64 = row.get(6)?;
    Ok(GoalRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: Status::from_code(status).ok_or_else(|| bad_code(5, "status", status))?,
        priority: Priority::from_code(priority).ok_or_else(|| bad_code(6, "priority", priority))?,
        due_date: row.get(7)?,
        created: row.get(8)?,
        updated: row.get(9)?,
    })
}

fn bad_code(idx: usize, column: &str, code: i64) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Integer,
        format!("invalid goal {} code {}", column, code).into(),
    )
}

impl Database {
    pub fn create_goal(&self, goal: &NewGoal<'_>) -> Result<GoalRow> {
        self.with_conn(|conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO goals
                    (title, description, status, priority, due_date, category_id, user_id, created, updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                rusqlite::params![
                    goal.title,
                    goal.description,
                    goal.status.code(),
                    goal.priority.code(),
                    goal.due_date,
                    goal.category_id,
                    goal.user_id,
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            query_goal(conn, id, false)?.ok_or_else(|| anyhow::anyhow!("Goal {} vanished after insert", id))
        })
    }

    /// Fetch a goal unless it is archived or sits in a deleted category.
    pub fn get_visible_goal(&self, id: i64) -> Result<Option<GoalRow>> {
        self.with_conn(|conn| query_goal(conn, id, true))
    }

    /// Goals owned by `filter.user_id` that are visible, narrowed by the
    /// filter. Returns the total match count and the requested window.
    pub fn list_goals(&self, filter: &GoalFilter) -> Result<(i64, Vec<GoalRow>)> {
        self.with_conn(|conn| {
            let mut clause = format!("g.user_id = ? AND {}", visible_goal());
            let mut params: Params = vec![Box::new(filter.user_id)];

            if !filter.category_ids.is_empty() {
                clause.push_str(&format!(" AND g.category_id IN ({})", placeholders(filter.category_ids.len())));
                for id in &filter.category_ids {
                    params.push(Box::new(*id));
                }
            }
            if !filter.statuses.is_empty() {
                clause.push_str(&format!(" AND g.status IN ({})", placeholders(filter.statuses.len())));
                for status in &filter.statuses {
                    params.push(Box::new(status.code()));
                }
            }
            if !filter.priorities.is_empty() {
                clause.push_str(&format!(" AND g.priority IN ({})", placeholders(filter.priorities.len())));
                for priority in &filter.priorities {
                    params.push(Box::new(priority.code()));
                }
            }
            if let Some(from) = filter.due_from {
                clause.push_str(" AND g.due_date >= ?");
                params.push(Box::new(from));
            }
            if let Some(until) = filter.due_until {
                clause.push_str(" AND g.due_date <= ?");
                params.push(Box::new(until));
            }
            if let Some(search) = &filter.search {
                clause.push_str(
                    " AND (instr(lower(g.title), lower(?)) > 0 \
                       OR instr(lower(coalesce(g.description, '')), lower(?)) > 0)",
                );
                params.push(Box::new(search.clone()));
                params.push(Box::new(search.clone()));
            }

            let count: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM goals g
                     JOIN goal_categories c ON c.id = g.category_id
                     WHERE {clause}"
                ),
                as_params(&params),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT {GOAL_COLUMNS}
                 FROM goals g
                 JOIN goal_categories c ON c.id = g.category_id
                 WHERE {clause}
                 {} {}",
                order_clause("g", &filter.ordering),
                window_clause(filter.window),
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(as_params(&params), goal_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((count, rows))
        })
    }

    /// Persist every mutable column of `goal` and refresh `updated`.
    ///
    /// The write only lands while the stored goal is still unarchived and
    /// the target category is still active; otherwise nothing changes and
    /// `None` is returned.
    pub fn update_goal(&self, goal: &GoalRow) -> Result<Option<GoalRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE goals
                 SET title = ?1, description = ?2, status = ?3, priority = ?4,
                     due_date = ?5, category_id = ?6, updated = ?7
                 WHERE id = ?8 AND status != ?9
                   AND EXISTS (SELECT 1 FROM goal_categories WHERE id = ?6 AND is_deleted = 0)",
                rusqlite::params![
                    goal.title,
                    goal.description,
                    goal.status.code(),
                    goal.priority.code(),
                    goal.due_date,
                    goal.category_id,
                    Utc::now(),
                    goal.id,
                    Status::Archived.code(),
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_goal(conn, goal.id, false)
        })
    }

    pub fn archive_goal(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE goals SET status = ?1, updated = ?2 WHERE id = ?3",
                rusqlite::params![Status::Archived.code(), Utc::now(), id],
            )?;
            Ok(())
        })
    }
}

fn query_goal(conn: &Connection, id: i64, visible_only: bool) -> Result<Option<GoalRow>> {
    let visibility = if visible_only {
        format!(" AND {}", visible_goal())
    } else {
        String::new()
    };
    conn.query_row(
        &format!(
            "SELECT {GOAL_COLUMNS}
             FROM goals g
             JOIN goal_categories c ON c.id = g.category_id
             WHERE g.id = ?1{visibility}"
        ),
        [id],
        goal_from_row,
    )
    .optional()
}
