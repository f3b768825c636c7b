use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};

use super::goals::visible_goal;
use super::{OptionalExt, Params, USER_COLUMNS, as_params, order_clause, user_at, window_clause};
use crate::Database;
use crate::models::{CommentFilter, CommentRow};

const COMMENT_COLUMNS: &str = "m.id, m.goal_id, m.text, m.created, m.updated";

const COMMENT_JOINS: &str = "FROM goal_comments m
     JOIN users u ON u.id = m.user_id
     JOIN goals g ON g.id = m.goal_id
     JOIN goal_categories c ON c.id = g.category_id";

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        goal_id: row.get(1)?,
        text: row.get(2)?,
        created: row.get(3)?,
        updated: row.get(4)?,
        author: user_at(row, 5)?,
    })
}

impl Database {
    pub fn create_comment(&self, goal_id: i64, user_id: i64, text: &str) -> Result<CommentRow> {
        self.with_conn(|conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO goal_comments (text, goal_id, user_id, created, updated)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![text, goal_id, user_id, now],
            )?;
            let id = conn.last_insert_rowid();
            query_comment(conn, id)?.ok_or_else(|| anyhow::anyhow!("Comment {} vanished after insert", id))
        })
    }

    /// Fetch a comment whose goal is still visible.
    pub fn get_visible_comment(&self, id: i64) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| query_comment(conn, id))
    }

    /// Comments on visible goals owned by `filter.user_id`.
    pub fn list_comments(&self, filter: &CommentFilter) -> Result<(i64, Vec<CommentRow>)> {
        self.with_conn(|conn| {
            let mut clause = format!("g.user_id = ? AND {}", visible_goal());
            let mut params: Params = vec![Box::new(filter.user_id)];

            if let Some(goal_id) = filter.goal_id {
                clause.push_str(" AND m.goal_id = ?");
                params.push(Box::new(goal_id));
            }

            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) {COMMENT_JOINS} WHERE {clause}"),
                as_params(&params),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT {COMMENT_COLUMNS}, {USER_COLUMNS} {COMMENT_JOINS} WHERE {clause} {} {}",
                order_clause("m", &filter.ordering),
                window_clause(filter.window),
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(as_params(&params), comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((count, rows))
        })
    }

    pub fn update_comment_text(&self, id: i64, text: &str) -> Result<CommentRow> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE goal_comments SET text = ?1, updated = ?2 WHERE id = ?3",
                rusqlite::params![text, Utc::now(), id],
            )?;
            query_comment(conn, id)?.ok_or_else(|| anyhow::anyhow!("Comment {} not found", id))
        })
    }

    pub fn delete_comment(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM goal_comments WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

fn query_comment(conn: &Connection, id: i64) -> Result<Option<CommentRow>> {
    conn.query_row(
        &format!("SELECT {COMMENT_COLUMNS}, {USER_COLUMNS} {COMMENT_JOINS} WHERE m.id = ?1 AND {}", visible_goal()),
        [id],
        comment_from_row,
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewGoal, NewUser, OrderBy, SortKey};
    use todolist_types::{Priority, Status};

    fn setup() -> (Database, i64, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let alice = db
            .create_user(&NewUser {
                username: "alice",
                password_hash: "hash",
                first_name: "",
                last_name: "",
                email: "",
            })
            .unwrap()
            .id;
        let cat = db.create_category(alice, "work").unwrap().id;
        let goal = db
            .create_goal(&NewGoal {
                user_id: alice,
                category_id: cat,
                title: "goal",
                description: None,
                status: Status::ToDo,
                priority: Priority::Medium,
                due_date: Utc::now(),
            })
            .unwrap()
            .id;
        (db, alice, cat, goal)
    }

    #[test]
    fn create_list_update_delete() {
        let (db, alice, _, goal) = setup();
        let first = db.create_comment(goal, alice, "first").unwrap();
        let second = db.create_comment(goal, alice, "second").unwrap();
        assert_eq!(first.author.username, "alice");

        let filter = CommentFilter {
            user_id: alice,
            goal_id: Some(goal),
            ordering: vec![OrderBy { key: SortKey::Created, descending: true }],
            ..Default::default()
        };
        let (count, rows) = db.list_comments(&filter).unwrap();
        assert_eq!(count, 2);
        assert_eq!(rows[0].id, second.id);

        let edited = db.update_comment_text(first.id, "edited").unwrap();
        assert_eq!(edited.text, "edited");

        db.delete_comment(second.id).unwrap();
        assert!(db.get_visible_comment(second.id).unwrap().is_none());
    }

    #[test]
    fn comments_follow_goal_visibility() {
        let (db, alice, cat, goal) = setup();
        let comment = db.create_comment(goal, alice, "note").unwrap();

        db.soft_delete_category(cat).unwrap();
        assert!(db.get_visible_comment(comment.id).unwrap().is_none());
        let (count, _) = db
            .list_comments(&CommentFilter { user_id: alice, ..Default::default() })
            .unwrap();
        assert_eq!(count, 0);
    }
}
