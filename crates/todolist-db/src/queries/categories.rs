use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use todolist_types::Status;
use tracing::debug;

use super::{OptionalExt, Params, USER_COLUMNS, as_params, order_clause, user_at, window_clause};
use crate::Database;
use crate::models::{CategoryFilter, CategoryRow};

const CATEGORY_COLUMNS: &str = "c.id, c.title, c.is_deleted, c.created, c.updated";

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<CategoryRow> {
    Ok(CategoryRow {
        id: row.get(0)?,
        title: row.get(1)?,
        is_deleted: row.get(2)?,
        created: row.get(3)?,
        updated: row.get(4)?,
        owner: user_at(row, 5)?,
    })
}

impl Database {
    pub fn create_category(&self, user_id: i64, title: &str) -> Result<CategoryRow> {
        self.with_conn(|conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO goal_categories (title, user_id, is_deleted, created, updated)
                 VALUES (?1, ?2, 0, ?3, ?3)",
                rusqlite::params![title, user_id, now],
            )?;
            let id = conn.last_insert_rowid();
            query_category(conn, id)?.ok_or_else(|| anyhow::anyhow!("Category {} vanished after insert", id))
        })
    }

    /// Fetch a category that has not been soft-deleted.
    pub fn get_active_category(&self, id: i64) -> Result<Option<CategoryRow>> {
        self.with_conn(|conn| Ok(query_category(conn, id)?.filter(|c| !c.is_deleted)))
    }

    /// Returns the total number of matches and the requested window of them.
    pub fn list_categories(&self, filter: &CategoryFilter) -> Result<(i64, Vec<CategoryRow>)> {
        self.with_conn(|conn| {
            let mut clause = String::from("c.user_id = ? AND c.is_deleted = 0");
            let mut params: Params = vec![Box::new(filter.user_id)];

            if let Some(search) = &filter.search {
                clause.push_str(" AND instr(lower(c.title), lower(?)) > 0");
                params.push(Box::new(search.clone()));
            }

            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM goal_categories c WHERE {clause}"),
                as_params(&params),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT {CATEGORY_COLUMNS}, {USER_COLUMNS}
                 FROM goal_categories c
                 JOIN users u ON u.id = c.user_id
                 WHERE {clause}
                 {} {}",
                order_clause("c", &filter.ordering),
                window_clause(filter.window),
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(as_params(&params), category_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((count, rows))
        })
    }

    pub fn update_category_title(&self, id: i64, title: &str) -> Result<CategoryRow> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE goal_categories SET title = ?1, updated = ?2 WHERE id = ?3",
                rusqlite::params![title, Utc::now(), id],
            )?;
            query_category(conn, id)?.ok_or_else(|| anyhow::anyhow!("Category {} not found", id))
        })
    }

    /// Soft-delete a category and archive every goal still active in it.
    /// Both updates commit together. Returns the number of archived goals.
    pub fn soft_delete_category(&self, id: i64) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let now = Utc::now();
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE goal_categories SET is_deleted = 1, updated = ?1 WHERE id = ?2",
                rusqlite::params![now, id],
            )?;
            let archived = archive_goals_in_category(&tx, id, now)?;
            tx.commit()?;

            debug!("Category {} deleted, {} goals archived", id, archived);
            Ok(archived)
        })
    }
}

fn query_category(conn: &Connection, id: i64) -> Result<Option<CategoryRow>> {
    conn.query_row(
        &format!(
            "SELECT {CATEGORY_COLUMNS}, {USER_COLUMNS}
             FROM goal_categories c
             JOIN users u ON u.id = c.user_id
             WHERE c.id = ?1"
        ),
        [id],
        category_from_row,
    )
    .optional()
}

fn archive_goals_in_category(conn: &Connection, category_id: i64, now: DateTime<Utc>) -> Result<usize> {
    let archived = Status::Archived.code();
    let n = conn.execute(
        "UPDATE goals SET status = ?1, updated = ?2 WHERE category_id = ?3 AND status != ?1",
        rusqlite::params![archived, now, category_id],
    )?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewGoal, NewUser, OrderBy, SortKey, Window};
    use todolist_types::Priority;

    fn user(db: &Database, username: &str) -> i64 {
        db.create_user(&NewUser {
            username,
            password_hash: "hash",
            first_name: "",
            last_name: "",
            email: "",
        })
        .unwrap()
        .id
    }

    fn goal(db: &Database, user_id: i64, category_id: i64, status: Status) -> i64 {
        db.create_goal(&NewGoal {
            user_id,
            category_id,
            title: "goal",
            description: None,
            status,
            priority: Priority::Medium,
            due_date: Utc::now(),
        })
        .unwrap()
        .id
    }

    #[test]
    fn create_sets_owner_and_not_deleted() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let cat = db.create_category(alice, "work").unwrap();

        assert_eq!(cat.title, "work");
        assert_eq!(cat.owner.id, alice);
        assert!(!cat.is_deleted);
        assert_eq!(cat.created, cat.updated);
    }

    #[test]
    fn list_is_scoped_to_owner_and_hides_deleted() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let kept = db.create_category(alice, "kept").unwrap();
        let gone = db.create_category(alice, "gone").unwrap();
        db.create_category(bob, "other").unwrap();
        db.soft_delete_category(gone.id).unwrap();

        let (count, rows) = db
            .list_categories(&CategoryFilter { user_id: alice, ..Default::default() })
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, kept.id);
    }

    #[test]
    fn list_searches_orders_and_windows() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        for title in ["Beta work", "alpha WORK", "home"] {
            db.create_category(alice, title).unwrap();
        }

        let filter = CategoryFilter {
            user_id: alice,
            search: Some("work".into()),
            ordering: vec![OrderBy { key: SortKey::Title, descending: true }],
            window: Window { limit: Some(1), offset: 0 },
        };
        let (count, rows) = db.list_categories(&filter).unwrap();
        assert_eq!(count, 2);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "alpha WORK");
    }

    #[test]
    fn soft_delete_archives_active_goals() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let cat = db.create_category(alice, "work").unwrap();
        let other = db.create_category(alice, "home").unwrap();
        let g1 = goal(&db, alice, cat.id, Status::ToDo);
        let g2 = goal(&db, alice, cat.id, Status::Done);
        let g3 = goal(&db, alice, cat.id, Status::Archived);
        let untouched = goal(&db, alice, other.id, Status::InProgress);

        assert_eq!(db.soft_delete_category(cat.id).unwrap(), 2);
        assert!(db.get_active_category(cat.id).unwrap().is_none());

        for id in [g1, g2, g3] {
            let status: i64 = db
                .with_conn(|conn| {
                    Ok(conn.query_row("SELECT status FROM goals WHERE id = ?1", [id], |r| r.get(0))?)
                })
                .unwrap();
            assert_eq!(status, Status::Archived.code());
        }
        assert_eq!(db.get_visible_goal(untouched).unwrap().unwrap().status, Status::InProgress);
    }

    #[test]
    fn update_title_bumps_updated() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let cat = db.create_category(alice, "old").unwrap();

        let updated = db.update_category_title(cat.id, "new").unwrap();
        assert_eq!(updated.title, "new");
        assert_eq!(updated.created, cat.created);
        assert!(updated.updated >= cat.updated);
    }
}
