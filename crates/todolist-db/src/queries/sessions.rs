use anyhow::Result;
use chrono::{DateTime, Utc};

use super::{OptionalExt, USER_COLUMNS, user_at};
use crate::Database;
use crate::models::UserRow;

impl Database {
    pub fn create_session(&self, key: &str, user_id: i64, expires_at: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (session_key, user_id, expires_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, user_id, expires_at],
            )?;
            Ok(())
        })
    }

    /// Resolve a session key to its user, ignoring sessions expired at `now`.
    pub fn get_session_user(&self, key: &str, now: DateTime<Utc>) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {USER_COLUMNS}
                     FROM sessions s
                     JOIN users u ON u.id = s.user_id
                     WHERE s.session_key = ?1 AND s.expires_at > ?2"
                ),
                rusqlite::params![key, now],
                |row| user_at(row, 0),
            )
            .optional()
        })
    }

    pub fn delete_session(&self, key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE session_key = ?1", [key])?;
            Ok(())
        })
    }

    /// Drop every session of `user_id` except `keep`.
    pub fn delete_other_sessions(&self, user_id: i64, keep: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM sessions WHERE user_id = ?1 AND session_key != ?2",
                rusqlite::params![user_id, keep],
            )?;
            Ok(n)
        })
    }

    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now])?;
            Ok(n)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use chrono::Duration;

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let user = db
            .create_user(&NewUser {
                username: "alice",
                password_hash: "hash",
                first_name: "",
                last_name: "",
                email: "",
            })
            .unwrap();
        (db, user.id)
    }

    #[test]
    fn live_session_resolves_to_user() {
        let (db, user_id) = setup();
        let now = Utc::now();
        db.create_session("k1", user_id, now + Duration::hours(1)).unwrap();

        let user = db.get_session_user("k1", now).unwrap().unwrap();
        assert_eq!(user.id, user_id);
        assert!(db.get_session_user("missing", now).unwrap().is_none());
    }

    #[test]
    fn expired_session_is_ignored_and_purged() {
        let (db, user_id) = setup();
        let now = Utc::now();
        db.create_session("old", user_id, now - Duration::seconds(1)).unwrap();
        db.create_session("new", user_id, now + Duration::hours(1)).unwrap();

        assert!(db.get_session_user("old", now).unwrap().is_none());
        assert_eq!(db.purge_expired_sessions(now).unwrap(), 1);
        assert!(db.get_session_user("new", now).unwrap().is_some());
    }

    #[test]
    fn delete_other_sessions_keeps_current() {
        let (db, user_id) = setup();
        let now = Utc::now();
        let later = now + Duration::hours(1);
        for key in ["a", "b", "c"] {
            db.create_session(key, user_id, later).unwrap();
        }

        assert_eq!(db.delete_other_sessions(user_id, "b").unwrap(), 2);
        assert!(db.get_session_user("a", now).unwrap().is_none());
        assert!(db.get_session_user("b", now).unwrap().is_some());

        db.delete_session("b").unwrap();
        assert!(db.get_session_user("b", now).unwrap().is_none());
    }
}
