use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            first_name  TEXT NOT NULL DEFAULT '',
            last_name   TEXT NOT NULL DEFAULT '',
            email       TEXT NOT NULL DEFAULT '',
            date_joined TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            session_key TEXT PRIMARY KEY,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            expires_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user
            ON sessions(user_id);

        CREATE TABLE IF NOT EXISTS goal_categories (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            is_deleted  INTEGER NOT NULL DEFAULT 0,
            created     TEXT NOT NULL,
            updated     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_goal_categories_user
            ON goal_categories(user_id, is_deleted);

        CREATE TABLE IF NOT EXISTS goals (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            description TEXT,
            status      INTEGER NOT NULL DEFAULT 1,
            priority    INTEGER NOT NULL DEFAULT 2,
            due_date    TEXT NOT NULL,
            category_id INTEGER NOT NULL REFERENCES goal_categories(id),
            user_id     INTEGER NOT NULL REFERENCES users(id),
            created     TEXT NOT NULL,
            updated     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_goals_user
            ON goals(user_id, status);

        CREATE INDEX IF NOT EXISTS idx_goals_category
            ON goals(category_id);

        CREATE TABLE IF NOT EXISTS goal_comments (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            text        TEXT NOT NULL,
            goal_id     INTEGER NOT NULL REFERENCES goals(id),
            user_id     INTEGER NOT NULL REFERENCES users(id),
            created     TEXT NOT NULL,
            updated     TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_goal_comments_goal
            ON goal_comments(goal_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
