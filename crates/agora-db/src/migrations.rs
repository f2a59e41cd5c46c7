use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                is_banned   INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- user_id is an opaque owner id, not a foreign key.
            CREATE TABLE sessions (
                session_id  TEXT PRIMARY KEY,
                user_id     INTEGER NOT NULL,
                expiry      INTEGER NOT NULL
            );

            CREATE INDEX idx_sessions_expiry ON sessions(expiry);

            CREATE TABLE categories (
                id      INTEGER PRIMARY KEY,
                name    TEXT NOT NULL UNIQUE
            );

            INSERT INTO categories (id, name) VALUES
                (1, 'technology'),
                (2, 'entertainment'),
                (3, 'sports'),
                (4, 'education'),
                (5, 'health');

            CREATE TABLE posts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                created     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX idx_posts_user ON posts(user_id);

            CREATE TABLE post_categories (
                post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                PRIMARY KEY (post_id, category_id)
            );

            CREATE TABLE comments (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                content     TEXT NOT NULL,
                created     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX idx_comments_post ON comments(post_id, created);

            CREATE TABLE post_votes (
                post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                vote_type   INTEGER NOT NULL CHECK (vote_type IN (1, -1)),
                PRIMARY KEY (post_id, user_id)
            );

            CREATE TABLE comment_votes (
                comment_id  INTEGER NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                vote_type   INTEGER NOT NULL CHECK (vote_type IN (1, -1)),
                PRIMARY KEY (comment_id, user_id)
            );

            CREATE INDEX idx_post_votes_user ON post_votes(user_id, vote_type);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
