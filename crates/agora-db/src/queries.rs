use crate::Database;
use crate::models::{AdminUserRow, CommentRow, PostRow, SessionRow, UserRow, UserStatsRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

/// Post columns joined with the author's name. Every listing shares it.
macro_rules! post_select {
    ($tail:literal) => {
        concat!(
            "SELECT p.id, p.title, p.content, p.user_id, u.username, p.created
             FROM posts p
             JOIN users u ON p.user_id = u.id ",
            $tail
        )
    };
}

/// Per-user statistics as correlated subqueries over a `users u` row.
macro_rules! user_stats_columns {
    () => {
        "(SELECT COUNT(*) FROM posts WHERE user_id = u.id),
         (SELECT COUNT(*) FROM comments WHERE user_id = u.id),
         (SELECT COUNT(*) FROM post_votes WHERE user_id = u.id AND vote_type = 1),
         (SELECT COUNT(*) FROM post_votes WHERE user_id = u.id AND vote_type = -1),
         COALESCE((SELECT AVG(vote_type) FROM post_votes WHERE user_id = u.id), 0)"
    };
}

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)",
                (username, email, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
                [email],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, USER_BY_EMAIL, email))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, USER_BY_ID, id))
    }

    pub fn update_password(&self, id: i64, password_hash: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                params![password_hash, id],
            )?)
        })
    }

    pub fn update_username(&self, id: i64, username: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute(
                "UPDATE users SET username = ?1 WHERE id = ?2",
                params![username, id],
            )?)
        })
    }

    pub fn set_banned(&self, id: i64, banned: bool) -> Result<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute(
                "UPDATE users SET is_banned = ?1 WHERE id = ?2",
                params![banned, id],
            )?)
        })
    }

    pub fn user_stats(&self, id: i64) -> Result<UserStatsRow> {
        self.with_conn(|conn| {
            let stats = conn
                .query_row(
                    concat!("SELECT ", user_stats_columns!(), " FROM users u WHERE u.id = ?1"),
                    [id],
                    |row| map_stats(row, 0),
                )
                .optional()?;
            Ok(stats.unwrap_or_default())
        })
    }

    pub fn list_users_with_stats(&self) -> Result<Vec<AdminUserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(concat!(
                "SELECT u.id, u.username, u.email, u.is_banned, ",
                user_stats_columns!(),
                " FROM users u ORDER BY u.id"
            ))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(AdminUserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        is_banned: row.get(3)?,
                        stats: map_stats(row, 4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Sessions --

    /// Insert or replace the row keyed by `session_id`.
    pub fn upsert_session(&self, session_id: &str, user_id: i64, expiry: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "REPLACE INTO sessions (session_id, user_id, expiry) VALUES (?1, ?2, ?3)",
                params![session_id, user_id, expiry],
            )?;
            Ok(())
        })
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT session_id, user_id, expiry FROM sessions WHERE session_id = ?1",
                    [session_id],
                    |row| {
                        Ok(SessionRow {
                            session_id: row.get(0)?,
                            user_id: row.get(1)?,
                            expiry: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Returns the number of rows removed; zero when the token was already gone.
    pub fn delete_session(&self, session_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute("DELETE FROM sessions WHERE session_id = ?1", [session_id])?)
        })
    }

    pub fn delete_expired_sessions(&self, now: i64) -> Result<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute("DELETE FROM sessions WHERE expiry <= ?1", [now])?)
        })
    }

    pub fn count_sessions_for_user(&self, user_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sessions WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    // -- Categories --

    pub fn list_categories(&self) -> Result<Vec<(i64, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn category_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
                [id],
                |row| row.get(0),
            )?)
        })
    }

    pub fn categories_for_post(&self, post_id: i64) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.name FROM categories c
                 JOIN post_categories pc ON c.id = pc.category_id
                 WHERE pc.post_id = ?1
                 ORDER BY c.id",
            )?;
            let rows = stmt
                .query_map([post_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    // -- Posts --

    /// Insert a post and its category links in one transaction. A failure on
    /// any link rolls back the post as well.
    pub fn insert_post_with_categories(
        &self,
        title: &str,
        content: &str,
        user_id: i64,
        category_ids: &[i64],
    ) -> Result<i64> {
        self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO posts (title, content, user_id) VALUES (?1, ?2, ?3)",
                params![title, content, user_id],
            )?;
            let post_id = tx.last_insert_rowid();

            let mut link = tx
                .prepare("INSERT INTO post_categories (post_id, category_id) VALUES (?1, ?2)")?;
            for category_id in category_ids {
                link.execute(params![post_id, category_id])?;
            }

            Ok(post_id)
        })
    }

    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(post_select!("WHERE p.id = ?1"), [id], map_post)
                .optional()?;
            Ok(row)
        })
    }

    pub fn post_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
                [id],
                |row| row.get(0),
            )?)
        })
    }

    pub fn latest_posts(&self, limit: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                post_select!("ORDER BY p.created DESC, p.id DESC LIMIT ?1"),
                params![limit],
            )
        })
    }

    pub fn posts_by_category(&self, category_id: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                post_select!(
                    "JOIN post_categories pc ON p.id = pc.post_id
                     WHERE pc.category_id = ?1
                     ORDER BY p.created DESC, p.id DESC"
                ),
                params![category_id],
            )
        })
    }

    pub fn posts_by_user(&self, user_id: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                post_select!("WHERE p.user_id = ?1 ORDER BY p.created DESC, p.id DESC"),
                params![user_id],
            )
        })
    }

    pub fn posts_liked_by(&self, user_id: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                post_select!(
                    "JOIN post_votes pv ON p.id = pv.post_id
                     WHERE pv.user_id = ?1 AND pv.vote_type = 1
                     ORDER BY p.created DESC, p.id DESC"
                ),
                params![user_id],
            )
        })
    }

    pub fn posts_commented_by(&self, user_id: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                post_select!(
                    "WHERE p.id IN (SELECT post_id FROM comments WHERE user_id = ?1)
                     ORDER BY p.created DESC, p.id DESC"
                ),
                params![user_id],
            )
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, post_id: i64, user_id: i64, content: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (post_id, user_id, content) VALUES (?1, ?2, ?3)",
                params![post_id, user_id, content],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn comments_for_post(&self, post_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            query_comments(
                conn,
                "SELECT c.id, c.post_id, c.user_id, u.username, c.content, c.created
                 FROM comments c
                 JOIN users u ON c.user_id = u.id
                 WHERE c.post_id = ?1
                 ORDER BY c.created ASC, c.id ASC",
                params![post_id],
            )
        })
    }

    pub fn comments_by_user_for_post(&self, post_id: i64, user_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            query_comments(
                conn,
                "SELECT c.id, c.post_id, c.user_id, u.username, c.content, c.created
                 FROM comments c
                 JOIN users u ON c.user_id = u.id
                 WHERE c.post_id = ?1 AND c.user_id = ?2
                 ORDER BY c.created ASC, c.id ASC",
                params![post_id, user_id],
            )
        })
    }

    pub fn count_comments_for_post(&self, post_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    pub fn has_user_commented(&self, post_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM comments WHERE post_id = ?1 AND user_id = ?2)",
                params![post_id, user_id],
                |row| row.get(0),
            )?)
        })
    }
}

const USER_BY_EMAIL: &str =
    "SELECT id, username, email, password, is_banned, created_at FROM users WHERE email = ?1";
const USER_BY_ID: &str =
    "SELECT id, username, email, password, is_banned, created_at FROM users WHERE id = ?1";

fn query_user<K: rusqlite::ToSql>(conn: &Connection, sql: &str, value: K) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(sql, [value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                is_banned: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_posts(conn: &Connection, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<PostRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_post)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_comments(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<CommentRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok(CommentRow {
                id: row.get(0)?,
                post_id: row.get(1)?,
                user_id: row.get(2)?,
                username: row.get(3)?,
                content: row.get(4)?,
                created: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        user_id: row.get(3)?,
        username: row.get(4)?,
        created: row.get(5)?,
    })
}

fn map_stats(row: &Row<'_>, offset: usize) -> rusqlite::Result<UserStatsRow> {
    Ok(UserStatsRow {
        post_count: row.get(offset)?,
        comment_count: row.get(offset + 1)?,
        liked_posts: row.get(offset + 2)?,
        disliked_posts: row.get(offset + 3)?,
        like_dislike_ratio: row.get(offset + 4)?,
    })
}
