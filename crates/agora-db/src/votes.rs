//! Vote ledger tables. `post_votes` and `comment_votes` have the same shape
//! and are addressed through [`SubjectKind`]; the SQL for each is a fixed
//! template, never assembled from caller input.

use crate::Database;
use agora_types::models::SubjectKind;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

struct VoteSql {
    select: &'static str,
    insert: &'static str,
    update: &'static str,
    delete: &'static str,
    count: &'static str,
    subject_exists: &'static str,
}

const POST_VOTES: VoteSql = VoteSql {
    select: "SELECT vote_type FROM post_votes WHERE post_id = ?1 AND user_id = ?2",
    insert: "INSERT INTO post_votes (post_id, user_id, vote_type) VALUES (?1, ?2, ?3)",
    update: "UPDATE post_votes SET vote_type = ?3 WHERE post_id = ?1 AND user_id = ?2",
    delete: "DELETE FROM post_votes WHERE post_id = ?1 AND user_id = ?2",
    count: "SELECT COUNT(*) FROM post_votes WHERE post_id = ?1 AND vote_type = ?2",
    subject_exists: "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
};

const COMMENT_VOTES: VoteSql = VoteSql {
    select: "SELECT vote_type FROM comment_votes WHERE comment_id = ?1 AND user_id = ?2",
    insert: "INSERT INTO comment_votes (comment_id, user_id, vote_type) VALUES (?1, ?2, ?3)",
    update: "UPDATE comment_votes SET vote_type = ?3 WHERE comment_id = ?1 AND user_id = ?2",
    delete: "DELETE FROM comment_votes WHERE comment_id = ?1 AND user_id = ?2",
    count: "SELECT COUNT(*) FROM comment_votes WHERE comment_id = ?1 AND vote_type = ?2",
    subject_exists: "SELECT EXISTS(SELECT 1 FROM comments WHERE id = ?1)",
};

fn sql(kind: SubjectKind) -> &'static VoteSql {
    match kind {
        SubjectKind::Post => &POST_VOTES,
        SubjectKind::Comment => &COMMENT_VOTES,
    }
}

// -- Connection-level statements --
//
// These run on whatever connection they are handed, so a caller can group
// several of them inside one transaction.

pub fn select_vote(conn: &Connection, kind: SubjectKind, subject_id: i64, user_id: i64) -> Result<Option<i64>> {
    let vote = conn
        .query_row(sql(kind).select, params![subject_id, user_id], |row| row.get(0))
        .optional()?;
    Ok(vote)
}

pub fn insert_vote(conn: &Connection, kind: SubjectKind, subject_id: i64, user_id: i64, vote_type: i64) -> Result<()> {
    conn.execute(sql(kind).insert, params![subject_id, user_id, vote_type])?;
    Ok(())
}

pub fn update_vote(conn: &Connection, kind: SubjectKind, subject_id: i64, user_id: i64, vote_type: i64) -> Result<usize> {
    Ok(conn.execute(sql(kind).update, params![subject_id, user_id, vote_type])?)
}

pub fn delete_vote(conn: &Connection, kind: SubjectKind, subject_id: i64, user_id: i64) -> Result<usize> {
    Ok(conn.execute(sql(kind).delete, params![subject_id, user_id])?)
}

pub fn count_votes(conn: &Connection, kind: SubjectKind, subject_id: i64, vote_type: i64) -> Result<u64> {
    let count: i64 = conn.query_row(sql(kind).count, params![subject_id, vote_type], |row| row.get(0))?;
    Ok(count as u64)
}

// -- Pooled round-trips --
//
// Each call below is one independent statement on the shared store.

impl Database {
    pub fn get_vote(&self, kind: SubjectKind, subject_id: i64, user_id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| select_vote(conn, kind, subject_id, user_id))
    }

    pub fn insert_vote(&self, kind: SubjectKind, subject_id: i64, user_id: i64, vote_type: i64) -> Result<()> {
        self.with_conn_mut(|conn| insert_vote(conn, kind, subject_id, user_id, vote_type))
    }

    pub fn update_vote(&self, kind: SubjectKind, subject_id: i64, user_id: i64, vote_type: i64) -> Result<usize> {
        self.with_conn_mut(|conn| update_vote(conn, kind, subject_id, user_id, vote_type))
    }

    pub fn delete_vote(&self, kind: SubjectKind, subject_id: i64, user_id: i64) -> Result<usize> {
        self.with_conn_mut(|conn| delete_vote(conn, kind, subject_id, user_id))
    }

    pub fn count_votes(&self, kind: SubjectKind, subject_id: i64, vote_type: i64) -> Result<u64> {
        self.with_conn(|conn| count_votes(conn, kind, subject_id, vote_type))
    }

    pub fn subject_exists(&self, kind: SubjectKind, subject_id: i64) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.query_row(sql(kind).subject_exists, [subject_id], |row| row.get(0))?))
    }
}
