//! Row types as read from SQLite. API shapes live in agora-types.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_banned: bool,
    pub created_at: String,
}

pub struct SessionRow {
    pub session_id: String,
    pub user_id: i64,
    /// Absolute expiry, milliseconds since the Unix epoch.
    pub expiry: i64,
}

pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub username: String,
    pub created: String,
}

pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub content: String,
    pub created: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UserStatsRow {
    pub post_count: i64,
    pub comment_count: i64,
    pub liked_posts: i64,
    pub disliked_posts: i64,
    pub like_dislike_ratio: f64,
}

pub struct AdminUserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_banned: bool,
    pub stats: UserStatsRow,
}
