use serde::{Deserialize, Serialize};

use crate::models::{Aggregate, CategoryId, CommentId, PostId, Stance, UserId};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

// -- Content --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: i64,
}

/// A post as shown in listings. Vote figures are recomputed from the ledger
/// on every read and never stored on the post itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub author_id: UserId,
    pub author: String,
    pub categories: Vec<String>,
    #[serde(flatten)]
    pub aggregate: Aggregate,
    pub user_vote: Option<Stance>,
    pub comment_count: u64,
    pub user_commented: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_comments: Vec<CommentView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub author: String,
    pub content: String,
    pub created_at: String,
    #[serde(flatten)]
    pub aggregate: Aggregate,
    pub user_vote: Option<Stance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: PostView,
    pub comments: Vec<CommentView>,
}

// -- Votes --

/// Accepts either the stance name (`"like"`) or the stored code (`1`/`-1`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StanceInput {
    Code(i64),
    Name(String),
}

impl StanceInput {
    pub fn parse(&self) -> Result<Stance, String> {
        match self {
            Self::Code(code) => Stance::try_from(*code),
            Self::Name(name) => name.parse(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    pub subject_id: i64,
    pub stance: StanceInput,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponse {
    pub subject_id: i64,
    pub stance: Option<Stance>,
    #[serde(flatten)]
    pub aggregate: Aggregate,
}

// -- Profile --

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub post_count: u64,
    pub comment_count: u64,
    pub liked_posts: u64,
    pub disliked_posts: u64,
    /// Mean of the user's post votes, in `[-1, 1]`; `0` when they never voted.
    pub like_dislike_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_banned: bool,
    #[serde(flatten)]
    pub stats: UserStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(flatten)]
    pub stats: UserStats,
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<AdminUserView>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeNameRequest {
    pub new_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BanResponse {
    pub user_id: UserId,
    pub is_banned: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
