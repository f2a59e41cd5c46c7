//! Read-side composition for listings and profiles.
//!
//! Every post or comment handed out is decorated with its like/dislike
//! counts and the viewer's stance, queried from the ledger at that moment.
//! Nothing is cached, so a listing of N posts costs N times a fixed number of
//! ledger queries.

use std::sync::Arc;

use agora_db::Database;
use agora_db::models::{CommentRow, PostRow, UserStatsRow};
use agora_types::api::{AdminUserView, CommentView, PostDetail, PostView, ProfileResponse, UserStats};
use agora_types::models::{CategoryId, PostId, SubjectKind, UserId};

use crate::credentials::CredentialStore;
use crate::error::{CoreError, CoreResult};
use crate::votes::VoteLedger;

pub const LATEST_LIMIT: u32 = 10;

/// Which posts a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    Latest,
    Category(CategoryId),
    AuthoredBy(UserId),
    LikedBy(UserId),
    /// Posts the user commented on, with those comments attached.
    CommentedBy(UserId),
}

#[derive(Clone)]
pub struct Aggregator {
    db: Arc<Database>,
    ledger: VoteLedger,
    credentials: CredentialStore,
}

impl Aggregator {
    pub fn new(db: Arc<Database>, ledger: VoteLedger, credentials: CredentialStore) -> Self {
        Self {
            db,
            ledger,
            credentials,
        }
    }

    pub fn list_posts(&self, filter: PostFilter, viewer: Option<UserId>) -> CoreResult<Vec<PostView>> {
        let rows = match filter {
            PostFilter::Latest => self.db.latest_posts(LATEST_LIMIT)?,
            PostFilter::Category(id) => self.db.posts_by_category(id)?,
            PostFilter::AuthoredBy(id) => self.db.posts_by_user(id)?,
            PostFilter::LikedBy(id) => self.db.posts_liked_by(id)?,
            PostFilter::CommentedBy(id) => self.db.posts_commented_by(id)?,
        };

        rows.into_iter()
            .map(|row| {
                let mut view = self.decorate_post(row, viewer)?;
                if let PostFilter::CommentedBy(user) = filter {
                    view.user_comments = self
                        .db
                        .comments_by_user_for_post(view.id, user)?
                        .into_iter()
                        .map(|c| self.decorate_comment(c, viewer))
                        .collect::<CoreResult<_>>()?;
                }
                Ok(view)
            })
            .collect()
    }

    pub fn post_detail(&self, post_id: PostId, viewer: Option<UserId>) -> CoreResult<PostDetail> {
        let row = self.db.get_post(post_id)?.ok_or(CoreError::NotFound("post"))?;
        let post = self.decorate_post(row, viewer)?;

        let comments = self
            .db
            .comments_for_post(post_id)?
            .into_iter()
            .map(|c| self.decorate_comment(c, viewer))
            .collect::<CoreResult<_>>()?;

        Ok(PostDetail { post, comments })
    }

    fn decorate_post(&self, row: PostRow, viewer: Option<UserId>) -> CoreResult<PostView> {
        let aggregate = self.ledger.aggregate(SubjectKind::Post, row.id)?;
        let (user_vote, user_commented) = match viewer {
            Some(uid) => (
                self.ledger.stance(SubjectKind::Post, row.id, uid)?,
                self.db.has_user_commented(row.id, uid)?,
            ),
            None => (None, false),
        };

        Ok(PostView {
            categories: self.db.categories_for_post(row.id)?,
            comment_count: self.db.count_comments_for_post(row.id)?,
            id: row.id,
            title: row.title,
            content: row.content,
            created_at: row.created,
            author_id: row.user_id,
            author: row.username,
            aggregate,
            user_vote,
            user_commented,
            user_comments: Vec::new(),
        })
    }

    fn decorate_comment(&self, row: CommentRow, viewer: Option<UserId>) -> CoreResult<CommentView> {
        let aggregate = self.ledger.aggregate(SubjectKind::Comment, row.id)?;
        let user_vote = match viewer {
            Some(uid) => self.ledger.stance(SubjectKind::Comment, row.id, uid)?,
            None => None,
        };

        Ok(CommentView {
            id: row.id,
            post_id: row.post_id,
            author_id: row.user_id,
            author: row.username,
            content: row.content,
            created_at: row.created,
            aggregate,
            user_vote,
        })
    }

    /// Profile page data. The admin account also receives every user with
    /// the same statistics.
    pub fn profile(&self, user_id: UserId) -> CoreResult<ProfileResponse> {
        let user = self.credentials.get_user(user_id)?;
        let is_admin = self.credentials.is_admin(&user);

        let users = if is_admin {
            self.db
                .list_users_with_stats()?
                .into_iter()
                .map(|u| AdminUserView {
                    id: u.id,
                    username: u.username,
                    email: u.email,
                    is_banned: u.is_banned,
                    stats: stats_view(u.stats),
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(ProfileResponse {
            id: user.id,
            stats: stats_view(self.db.user_stats(user.id)?),
            username: user.username,
            email: user.email,
            is_admin,
            users,
        })
    }
}

fn stats_view(row: UserStatsRow) -> UserStats {
    UserStats {
        post_count: row.post_count.max(0) as u64,
        comment_count: row.comment_count.max(0) as u64,
        liked_posts: row.liked_posts.max(0) as u64,
        disliked_posts: row.disliked_posts.max(0) as u64,
        like_dislike_ratio: row.like_dislike_ratio,
    }
}
