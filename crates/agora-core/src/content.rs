use std::collections::BTreeSet;
use std::sync::Arc;

use agora_db::Database;
use agora_types::models::{Category, CategoryId, CommentId, PostId, UserId};
use tracing::info;

use crate::error::{CoreError, CoreResult};
use crate::validation::{is_blank_or_invisible, truncate_title};

/// Post and comment creation. Callers authorize the author first.
#[derive(Clone)]
pub struct ContentService {
    db: Arc<Database>,
}

impl ContentService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a post linked to `category_ids`. The post and its links are
    /// written in one transaction; the title is cut to 25 characters.
    pub fn create_post(
        &self,
        author: UserId,
        title: &str,
        content: &str,
        category_ids: &[CategoryId],
    ) -> CoreResult<PostId> {
        if is_blank_or_invisible(title) || is_blank_or_invisible(content) {
            return Err(CoreError::invalid(
                "title and content cannot be blank or contain invisible characters",
            ));
        }

        let categories: BTreeSet<CategoryId> = category_ids.iter().copied().collect();
        for &id in &categories {
            if !self.db.category_exists(id)? {
                return Err(CoreError::invalid(format!("unknown category {}", id)));
            }
        }
        let categories: Vec<CategoryId> = categories.into_iter().collect();

        let post_id =
            self.db
                .insert_post_with_categories(truncate_title(title.trim()), content, author, &categories)?;

        info!("User {} created post {}", author, post_id);
        Ok(post_id)
    }

    pub fn create_comment(&self, post_id: PostId, author: UserId, content: &str) -> CoreResult<CommentId> {
        if post_id < 1 {
            return Err(CoreError::invalid("post id must be positive"));
        }
        if is_blank_or_invisible(content) {
            return Err(CoreError::invalid("comment cannot be blank or contain invisible characters"));
        }
        if !self.db.post_exists(post_id)? {
            return Err(CoreError::NotFound("post"));
        }

        let id = self.db.insert_comment(post_id, author, content)?;
        info!("User {} commented on post {}", author, post_id);
        Ok(id)
    }

    pub fn categories(&self) -> CoreResult<Vec<Category>> {
        Ok(self
            .db
            .list_categories()?
            .into_iter()
            .map(|(id, name)| Category { id, name })
            .collect())
    }
}
