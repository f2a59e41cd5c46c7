use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use agora_core::{CoreError, PostFilter};
use agora_types::api::{CreateCommentRequest, CreatePostRequest, CreatedResponse};
use agora_types::models::{CategoryId, PostId};

use crate::auth::AppState;
use crate::error::{ApiError, JsonBody, PathParam, QueryParams, blocking};
use crate::middleware::{AuthUser, Viewer};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListFilter {
    Mine,
    Liked,
    Commented,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category_id: Option<CategoryId>,
    pub filter: Option<ListFilter>,
}

impl ListQuery {
    /// Personal filters need a signed-in viewer; a filter takes precedence
    /// over a category.
    fn post_filter(&self, viewer: Option<i64>) -> Result<PostFilter, CoreError> {
        match (self.filter, viewer) {
            (Some(_), None) => Err(CoreError::Unauthorized),
            (Some(ListFilter::Mine), Some(uid)) => Ok(PostFilter::AuthoredBy(uid)),
            (Some(ListFilter::Liked), Some(uid)) => Ok(PostFilter::LikedBy(uid)),
            (Some(ListFilter::Commented), Some(uid)) => Ok(PostFilter::CommentedBy(uid)),
            (None, _) => Ok(self
                .category_id
                .map(PostFilter::Category)
                .unwrap_or(PostFilter::Latest)),
        }
    }
}

pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = blocking(move || state.forum.content.categories()).await?;
    Ok(Json(categories))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    WithRejection(Query(query), _): QueryParams<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.post_filter(viewer)?;
    let posts = blocking(move || state.forum.aggregator.list_posts(filter, viewer)).await?;
    Ok(Json(posts))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = blocking(move || {
        state
            .forum
            .content
            .create_post(user_id, &req.title, &req.content, &req.category_ids)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn get_post(
    State(state): State<AppState>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    WithRejection(Path(post_id), _): PathParam<PostId>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = blocking(move || state.forum.aggregator.post_detail(post_id, viewer)).await?;
    Ok(Json(detail))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    WithRejection(Path(post_id), _): PathParam<PostId>,
    WithRejection(Json(req), _): JsonBody<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = blocking(move || state.forum.content.create_comment(post_id, user_id, &req.content))
        .await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(category_id: Option<i64>, filter: Option<ListFilter>) -> ListQuery {
        ListQuery { category_id, filter }
    }

    #[test]
    fn filters_map_to_listings() {
        assert_eq!(query(None, None).post_filter(None).unwrap(), PostFilter::Latest);
        assert_eq!(query(Some(4), None).post_filter(None).unwrap(), PostFilter::Category(4));
        assert_eq!(
            query(Some(4), Some(ListFilter::Liked)).post_filter(Some(9)).unwrap(),
            PostFilter::LikedBy(9)
        );
        assert!(matches!(
            query(None, Some(ListFilter::Mine)).post_filter(None),
            Err(CoreError::Unauthorized)
        ));
    }
}
