use axum::{
    Json,
    extract::{
        Path, Query,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use thiserror::Error;
use tracing::error;

use agora_core::CoreError;
use agora_types::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{0}")]
    BadRequest(String),

    #[error("blocking task failed")]
    Join,
}

/// Extractors whose rejections come back as `ApiError` bodies.
pub type JsonBody<T> = WithRejection<Json<T>, ApiError>;
pub type QueryParams<T> = WithRejection<Query<T>, ApiError>;
pub type PathParam<T> = WithRejection<Path<T>, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Core(CoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Core(CoreError::Unauthorized | CoreError::Expired) => StatusCode::UNAUTHORIZED,
            Self::Core(CoreError::Forbidden(_)) => StatusCode::FORBIDDEN,
            Self::Core(CoreError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Core(CoreError::Invalid(_)) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Core(CoreError::Internal(_)) | Self::Join => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {:#}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Run a blocking core call off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Join
        })?
        .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        assert_eq!(ApiError::from(CoreError::NotFound("post")).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(CoreError::Expired).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(CoreError::Forbidden("x")).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(CoreError::Conflict("dup".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::BadRequest("bad".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Join.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
