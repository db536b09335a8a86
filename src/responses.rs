use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequest, Request},
    response::{IntoResponse, Json, Response},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utoipa::{ToResponse, ToSchema};

use crate::errors::AppError;

pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// JSON body extractor whose rejections answer with an [`ErrorMessage`]
/// instead of axum's plain text. The body is parsed whatever its
/// `Content-Type` says.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(request, state).await.map_err(|rejection| {
            tracing::debug!(%rejection, "unreadable json body");
            ApiError(AppError::validation("Invalid JSON"))
        })?;
        let Json(value) = Json::<T>::from_bytes(&bytes)?;
        Ok(Self(value))
    }
}

impl<T> IntoResponse for AppJson<T>
where
    axum::Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// [`AppError`] rendered as `{"error": ...}` for the JSON endpoints.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(%rejection, "rejected json body");
        Self(AppError::validation("Invalid JSON"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.0.get_status_code_and_message();
        (status, Json(ErrorMessage::new(message))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize, ToResponse, ToSchema)]
pub struct ErrorMessage {
    #[schema(example = "Permission denied")]
    pub error: String,
}

impl ErrorMessage {
    pub fn new(error: String) -> Self {
        Self { error }
    }
}
