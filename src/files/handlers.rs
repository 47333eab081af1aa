use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::auth::jwt::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::files::dto::FileDto;
use crate::files::services;
use crate::items::dto::IdQuery;
use crate::state::AppState;

pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/file", post(upload).get(find).delete(delete_file))
        .route("/file/download", get(download))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Multipart upload; the body comes from the `file` part, everything else
/// is ignored.
#[instrument(skip(state, mp))]
async fn upload(
    State(state): State<AppState>,
    AuthUser(_principal): AuthUser,
    mut mp: Multipart,
) -> ApiResult<(StatusCode, Json<FileDto>)> {
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or(ApiError::Validation)?;
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field
            .bytes()
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        let record = services::upload(&state, &file_name, &content_type, body).await?;
        return Ok((StatusCode::CREATED, Json(record.into())));
    }
    Err(ApiError::Validation)
}

#[instrument(skip(state))]
async fn find(
    State(state): State<AppState>,
    Query(q): Query<IdQuery>,
) -> ApiResult<Json<FileDto>> {
    let id = q.id.ok_or(ApiError::Validation)?;
    let record = services::metadata(&state, id).await?;
    Ok(Json(record.into()))
}

#[instrument(skip(state))]
async fn download(
    State(state): State<AppState>,
    Query(q): Query<IdQuery>,
) -> ApiResult<Response> {
    let id = q.id.ok_or(ApiError::Validation)?;
    let (record, body) = services::download(&state, id).await?;
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        record
            .content_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}\"", record.file_name)
            .parse()
            .map_err(|_| ApiError::Internal("invalid header value".into()))?,
    );
    Ok((headers, body).into_response())
}

#[instrument(skip(state))]
async fn delete_file(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(q): Query<IdQuery>,
) -> ApiResult<StatusCode> {
    principal.ensure_elevated()?;
    let id = q.id.ok_or(ApiError::Validation)?;
    services::delete(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
