use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::auth::jwt::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::items::dto::{IdQuery, ItemCreateRequest, ItemDto, ItemQuery, ItemUpdateRequest};
use crate::items::services;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/item",
        get(find).post(create).put(update).delete(delete_item),
    )
}

#[instrument(skip(state, body))]
async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(body): Json<ItemCreateRequest>,
) -> ApiResult<(StatusCode, Json<ItemDto>)> {
    principal.ensure_elevated()?;
    body.validate()?;
    let item = services::create(&state, &body.name, body.nutrients()).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

#[instrument(skip(state, body))]
async fn update(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(body): Json<ItemUpdateRequest>,
) -> ApiResult<StatusCode> {
    principal.ensure_elevated()?;
    body.validate()?;
    services::update(&state, &body).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn delete_item(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(q): Query<IdQuery>,
) -> ApiResult<StatusCode> {
    principal.ensure_elevated()?;
    let id = q.id.ok_or(ApiError::Validation)?;
    services::delete(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `?id=` and `?name=` return a single item; otherwise a page of items with
/// an `X-Total-Count` header.
#[instrument(skip(state))]
async fn find(State(state): State<AppState>, Query(q): Query<ItemQuery>) -> ApiResult<Response> {
    if let Some(id) = q.id {
        let item = services::find_by_id(&state, id).await?;
        return Ok(Json(ItemDto::from(item)).into_response());
    }
    if let Some(name) = q.name {
        let item = services::find_by_name(&state, &name).await?;
        return Ok(Json(ItemDto::from(item)).into_response());
    }
    let (page, size) = state.config.paging.resolve(q.pnumber, q.psize);
    let (items, total) = services::list(&state, page, size).await?;
    let dtos: Vec<ItemDto> = items.into_iter().map(Into::into).collect();
    let mut headers = HeaderMap::new();
    headers.insert(
        "X-Total-Count",
        total
            .to_string()
            .parse()
            .map_err(|_| ApiError::Internal("invalid header value".into()))?,
    );
    Ok((headers, Json(dtos)).into_response())
}
