use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::auth::jwt::AuthUser;
use crate::dishes::dto::{
    DishAddItemRequest, DishCreateRequest, DishDto, DishQuery, DishUpdateNameRequest, ItemCountDto,
    ItemLinkQuery,
};
use crate::dishes::services;
use crate::error::{ApiError, ApiResult};
use crate::items::dto::IdQuery;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/dish",
            get(find).post(create).put(update_name).delete(delete_dish),
        )
        .route(
            "/dish/items",
            get(get_items).put(add_item).delete(remove_item),
        )
}

#[instrument(skip(state, body))]
async fn create(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(body): Json<DishCreateRequest>,
) -> ApiResult<(StatusCode, Json<DishDto>)> {
    principal.ensure_elevated()?;
    body.validate()?;
    let dish = services::create(&state, &body.name).await?;
    let dto = services::to_dto(&state, &dish).await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

#[instrument(skip(state, body))]
async fn update_name(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(body): Json<DishUpdateNameRequest>,
) -> ApiResult<StatusCode> {
    principal.ensure_elevated()?;
    body.validate()?;
    services::update_name(&state, body.id, &body.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn delete_dish(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(q): Query<IdQuery>,
) -> ApiResult<StatusCode> {
    principal.ensure_elevated()?;
    let id = q.id.ok_or(ApiError::Validation)?;
    services::delete(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn find(State(state): State<AppState>, Query(q): Query<DishQuery>) -> ApiResult<Response> {
    if let Some(id) = q.id {
        let dish = services::find_by_id(&state, id).await?;
        return Ok(Json(services::to_dto(&state, &dish).await?).into_response());
    }
    if let Some(name) = q.name {
        let dish = services::find_by_name(&state, &name).await?;
        return Ok(Json(services::to_dto(&state, &dish).await?).into_response());
    }
    let (page, size) = state.config.paging.resolve(q.pnumber, q.psize);
    let dishes = services::list(&state, page, size).await?;
    let mut dtos = Vec::with_capacity(dishes.len());
    for dish in &dishes {
        dtos.push(services::to_dto(&state, dish).await?);
    }
    Ok(Json(dtos).into_response())
}

#[instrument(skip(state, body))]
async fn add_item(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(body): Json<DishAddItemRequest>,
) -> ApiResult<StatusCode> {
    principal.ensure_elevated()?;
    body.validate()?;
    services::add_item(&state, body.item_id, body.dish_id, body.count).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn remove_item(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(q): Query<ItemLinkQuery>,
) -> ApiResult<StatusCode> {
    principal.ensure_elevated()?;
    let (item_id, dish_id) = match (q.item_id, q.dish_id) {
        (Some(i), Some(d)) => (i, d),
        _ => return Err(ApiError::Validation),
    };
    services::remove_item(&state, item_id, dish_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn get_items(
    State(state): State<AppState>,
    Query(q): Query<IdQuery>,
) -> ApiResult<Json<Vec<ItemCountDto>>> {
    let id = q.id.ok_or(ApiError::Validation)?;
    let items = services::items_of(&state, id).await?;
    let dtos = items
        .into_iter()
        .map(|(item, count)| ItemCountDto {
            item: item.into(),
            count,
        })
        .collect();
    Ok(Json(dtos))
}
