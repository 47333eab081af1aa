use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::auth::jwt::Identity;
use crate::clients::RemoteDish;
use crate::error::{ApiError, ApiResult};
use crate::menus::dto::{MenuCreateRequest, MenuDishRequest, MenuDto, MenuQuery, MenuUpdateRequest};
use crate::menus::services;
use crate::nutrition::Ccpf;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/menu",
            get(find).post(create).put(update).delete(delete_menu),
        )
        .route(
            "/menu/dishes",
            get(get_dishes).put(include_dish).delete(exclude_dish),
        )
}

#[instrument(skip(state, body))]
async fn create(
    State(state): State<AppState>,
    Identity(principal): Identity,
    Json(body): Json<MenuCreateRequest>,
) -> ApiResult<(StatusCode, Json<MenuDto>)> {
    let menu = services::create(&state, principal.id, body.meal.as_str(), body.date).await?;
    // a fresh menu has no member dishes yet
    Ok((
        StatusCode::CREATED,
        Json(MenuDto::new(&menu, Ccpf::default())),
    ))
}

#[instrument(skip(state, body))]
async fn update(
    State(state): State<AppState>,
    Identity(principal): Identity,
    Json(body): Json<MenuUpdateRequest>,
) -> ApiResult<StatusCode> {
    services::update_for_user(&state, &principal, body.id, body.meal.as_str(), body.date).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn delete_menu(
    State(state): State<AppState>,
    Identity(principal): Identity,
    Query(q): Query<MenuQuery>,
) -> ApiResult<StatusCode> {
    let id = q.id.ok_or(ApiError::Validation)?;
    services::delete(&state, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `?id=` returns a single menu; `?username=` lists another user's menus
/// (elevated roles only); otherwise a page of the caller's own menus, or of
/// all menus for elevated roles. Totals are computed on read.
#[instrument(skip(state, headers))]
async fn find(
    State(state): State<AppState>,
    Identity(principal): Identity,
    headers: HeaderMap,
    Query(q): Query<MenuQuery>,
) -> ApiResult<Response> {
    if let Some(id) = q.id {
        let menu = services::find_by_id(&state, &principal, id).await?;
        let dto = services::to_dto(&state, &menu).await?;
        return Ok(Json(dto).into_response());
    }
    if let Some(username) = q.username {
        if !principal.role.is_elevated() {
            return Err(ApiError::Forbidden(
                "For USER parameter `username` unavailable".into(),
            ));
        }
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let menus = services::list_by_username(&state, auth, &username).await?;
        let mut dtos = Vec::with_capacity(menus.len());
        for menu in &menus {
            dtos.push(services::to_dto(&state, menu).await?);
        }
        return Ok(Json(dtos).into_response());
    }
    let (page, size) = state.config.paging.resolve(q.pnumber, q.psize);
    let menus = services::list(&state, &principal, page, size).await?;
    let mut dtos = Vec::with_capacity(menus.len());
    for menu in &menus {
        dtos.push(services::to_dto(&state, menu).await?);
    }
    Ok(Json(dtos).into_response())
}

#[instrument(skip(state))]
async fn get_dishes(
    State(state): State<AppState>,
    Identity(principal): Identity,
    Query(q): Query<MenuQuery>,
) -> ApiResult<Json<Vec<RemoteDish>>> {
    let id = q.id.ok_or(ApiError::Validation)?;
    let dishes = services::dishes_of(&state, &principal, id).await?;
    Ok(Json(dishes))
}

#[instrument(skip(state, body))]
async fn include_dish(
    State(state): State<AppState>,
    Identity(principal): Identity,
    Json(body): Json<MenuDishRequest>,
) -> ApiResult<StatusCode> {
    services::include_dish(&state, &principal, body.dish_id, body.menu_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
async fn exclude_dish(
    State(state): State<AppState>,
    Identity(principal): Identity,
    Json(body): Json<MenuDishRequest>,
) -> ApiResult<StatusCode> {
    services::exclude_dish(&state, &principal, body.dish_id, body.menu_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
