use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::auth::claims::Role;
use crate::auth::dto::{DeleteUserQuery, SetRoleRequest, TokenResponse, UserAuthRequest, UserDto, UserQuery};
use crate::auth::jwt::{AuthUser, JwtKeys};
use crate::auth::services;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(find).delete(delete_user))
        .route("/user/whoami", get(whoami))
        .route("/user/role", put(set_role))
}

#[instrument(skip(state, body))]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<UserAuthRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    body.validate()?;
    let keys = JwtKeys::from_ref(&state);
    let token = services::register(&state, &keys, &body).await?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

#[instrument(skip(state, body))]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<UserAuthRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    body.validate()?;
    let keys = JwtKeys::from_ref(&state);
    let token = services::login(&state, &keys, &body).await?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

#[instrument(skip(state))]
async fn find(
    State(state): State<AppState>,
    AuthUser(_principal): AuthUser,
    Query(q): Query<UserQuery>,
) -> ApiResult<Json<UserDto>> {
    let user = match (q.id, q.name) {
        (Some(id), _) => services::find_by_id(&state, id).await?,
        (None, Some(name)) => services::find_by_name(&state, &name).await?,
        (None, None) => return Err(ApiError::Validation),
    };
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
async fn whoami(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> ApiResult<Json<UserDto>> {
    let user = services::whoami(&state, &principal).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
async fn set_role(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(body): Json<SetRoleRequest>,
) -> ApiResult<Json<UserDto>> {
    if principal.role != Role::Admin {
        return Err(ApiError::Forbidden("ADMIN role required".into()));
    }
    let user = services::set_role(&state, body.id, body.role).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
async fn delete_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(q): Query<DeleteUserQuery>,
) -> ApiResult<StatusCode> {
    if principal.role != Role::Admin {
        return Err(ApiError::Forbidden("ADMIN role required".into()));
    }
    let id = q.id.ok_or(ApiError::Validation)?;
    services::delete(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
