use serde_json::json;
use tracing::debug;

use crate::auth::claims::{Principal, Role};
use crate::auth::dto::UserAuthRequest;
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::User;
use crate::error::{ApiError, ApiResult};
use crate::events;
use crate::state::AppState;

pub async fn register(state: &AppState, keys: &JwtKeys, req: &UserAuthRequest) -> ApiResult<String> {
    if User::find_by_username(&state.db, &req.username).await?.is_some() {
        return Err(ApiError::DataIntegrity(format!(
            "User with name {} already exists",
            req.username
        )));
    }
    let hash = hash_password(&req.password).map_err(|e| ApiError::Internal(e.to_string()))?;
    let user = User::create(&state.db, &req.username, &hash, Role::User.as_str()).await?;
    debug!(user_id = user.id, "user registered");
    events::publish(
        &state.events,
        events::USER_EVENTS,
        events::created(json!({ "id": user.id, "name": user.username, "role": user.role })),
    );
    keys.sign(&user).map_err(|e| ApiError::Internal(e.to_string()))
}

pub async fn login(state: &AppState, keys: &JwtKeys, req: &UserAuthRequest) -> ApiResult<String> {
    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Bad credentials".into()))?;
    let ok = verify_password(&req.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !ok {
        return Err(ApiError::Unauthorized("Bad credentials".into()));
    }
    keys.sign(&user).map_err(|e| ApiError::Internal(e.to_string()))
}

/// ADMIN is granted out of band only: it can be neither assigned nor taken
/// away through the web API.
pub async fn set_role(state: &AppState, id: i64, role: Role) -> ApiResult<User> {
    if role == Role::Admin {
        return Err(ApiError::DataIntegrity(
            "ADMIN cannot be assigned via web API".into(),
        ));
    }
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User with id {id} was not found")))?;
    if user.role == Role::Admin.as_str() {
        return Err(ApiError::DataIntegrity(
            "ADMIN cannot be unassigned via web API".into(),
        ));
    }
    let updated = User::update_role(&state.db, id, role.as_str()).await?;
    events::publish(
        &state.events,
        events::USER_EVENTS,
        events::updated(json!({
            "id": id,
            "role": events::field_change(&json!(user.role), &json!(updated.role)),
        })),
    );
    Ok(updated)
}

pub async fn delete(state: &AppState, id: i64) -> ApiResult<()> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User with id {id} was not found")))?;
    User::delete(&state.db, id).await?;
    events::publish(
        &state.events,
        events::USER_EVENTS,
        events::deleted(json!({ "id": user.id, "name": user.username })),
    );
    Ok(())
}

pub async fn find_by_id(state: &AppState, id: i64) -> ApiResult<User> {
    User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User with id {id} was not found")))
}

pub async fn find_by_name(state: &AppState, name: &str) -> ApiResult<User> {
    User::find_by_username(&state.db, name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User with name {name} was not found")))
}

pub async fn whoami(state: &AppState, principal: &Principal) -> ApiResult<User> {
    find_by_id(state, principal.id).await
}
