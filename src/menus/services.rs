use serde_json::json;
use time::Date;
use tracing::debug;

use crate::auth::claims::Principal;
use crate::clients::{ClientError, DishClient, RemoteDish};
use crate::error::{ApiError, ApiResult};
use crate::events;
use crate::menus::dto::MenuDto;
use crate::menus::repo::Menu;
use crate::nutrition::Ccpf;
use crate::state::AppState;

fn menu_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Menu with id {id} was not found"))
}

fn menu_data(menu: &Menu) -> serde_json::Value {
    json!({
        "id": menu.id,
        "date": menu.date.to_string(),
        "meal": menu.meal,
        "user_id": menu.user_id,
    })
}

/// Resolve a menu the principal may act on. Owners see their own menus;
/// anyone else gets NotFound rather than Forbidden, so menu ids cannot be
/// enumerated. Elevated roles bypass the owner check when `elevated_ok` is set.
async fn resolve_owned(
    state: &AppState,
    id: i64,
    principal: &Principal,
    elevated_ok: bool,
) -> ApiResult<Menu> {
    let menu = Menu::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| menu_not_found(id))?;
    let allowed = menu.user_id == principal.id || (elevated_ok && principal.role.is_elevated());
    if !allowed {
        return Err(menu_not_found(id));
    }
    Ok(menu)
}

pub async fn create(state: &AppState, owner: i64, meal: &str, date: Date) -> ApiResult<Menu> {
    if Menu::find_by_key(&state.db, meal, date, owner).await?.is_some() {
        return Err(ApiError::DataIntegrity(
            "Menu with given key already exists".into(),
        ));
    }
    let menu = Menu::insert(&state.db, meal, date, owner).await?;
    debug!(menu_id = menu.id, owner, "menu created");
    events::publish(&state.events, events::MENU_EVENTS, events::created(menu_data(&menu)));
    Ok(menu)
}

pub async fn update_for_user(
    state: &AppState,
    principal: &Principal,
    id: i64,
    meal: &str,
    date: Date,
) -> ApiResult<()> {
    let existing = resolve_owned(state, id, principal, false).await?;
    if let Some(holder) = Menu::find_by_key(&state.db, meal, date, existing.user_id).await? {
        // moving the menu onto its own current key is a no-op success
        if holder.id != id {
            return Err(ApiError::DataIntegrity(
                "Menu with given new key already exists".into(),
            ));
        }
    }
    let updated = Menu {
        id,
        date,
        meal: meal.to_string(),
        user_id: existing.user_id,
    };
    Menu::update(&state.db, &updated).await?;

    let mut data = json!({ "id": id });
    if existing.meal != updated.meal {
        data["meal"] = events::field_change(&json!(existing.meal), &json!(updated.meal));
    }
    if existing.date != updated.date {
        data["date"] = events::field_change(
            &json!(existing.date.to_string()),
            &json!(updated.date.to_string()),
        );
    }
    events::publish(&state.events, events::MENU_EVENTS, events::updated(data));
    Ok(())
}

pub async fn delete(state: &AppState, principal: &Principal, id: i64) -> ApiResult<()> {
    let menu = resolve_owned(state, id, principal, true).await?;
    Menu::delete(&state.db, id).await?;
    events::publish(&state.events, events::MENU_EVENTS, events::deleted(menu_data(&menu)));
    Ok(())
}

fn membership_event(menu: &Menu, dish_id: i64, removed: bool) -> serde_json::Value {
    events::updated(json!({
        "id": menu.id,
        "dishes": [{ "id": dish_id, "removed": removed }],
    }))
}

/// The dish lives in another service: its existence is checked through the
/// client, and only Unavailable survives unchanged. Any other client
/// failure means the dish cannot be linked and is reported as NotFound.
pub async fn include_dish(
    state: &AppState,
    principal: &Principal,
    dish_id: i64,
    menu_id: i64,
) -> ApiResult<()> {
    let menu = resolve_owned(state, menu_id, principal, false).await?;
    let members = Menu::dish_ids(&state.db, menu_id).await?;
    if members.contains(&dish_id) {
        return Err(ApiError::DataIntegrity(format!(
            "Dish with id {dish_id} already in menu with id {menu_id}"
        )));
    }
    match state.dishes.get_by_id(dish_id).await {
        Ok(_) => {}
        Err(ClientError::Unavailable(m)) => return Err(ApiError::Unavailable(m)),
        Err(_) => {
            return Err(ApiError::NotFound(format!(
                "Dish with id {dish_id} was not found"
            )))
        }
    }
    Menu::insert_dish_link(&state.db, menu_id, dish_id).await?;
    events::publish(
        &state.events,
        events::MENU_EVENTS,
        membership_event(&menu, dish_id, false),
    );
    Ok(())
}

pub async fn exclude_dish(
    state: &AppState,
    principal: &Principal,
    dish_id: i64,
    menu_id: i64,
) -> ApiResult<()> {
    let menu = resolve_owned(state, menu_id, principal, false).await?;
    let removed = Menu::delete_dish_link(&state.db, menu_id, dish_id).await?;
    if removed == 0 {
        return Err(ApiError::NotFound(format!(
            "Dish with id {dish_id} is not in menu with id {menu_id}"
        )));
    }
    events::publish(
        &state.events,
        events::MENU_EVENTS,
        membership_event(&menu, dish_id, true),
    );
    Ok(())
}

/// Resolve every member dish through the dish tier. Unavailable fails the
/// whole read: a partial sum would be silently wrong. A dish that no longer
/// exists is substituted with a zero-valued "(not found)" placeholder so
/// the menu still renders, visibly incomplete.
pub async fn resolve_dishes(
    client: &dyn DishClient,
    dish_ids: &[i64],
) -> ApiResult<Vec<RemoteDish>> {
    let mut dishes = Vec::with_capacity(dish_ids.len());
    for &dish_id in dish_ids {
        match client.get_by_id(dish_id).await {
            Ok(dish) => dishes.push(dish),
            Err(ClientError::Unavailable(m)) => return Err(ApiError::Unavailable(m)),
            Err(_) => dishes.push(RemoteDish::not_found(dish_id)),
        }
    }
    Ok(dishes)
}

/// Membership aggregation: each dish's own (already aggregated) totals are
/// added as-is, no per-gram scaling.
pub fn aggregate(dishes: &[RemoteDish]) -> Ccpf {
    dishes.iter().fold(Ccpf::default(), |acc, dish| {
        acc.add(Ccpf {
            calories: dish.calories,
            carbs: dish.carbs,
            protein: dish.protein,
            fats: dish.fats,
        })
    })
}

pub async fn dishes_of(
    state: &AppState,
    principal: &Principal,
    menu_id: i64,
) -> ApiResult<Vec<RemoteDish>> {
    resolve_owned(state, menu_id, principal, false).await?;
    let ids = Menu::dish_ids(&state.db, menu_id).await?;
    resolve_dishes(state.dishes.as_ref(), &ids).await
}

pub async fn to_dto(state: &AppState, menu: &Menu) -> ApiResult<MenuDto> {
    let ids = Menu::dish_ids(&state.db, menu.id).await?;
    let dishes = resolve_dishes(state.dishes.as_ref(), &ids).await?;
    Ok(MenuDto::new(menu, aggregate(&dishes)))
}

pub async fn find_by_id(state: &AppState, principal: &Principal, id: i64) -> ApiResult<Menu> {
    resolve_owned(state, id, principal, true).await
}

pub async fn list(state: &AppState, principal: &Principal, page: i64, size: i64) -> ApiResult<Vec<Menu>> {
    if principal.role.is_elevated() {
        Ok(Menu::list(&state.db, page, size).await?)
    } else {
        Ok(Menu::list_by_user(&state.db, principal.id, page, size).await?)
    }
}

/// Elevated-only search: resolves the username through the user tier and
/// lists that user's menus. The caller's Authorization header is forwarded.
pub async fn list_by_username(
    state: &AppState,
    auth_header: &str,
    username: &str,
) -> ApiResult<Vec<Menu>> {
    let user = state.users.get_by_name(auth_header, username).await?;
    Ok(Menu::list_all_by_user(&state.db, user.id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MapDishes {
        dishes: HashMap<i64, RemoteDish>,
        unavailable: bool,
    }

    #[async_trait]
    impl DishClient for MapDishes {
        async fn get_by_id(&self, id: i64) -> Result<RemoteDish, ClientError> {
            if self.unavailable {
                return Err(ClientError::Unavailable(
                    "Dish Service is unavailable now".into(),
                ));
            }
            self.dishes
                .get(&id)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(format!("Dish with id {id} was not found")))
        }
    }

    fn dish(id: i64, calories: i32) -> RemoteDish {
        RemoteDish {
            id,
            name: format!("dish{id}"),
            calories,
            carbs: 0,
            protein: 0,
            fats: 0,
        }
    }

    #[tokio::test]
    async fn unavailable_dish_tier_fails_the_whole_aggregate() {
        let client = MapDishes {
            dishes: HashMap::new(),
            unavailable: true,
        };
        let err = resolve_dishes(&client, &[1, 2]).await.unwrap_err();
        assert!(matches!(err, ApiError::Unavailable(_)));
    }

    #[tokio::test]
    async fn missing_dish_becomes_zero_placeholder_instead_of_failing() {
        let client = MapDishes {
            dishes: HashMap::from([(1, dish(1, 300))]),
            unavailable: false,
        };
        let dishes = resolve_dishes(&client, &[1, 99]).await.unwrap();
        assert_eq!(dishes.len(), 2);
        assert_eq!(dishes[1].name, "(not found)");
        assert_eq!(aggregate(&dishes).calories, 300);
    }

    #[tokio::test]
    async fn aggregate_sums_member_dish_totals() {
        let client = MapDishes {
            dishes: HashMap::from([(1, dish(1, 300)), (2, dish(2, 150))]),
            unavailable: false,
        };
        let dishes = resolve_dishes(&client, &[1, 2]).await.unwrap();
        assert_eq!(aggregate(&dishes).calories, 450);
    }

    use crate::auth::claims::Role;

    fn owner(id: i64) -> Principal {
        Principal { id, role: Role::User }
    }

    #[sqlx::test]
    async fn deleting_a_menu_removes_its_links_and_reads_not_found(db: sqlx::PgPool) {
        let state = AppState::fake_with_db(db);
        let date = time::macros::date!(2026 - 08 - 31);
        let menu = create(&state, 10, "LUNCH", date).await.expect("create");
        Menu::insert_dish_link(&state.db, menu.id, 77)
            .await
            .expect("link");
        delete(&state, &owner(10), menu.id).await.expect("delete");
        let err = dishes_of(&state, &owner(10), menu.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[sqlx::test]
    async fn duplicate_membership_link_is_a_conflict(db: sqlx::PgPool) {
        let state = AppState::fake_with_db(db);
        let date = time::macros::date!(2026 - 08 - 31);
        let menu = create(&state, 10, "DINNER", date).await.expect("create");
        Menu::insert_dish_link(&state.db, menu.id, 5)
            .await
            .expect("first link");
        let err: ApiError = Menu::insert_dish_link(&state.db, menu.id, 5)
            .await
            .expect_err("duplicate link")
            .into();
        assert!(matches!(err, ApiError::DataIntegrity(_)));
    }

    #[sqlx::test]
    async fn moving_a_menu_onto_its_own_key_succeeds(db: sqlx::PgPool) {
        let state = AppState::fake_with_db(db);
        let date = time::macros::date!(2026 - 08 - 31);
        let menu = create(&state, 10, "SUPPER", date).await.expect("create");
        update_for_user(&state, &owner(10), menu.id, "SUPPER", date)
            .await
            .expect("same key is a no-op");
    }
}
