use serde_json::json;
use tracing::debug;

use crate::dishes::dto::DishDto;
use crate::dishes::repo::Dish;
use crate::error::{ApiError, ApiResult};
use crate::events;
use crate::items::repo::Item;
use crate::nutrition::Ccpf;
use crate::state::AppState;

fn dish_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Dish with id {id} was not found"))
}

fn item_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Item with id {id} was not found"))
}

pub async fn create(state: &AppState, name: &str) -> ApiResult<Dish> {
    if Dish::find_by_name(&state.db, name).await?.is_some() {
        return Err(ApiError::DataIntegrity(format!(
            "Dish with name {name} already exist"
        )));
    }
    let dish = Dish::insert(&state.db, name).await?;
    debug!(dish_id = dish.id, "dish created");
    events::publish(
        &state.events,
        events::DISH_EVENTS,
        events::created(json!({ "id": dish.id, "name": dish.name })),
    );
    Ok(dish)
}

pub async fn update_name(state: &AppState, id: i64, name: &str) -> ApiResult<()> {
    let existing = Dish::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| dish_not_found(id))?;
    if let Some(holder) = Dish::find_by_name(&state.db, name).await? {
        // renaming to the dish's own current name is a no-op success
        if holder.id != id {
            return Err(ApiError::DataIntegrity(format!(
                "Dish with name {name} already exist"
            )));
        }
    }
    Dish::rename(&state.db, id, name).await?;
    events::publish(
        &state.events,
        events::DISH_EVENTS,
        events::updated(json!({
            "id": id,
            "name": events::field_change(&json!(existing.name), &json!(name)),
        })),
    );
    Ok(())
}

pub async fn delete(state: &AppState, id: i64) -> ApiResult<()> {
    let dish = Dish::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| dish_not_found(id))?;
    Dish::delete(&state.db, id).await?;
    events::publish(
        &state.events,
        events::DISH_EVENTS,
        events::deleted(json!({ "id": dish.id, "name": dish.name })),
    );
    Ok(())
}

fn composition_event(dish: &Dish, item_id: i64, count: i32) -> serde_json::Value {
    events::updated(json!({
        "id": dish.id,
        "name": dish.name,
        "items": [{ "id": item_id, "count": count }],
    }))
}

/// Item existence is validated here, before linking; the aggregation fold
/// over this dish can therefore assume every linked item resolves.
pub async fn add_item(state: &AppState, item_id: i64, dish_id: i64, count: i32) -> ApiResult<()> {
    let dish = Dish::find_by_id(&state.db, dish_id)
        .await?
        .ok_or_else(|| dish_not_found(dish_id))?;
    Item::find_by_id(&state.db, item_id)
        .await?
        .ok_or_else(|| item_not_found(item_id))?;
    Dish::upsert_item_link(&state.db, item_id, dish_id, count).await?;
    events::publish(
        &state.events,
        events::DISH_EVENTS,
        composition_event(&dish, item_id, count),
    );
    Ok(())
}

pub async fn remove_item(state: &AppState, item_id: i64, dish_id: i64) -> ApiResult<()> {
    let dish = Dish::find_by_id(&state.db, dish_id)
        .await?
        .ok_or_else(|| dish_not_found(dish_id))?;
    Item::find_by_id(&state.db, item_id)
        .await?
        .ok_or_else(|| item_not_found(item_id))?;
    let removed = Dish::delete_item_link(&state.db, item_id, dish_id).await?;
    if removed == 0 {
        return Err(ApiError::NotFound(format!(
            "Item with id {item_id} was not found in Dish with id {dish_id}"
        )));
    }
    // count 0 marks removal of the item from the composition
    events::publish(
        &state.events,
        events::DISH_EVENTS,
        composition_event(&dish, item_id, 0),
    );
    Ok(())
}

pub async fn items_of(state: &AppState, dish_id: i64) -> ApiResult<Vec<(Item, i32)>> {
    Dish::find_by_id(&state.db, dish_id)
        .await?
        .ok_or_else(|| dish_not_found(dish_id))?;
    Ok(Dish::items(&state.db, dish_id).await?)
}

/// Fold the dish's composition into its nutrient totals, weighting each
/// item by its gram count.
pub fn aggregate(items: &[(Item, i32)]) -> Ccpf {
    items.iter().fold(Ccpf::default(), |acc, (item, count)| {
        acc.add_weighted(item.nutrients(), *count)
    })
}

/// Aggregate-on-read: the DTO is always consistent with the current
/// composition and item data.
pub async fn to_dto(state: &AppState, dish: &Dish) -> ApiResult<DishDto> {
    let items = Dish::items(&state.db, dish.id).await?;
    Ok(DishDto::new(dish, aggregate(&items)))
}

pub async fn find_by_id(state: &AppState, id: i64) -> ApiResult<Dish> {
    Dish::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| dish_not_found(id))
}

pub async fn find_by_name(state: &AppState, name: &str) -> ApiResult<Dish> {
    Dish::find_by_name(&state.db, name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Dish with name {name} was not found")))
}

pub async fn list(state: &AppState, page: i64, size: i64) -> ApiResult<Vec<Dish>> {
    Ok(Dish::list(&state.db, page, size).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(calories: i32, carbs: i32, protein: i32, fats: i32) -> Item {
        Item {
            id: 0,
            name: "test".into(),
            calories,
            carbs,
            protein,
            fats,
        }
    }

    #[test]
    fn aggregate_weights_each_item_by_its_count() {
        let items = vec![(item(100, 0, 0, 0), 50), (item(200, 0, 0, 0), 100)];
        assert_eq!(aggregate(&items).calories, 250);
    }

    #[test]
    fn aggregate_of_empty_composition_is_zero() {
        assert_eq!(aggregate(&[]), Ccpf::default());
    }

    #[sqlx::test]
    async fn rename_to_own_name_is_a_noop(db: sqlx::PgPool) {
        let state = AppState::fake_with_db(db);
        let dish = create(&state, "Borscht").await.expect("create");
        update_name(&state, dish.id, "Borscht")
            .await
            .expect("self rename is a no-op");
        create(&state, "Solyanka").await.expect("create second");
        let err = update_name(&state, dish.id, "Solyanka").await.unwrap_err();
        assert!(matches!(err, ApiError::DataIntegrity(_)));
    }

    #[sqlx::test]
    async fn relinking_an_item_updates_the_count_in_place(db: sqlx::PgPool) {
        let state = AppState::fake_with_db(db);
        let dish = create(&state, "Borscht").await.expect("dish");
        let beet = crate::items::services::create(
            &state,
            "Beet",
            Ccpf { calories: 43, carbs: 10, protein: 2, fats: 0 },
        )
        .await
        .expect("item");
        add_item(&state, beet.id, dish.id, 50).await.expect("link");
        add_item(&state, beet.id, dish.id, 80).await.expect("relink");
        let items = items_of(&state, dish.id).await.expect("list");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].1, 80);
    }

    #[sqlx::test]
    async fn deleted_dish_loses_its_links_and_reads_not_found(db: sqlx::PgPool) {
        let state = AppState::fake_with_db(db);
        let dish = create(&state, "Borscht").await.expect("dish");
        let beet = crate::items::services::create(
            &state,
            "Beet",
            Ccpf { calories: 43, carbs: 10, protein: 2, fats: 0 },
        )
        .await
        .expect("item");
        add_item(&state, beet.id, dish.id, 50).await.expect("link");
        delete(&state, dish.id).await.expect("delete");
        let err = items_of(&state, dish.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        // the item itself survives the cascade
        crate::items::services::find_by_id(&state, beet.id)
            .await
            .expect("item still present");
    }
}
