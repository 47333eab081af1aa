use serde_json::json;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::events;
use crate::items::dto::ItemUpdateRequest;
use crate::items::repo::Item;
use crate::nutrition::Ccpf;
use crate::state::AppState;

fn item_data(item: &Item) -> serde_json::Value {
    json!({
        "id": item.id,
        "name": item.name,
        "calories": item.calories,
        "carbs": item.carbs,
        "protein": item.protein,
        "fats": item.fats,
    })
}

pub async fn create(state: &AppState, name: &str, nutrients: Ccpf) -> ApiResult<Item> {
    if Item::find_by_name(&state.db, name).await?.is_some() {
        return Err(ApiError::DataIntegrity(format!(
            "Item with name {name} already exist"
        )));
    }
    let item = Item::insert(&state.db, name, nutrients).await?;
    debug!(item_id = item.id, "item created");
    events::publish(&state.events, events::ITEM_EVENTS, events::created(item_data(&item)));
    Ok(item)
}

pub async fn update(state: &AppState, req: &ItemUpdateRequest) -> ApiResult<()> {
    let existing = Item::find_by_id(&state.db, req.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item with id {} was not found", req.id)))?;
    if let Some(holder) = Item::find_by_name(&state.db, &req.name).await? {
        // renaming to the entity's own current name is a no-op success
        if holder.id != req.id {
            return Err(ApiError::DataIntegrity(format!(
                "Item with name {} already exist",
                req.name
            )));
        }
    }
    let updated = Item {
        id: req.id,
        name: req.name.clone(),
        calories: req.calories,
        carbs: req.carbs,
        protein: req.protein,
        fats: req.fats,
    };
    Item::update(&state.db, &updated).await?;

    let mut data = json!({ "id": existing.id });
    for (field, old, new) in [
        ("name", json!(existing.name), json!(updated.name)),
        ("calories", json!(existing.calories), json!(updated.calories)),
        ("carbs", json!(existing.carbs), json!(updated.carbs)),
        ("protein", json!(existing.protein), json!(updated.protein)),
        ("fats", json!(existing.fats), json!(updated.fats)),
    ] {
        if old != new {
            data[field] = events::field_change(&old, &new);
        }
    }
    events::publish(&state.events, events::ITEM_EVENTS, events::updated(data));
    Ok(())
}

pub async fn delete(state: &AppState, id: i64) -> ApiResult<()> {
    let item = Item::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item with id {id} was not found")))?;
    Item::delete(&state.db, id).await?;
    events::publish(&state.events, events::ITEM_EVENTS, events::deleted(item_data(&item)));
    Ok(())
}

pub async fn find_by_id(state: &AppState, id: i64) -> ApiResult<Item> {
    Item::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item with id {id} was not found")))
}

pub async fn find_by_name(state: &AppState, name: &str) -> ApiResult<Item> {
    Item::find_by_name(&state.db, name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item with name {name} was not found")))
}

pub async fn list(state: &AppState, page: i64, size: i64) -> ApiResult<(Vec<Item>, i64)> {
    let items = Item::list(&state.db, page, size).await?;
    let total = Item::count(&state.db).await?;
    Ok((items, total))
}
