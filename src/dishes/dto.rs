use serde::{Deserialize, Serialize};

use crate::dishes::repo::Dish;
use crate::error::ApiError;
use crate::items::dto::ItemDto;
use crate::nutrition::Ccpf;

fn valid_name(name: &str) -> bool {
    (3..=16).contains(&name.chars().count())
}

#[derive(Debug, Deserialize)]
pub struct DishCreateRequest {
    pub name: String,
}

impl DishCreateRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !valid_name(&self.name) {
            return Err(ApiError::Validation);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct DishUpdateNameRequest {
    pub id: i64,
    pub name: String,
}

impl DishUpdateNameRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !valid_name(&self.name) {
            return Err(ApiError::Validation);
        }
        Ok(())
    }
}

/// Dish with its composition's nutrient totals, computed on read.
#[derive(Debug, Serialize)]
pub struct DishDto {
    pub id: i64,
    pub name: String,
    pub calories: i32,
    pub carbs: i32,
    pub protein: i32,
    pub fats: i32,
}

impl DishDto {
    pub fn new(dish: &Dish, totals: Ccpf) -> Self {
        Self {
            id: dish.id,
            name: dish.name.clone(),
            calories: totals.calories,
            carbs: totals.carbs,
            protein: totals.protein,
            fats: totals.fats,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DishAddItemRequest {
    pub item_id: i64,
    pub dish_id: i64,
    pub count: i32,
}

impl DishAddItemRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.count < 0 {
            return Err(ApiError::Validation);
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ItemCountDto {
    pub item: ItemDto,
    pub count: i32,
}

#[derive(Debug, Deserialize)]
pub struct DishQuery {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub pnumber: Option<i64>,
    pub psize: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ItemLinkQuery {
    #[serde(rename = "item-id")]
    pub item_id: Option<i64>,
    #[serde(rename = "dish-id")]
    pub dish_id: Option<i64>,
}
