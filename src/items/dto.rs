use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::items::repo::Item;
use crate::nutrition::Ccpf;

fn valid_name(name: &str) -> bool {
    (3..=16).contains(&name.chars().count())
}

fn valid_nutrients(values: [i32; 4]) -> bool {
    values.iter().all(|v| *v >= 0)
}

#[derive(Debug, Deserialize)]
pub struct ItemCreateRequest {
    pub name: String,
    pub calories: i32,
    pub carbs: i32,
    pub protein: i32,
    pub fats: i32,
}

impl ItemCreateRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !valid_name(&self.name)
            || !valid_nutrients([self.calories, self.carbs, self.protein, self.fats])
        {
            return Err(ApiError::Validation);
        }
        Ok(())
    }

    pub fn nutrients(&self) -> Ccpf {
        Ccpf {
            calories: self.calories,
            carbs: self.carbs,
            protein: self.protein,
            fats: self.fats,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ItemUpdateRequest {
    pub id: i64,
    pub name: String,
    pub calories: i32,
    pub carbs: i32,
    pub protein: i32,
    pub fats: i32,
}

impl ItemUpdateRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !valid_name(&self.name)
            || !valid_nutrients([self.calories, self.carbs, self.protein, self.fats])
        {
            return Err(ApiError::Validation);
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ItemDto {
    pub id: i64,
    pub name: String,
    pub calories: i32,
    pub carbs: i32,
    pub protein: i32,
    pub fats: i32,
}

impl From<Item> for ItemDto {
    fn from(i: Item) -> Self {
        Self {
            id: i.id,
            name: i.name,
            calories: i.calories,
            carbs: i.carbs,
            protein: i.protein,
            fats: i.fats,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ItemQuery {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub pnumber: Option<i64>,
    pub psize: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(name: &str, calories: i32) -> ItemCreateRequest {
        ItemCreateRequest {
            name: name.into(),
            calories,
            carbs: 5,
            protein: 3,
            fats: 3,
        }
    }

    #[test]
    fn accepts_well_formed_input() {
        assert!(req("Milk", 60).validate().is_ok());
    }

    #[test]
    fn rejects_short_and_long_names() {
        assert!(req("ab", 60).validate().is_err());
        assert!(req("a-very-long-item-name", 60).validate().is_err());
    }

    #[test]
    fn rejects_negative_nutrients() {
        assert!(req("Milk", -1).validate().is_err());
    }
}
