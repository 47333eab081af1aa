use serde::{Deserialize, Serialize};
use time::Date;

use crate::menus::repo::Menu;
use crate::nutrition::Ccpf;

time::serde::format_description!(date_format, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
    Supper,
}

impl Meal {
    pub fn as_str(self) -> &'static str {
        match self {
            Meal::Breakfast => "BREAKFAST",
            Meal::Lunch => "LUNCH",
            Meal::Dinner => "DINNER",
            Meal::Supper => "SUPPER",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MenuCreateRequest {
    #[serde(with = "date_format")]
    pub date: Date,
    pub meal: Meal,
}

#[derive(Debug, Deserialize)]
pub struct MenuUpdateRequest {
    pub id: i64,
    #[serde(with = "date_format")]
    pub date: Date,
    pub meal: Meal,
}

/// Menu with the nutrient totals of its member dishes, computed on read
/// against the dish tier.
#[derive(Debug, Serialize)]
pub struct MenuDto {
    pub id: i64,
    #[serde(with = "date_format")]
    pub date: Date,
    pub meal: String,
    pub calories: i32,
    pub carbs: i32,
    pub protein: i32,
    pub fats: i32,
}

impl MenuDto {
    pub fn new(menu: &Menu, totals: Ccpf) -> Self {
        Self {
            id: menu.id,
            date: menu.date,
            meal: menu.meal.clone(),
            calories: totals.calories,
            carbs: totals.carbs,
            protein: totals.protein,
            fats: totals.fats,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuDishRequest {
    pub dish_id: i64,
    pub menu_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub pnumber: Option<i64>,
    pub psize: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_round_trips_through_uppercase() {
        for meal in [Meal::Breakfast, Meal::Lunch, Meal::Dinner, Meal::Supper] {
            let encoded = serde_json::to_string(&meal).unwrap();
            assert_eq!(encoded, format!("\"{}\"", meal.as_str()));
            let decoded: Meal = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, meal);
        }
        assert!(serde_json::from_str::<Meal>("\"BRUNCH\"").is_err());
    }

    #[test]
    fn create_request_parses_iso_date() {
        let req: MenuCreateRequest =
            serde_json::from_str(r#"{"date":"2026-08-31","meal":"LUNCH"}"#).unwrap();
        assert_eq!(req.meal, Meal::Lunch);
        assert_eq!(req.date.to_string(), "2026-08-31");
    }
}
