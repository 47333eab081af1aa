use sqlx::{FromRow, PgPool};

use crate::items::repo::Item;

#[derive(Debug, Clone, FromRow)]
pub struct Dish {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, FromRow)]
struct ItemCountRow {
    id: i64,
    name: String,
    calories: i32,
    carbs: i32,
    protein: i32,
    fats: i32,
    count: i32,
}

impl Dish {
    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<Dish>> {
        sqlx::query_as::<_, Dish>("SELECT id, name FROM dishes WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_name(db: &PgPool, name: &str) -> sqlx::Result<Option<Dish>> {
        sqlx::query_as::<_, Dish>("SELECT id, name FROM dishes WHERE name = $1")
            .bind(name)
            .fetch_optional(db)
            .await
    }

    pub async fn list(db: &PgPool, page: i64, size: i64) -> sqlx::Result<Vec<Dish>> {
        sqlx::query_as::<_, Dish>("SELECT id, name FROM dishes ORDER BY id LIMIT $1 OFFSET $2")
            .bind(size)
            .bind(page * size)
            .fetch_all(db)
            .await
    }

    pub async fn insert(db: &PgPool, name: &str) -> sqlx::Result<Dish> {
        sqlx::query_as::<_, Dish>("INSERT INTO dishes (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(db)
            .await
    }

    pub async fn rename(db: &PgPool, id: i64, name: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE dishes SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Composition links are removed by the `ON DELETE CASCADE` constraint
    /// in the same statement.
    pub async fn delete(db: &PgPool, id: i64) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM dishes WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    /// All items linked to this dish with their gram counts. No order is
    /// guaranteed.
    pub async fn items(db: &PgPool, dish_id: i64) -> sqlx::Result<Vec<(Item, i32)>> {
        let rows = sqlx::query_as::<_, ItemCountRow>(
            r#"
            SELECT i.id, i.name, i.calories, i.carbs, i.protein, i.fats, l.count
            FROM items_dishes l
            JOIN items i ON i.id = l.item_id
            WHERE l.dish_id = $1
            "#,
        )
        .bind(dish_id)
        .fetch_all(db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    Item {
                        id: r.id,
                        name: r.name,
                        calories: r.calories,
                        carbs: r.carbs,
                        protein: r.protein,
                        fats: r.fats,
                    },
                    r.count,
                )
            })
            .collect())
    }

    /// Quantity-bearing link: re-linking an existing (item, dish) pair
    /// updates the count in place.
    pub async fn upsert_item_link(
        db: &PgPool,
        item_id: i64,
        dish_id: i64,
        count: i32,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items_dishes (item_id, dish_id, count)
            VALUES ($1, $2, $3)
            ON CONFLICT (item_id, dish_id) DO UPDATE SET count = EXCLUDED.count
            "#,
        )
        .bind(item_id)
        .bind(dish_id)
        .bind(count)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn delete_item_link(db: &PgPool, item_id: i64, dish_id: i64) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM items_dishes WHERE item_id = $1 AND dish_id = $2")
            .bind(item_id)
            .bind(dish_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
