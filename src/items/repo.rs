use sqlx::{FromRow, PgPool};

use crate::nutrition::Ccpf;

#[derive(Debug, Clone, FromRow)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub calories: i32,
    pub carbs: i32,
    pub protein: i32,
    pub fats: i32,
}

impl Item {
    /// Per-100-gram nutrient values of this item.
    pub fn nutrients(&self) -> Ccpf {
        Ccpf {
            calories: self.calories,
            carbs: self.carbs,
            protein: self.protein,
            fats: self.fats,
        }
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<Item>> {
        sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, calories, carbs, protein, fats
            FROM items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_name(db: &PgPool, name: &str) -> sqlx::Result<Option<Item>> {
        sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, calories, carbs, protein, fats
            FROM items
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(db)
        .await
    }

    pub async fn list(db: &PgPool, page: i64, size: i64) -> sqlx::Result<Vec<Item>> {
        sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, calories, carbs, protein, fats
            FROM items
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(size)
        .bind(page * size)
        .fetch_all(db)
        .await
    }

    pub async fn count(db: &PgPool) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items")
            .fetch_one(db)
            .await
    }

    pub async fn insert(
        db: &PgPool,
        name: &str,
        nutrients: Ccpf,
    ) -> sqlx::Result<Item> {
        sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (name, calories, carbs, protein, fats)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, calories, carbs, protein, fats
            "#,
        )
        .bind(name)
        .bind(nutrients.calories)
        .bind(nutrients.carbs)
        .bind(nutrients.protein)
        .bind(nutrients.fats)
        .fetch_one(db)
        .await
    }

    pub async fn update(db: &PgPool, item: &Item) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            UPDATE items
            SET name = $2, calories = $3, carbs = $4, protein = $5, fats = $6
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(item.calories)
        .bind(item.carbs)
        .bind(item.protein)
        .bind(item.fats)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn delete(db: &PgPool, id: i64) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
