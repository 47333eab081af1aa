use sqlx::{FromRow, PgPool};
use time::Date;

#[derive(Debug, Clone, FromRow)]
pub struct Menu {
    pub id: i64,
    pub date: Date,
    pub meal: String,
    pub user_id: i64,
}

impl Menu {
    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<Menu>> {
        sqlx::query_as::<_, Menu>("SELECT id, date, meal, user_id FROM menus WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Natural key: one menu per (meal, date, owner).
    pub async fn find_by_key(
        db: &PgPool,
        meal: &str,
        date: Date,
        user_id: i64,
    ) -> sqlx::Result<Option<Menu>> {
        sqlx::query_as::<_, Menu>(
            r#"
            SELECT id, date, meal, user_id
            FROM menus
            WHERE meal = $1 AND date = $2 AND user_id = $3
            "#,
        )
        .bind(meal)
        .bind(date)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    pub async fn list(db: &PgPool, page: i64, size: i64) -> sqlx::Result<Vec<Menu>> {
        sqlx::query_as::<_, Menu>(
            "SELECT id, date, meal, user_id FROM menus ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(size)
        .bind(page * size)
        .fetch_all(db)
        .await
    }

    pub async fn list_by_user(
        db: &PgPool,
        user_id: i64,
        page: i64,
        size: i64,
    ) -> sqlx::Result<Vec<Menu>> {
        sqlx::query_as::<_, Menu>(
            r#"
            SELECT id, date, meal, user_id
            FROM menus
            WHERE user_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(size)
        .bind(page * size)
        .fetch_all(db)
        .await
    }

    pub async fn list_all_by_user(db: &PgPool, user_id: i64) -> sqlx::Result<Vec<Menu>> {
        sqlx::query_as::<_, Menu>("SELECT id, date, meal, user_id FROM menus WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(db)
            .await
    }

    pub async fn insert(db: &PgPool, meal: &str, date: Date, user_id: i64) -> sqlx::Result<Menu> {
        sqlx::query_as::<_, Menu>(
            r#"
            INSERT INTO menus (meal, date, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, date, meal, user_id
            "#,
        )
        .bind(meal)
        .bind(date)
        .bind(user_id)
        .fetch_one(db)
        .await
    }

    pub async fn update(db: &PgPool, menu: &Menu) -> sqlx::Result<()> {
        sqlx::query("UPDATE menus SET meal = $2, date = $3 WHERE id = $1")
            .bind(menu.id)
            .bind(&menu.meal)
            .bind(menu.date)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Membership links go with the menu via `ON DELETE CASCADE`.
    pub async fn delete(db: &PgPool, id: i64) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn dish_ids(db: &PgPool, menu_id: i64) -> sqlx::Result<Vec<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT dish_id FROM menus_dishes WHERE menu_id = $1")
            .bind(menu_id)
            .fetch_all(db)
            .await
    }

    /// Pure membership link: a duplicate insert violates the primary key and
    /// surfaces as a conflict, it is never an upsert.
    pub async fn insert_dish_link(db: &PgPool, menu_id: i64, dish_id: i64) -> sqlx::Result<()> {
        sqlx::query("INSERT INTO menus_dishes (menu_id, dish_id) VALUES ($1, $2)")
            .bind(menu_id)
            .bind(dish_id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn delete_dish_link(db: &PgPool, menu_id: i64, dish_id: i64) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM menus_dishes WHERE menu_id = $1 AND dish_id = $2")
            .bind(menu_id)
            .bind(dish_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
