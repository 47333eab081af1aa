use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, FromRow)]
pub struct FileRecord {
    pub id: i64,
    pub file_name: String,
    pub storage_key: String,
    pub content_type: String,
    pub file_size: i64,
}

impl FileRecord {
    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, file_name, storage_key, content_type, file_size
            FROM file_metadata
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn insert(
        db: &PgPool,
        file_name: &str,
        storage_key: &str,
        content_type: &str,
        file_size: i64,
    ) -> sqlx::Result<FileRecord> {
        sqlx::query_as::<_, FileRecord>(
            r#"
            INSERT INTO file_metadata (file_name, storage_key, content_type, file_size)
            VALUES ($1, $2, $3, $4)
            RETURNING id, file_name, storage_key, content_type, file_size
            "#,
        )
        .bind(file_name)
        .bind(storage_key)
        .bind(content_type)
        .bind(file_size)
        .fetch_one(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: i64) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM file_metadata WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
