use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::files::repo::FileRecord;
use crate::state::AppState;

fn file_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("File with id {id} was not found"))
}

fn extension_of(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[idx..],
        _ => "",
    }
}

/// The body lands in the store under a generated key before the metadata row
/// exists, so a metadata failure leaves only an orphaned object, which is
/// cleaned up best effort. The client never sees a row without a body.
pub async fn upload(
    state: &AppState,
    file_name: &str,
    content_type: &str,
    body: Bytes,
) -> ApiResult<FileRecord> {
    let key = format!("{}{}", Uuid::new_v4(), extension_of(file_name));
    let size = body.len() as i64;
    state.files.put(&key, body).await?;
    let record =
        match FileRecord::insert(&state.db, file_name, &key, content_type, size).await {
            Ok(record) => record,
            Err(e) => {
                if let Err(cleanup) = state.files.delete(&key).await {
                    warn!(error = %cleanup, key, "failed to remove orphaned upload");
                }
                return Err(e.into());
            }
        };
    debug!(file_id = record.id, size, "file uploaded");
    Ok(record)
}

pub async fn metadata(state: &AppState, id: i64) -> ApiResult<FileRecord> {
    FileRecord::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| file_not_found(id))
}

/// Metadata and body together; a row whose object has gone missing from the
/// store reports NotFound rather than an internal error.
pub async fn download(state: &AppState, id: i64) -> ApiResult<(FileRecord, Bytes)> {
    let record = metadata(state, id).await?;
    let body = state
        .files
        .read(&record.storage_key)
        .await
        .map_err(|_| file_not_found(id))?;
    Ok((record, body))
}

pub async fn delete(state: &AppState, id: i64) -> ApiResult<()> {
    let record = metadata(state, id).await?;
    FileRecord::delete(&state.db, id).await?;
    if let Err(e) = state.files.delete(&record.storage_key).await {
        warn!(error = %e, key = record.storage_key, "failed to remove stored file");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_kept_for_generated_keys() {
        assert_eq!(extension_of("photo.png"), ".png");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("no_extension"), "");
        assert_eq!(extension_of(".hidden"), "");
    }

    #[sqlx::test]
    async fn upload_then_download_round_trips(db: sqlx::PgPool) {
        let state = AppState::fake_with_db(db);
        let record = upload(&state, "note.txt", "text/plain", Bytes::from_static(b"hello"))
            .await
            .expect("upload");
        assert_eq!(record.file_size, 5);
        let (meta, body) = download(&state, record.id).await.expect("download");
        assert_eq!(meta.file_name, "note.txt");
        assert_eq!(&body[..], b"hello");
    }

    #[sqlx::test]
    async fn deleted_file_reports_not_found(db: sqlx::PgPool) {
        let state = AppState::fake_with_db(db);
        let record = upload(&state, "gone.txt", "text/plain", Bytes::from_static(b"x"))
            .await
            .expect("upload");
        delete(&state, record.id).await.expect("delete");
        let err = download(&state, record.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
