use serde::Serialize;

use crate::files::repo::FileRecord;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDto {
    pub id: i64,
    pub file_name: String,
    pub file_size: i64,
    pub download_url: String,
}

impl From<FileRecord> for FileDto {
    fn from(record: FileRecord) -> Self {
        Self {
            download_url: format!("/file/download?id={}", record.id),
            id: record.id,
            file_name: record.file_name,
            file_size: record.file_size,
        }
    }
}
