use serde::Serialize;

/// One cached APOD image. Rows are immutable once inserted; the cache
/// only grows.
#[derive(Debug, Clone, Serialize)]
pub struct ApodRecord {
    pub id: i64,
    pub title: String,
    pub explanation: String,
    pub file_path: String,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct NewApod {
    pub title: String,
    pub explanation: String,
    pub file_path: String,
    pub sha256: String,
}
