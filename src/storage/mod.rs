pub mod models;
pub mod schema;
pub mod sqlite;

use crate::errors::Result;
use models::{ApodRecord, NewApod};

/// Read/insert surface of the image cache index. Everything outside the
/// storage module, the TUI included, goes through this trait; nothing
/// else holds a raw database handle.
pub trait ApodStore {
    fn insert(&self, apod: NewApod) -> Result<ApodRecord>;
    fn get_by_id(&self, id: i64) -> Result<ApodRecord>;
    fn find_by_sha256(&self, sha256: &str) -> Result<Option<ApodRecord>>;
    fn list(&self) -> Result<Vec<ApodRecord>>;
    fn list_titles(&self) -> Result<Vec<String>>;
    fn count(&self) -> Result<i64>;
}
