// Uniqueness on sha256 and file_path is enforced here, in the schema,
// not by the orchestrator's pre-insert lookup. A racing duplicate insert
// from another process fails cleanly instead of corrupting the index.
pub const CREATE_APOD_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS apod_images (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        explanation TEXT NOT NULL,
        file_path TEXT NOT NULL UNIQUE,
        sha256 TEXT NOT NULL UNIQUE
    )
";

pub const CREATE_INDEX_SHA256: &str =
    "CREATE INDEX IF NOT EXISTS idx_apod_images_sha256 ON apod_images(sha256)";
