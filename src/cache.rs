use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::api::ApodSource;
use crate::config::AppPaths;
use crate::errors::{ApodError, Result};
use crate::hash::sha256_hex;
use crate::storage::ApodStore;
use crate::storage::models::NewApod;
use crate::storage::sqlite::SqliteStorage;

/// Creates the cache directories and opens the index, creating its schema
/// if absent. Idempotent; existing data is untouched.
pub fn init_cache(paths: &AppPaths) -> Result<SqliteStorage> {
    fs::create_dir_all(&paths.images_dir)?;
    let conn = Connection::open(&paths.db_path)?;
    SqliteStorage::new(conn)
}

/// Destination path for a downloaded image: sanitized title plus the
/// extension of the source URL, inside the images directory. Pure; no I/O.
///
/// The title is trimmed and every maximal run of non-word characters
/// becomes a single underscore, so
/// `"  NGC #3521: Galaxy in a Bubble  "` downloaded from
/// `.../NGC3521LRGBHaAPOD-20.jpg` lands at
/// `<images_dir>/NGC_3521_Galaxy_in_a_Bubble.jpg`.
pub fn derive_file_path(images_dir: &Path, title: &str, image_url: &str) -> PathBuf {
    let mut name = String::new();
    let mut in_run = false;
    for c in title.trim().chars() {
        if c.is_alphanumeric() || c == '_' {
            name.push(c);
            in_run = false;
        } else if !in_run {
            name.push('_');
            in_run = true;
        }
    }
    name.push_str(url_extension(image_url));
    images_dir.join(name)
}

/// Final dot-suffix of the URL's last path segment, dot included.
/// Empty when the segment has no extension.
fn url_extension(url: &str) -> &str {
    let name = url.rsplit('/').next().unwrap_or("");
    match name.rfind('.') {
        Some(i) if i > 0 => &name[i..],
        _ => "",
    }
}

/// Writes the payload to `path`, overwriting any existing file. The
/// orchestrator's dedupe check makes overwrites unreachable in practice,
/// but the store itself does not forbid them.
pub fn save_image_file(data: &[u8], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data)?;
    Ok(())
}

/// Ensures the APOD for `date` is cached and returns its record id.
///
/// Fetch metadata, download the payload, hash it, and look the digest up
/// in the index. A hit returns the existing id with no writes at all. On
/// a miss the file is persisted and the record inserted; if the insert
/// fails the just-written file is removed, so no step leaves partial
/// state behind.
///
/// A distinct payload whose title derives an already-occupied path is
/// rejected before anything is written; overwriting would destroy the
/// file a previous record points at.
pub fn add_to_cache<S, T>(source: &S, store: &T, images_dir: &Path, date: NaiveDate) -> Result<i64>
where
    S: ApodSource,
    T: ApodStore,
{
    let info = source.apod_info(date)?;
    let image_url = info.image_url()?.to_string();
    let data = source.download(&image_url)?;
    let digest = sha256_hex(&data);

    if let Some(existing) = store.find_by_sha256(&digest)? {
        return Ok(existing.id);
    }

    let file_path = derive_file_path(images_dir, &info.title, &image_url);
    if file_path.exists() {
        return Err(ApodError::Duplicate(format!(
            "derived path {} already holds another cached image",
            file_path.display()
        )));
    }
    save_image_file(&data, &file_path)?;

    let inserted = store.insert(NewApod {
        title: info.title,
        explanation: info.explanation,
        file_path: file_path.to_string_lossy().into_owned(),
        sha256: digest,
    });
    match inserted {
        Ok(record) => Ok(record.id),
        Err(e) => {
            // A failed insert must not strand the file on disk
            let _ = fs::remove_file(&file_path);
            Err(e)
        }
    }
}

/// Files in the images directory that no index row references. These can
/// only appear through interference from outside this process (a deleted
/// database, files dropped in by hand); `add_to_cache` itself cleans up
/// after failed inserts.
pub fn find_orphans<T: ApodStore>(store: &T, images_dir: &Path) -> Result<Vec<PathBuf>> {
    let indexed: std::collections::HashSet<String> = store
        .list()?
        .into_iter()
        .map(|record| record.file_path)
        .collect();

    let mut orphans = Vec::new();
    for entry in fs::read_dir(images_dir)? {
        let path = entry?.path();
        if path.is_file() && !indexed.contains(&path.to_string_lossy().into_owned()) {
            orphans.push(path);
        }
    }
    orphans.sort();
    Ok(orphans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApodInfo;
    use crate::errors::ApodError;
    use crate::storage::sqlite::SqliteStorage;
    use std::cell::Cell;
    use tempfile::TempDir;

    struct FakeSource {
        info: ApodInfo,
        payload: Vec<u8>,
        fail_info: bool,
        fail_download: bool,
        downloads: Cell<usize>,
    }

    impl FakeSource {
        fn new(title: &str, payload: &[u8]) -> Self {
            Self {
                info: ApodInfo {
                    title: title.to_string(),
                    explanation: format!("About {}", title),
                    media_type: "image".to_string(),
                    url: Some("https://apod.example/low.jpg".to_string()),
                    hdurl: Some("https://apod.example/hd.jpg".to_string()),
                    thumbnail_url: None,
                },
                payload: payload.to_vec(),
                fail_info: false,
                fail_download: false,
                downloads: Cell::new(0),
            }
        }
    }

    impl ApodSource for FakeSource {
        fn apod_info(&self, _date: NaiveDate) -> crate::errors::Result<ApodInfo> {
            if self.fail_info {
                return Err(ApodError::NotFound("simulated API failure".to_string()));
            }
            Ok(self.info.clone())
        }

        fn download(&self, _url: &str) -> crate::errors::Result<Vec<u8>> {
            if self.fail_download {
                return Err(ApodError::NotFound("simulated download failure".to_string()));
            }
            self.downloads.set(self.downloads.get() + 1);
            Ok(self.payload.clone())
        }
    }

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 16).unwrap()
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    // --- Path derivation ---

    #[test]
    fn test_derive_file_path_sanitizes_title() {
        let path = derive_file_path(
            Path::new("/cache/images"),
            "  NGC #3521: Galaxy in a Bubble  ",
            "https://apod.nasa.gov/apod/image/2205/NGC3521LRGBHaAPOD-20.jpg",
        );
        assert_eq!(
            path,
            PathBuf::from("/cache/images/NGC_3521_Galaxy_in_a_Bubble.jpg")
        );
    }

    #[test]
    fn test_derive_file_path_is_deterministic() {
        let a = derive_file_path(Path::new("/c"), "A Title", "https://x/y.png");
        let b = derive_file_path(Path::new("/c"), "A Title", "https://x/y.png");
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_file_path_punctuation_only_title() {
        let path = derive_file_path(Path::new("/c"), "?!*", "https://x/y.jpg");
        assert_eq!(path, PathBuf::from("/c/_.jpg"));
    }

    #[test]
    fn test_derive_file_path_url_without_extension() {
        let path = derive_file_path(Path::new("/c"), "Plain", "https://x.example/image");
        assert_eq!(path, PathBuf::from("/c/Plain"));
    }

    #[test]
    fn test_derive_file_path_preserves_extension_case() {
        let path = derive_file_path(Path::new("/c"), "Loud", "https://x/IMG.JPG");
        assert_eq!(path, PathBuf::from("/c/Loud.JPG"));
    }

    // --- Persist ---

    #[test]
    fn test_save_image_file_writes_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.jpg");
        save_image_file(b"jpeg bytes", &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"jpeg bytes");
    }

    #[test]
    fn test_save_image_file_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.jpg");
        save_image_file(b"old", &path).unwrap();
        save_image_file(b"new", &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    // --- Init ---

    #[test]
    fn test_init_cache_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::from_base(dir.path().to_path_buf());

        let storage = init_cache(&paths).unwrap();
        storage
            .insert(NewApod {
                title: "Persisted".to_string(),
                explanation: "Survives re-init".to_string(),
                file_path: "/tmp/p.jpg".to_string(),
                sha256: sha256_hex(b"p"),
            })
            .unwrap();
        drop(storage);

        let reopened = init_cache(&paths).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        assert!(paths.images_dir.is_dir());
    }

    // --- Orchestration ---

    #[test]
    fn test_cache_miss_writes_file_and_row() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStorage::in_memory().unwrap();
        let source = FakeSource::new("Crab Nebula", b"crab bytes");

        let id = add_to_cache(&source, &store, dir.path(), test_date()).unwrap();
        assert!(id > 0);

        let record = store.get_by_id(id).unwrap();
        assert_eq!(record.title, "Crab Nebula");
        assert_eq!(record.sha256, sha256_hex(b"crab bytes"));
        let expected = dir.path().join("Crab_Nebula.jpg");
        assert_eq!(record.file_path, expected.to_string_lossy());
        assert_eq!(fs::read(&expected).unwrap(), b"crab bytes");
    }

    #[test]
    fn test_cache_hit_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStorage::in_memory().unwrap();
        let source = FakeSource::new("Pillars of Creation", b"pillars");

        let first = add_to_cache(&source, &store, dir.path(), test_date()).unwrap();
        let second = add_to_cache(&source, &store, dir.path(), test_date()).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(files_in(dir.path()).len(), 1);
        // Both calls hit the network; only the first one wrote anything
        assert_eq!(source.downloads.get(), 2);
    }

    #[test]
    fn test_metadata_failure_leaves_no_state() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStorage::in_memory().unwrap();
        let mut source = FakeSource::new("Unreachable", b"bytes");
        source.fail_info = true;

        assert!(add_to_cache(&source, &store, dir.path(), test_date()).is_err());
        assert_eq!(store.count().unwrap(), 0);
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn test_download_failure_leaves_no_state() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStorage::in_memory().unwrap();
        let mut source = FakeSource::new("Half Fetched", b"bytes");
        source.fail_download = true;

        assert!(add_to_cache(&source, &store, dir.path(), test_date()).is_err());
        assert_eq!(store.count().unwrap(), 0);
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn test_unsupported_media_aborts_before_download() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStorage::in_memory().unwrap();
        let mut source = FakeSource::new("Live Stream", b"bytes");
        source.info.media_type = "other".to_string();

        let result = add_to_cache(&source, &store, dir.path(), test_date());
        assert!(matches!(result, Err(ApodError::UnsupportedMedia(_))));
        assert_eq!(source.downloads.get(), 0);
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn test_insert_failure_removes_written_file() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStorage::in_memory().unwrap();
        let source = FakeSource::new("Colliding Title", b"fresh bytes");

        // Index a row claiming the derived path without a file on disk:
        // the insert trips UNIQUE(file_path) after the file write, and
        // the rollback has nothing but our own write to undo
        let derived = derive_file_path(dir.path(), "Colliding Title", "https://apod.example/hd.jpg");
        store
            .insert(NewApod {
                title: "Occupant".to_string(),
                explanation: "Holds the path".to_string(),
                file_path: derived.to_string_lossy().into_owned(),
                sha256: sha256_hex(b"stale bytes"),
            })
            .unwrap();

        let result = add_to_cache(&source, &store, dir.path(), test_date());
        assert!(matches!(result, Err(ApodError::Duplicate(_))));
        assert!(!derived.exists());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_path_collision_preserves_existing_file() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStorage::in_memory().unwrap();

        // Two different images whose titles sanitize to the same filename
        let january = FakeSource::new("Eclipse", b"january bytes");
        let july = FakeSource::new("Eclipse", b"july bytes");

        let first = add_to_cache(&january, &store, dir.path(), test_date()).unwrap();
        let record = store.get_by_id(first).unwrap();

        let result = add_to_cache(&july, &store, dir.path(), test_date());
        assert!(matches!(result, Err(ApodError::Duplicate(_))));

        // The first record's file must survive the collision untouched
        assert!(Path::new(&record.file_path).exists());
        assert_eq!(fs::read(&record.file_path).unwrap(), b"january bytes");
        assert_eq!(store.count().unwrap(), 1);
        // The colliding payload was never written anywhere
        assert_eq!(files_in(dir.path()).len(), 1);
    }

    // --- Orphans ---

    #[test]
    fn test_find_orphans_flags_unindexed_files() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStorage::in_memory().unwrap();
        let source = FakeSource::new("Indexed Image", b"indexed");

        add_to_cache(&source, &store, dir.path(), test_date()).unwrap();
        fs::write(dir.path().join("stray.jpg"), b"stray").unwrap();

        let orphans = find_orphans(&store, dir.path()).unwrap();
        assert_eq!(orphans, vec![dir.path().join("stray.jpg")]);
    }

    #[test]
    fn test_find_orphans_empty_when_consistent() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStorage::in_memory().unwrap();
        let source = FakeSource::new("Only Image", b"only");

        add_to_cache(&source, &store, dir.path(), test_date()).unwrap();
        assert!(find_orphans(&store, dir.path()).unwrap().is_empty());
    }
}
