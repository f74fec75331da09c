use std::path::PathBuf;

/// Filesystem layout of the image cache. Built once in `main` and passed
/// by reference; nothing else in the crate knows where the cache lives.
pub struct AppPaths {
    pub base_dir: PathBuf,
    pub images_dir: PathBuf,
    pub db_path: PathBuf,
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

impl AppPaths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .expect("Could not determine home directory")
            .join(".apod");
        Self::from_base(base)
    }

    pub fn from_base(base: PathBuf) -> Self {
        Self {
            images_dir: base.join("images"),
            db_path: base.join("image_cache.db"),
            base_dir: base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_base() {
        let paths = AppPaths::from_base(PathBuf::from("/tmp/test-apod"));
        assert_eq!(paths.base_dir, PathBuf::from("/tmp/test-apod"));
        assert_eq!(paths.images_dir, PathBuf::from("/tmp/test-apod/images"));
        assert_eq!(paths.db_path, PathBuf::from("/tmp/test-apod/image_cache.db"));
    }

    #[test]
    fn test_new_uses_home_dir() {
        let paths = AppPaths::new();
        assert!(paths.base_dir.ends_with(".apod"));
    }
}
