use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApodError {
    #[error("Index error: {0}")]
    Index(#[from] rusqlite::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("Write error: {0}")]
    Write(#[from] std::io::Error),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Wallpaper error: {0}")]
    Wallpaper(String),
}

pub type Result<T> = std::result::Result<T, ApodError>;
