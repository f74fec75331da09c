pub mod api;
pub mod cache;
pub mod config;
pub mod errors;
pub mod hash;
pub mod image_ops;
pub mod storage;
pub mod tui;
pub mod wallpaper;
