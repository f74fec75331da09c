use std::path::Path;

use crate::errors::{ApodError, Result};

/// Largest size that fits inside `max_size` while preserving the aspect
/// ratio of `size`. Pure arithmetic; the viewer uses it to report how an
/// image will be displayed.
pub fn scale_to_fit(size: (u32, u32), max_size: (u32, u32)) -> (u32, u32) {
    let ratio = f64::min(
        max_size.0 as f64 / size.0 as f64,
        max_size.1 as f64 / size.1 as f64,
    );
    (
        (size.0 as f64 * ratio) as u32,
        (size.1 as f64 * ratio) as u32,
    )
}

/// Pixel dimensions of an image file, read from the header without
/// decoding the full payload.
pub fn dimensions(path: &Path) -> Result<(u32, u32)> {
    image::image_dimensions(path).map_err(|e| ApodError::Image(e.to_string()))
}
