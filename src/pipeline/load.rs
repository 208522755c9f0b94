//! Input resolution and image decoding.
//!
//! The existence/readability check runs before anything else in the pipeline
//! — in particular before any provider is constructed — so a typo'd path is
//! reported immediately and never costs a network call. The image format is
//! deliberately NOT pre-validated: decoding is attempted with format guessing
//! from the file content, and whatever the image library raises for an
//! unsupported or corrupt file surfaces as [`ReceiptError::DecodeFailed`].

use crate::error::ReceiptError;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that the input path exists and is readable.
///
/// Returns the path as a `PathBuf` so callers own it for the rest of the run.
pub fn resolve_input(path_str: &str) -> Result<PathBuf, ReceiptError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(ReceiptError::FileNotFound { path });
    }

    // Check read permission by attempting to open
    match std::fs::File::open(&path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ReceiptError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ReceiptError::FileNotFound { path });
        }
    }

    debug!("Resolved receipt image: {}", path.display());
    Ok(path)
}

/// Decode the receipt image into memory.
///
/// The format is guessed from the file content rather than the extension, so
/// a `.jpg` that is really a PNG still decodes. The decoded bitmap is owned
/// by the pipeline run and dropped as soon as it has been encoded for the
/// model.
pub fn load_image(path: &Path) -> Result<DynamicImage, ReceiptError> {
    let reader = image::ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| ReceiptError::DecodeFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let img = reader.decode().map_err(|e| ReceiptError::DecodeFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    debug!(
        "Decoded {}x{} image from {}",
        img.width(),
        img.height(),
        path.display()
    );
    Ok(img)
}
