//! Image precondition checks, run before any model call

use crate::error::{Result, SafetyVisionError};

/// Sniff the MIME type from magic bytes
pub fn detect_image_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"BM") {
        Some("image/bmp")
    } else {
        None
    }
}

/// Reject empty, over-size or non-image input; returns the detected MIME type
pub fn validate_image(bytes: &[u8], max_bytes: usize) -> Result<&'static str> {
    if bytes.is_empty() {
        return Err(SafetyVisionError::InvalidInput("image is empty".to_string()));
    }
    if bytes.len() > max_bytes {
        return Err(SafetyVisionError::InvalidInput(format!(
            "image too large: {} bytes (limit {})",
            bytes.len(),
            max_bytes
        )));
    }
    detect_image_mime(bytes).ok_or_else(|| {
        SafetyVisionError::InvalidInput(
            "unsupported file type, expected PNG, JPEG, GIF, WebP or BMP".to_string(),
        )
    })
}
