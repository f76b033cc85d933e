use std::fmt;

use image::{ExtendedColorType, codecs::jpeg::JpegEncoder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ExportError;
use crate::bitmap::Bitmap;

/// JPEG quality used when none is configured (0.0 to 1.0).
pub const DEFAULT_JPEG_QUALITY: f32 = 0.92;

/// File formats an image can be exported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    /// Lossy; transparency is flattened onto white.
    Jpeg,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
        }
    }

    /// Guesses the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Png => "PNG",
            ExportFormat::Jpeg => "JPEG",
        })
    }
}

/// Encodes `bitmap` into file bytes.
///
/// `jpeg_quality` is ignored for PNG.
pub fn encode(
    bitmap: &Bitmap,
    format: ExportFormat,
    jpeg_quality: f32,
) -> Result<Vec<u8>, ExportError> {
    let bytes = match format {
        ExportFormat::Png => bitmap
            .to_png_bytes()
            .map_err(|e| ExportError::Encode(e.to_string()))?,
        ExportFormat::Jpeg => encode_jpeg(bitmap, jpeg_quality)?,
    };
    log::debug!(
        "Encoded {}x{} image as {} ({} bytes)",
        bitmap.width(),
        bitmap.height(),
        format,
        bytes.len()
    );
    Ok(bytes)
}

fn encode_jpeg(bitmap: &Bitmap, quality: f32) -> Result<Vec<u8>, ExportError> {
    let rgb = flatten_onto_white(bitmap);
    let quality = (quality.clamp(0.01, 1.0) * 100.0).round() as u8;

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode(
            &rgb,
            bitmap.width(),
            bitmap.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// Composites premultiplied ARGB over opaque white into packed RGB.
fn flatten_onto_white(bitmap: &Bitmap) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(bitmap.width() as usize * bitmap.height() as usize * 3);
    for px in bitmap.data().chunks_exact(4) {
        let word = u32::from_ne_bytes([px[0], px[1], px[2], px[3]]);
        let inverse_alpha = 255 - ((word >> 24) & 0xff);
        for shift in [16, 8, 0] {
            let channel = (word >> shift) & 0xff;
            rgb.push((channel + inverse_alpha).min(255) as u8);
        }
    }
    rgb
}
