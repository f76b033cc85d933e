//! Delivering finished images: encoding, saving to disk, and the clipboard.

pub mod clipboard;
pub mod encode;
pub mod file;

use std::path::PathBuf;

use thiserror::Error;

use crate::{capture::CaptureError, compose::ComposeError};

pub use clipboard::{ClipboardSink, WaylandClipboard};
pub use encode::{DEFAULT_JPEG_QUALITY, ExportFormat, encode};
pub use file::{
    ExportSettings, expand_tilde, generate_filename, is_valid_template, save_to_directory,
    write_image,
};

/// Errors that can occur while exporting an image.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Could not render the final image: {0}")]
    Render(#[from] ComposeError),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid filename template '{0}'")]
    FilenameTemplate(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),
}

impl From<ExportError> for CaptureError {
    fn from(err: ExportError) -> Self {
        CaptureError::ExportWriteFailure(err.to_string())
    }
}
