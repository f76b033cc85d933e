//! Editing session: one captured image plus the style being tuned for it.
//!
//! Previews render at whatever scale the viewer wants; copy and save always
//! re-render at [`EXPORT_SCALE`] so the delivered image does not depend on
//! the preview size.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    bitmap::Bitmap,
    compose::{ComposeError, CompositeResult, EXPORT_SCALE, StyleParameters, compose},
    export::{
        ClipboardSink, ExportError, ExportFormat, ExportSettings, WaylandClipboard, encode,
        save_to_directory, write_image,
    },
};

pub struct EditingSession {
    source: Arc<Bitmap>,
    style: StyleParameters,
    clipboard: Arc<dyn ClipboardSink>,
}

impl EditingSession {
    pub fn new(source: Arc<Bitmap>, style: StyleParameters) -> Self {
        Self::with_clipboard(source, style, Arc::new(WaylandClipboard))
    }

    pub fn with_clipboard(
        source: Arc<Bitmap>,
        style: StyleParameters,
        clipboard: Arc<dyn ClipboardSink>,
    ) -> Self {
        Self {
            source,
            style,
            clipboard,
        }
    }

    pub fn source(&self) -> &Arc<Bitmap> {
        &self.source
    }

    pub fn style(&self) -> &StyleParameters {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut StyleParameters {
        &mut self.style
    }

    pub fn set_style(&mut self, style: StyleParameters) {
        self.style = style;
    }

    /// Renders for display at `scale` pixels per point.
    pub fn render(&self, scale: f64) -> Result<CompositeResult, ComposeError> {
        compose(&self.source, &self.style, scale)
    }

    /// Renders the deliverable image.
    pub fn export_image(&self) -> Result<CompositeResult, ComposeError> {
        self.render(EXPORT_SCALE)
    }

    /// Export render encoded as `format`.
    pub fn encoded(&self, format: ExportFormat, jpeg_quality: f32) -> Result<Vec<u8>, ExportError> {
        let result = self.export_image()?;
        encode(&result.bitmap, format, jpeg_quality)
    }

    /// Replaces the clipboard contents with the export render as PNG.
    pub fn copy_to_clipboard(&self) -> Result<(), ExportError> {
        let png = self.encoded(ExportFormat::Png, 1.0)?;
        self.clipboard.copy(&png, ExportFormat::Png.mime_type())
    }

    /// Writes the export render to an explicit path.
    pub fn save_to(
        &self,
        path: &Path,
        format: ExportFormat,
        jpeg_quality: f32,
    ) -> Result<PathBuf, ExportError> {
        let bytes = self.encoded(format, jpeg_quality)?;
        write_image(&bytes, path)
    }

    /// Saves under a timestamped name in the configured directory.
    ///
    /// When the settings ask for it the image is copied as well; a clipboard
    /// failure is logged and does not undo the save.
    pub fn save(&self, settings: &ExportSettings) -> Result<PathBuf, ExportError> {
        let bytes = self.encoded(settings.format, settings.jpeg_quality)?;
        let path = save_to_directory(&bytes, settings)?;

        if settings.copy_to_clipboard
            && let Err(e) = self.copy_to_clipboard()
        {
            log::warn!("Saved {} but clipboard copy failed: {}", path.display(), e);
        }
        Ok(path)
    }
}
