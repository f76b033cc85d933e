use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    bitmap::Bitmap,
    capture::{
        selection::{NativeSelectionDelegate, SelectionToolSettings},
        sources::hyprland::HyprlandProvider,
        types::{CaptureError, ContentFilter, PixelFormat, ShareableContent},
    },
};

/// The operating system's screen capture service.
///
/// Both calls are asynchronous request/response round-trips. A failing
/// `enumerate` means screen recording is not permitted.
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    async fn enumerate(&self) -> Result<ShareableContent, CaptureError>;

    async fn capture_image(
        &self,
        filter: &ContentFilter,
        pixel_width: u32,
        pixel_height: u32,
        pixel_format: PixelFormat,
        show_cursor: bool,
    ) -> Result<Bitmap, CaptureError>;
}

/// Hides and re-shows the host application's windows.
pub trait AppVisibility: Send + Sync {
    fn hide(&self);
    fn unhide(&self);
}

/// Interactive rectangle selection producing a bitmap.
///
/// A user abort is reported as [`CaptureError::Cancelled`].
#[async_trait]
pub trait SelectionSource: Send + Sync {
    async fn select(&self) -> Result<Bitmap, CaptureError>;
}

/// Host without windows of its own (command line use): hiding is a no-op.
pub struct NoWindows;

impl AppVisibility for NoWindows {
    fn hide(&self) {
        log::debug!("No host windows to hide");
    }

    fn unhide(&self) {}
}

/// Bundle of dependencies used by the capture orchestrator. Each component can be mocked in tests.
#[derive(Clone)]
pub struct CaptureDependencies {
    pub provider: Arc<dyn CaptureProvider>,
    pub visibility: Arc<dyn AppVisibility>,
    pub selection: Arc<dyn SelectionSource>,
}

impl CaptureDependencies {
    /// Platform defaults: Hyprland provider and the configured selection tool.
    pub fn platform(tool: SelectionToolSettings, selection_settle: Duration) -> Self {
        let visibility: Arc<dyn AppVisibility> = Arc::new(NoWindows);
        Self {
            provider: Arc::new(HyprlandProvider::new()),
            selection: Arc::new(NativeSelectionDelegate::new(
                tool,
                selection_settle,
                Arc::clone(&visibility),
            )),
            visibility,
        }
    }
}

impl Default for CaptureDependencies {
    fn default() -> Self {
        Self::platform(
            SelectionToolSettings::default(),
            crate::capture::DEFAULT_SELECTION_SETTLE,
        )
    }
}
