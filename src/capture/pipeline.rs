//! Per-mode acquisition paths.
//!
//! Full screen hides the app first, window capture does not, and selection is
//! handed to the selection delegate without touching the provider at all.

use std::time::Duration;

use crate::{
    bitmap::Bitmap,
    capture::{
        dependencies::{CaptureDependencies, CaptureProvider},
        types::{
            CaptureError, CaptureMode, CaptureTarget, ContentFilter, DisplayDescriptor,
            PixelFormat, ShareableContent,
        },
        visibility::hide_and_settle,
    },
    geometry::Rect,
};

/// Settle delay before a full screen capture.
pub const DEFAULT_FULL_SCREEN_SETTLE: Duration = Duration::from_millis(800);
/// Settle delay before the selection tool launches.
pub const DEFAULT_SELECTION_SETTLE: Duration = Duration::from_millis(500);
/// Scale assumed when a window's display reports no usable backing scale.
pub const DEFAULT_WINDOW_SCALE: f64 = 2.0;

/// Tunables for the provider-backed capture paths.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    pub full_screen_settle: Duration,
    pub default_window_scale: f64,
    pub show_cursor: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            full_screen_settle: DEFAULT_FULL_SCREEN_SETTLE,
            default_window_scale: DEFAULT_WINDOW_SCALE,
            show_cursor: true,
        }
    }
}

pub(crate) async fn acquire(
    mode: CaptureMode,
    target: Option<&CaptureTarget>,
    dependencies: &CaptureDependencies,
    settings: &CaptureSettings,
) -> Result<Bitmap, CaptureError> {
    log::info!("Starting capture: {}", mode);
    match mode {
        CaptureMode::FullScreen => capture_full_screen(dependencies, settings).await,
        CaptureMode::Window => capture_window(dependencies, settings, target).await,
        CaptureMode::Selection => dependencies.selection.select().await,
    }
}

async fn capture_full_screen(
    dependencies: &CaptureDependencies,
    settings: &CaptureSettings,
) -> Result<Bitmap, CaptureError> {
    let _hidden =
        hide_and_settle(dependencies.visibility.as_ref(), settings.full_screen_settle).await;

    let content = enumerate(dependencies.provider.as_ref()).await?;
    let display = content
        .displays
        .into_iter()
        .next()
        .ok_or(CaptureError::NoDisplayFound)?;

    let scale = display.scale_or(settings.default_window_scale);
    if scale != display.scale_factor {
        log::debug!(
            "Display {} has no usable scale, assuming {}",
            display.name,
            scale
        );
    }
    let (pixel_width, pixel_height) = display.pixel_size_at(scale);
    log::debug!(
        "Full screen capture of {} at {}x{} px",
        display.name,
        pixel_width,
        pixel_height
    );

    let bitmap = request_image(
        dependencies.provider.as_ref(),
        &ContentFilter::Display(display),
        (pixel_width, pixel_height),
        settings.show_cursor,
    )
    .await?;
    Ok(bitmap.with_scale(scale))
}

async fn capture_window(
    dependencies: &CaptureDependencies,
    settings: &CaptureSettings,
    target: Option<&CaptureTarget>,
) -> Result<Bitmap, CaptureError> {
    let target = target.ok_or(CaptureError::NoWindowSelected)?;
    let content = enumerate(dependencies.provider.as_ref()).await?;

    let Some(window) = content
        .windows
        .iter()
        .find(|w| w.id == target.window_id)
        .cloned()
    else {
        log::warn!(
            "Window {} ({}) is no longer available",
            target.window_id,
            target.title
        );
        return Err(CaptureError::NoWindowSelected);
    };

    let scale = resolve_window_scale(&window.frame, &content, settings.default_window_scale)?;
    let pixel_width = (window.frame.width * scale).round().max(1.0) as u32;
    let pixel_height = (window.frame.height * scale).round().max(1.0) as u32;
    log::debug!(
        "Window capture of '{}' at scale {} ({}x{} px)",
        window.title.as_deref().unwrap_or_default(),
        scale,
        pixel_width,
        pixel_height
    );

    let bitmap = request_image(
        dependencies.provider.as_ref(),
        &ContentFilter::Window(window),
        (pixel_width, pixel_height),
        settings.show_cursor,
    )
    .await?;
    Ok(bitmap.with_scale(scale))
}

/// Backing scale of the display showing `frame`.
///
/// The owning display is the first one the frame overlaps, else the first
/// display. A display without a usable scale yields `fallback`.
pub(crate) fn resolve_window_scale(
    frame: &Rect,
    content: &ShareableContent,
    fallback: f64,
) -> Result<f64, CaptureError> {
    let display: &DisplayDescriptor = content
        .displays
        .iter()
        .find(|d| d.frame.intersects(frame))
        .or_else(|| content.displays.first())
        .ok_or(CaptureError::NoDisplayFound)?;

    let scale = display.scale_or(fallback);
    if scale != display.scale_factor {
        log::debug!(
            "Display {} has no usable scale, assuming {}",
            display.name,
            fallback
        );
    }
    Ok(scale)
}

async fn enumerate(provider: &dyn CaptureProvider) -> Result<ShareableContent, CaptureError> {
    provider.enumerate().await.map_err(|e| {
        log::warn!("Shareable content query failed: {}", e);
        CaptureError::PermissionDenied
    })
}

async fn request_image(
    provider: &dyn CaptureProvider,
    filter: &ContentFilter,
    (pixel_width, pixel_height): (u32, u32),
    show_cursor: bool,
) -> Result<Bitmap, CaptureError> {
    provider
        .capture_image(
            filter,
            pixel_width,
            pixel_height,
            PixelFormat::Bgra8Premultiplied,
            show_cursor,
        )
        .await
        .map_err(|e| match e {
            CaptureError::ProviderFailure(_) => e,
            other => CaptureError::ProviderFailure(other.to_string()),
        })
}
