//! Data types for screenshot capture functionality.

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::{bitmap::Bitmap, geometry::Rect};

/// Type of screenshot capture to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureMode {
    /// Capture the entire (first) display.
    FullScreen,
    /// Capture one specific application window.
    Window,
    /// Capture a rectangle the user drags out with the native selection tool.
    Selection,
}

impl CaptureMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            CaptureMode::FullScreen => "Full Screen",
            CaptureMode::Window => "Window",
            CaptureMode::Selection => "Selection",
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A window chosen as capture subject. Identity is the opaque id; the names
/// are carried for display only.
#[derive(Debug, Clone)]
pub struct CaptureTarget {
    pub window_id: u64,
    pub title: String,
    pub app_name: String,
}

impl PartialEq for CaptureTarget {
    fn eq(&self, other: &Self) -> bool {
        self.window_id == other.window_id
    }
}

impl Eq for CaptureTarget {}

impl From<&WindowDescriptor> for CaptureTarget {
    fn from(window: &WindowDescriptor) -> Self {
        Self {
            window_id: window.id,
            title: window.title.clone(),
            app_name: window.app_name.clone(),
        }
    }
}

/// A curated, read-only window snapshot as exposed to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowDescriptor {
    pub id: u64,
    pub title: String,
    pub app_name: String,
    /// On-screen bounds in points.
    pub frame: Rect,
    pub on_screen: bool,
}

/// A window exactly as the platform reports it, before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderWindow {
    pub id: u64,
    pub title: Option<String>,
    pub owning_application: Option<String>,
    pub frame: Rect,
    pub on_screen: bool,
}

/// A physical display.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayDescriptor {
    pub id: u64,
    pub name: String,
    /// Bounds in points within the global desktop space.
    pub frame: Rect,
    /// Backing scale factor (pixels per point).
    pub scale_factor: f64,
}

impl DisplayDescriptor {
    /// Full native resolution in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        self.pixel_size_at(self.scale_factor)
    }

    /// Size in pixels at `scale`, never smaller than 1x1.
    pub fn pixel_size_at(&self, scale: f64) -> (u32, u32) {
        (
            (self.frame.width * scale).round().max(1.0) as u32,
            (self.frame.height * scale).round().max(1.0) as u32,
        )
    }

    /// The backing scale, or `fallback` when it is zero, negative or not finite.
    pub fn scale_or(&self, fallback: f64) -> f64 {
        if self.scale_factor.is_finite() && self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            fallback
        }
    }
}

/// Everything the platform will let us capture right now.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShareableContent {
    pub displays: Vec<DisplayDescriptor>,
    pub windows: Vec<ProviderWindow>,
}

/// What a capture request should record.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentFilter {
    Display(DisplayDescriptor),
    /// A single window, independent of what overlaps it.
    Window(ProviderWindow),
}

/// Pixel layout requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32-bit BGRA, premultiplied alpha.
    Bgra8Premultiplied,
}

/// Whether screen recording is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Unknown,
    Granted,
    Denied,
}

/// Where the orchestrator's state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    PermissionCheck,
    Capturing,
    AwaitingExternalTool,
    Completed,
    Failed,
}

impl CapturePhase {
    /// A capture is in flight in these phases.
    pub fn is_capturing(&self) -> bool {
        matches!(self, CapturePhase::Capturing | CapturePhase::AwaitingExternalTool)
    }

    /// Phases that hold the single-capture guard.
    pub fn is_busy(&self) -> bool {
        self.is_capturing() || *self == CapturePhase::PermissionCheck
    }
}

/// Immutable view of the capture session, published after every transition.
#[derive(Debug, Clone)]
pub struct CaptureSnapshot {
    pub phase: CapturePhase,
    pub is_capturing: bool,
    pub last_error: Option<String>,
    pub current_image: Option<Arc<Bitmap>>,
    pub permission: PermissionStatus,
    pub windows: Arc<Vec<WindowDescriptor>>,
    /// Incremented on every published transition.
    pub revision: u64,
}

impl Default for CaptureSnapshot {
    fn default() -> Self {
        Self {
            phase: CapturePhase::Idle,
            is_capturing: false,
            last_error: None,
            current_image: None,
            permission: PermissionStatus::Unknown,
            windows: Arc::new(Vec::new()),
            revision: 0,
        }
    }
}

/// How one `capture` call resolved.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// A new image became the current image.
    Captured(Arc<Bitmap>),
    /// The user dismissed the selection tool. Not an error.
    Cancelled,
    /// Permission was unknown; the request was spent checking it and dropped.
    PermissionChecked { granted: bool },
    /// The capture failed; the message is also in `last_error`.
    Failed(String),
}

/// Errors that can occur during screenshot capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(
        "Screen recording permission required. Grant access to screen capture and try again"
    )]
    PermissionDenied,

    #[error("No display found to capture")]
    NoDisplayFound,

    #[error("No window selected for capture")]
    NoWindowSelected,

    #[error("Screen capture failed: {0}")]
    ProviderFailure(String),

    #[error("Failed to start screenshot selection: {0}")]
    ToolLaunchFailure(String),

    #[error("Failed to load captured screenshot: {0}")]
    ImageDecodeFailure(String),

    #[error("Failed to save the image: {0}")]
    ExportWriteFailure(String),

    #[error("Capture cancelled: {0}")]
    Cancelled(String),

    #[error("A capture is already in progress")]
    CaptureInProgress,
}

impl CaptureError {
    /// Cancellation is a normal outcome and never reaches `last_error`.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, CaptureError::Cancelled(_))
    }
}
