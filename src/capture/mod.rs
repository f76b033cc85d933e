//! Screenshot acquisition for snapframe.
//!
//! This module provides:
//! - Full screen capture of the first display
//! - Single window capture at the owning display's backing scale
//! - Rectangle selection through the platform's interactive screenshot tool
//! - The filtered window catalog offered as window capture targets

pub mod catalog;
pub mod dependencies;
pub mod selection;
pub mod sources;
pub mod types;

mod orchestrator;
mod pipeline;
mod visibility;
#[cfg(test)]
mod tests;

pub use catalog::{display_name, filter_windows};
pub use dependencies::{
    AppVisibility, CaptureDependencies, CaptureProvider, NoWindows, SelectionSource,
};
pub use orchestrator::CaptureOrchestrator;
pub use pipeline::{
    CaptureSettings, DEFAULT_FULL_SCREEN_SETTLE, DEFAULT_SELECTION_SETTLE, DEFAULT_WINDOW_SCALE,
};
pub use selection::{NativeSelectionDelegate, SelectionToolSettings};
pub use types::{
    CaptureError, CaptureMode, CaptureOutcome, CapturePhase, CaptureSnapshot, CaptureTarget,
    ContentFilter, DisplayDescriptor, PermissionStatus, PixelFormat, ProviderWindow,
    ShareableContent, WindowDescriptor,
};
pub use visibility::{HiddenApp, hide_and_settle};
