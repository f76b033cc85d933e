//! Window catalog: the curated list of windows offered for window capture.
//!
//! The platform reports every surface it knows about, including menu bars,
//! docks, wallpaper layers and tiny helper windows. [`filter_windows`] keeps
//! only real application windows and orders them deterministically. It is a
//! pure function of its input; every refresh replaces the previous catalog.

use super::types::{ProviderWindow, WindowDescriptor};

/// Titles (matched case-insensitively as substrings) that belong to system UI.
const SYSTEM_TITLES: &[&str] = &[
    "Menubar",
    "Menu Bar",
    "Dock",
    "Desktop",
    "Wallpaper",
    "Control Center",
    "Notification Center",
    "Spotlight",
    "Mission Control",
    "Window Server",
    "CoreGraphics",
];

/// Owning processes whose windows are never offered.
const SYSTEM_APPS: &[&str] = &[
    "WindowServer",
    "Dock",
    "ControlCenter",
    "NotificationCenter",
    "SystemUIServer",
    "Spotlight",
    "Wallpaper",
];

const MIN_WIDTH: f64 = 100.0;
const MIN_HEIGHT: f64 = 50.0;

/// Title prefix used by status-item and other synthetic surfaces.
const SYNTHETIC_PREFIX: &str = "Item-";
/// Title fragments marking offscreen or helper surfaces.
const SYNTHETIC_MARKERS: &[&str] = &["Offscreen", "Hidden", "Utility"];

/// Filters and sorts the raw window list.
pub fn filter_windows(windows: &[ProviderWindow]) -> Vec<WindowDescriptor> {
    let mut curated: Vec<WindowDescriptor> = windows.iter().filter_map(curate).collect();
    curated.sort_by(|a, b| {
        a.app_name
            .cmp(&b.app_name)
            .then_with(|| a.title.cmp(&b.title))
    });
    log::debug!(
        "Window catalog: kept {} of {} windows",
        curated.len(),
        windows.len()
    );
    curated
}

fn curate(window: &ProviderWindow) -> Option<WindowDescriptor> {
    if !window.on_screen {
        return None;
    }
    let title = window.title.as_deref().filter(|t| !t.is_empty())?;
    let app_name = window.owning_application.as_deref()?;

    let lowered = title.to_lowercase();
    if SYSTEM_TITLES
        .iter()
        .any(|system| lowered.contains(&system.to_lowercase()))
    {
        return None;
    }
    if SYSTEM_APPS.contains(&app_name) {
        return None;
    }
    if window.frame.width < MIN_WIDTH || window.frame.height < MIN_HEIGHT {
        return None;
    }
    if title.starts_with(SYNTHETIC_PREFIX)
        || SYNTHETIC_MARKERS.iter().any(|marker| title.contains(marker))
    {
        return None;
    }

    Some(WindowDescriptor {
        id: window.id,
        title: title.to_string(),
        app_name: app_name.to_string(),
        frame: window.frame,
        on_screen: window.on_screen,
    })
}

/// Human-friendly label for a window picker.
///
/// Shows just the app when the title repeats it, just the title when the
/// title already mentions the app, and `"<title> - <app>"` otherwise.
pub fn display_name(window: &WindowDescriptor) -> String {
    if window.title.is_empty() {
        return "Unknown Window".to_string();
    }
    if window.title == window.app_name {
        return window.app_name.clone();
    }
    if window.title.contains(&window.app_name) {
        return window.title.clone();
    }
    format!("{} - {}", window.title, window.app_name)
}
