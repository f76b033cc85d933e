//! Screenshot capture and framing.
//!
//! [`capture`] acquires raw screenshots (full screen, single window, or an
//! interactive selection), [`compose`] frames them on a padded gradient card
//! with rounded corners and a drop shadow, and [`export`] delivers the result
//! to disk or the clipboard.

pub mod bitmap;
pub mod capture;
pub mod compose;
pub mod config;
pub mod editor;
pub mod export;
pub mod geometry;

pub use bitmap::Bitmap;
pub use config::Config;
pub use editor::EditingSession;
