//! Hide, settle, capture, unhide.
//!
//! There is no signal telling us the window server has finished repainting
//! after the app hides, so the capture paths hide, wait a fixed settle delay,
//! and only then ask for pixels. The guard returned by [`hide_and_settle`]
//! re-shows the app when dropped, on every exit path.

use std::time::Duration;

use super::dependencies::AppVisibility;

/// Keeps the host app hidden until dropped.
pub struct HiddenApp<'a> {
    visibility: &'a dyn AppVisibility,
}

impl Drop for HiddenApp<'_> {
    fn drop(&mut self) {
        log::debug!("Unhiding application");
        self.visibility.unhide();
    }
}

/// Phase one: hide the app and wait for the desktop to settle.
pub async fn hide_and_settle(visibility: &dyn AppVisibility, settle: Duration) -> HiddenApp<'_> {
    log::debug!("Hiding application, settling for {:?}", settle);
    visibility.hide();
    let guard = HiddenApp { visibility };
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }
    guard
}
