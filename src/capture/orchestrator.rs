use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::{sync::watch, task::JoinHandle};

use crate::{
    bitmap::Bitmap,
    capture::{
        catalog::filter_windows,
        dependencies::CaptureDependencies,
        pipeline::{CaptureSettings, acquire},
        types::{
            CaptureError, CaptureMode, CaptureOutcome, CapturePhase, CaptureSnapshot,
            CaptureTarget, PermissionStatus, WindowDescriptor,
        },
    },
};

/// Owns the capture session and runs one capture at a time.
///
/// Every state change is published as a [`CaptureSnapshot`] on a watch
/// channel, so a UI can observe `is_capturing`, the current image and the
/// last error without polling. Clones share the same session.
#[derive(Clone)]
pub struct CaptureOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    dependencies: CaptureDependencies,
    settings: CaptureSettings,
    session: Mutex<CaptureSnapshot>,
    publisher: watch::Sender<CaptureSnapshot>,
}

/// Which branch a guarded request took.
enum Begun {
    PermissionCheck,
    Capture,
}

/// Resets the phase to idle if the owning future is dropped mid-flight.
struct InFlight<'a> {
    inner: &'a Inner,
    finished: bool,
}

impl InFlight<'_> {
    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("Capture abandoned before completion; returning to idle");
            self.inner.update(|s| s.phase = CapturePhase::Idle);
        }
    }
}

impl CaptureOrchestrator {
    /// Orchestrator on the platform capture stack with default settings.
    pub fn new() -> Self {
        Self::with_dependencies(CaptureDependencies::default(), CaptureSettings::default())
    }

    /// Orchestrator with custom dependencies (useful for testing).
    pub fn with_dependencies(dependencies: CaptureDependencies, settings: CaptureSettings) -> Self {
        let initial = CaptureSnapshot::default();
        let (publisher, _) = watch::channel(initial.clone());
        Self {
            inner: Arc::new(Inner {
                dependencies,
                settings,
                session: Mutex::new(initial),
                publisher,
            }),
        }
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.inner.settings
    }

    /// Captures in `mode`, replacing the current image on success.
    ///
    /// Returns `Err(CaptureInProgress)` without touching the session when a
    /// capture or permission check is already running. Every other failure is
    /// reported through [`CaptureOutcome::Failed`] and `last_error`.
    ///
    /// While screen recording permission is still unknown the request is spent
    /// on checking it and then dropped; the caller has to ask again.
    pub async fn capture(
        &self,
        mode: CaptureMode,
        target: Option<CaptureTarget>,
    ) -> Result<CaptureOutcome, CaptureError> {
        let begun = self.inner.begin(mode)?;
        let guard = InFlight {
            inner: &self.inner,
            finished: false,
        };

        let outcome = match begun {
            Begun::PermissionCheck => {
                log::info!("Checking screen recording permission before capturing");
                let granted = self.inner.run_permission_check().await;
                CaptureOutcome::PermissionChecked { granted }
            }
            Begun::Capture => {
                let result = acquire(
                    mode,
                    target.as_ref(),
                    &self.inner.dependencies,
                    &self.inner.settings,
                )
                .await;
                self.inner.finish_capture(mode, result)
            }
        };

        guard.finish();
        Ok(outcome)
    }

    /// Non-blocking variant of [`capture`](Self::capture) for event loops.
    pub fn spawn_capture(
        &self,
        runtime: &tokio::runtime::Handle,
        mode: CaptureMode,
        target: Option<CaptureTarget>,
    ) -> JoinHandle<Result<CaptureOutcome, CaptureError>> {
        let orchestrator = self.clone();
        runtime.spawn(async move { orchestrator.capture(mode, target).await })
    }

    /// Queries the provider to learn whether capture is allowed.
    ///
    /// On success the window catalog is refreshed as well.
    pub async fn check_permissions(&self) -> Result<bool, CaptureError> {
        self.inner.begin_permission_check()?;
        let guard = InFlight {
            inner: &self.inner,
            finished: false,
        };
        let granted = self.inner.run_permission_check().await;
        guard.finish();
        Ok(granted)
    }

    /// Re-enumerates windows and replaces the catalog.
    ///
    /// On failure the previous catalog is kept and the error is recorded.
    pub async fn refresh_windows(&self) -> Result<Arc<Vec<WindowDescriptor>>, CaptureError> {
        match self.inner.dependencies.provider.enumerate().await {
            Ok(content) => {
                let windows = Arc::new(filter_windows(&content.windows));
                log::debug!("Window catalog refreshed: {} windows", windows.len());
                self.inner.update(|s| {
                    s.windows = Arc::clone(&windows);
                    s.permission = PermissionStatus::Granted;
                });
                Ok(windows)
            }
            Err(e) => {
                log::warn!("Failed to refresh windows: {}", e);
                let message = format!("Failed to refresh windows: {}", e);
                self.inner.update(|s| s.last_error = Some(message));
                Err(e)
            }
        }
    }

    /// The latest published state.
    pub fn snapshot(&self) -> CaptureSnapshot {
        self.inner.lock().clone()
    }

    /// Receiver that sees every subsequent transition.
    pub fn subscribe(&self) -> watch::Receiver<CaptureSnapshot> {
        self.inner.publisher.subscribe()
    }

    pub fn windows(&self) -> Arc<Vec<WindowDescriptor>> {
        Arc::clone(&self.inner.lock().windows)
    }

    pub fn current_image(&self) -> Option<Arc<Bitmap>> {
        self.inner.lock().current_image.clone()
    }

    /// Drops the current image. Refused (returns `false`) while capturing.
    pub fn discard_image(&self) -> bool {
        let mut discarded = false;
        self.inner.update(|s| {
            if !s.phase.is_capturing() && s.current_image.is_some() {
                s.current_image = None;
                discarded = true;
            }
        });
        discarded
    }

    pub fn clear_error(&self) {
        self.inner.update(|s| s.last_error = None);
    }
}

impl Default for CaptureOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, CaptureSnapshot> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `change` and publishes the result while still holding the lock,
    /// so subscribers observe transitions in order.
    fn update(&self, change: impl FnOnce(&mut CaptureSnapshot)) {
        let mut session = self.lock();
        change(&mut session);
        self.publish(&mut session);
    }

    /// Derives `is_capturing`, bumps the revision and publishes. Callers hold the lock.
    fn publish(&self, session: &mut MutexGuard<'_, CaptureSnapshot>) {
        session.is_capturing = session.phase.is_capturing();
        session.revision += 1;
        self.publisher.send_replace((**session).clone());
    }

    fn begin(&self, mode: CaptureMode) -> Result<Begun, CaptureError> {
        let mut session = self.lock();
        if session.phase.is_busy() {
            log::warn!("Ignoring {} capture: {:?} in progress", mode, session.phase);
            return Err(CaptureError::CaptureInProgress);
        }

        let begun = if session.permission == PermissionStatus::Granted {
            session.phase = match mode {
                CaptureMode::Selection => CapturePhase::AwaitingExternalTool,
                CaptureMode::FullScreen | CaptureMode::Window => CapturePhase::Capturing,
            };
            session.last_error = None;
            Begun::Capture
        } else {
            session.phase = CapturePhase::PermissionCheck;
            Begun::PermissionCheck
        };
        self.publish(&mut session);
        Ok(begun)
    }

    fn begin_permission_check(&self) -> Result<(), CaptureError> {
        let mut session = self.lock();
        if session.phase.is_busy() {
            return Err(CaptureError::CaptureInProgress);
        }
        session.phase = CapturePhase::PermissionCheck;
        self.publish(&mut session);
        Ok(())
    }

    async fn run_permission_check(&self) -> bool {
        match self.dependencies.provider.enumerate().await {
            Ok(content) => {
                let windows = Arc::new(filter_windows(&content.windows));
                log::info!(
                    "Screen recording permitted: {} displays, {} capturable windows",
                    content.displays.len(),
                    windows.len()
                );
                self.update(|s| {
                    s.permission = PermissionStatus::Granted;
                    s.windows = windows;
                    s.phase = CapturePhase::Idle;
                });
                true
            }
            Err(e) => {
                log::warn!("Screen recording permission check failed: {}", e);
                let message = CaptureError::PermissionDenied.to_string();
                self.update(|s| {
                    s.permission = PermissionStatus::Denied;
                    s.last_error = Some(message);
                    s.phase = CapturePhase::Idle;
                });
                false
            }
        }
    }

    fn finish_capture(
        &self,
        mode: CaptureMode,
        result: Result<Bitmap, CaptureError>,
    ) -> CaptureOutcome {
        match result {
            Ok(bitmap) => {
                log::info!(
                    "{} capture complete ({}x{} px @{}x)",
                    mode,
                    bitmap.width(),
                    bitmap.height(),
                    bitmap.scale()
                );
                let image = Arc::new(bitmap);
                self.update(|s| {
                    s.phase = CapturePhase::Completed;
                    s.current_image = Some(Arc::clone(&image));
                    s.last_error = None;
                });
                self.update(|s| s.phase = CapturePhase::Idle);
                CaptureOutcome::Captured(image)
            }
            Err(e) if e.is_cancellation() => {
                log::info!("{} capture cancelled: {}", mode, e);
                self.update(|s| s.phase = CapturePhase::Idle);
                CaptureOutcome::Cancelled
            }
            Err(e) => {
                let message = e.to_string();
                log::error!("{} capture failed: {}", mode, message);
                let denied = matches!(e, CaptureError::PermissionDenied);
                self.update(|s| {
                    s.phase = CapturePhase::Failed;
                    s.last_error = Some(message.clone());
                    if denied {
                        s.permission = PermissionStatus::Denied;
                    }
                });
                self.update(|s| s.phase = CapturePhase::Idle);
                CaptureOutcome::Failed(message)
            }
        }
    }
}
