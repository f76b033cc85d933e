use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::{Notify, watch};

use super::{
    dependencies::{AppVisibility, CaptureDependencies, CaptureProvider, SelectionSource},
    orchestrator::CaptureOrchestrator,
    pipeline::{CaptureSettings, resolve_window_scale},
    types::{
        CaptureError, CaptureMode, CaptureOutcome, CapturePhase, CaptureSnapshot, CaptureTarget,
        ContentFilter, DisplayDescriptor, PermissionStatus, PixelFormat, ProviderWindow,
        ShareableContent,
    },
};
use crate::{bitmap::Bitmap, geometry::Rect};

type Events = Arc<Mutex<Vec<&'static str>>>;
type Observer = Arc<Mutex<Option<watch::Receiver<CaptureSnapshot>>>>;

#[derive(Default)]
struct ProviderState {
    content: ShareableContent,
    enumerate_fails: bool,
    capture_error: Option<CaptureError>,
    requests: Vec<(ContentFilter, u32, u32)>,
    capturing_during_request: Vec<bool>,
}

#[derive(Clone)]
struct MockProvider {
    state: Arc<Mutex<ProviderState>>,
    events: Events,
    observer: Observer,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl CaptureProvider for MockProvider {
    async fn enumerate(&self) -> Result<ShareableContent, CaptureError> {
        self.events.lock().unwrap().push("enumerate");
        let state = self.state.lock().unwrap();
        if state.enumerate_fails {
            Err(CaptureError::ProviderFailure("not authorized".into()))
        } else {
            Ok(state.content.clone())
        }
    }

    async fn capture_image(
        &self,
        filter: &ContentFilter,
        pixel_width: u32,
        pixel_height: u32,
        pixel_format: PixelFormat,
        _show_cursor: bool,
    ) -> Result<Bitmap, CaptureError> {
        assert_eq!(pixel_format, PixelFormat::Bgra8Premultiplied);
        self.events.lock().unwrap().push("capture");
        let capturing = self
            .observer
            .lock()
            .unwrap()
            .as_ref()
            .map(|rx| rx.borrow().is_capturing)
            .unwrap_or(false);
        {
            let mut state = self.state.lock().unwrap();
            state
                .requests
                .push((filter.clone(), pixel_width, pixel_height));
            state.capturing_during_request.push(capturing);
        }

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if let Some(err) = self.state.lock().unwrap().capture_error.take() {
            return Err(err);
        }
        Ok(Bitmap::solid(pixel_width, pixel_height, 1.0, [200, 40, 40, 255]).unwrap())
    }
}

#[derive(Clone, Default)]
struct MockVisibility {
    events: Events,
}

impl AppVisibility for MockVisibility {
    fn hide(&self) {
        self.events.lock().unwrap().push("hide");
    }

    fn unhide(&self) {
        self.events.lock().unwrap().push("unhide");
    }
}

#[derive(Default)]
struct MockSelection {
    result: Mutex<Option<Result<Bitmap, CaptureError>>>,
    phases: Mutex<Vec<CapturePhase>>,
    observer: Observer,
}

#[async_trait]
impl SelectionSource for MockSelection {
    async fn select(&self) -> Result<Bitmap, CaptureError> {
        if let Some(rx) = self.observer.lock().unwrap().as_ref() {
            self.phases.lock().unwrap().push(rx.borrow().phase);
        }
        self.result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(CaptureError::Cancelled("escape".into())))
    }
}

fn sample_content() -> ShareableContent {
    let window = |id, app: &str, title: &str, frame| ProviderWindow {
        id,
        title: Some(title.to_string()),
        owning_application: Some(app.to_string()),
        frame,
        on_screen: true,
    };
    ShareableContent {
        displays: vec![
            DisplayDescriptor {
                id: 1,
                name: "DP-1".into(),
                frame: Rect::new(0.0, 0.0, 200.0, 100.0),
                scale_factor: 2.0,
            },
            DisplayDescriptor {
                id: 2,
                name: "HDMI-A-1".into(),
                frame: Rect::new(200.0, 0.0, 300.0, 200.0),
                scale_factor: 1.0,
            },
        ],
        windows: vec![
            window(10, "Zed", "Editor", Rect::new(10.0, 10.0, 150.0, 80.0)),
            window(20, "kitty", "Terminal", Rect::new(250.0, 20.0, 120.0, 60.0)),
            window(30, "SystemUIServer", "Menu Bar", Rect::new(0.0, 0.0, 500.0, 24.0)),
        ],
    }
}

struct Harness {
    orchestrator: CaptureOrchestrator,
    provider: MockProvider,
    selection: Arc<MockSelection>,
    events: Events,
}

impl Harness {
    fn new() -> Self {
        Self::build(None)
    }

    fn gated(gate: Arc<Notify>) -> Self {
        Self::build(Some(gate))
    }

    fn build(gate: Option<Arc<Notify>>) -> Self {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let observer: Observer = Arc::new(Mutex::new(None));
        let provider = MockProvider {
            state: Arc::new(Mutex::new(ProviderState {
                content: sample_content(),
                ..Default::default()
            })),
            events: events.clone(),
            observer: observer.clone(),
            gate,
        };
        let selection = Arc::new(MockSelection {
            observer: observer.clone(),
            ..Default::default()
        });
        let deps = CaptureDependencies {
            provider: Arc::new(provider.clone()),
            visibility: Arc::new(MockVisibility {
                events: events.clone(),
            }),
            selection: selection.clone(),
        };
        let settings = CaptureSettings {
            full_screen_settle: Duration::ZERO,
            ..Default::default()
        };
        let orchestrator = CaptureOrchestrator::with_dependencies(deps, settings);
        *observer.lock().unwrap() = Some(orchestrator.subscribe());
        Self {
            orchestrator,
            provider,
            selection,
            events,
        }
    }

    /// Runs the permission check and forgets the events it produced.
    async fn granted(self) -> Self {
        assert!(self.orchestrator.check_permissions().await.unwrap());
        self.events.lock().unwrap().clear();
        self
    }

    fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    fn requests(&self) -> Vec<(ContentFilter, u32, u32)> {
        self.provider.state.lock().unwrap().requests.clone()
    }

    fn set_content(&self, content: ShareableContent) {
        self.provider.state.lock().unwrap().content = content;
    }
}

fn target(id: u64) -> CaptureTarget {
    CaptureTarget {
        window_id: id,
        title: "t".into(),
        app_name: "a".into(),
    }
}

async fn capture_ok(
    harness: &Harness,
    mode: CaptureMode,
    target: Option<CaptureTarget>,
) -> Arc<Bitmap> {
    match harness.orchestrator.capture(mode, target).await.unwrap() {
        CaptureOutcome::Captured(image) => image,
        other => panic!("expected a captured image, got {:?}", other),
    }
}

#[tokio::test]
async fn test_orchestrator_starts_idle() {
    let harness = Harness::new();
    let snapshot = harness.orchestrator.snapshot();
    assert_eq!(snapshot.phase, CapturePhase::Idle);
    assert!(!snapshot.is_capturing);
    assert!(snapshot.current_image.is_none());
    assert!(snapshot.last_error.is_none());
    assert_eq!(snapshot.permission, PermissionStatus::Unknown);
    assert!(harness.orchestrator.windows().is_empty());
}

#[tokio::test]
async fn test_first_capture_only_checks_permission() {
    let harness = Harness::new();

    let outcome = harness
        .orchestrator
        .capture(CaptureMode::FullScreen, None)
        .await
        .unwrap();
    assert!(matches!(outcome, CaptureOutcome::PermissionChecked { granted: true }));
    assert!(harness.requests().is_empty(), "request must be dropped");
    assert_eq!(harness.events(), vec!["enumerate"]);

    let snapshot = harness.orchestrator.snapshot();
    assert_eq!(snapshot.permission, PermissionStatus::Granted);
    assert!(snapshot.current_image.is_none());
    let ids: Vec<u64> = snapshot.windows.iter().map(|w| w.id).collect();
    assert_eq!(ids, vec![10, 20]);

    capture_ok(&harness, CaptureMode::FullScreen, None).await;
    assert_eq!(harness.requests().len(), 1);
}

#[tokio::test]
async fn test_permission_denied_drops_request() {
    let harness = Harness::new();
    harness.provider.state.lock().unwrap().enumerate_fails = true;

    let outcome = harness
        .orchestrator
        .capture(CaptureMode::Selection, None)
        .await
        .unwrap();
    assert!(matches!(outcome, CaptureOutcome::PermissionChecked { granted: false }));
    assert!(harness.selection.phases.lock().unwrap().is_empty());

    let snapshot = harness.orchestrator.snapshot();
    assert_eq!(snapshot.permission, PermissionStatus::Denied);
    assert_eq!(
        snapshot.last_error.as_deref(),
        Some(CaptureError::PermissionDenied.to_string().as_str())
    );
    assert_eq!(snapshot.phase, CapturePhase::Idle);
}

#[tokio::test]
async fn test_full_screen_hides_then_captures_native_resolution() {
    let harness = Harness::new().granted().await;

    let image = capture_ok(&harness, CaptureMode::FullScreen, None).await;
    assert_eq!((image.width(), image.height()), (400, 200));
    assert_eq!(image.scale(), 2.0);
    assert_eq!(image.logical_size(), (200.0, 100.0));

    assert_eq!(harness.events(), vec!["hide", "enumerate", "capture", "unhide"]);
    match &harness.requests()[0] {
        (ContentFilter::Display(display), 400, 200) => assert_eq!(display.id, 1),
        other => panic!("unexpected request {:?}", other),
    }

    let snapshot = harness.orchestrator.snapshot();
    assert!(Arc::ptr_eq(snapshot.current_image.as_ref().unwrap(), &image));
    assert_eq!(snapshot.phase, CapturePhase::Idle);
    assert!(snapshot.last_error.is_none());
}

#[tokio::test]
async fn test_full_screen_without_display_fails_and_keeps_image() {
    let harness = Harness::new().granted().await;
    let previous = capture_ok(&harness, CaptureMode::FullScreen, None).await;

    harness.set_content(ShareableContent {
        displays: Vec::new(),
        ..sample_content()
    });
    harness.events.lock().unwrap().clear();

    let outcome = harness
        .orchestrator
        .capture(CaptureMode::FullScreen, None)
        .await
        .unwrap();
    assert!(matches!(outcome, CaptureOutcome::Failed(_)));

    let snapshot = harness.orchestrator.snapshot();
    assert_eq!(
        snapshot.last_error.as_deref(),
        Some(CaptureError::NoDisplayFound.to_string().as_str())
    );
    assert!(Arc::ptr_eq(snapshot.current_image.as_ref().unwrap(), &previous));
    assert!(!snapshot.is_capturing);
    // The app is shown again even though the capture failed.
    assert_eq!(harness.events(), vec!["hide", "enumerate", "unhide"]);
}

#[tokio::test]
async fn test_window_capture_requires_target() {
    let harness = Harness::new().granted().await;

    let outcome = harness
        .orchestrator
        .capture(CaptureMode::Window, None)
        .await
        .unwrap();
    match outcome {
        CaptureOutcome::Failed(message) => {
            assert_eq!(message, CaptureError::NoWindowSelected.to_string())
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(harness.events().is_empty(), "window capture never hides the app");
}

#[tokio::test]
async fn test_window_capture_uses_owning_display_scale() {
    let harness = Harness::new().granted().await;

    let retina = capture_ok(&harness, CaptureMode::Window, Some(target(10))).await;
    assert_eq!((retina.width(), retina.height()), (300, 160));
    assert_eq!(retina.scale(), 2.0);

    let external = capture_ok(&harness, CaptureMode::Window, Some(target(20))).await;
    assert_eq!((external.width(), external.height()), (120, 60));
    assert_eq!(external.scale(), 1.0);

    assert!(!harness.events().contains(&"hide"));
    match &harness.requests()[1].0 {
        ContentFilter::Window(window) => assert_eq!(window.id, 20),
        other => panic!("unexpected filter {:?}", other),
    }
}

#[tokio::test]
async fn test_window_scale_falls_back_when_unresolvable() {
    let harness = Harness::new().granted().await;
    let mut content = sample_content();
    content.displays[1].scale_factor = 0.0;
    harness.set_content(content);

    let image = capture_ok(&harness, CaptureMode::Window, Some(target(20))).await;
    assert_eq!((image.width(), image.height()), (240, 120));
    assert_eq!(image.scale(), 2.0);
}

#[tokio::test]
async fn test_full_screen_scale_falls_back_when_unresolvable() {
    let harness = Harness::new().granted().await;
    for bad_scale in [0.0, f64::NAN] {
        let mut content = sample_content();
        content.displays[0].scale_factor = bad_scale;
        harness.set_content(content);

        let image = capture_ok(&harness, CaptureMode::FullScreen, None).await;
        assert_eq!((image.width(), image.height()), (400, 200));
        assert_eq!(image.scale(), 2.0);
    }
    let sizes: Vec<(u32, u32)> = harness.requests().iter().map(|(_, w, h)| (*w, *h)).collect();
    assert_eq!(sizes, vec![(400, 200), (400, 200)]);
}

#[test]
fn test_window_outside_every_display_uses_first() {
    let content = sample_content();
    let far_away = Rect::new(5000.0, 5000.0, 100.0, 100.0);
    assert_eq!(resolve_window_scale(&far_away, &content, 3.0).unwrap(), 2.0);

    let empty = ShareableContent::default();
    assert!(matches!(
        resolve_window_scale(&far_away, &empty, 2.0),
        Err(CaptureError::NoDisplayFound)
    ));
}

#[tokio::test]
async fn test_window_missing_from_enumeration() {
    let harness = Harness::new().granted().await;

    let outcome = harness
        .orchestrator
        .capture(CaptureMode::Window, Some(target(999)))
        .await
        .unwrap();
    assert!(matches!(outcome, CaptureOutcome::Failed(_)));
    assert!(harness.requests().is_empty());
    assert_eq!(
        harness.orchestrator.snapshot().last_error.as_deref(),
        Some(CaptureError::NoWindowSelected.to_string().as_str())
    );
}

#[tokio::test]
async fn test_selection_cancel_is_silent() {
    let harness = Harness::new().granted().await;
    let previous = capture_ok(&harness, CaptureMode::FullScreen, None).await;
    let requests_before = harness.requests().len();

    let outcome = harness
        .orchestrator
        .capture(CaptureMode::Selection, None)
        .await
        .unwrap();
    assert!(matches!(outcome, CaptureOutcome::Cancelled));

    let snapshot = harness.orchestrator.snapshot();
    assert!(snapshot.last_error.is_none());
    assert!(!snapshot.is_capturing);
    assert_eq!(snapshot.phase, CapturePhase::Idle);
    assert!(Arc::ptr_eq(snapshot.current_image.as_ref().unwrap(), &previous));
    assert_eq!(harness.requests().len(), requests_before);
}

#[tokio::test]
async fn test_selection_success_replaces_image() {
    let harness = Harness::new().granted().await;
    *harness.selection.result.lock().unwrap() =
        Some(Ok(Bitmap::solid(64, 32, 1.0, [0, 0, 255, 255]).unwrap()));

    let image = capture_ok(&harness, CaptureMode::Selection, None).await;
    assert_eq!((image.width(), image.height()), (64, 32));
    assert_eq!(
        *harness.selection.phases.lock().unwrap(),
        vec![CapturePhase::AwaitingExternalTool]
    );
    assert!(harness.requests().is_empty(), "selection never uses the provider");
}

#[tokio::test]
async fn test_selection_launch_failure_is_reported() {
    let harness = Harness::new().granted().await;
    *harness.selection.result.lock().unwrap() =
        Some(Err(CaptureError::ToolLaunchFailure("no such file".into())));

    let outcome = harness
        .orchestrator
        .capture(CaptureMode::Selection, None)
        .await
        .unwrap();
    match outcome {
        CaptureOutcome::Failed(message) => assert!(message.contains("no such file")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_capture_rejected() {
    let gate = Arc::new(Notify::new());
    let harness = Harness::gated(gate.clone()).granted().await;
    let mut rx = harness.orchestrator.subscribe();

    let orchestrator = harness.orchestrator.clone();
    let first =
        tokio::spawn(async move { orchestrator.capture(CaptureMode::FullScreen, None).await });
    rx.wait_for(|s| s.is_capturing).await.unwrap();

    let before = harness.orchestrator.snapshot();
    let err = harness
        .orchestrator
        .capture(CaptureMode::Window, Some(target(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, CaptureError::CaptureInProgress));
    assert!(matches!(
        harness.orchestrator.check_permissions().await,
        Err(CaptureError::CaptureInProgress)
    ));
    let after = harness.orchestrator.snapshot();
    assert_eq!(before.revision, after.revision, "rejection must not touch the session");

    gate.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert!(matches!(outcome, CaptureOutcome::Captured(_)));
    assert_eq!(harness.requests().len(), 1);
}

#[tokio::test]
async fn test_is_capturing_true_only_during_request() {
    let harness = Harness::new().granted().await;
    assert!(!harness.orchestrator.snapshot().is_capturing);

    capture_ok(&harness, CaptureMode::FullScreen, None).await;
    capture_ok(&harness, CaptureMode::Window, Some(target(10))).await;

    let seen = harness
        .provider
        .state
        .lock()
        .unwrap()
        .capturing_during_request
        .clone();
    assert_eq!(seen, vec![true, true]);
    assert!(!harness.orchestrator.snapshot().is_capturing);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_snapshots_from_other_threads_are_consistent() {
    use std::sync::atomic::{AtomicBool, Ordering};

    let harness = Harness::new().granted().await;
    let stop = Arc::new(AtomicBool::new(false));
    let reader = {
        let orchestrator = harness.orchestrator.clone();
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            let mut observed = 0usize;
            let mut last_revision = 0;
            while !stop.load(Ordering::Relaxed) {
                let snapshot = orchestrator.snapshot();
                assert_eq!(
                    snapshot.is_capturing,
                    snapshot.phase.is_capturing(),
                    "{:?} published with is_capturing = {}",
                    snapshot.phase,
                    snapshot.is_capturing
                );
                assert!(snapshot.revision >= last_revision);
                last_revision = snapshot.revision;
                observed += 1;
            }
            observed
        })
    };

    for _ in 0..20 {
        capture_ok(&harness, CaptureMode::Window, Some(target(10))).await;
    }
    stop.store(true, Ordering::Relaxed);

    assert!(reader.join().unwrap() > 0);
}

#[tokio::test]
async fn test_provider_failure_reported() {
    let harness = Harness::new().granted().await;
    harness.provider.state.lock().unwrap().capture_error =
        Some(CaptureError::ProviderFailure("stream stopped".into()));

    let outcome = harness
        .orchestrator
        .capture(CaptureMode::FullScreen, None)
        .await
        .unwrap();
    match outcome {
        CaptureOutcome::Failed(message) => assert!(message.contains("stream stopped")),
        other => panic!("expected failure, got {:?}", other),
    }
    let snapshot = harness.orchestrator.snapshot();
    assert!(snapshot.current_image.is_none());
    assert_eq!(snapshot.permission, PermissionStatus::Granted);
}

#[tokio::test]
async fn test_enumerate_failure_during_capture_marks_denied() {
    let harness = Harness::new().granted().await;
    harness.provider.state.lock().unwrap().enumerate_fails = true;

    let outcome = harness
        .orchestrator
        .capture(CaptureMode::FullScreen, None)
        .await
        .unwrap();
    match outcome {
        CaptureOutcome::Failed(message) => {
            assert_eq!(message, CaptureError::PermissionDenied.to_string())
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(
        harness.orchestrator.snapshot().permission,
        PermissionStatus::Denied
    );

    // The next request re-checks permission instead of capturing.
    harness.provider.state.lock().unwrap().enumerate_fails = false;
    let outcome = harness
        .orchestrator
        .capture(CaptureMode::FullScreen, None)
        .await
        .unwrap();
    assert!(matches!(outcome, CaptureOutcome::PermissionChecked { granted: true }));
}

#[tokio::test]
async fn test_refresh_windows_replaces_or_keeps_catalog() {
    let harness = Harness::new().granted().await;
    assert_eq!(harness.orchestrator.windows().len(), 2);

    let mut content = sample_content();
    content.windows.remove(0);
    harness.set_content(content);
    let refreshed = harness.orchestrator.refresh_windows().await.unwrap();
    assert_eq!(refreshed.len(), 1);
    assert_eq!(refreshed[0].id, 20);

    harness.provider.state.lock().unwrap().enumerate_fails = true;
    assert!(harness.orchestrator.refresh_windows().await.is_err());
    assert_eq!(harness.orchestrator.windows().len(), 1);
    let error = harness.orchestrator.snapshot().last_error.unwrap();
    assert!(error.starts_with("Failed to refresh windows"));
}

#[tokio::test]
async fn test_discard_image_and_clear_error() {
    let harness = Harness::new().granted().await;
    assert!(!harness.orchestrator.discard_image());

    capture_ok(&harness, CaptureMode::FullScreen, None).await;
    assert!(harness.orchestrator.current_image().is_some());
    assert!(harness.orchestrator.discard_image());
    assert!(harness.orchestrator.current_image().is_none());

    harness.orchestrator.capture(CaptureMode::Window, None).await.unwrap();
    assert!(harness.orchestrator.snapshot().last_error.is_some());
    harness.orchestrator.clear_error();
    assert!(harness.orchestrator.snapshot().last_error.is_none());
}

#[tokio::test]
async fn test_dropped_capture_returns_to_idle() {
    let gate = Arc::new(Notify::new());
    let harness = Harness::gated(gate).granted().await;

    let result = tokio::time::timeout(
        Duration::from_millis(50),
        harness.orchestrator.capture(CaptureMode::FullScreen, None),
    )
    .await;
    assert!(result.is_err(), "capture should still be blocked");

    let snapshot = harness.orchestrator.snapshot();
    assert_eq!(snapshot.phase, CapturePhase::Idle);
    assert!(!snapshot.is_capturing);
    assert!(snapshot.current_image.is_none());
}

#[tokio::test]
async fn test_spawn_capture_runs_in_background() {
    let harness = Harness::new().granted().await;
    let handle = harness.orchestrator.spawn_capture(
        &tokio::runtime::Handle::current(),
        CaptureMode::Window,
        Some(target(10)),
    );
    let outcome = handle.await.unwrap().unwrap();
    assert!(matches!(outcome, CaptureOutcome::Captured(_)));
    assert!(harness.orchestrator.current_image().is_some());
}

#[tokio::test]
async fn test_subscribers_see_completed_then_idle() {
    let harness = Harness::new().granted().await;
    let mut rx = harness.orchestrator.subscribe();
    let start = rx.borrow_and_update().revision;

    capture_ok(&harness, CaptureMode::FullScreen, None).await;

    assert!(rx.has_changed().unwrap());
    let latest = rx.borrow_and_update().clone();
    assert_eq!(latest.phase, CapturePhase::Idle);
    assert!(latest.current_image.is_some());
    // begin, completed, idle
    assert_eq!(latest.revision, start + 3);
}
