//! Native selection delegate.
//!
//! Rather than drawing our own drag-to-select overlay, selection captures
//! shell out to the platform's interactive screenshot tool, which writes a
//! PNG to a temporary path we hand it. Exit status 0 means an image was
//! written; any other status means the user backed out (Escape), which is
//! reported as a cancellation rather than an error.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    process::Stdio,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Local;
use tokio::process::Command;

use super::{
    dependencies::{AppVisibility, SelectionSource},
    types::CaptureError,
    visibility::hide_and_settle,
};
use crate::bitmap::Bitmap;

/// Argument replaced with the temporary output path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// External tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionToolSettings {
    pub program: String,
    /// Arguments; [`OUTPUT_PLACEHOLDER`] marks where the output path goes.
    /// When absent, the path is appended as the last argument.
    pub args: Vec<String>,
}

impl Default for SelectionToolSettings {
    #[cfg(target_os = "macos")]
    fn default() -> Self {
        // Interactive selection, no camera sound, PNG output.
        Self {
            program: "/usr/sbin/screencapture".to_string(),
            args: ["-s", "-x", "-t", "png", OUTPUT_PLACEHOLDER]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    #[cfg(not(target_os = "macos"))]
    fn default() -> Self {
        // slurp exits non-zero on Escape, which makes grim fail in turn.
        Self {
            program: "sh".to_string(),
            args: [
                "-c",
                "geometry=$(slurp) && grim -g \"$geometry\" \"$1\"",
                "snapframe-select",
                OUTPUT_PLACEHOLDER,
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl SelectionToolSettings {
    /// Arguments with the output path substituted in.
    pub fn args_for(&self, output: &Path) -> Vec<String> {
        let path = output.to_string_lossy();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &path))
            .collect();
        if !self.args.iter().any(|arg| arg.contains(OUTPUT_PLACEHOLDER)) {
            args.push(path.into_owned());
        }
        args
    }
}

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A fresh temp path; the timestamp plus a process-wide counter keeps rapid
/// repeated selections from colliding.
pub fn temp_selection_path() -> PathBuf {
    let stamp = Local::now().format("%Y%m%d-%H%M%S%.6f");
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("snapframe_selection_{stamp}_{sequence}.png"))
}

/// Removes the temp file when dropped. Failures are ignored.
struct TempFile(PathBuf);

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => log::debug!("Removed selection temp file {}", self.0.display()),
            Err(e) => log::debug!("Selection temp file {} not removed: {}", self.0.display(), e),
        }
    }
}

/// Runs the external selection tool and loads the image it writes.
pub struct NativeSelectionDelegate {
    tool: SelectionToolSettings,
    settle: Duration,
    visibility: Arc<dyn AppVisibility>,
}

impl NativeSelectionDelegate {
    pub fn new(
        tool: SelectionToolSettings,
        settle: Duration,
        visibility: Arc<dyn AppVisibility>,
    ) -> Self {
        Self {
            tool,
            settle,
            visibility,
        }
    }
}

#[async_trait]
impl SelectionSource for NativeSelectionDelegate {
    async fn select(&self) -> Result<Bitmap, CaptureError> {
        let output = TempFile(temp_selection_path());
        // Declared after `output` so the app is unhidden before the file goes.
        let _hidden = hide_and_settle(self.visibility.as_ref(), self.settle).await;

        let args = self.tool.args_for(&output.0);
        log::debug!("Launching selection tool: {} {:?}", self.tool.program, args);

        let mut child = Command::new(&self.tool.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                CaptureError::ToolLaunchFailure(format!("{}: {}", self.tool.program, e))
            })?;

        let status = child.wait().await.map_err(|e| {
            CaptureError::ToolLaunchFailure(format!("waiting for {}: {}", self.tool.program, e))
        })?;

        if !status.success() {
            log::info!("Screenshot selection cancelled ({})", status);
            return Err(CaptureError::Cancelled(format!(
                "selection tool exited with {status}"
            )));
        }

        let path = output.0.clone();
        let bitmap = tokio::task::spawn_blocking(move || load_png(&path))
            .await
            .map_err(|e| CaptureError::ImageDecodeFailure(format!("decode task failed: {e}")))??;

        log::info!(
            "Selection captured ({}x{} px)",
            bitmap.width(),
            bitmap.height()
        );
        Ok(bitmap)
    }
}

fn load_png(path: &Path) -> Result<Bitmap, CaptureError> {
    let file = File::open(path)
        .map_err(|e| CaptureError::ImageDecodeFailure(format!("{}: {}", path.display(), e)))?;
    Bitmap::read_png(&mut BufReader::new(file), 1.0)
        .map_err(|e| CaptureError::ImageDecodeFailure(format!("{}: {}", path.display(), e)))
}
