//! Clipboard integration for copying finished images.

use std::{
    io::Write,
    process::{Command, Stdio},
};

use wl_clipboard_rs::copy::{MimeType, Options, ServeRequests, Source};

use super::ExportError;

/// Destination for copied image bytes. Each copy replaces prior contents.
pub trait ClipboardSink: Send + Sync {
    fn copy(&self, data: &[u8], mime_type: &str) -> Result<(), ExportError>;
}

/// The Wayland clipboard: `wl-copy` first, then wl-clipboard-rs.
#[derive(Debug, Default, Clone, Copy)]
pub struct WaylandClipboard;

impl ClipboardSink for WaylandClipboard {
    fn copy(&self, data: &[u8], mime_type: &str) -> Result<(), ExportError> {
        log::debug!(
            "Copying {} bytes of {} to clipboard",
            data.len(),
            mime_type
        );

        match copy_via_command(data, mime_type) {
            Ok(()) => {
                log::info!("Copied image to clipboard via wl-copy");
                Ok(())
            }
            Err(cmd_err) => {
                log::warn!(
                    "wl-copy command path failed ({}). Falling back to wl-clipboard-rs",
                    cmd_err
                );
                copy_via_library(data, mime_type).map_err(|lib_err| {
                    ExportError::Clipboard(format!(
                        "wl-copy failed: {} ; wl-clipboard-rs failed: {}",
                        cmd_err, lib_err
                    ))
                })?;
                log::info!("Copied image to clipboard via wl-clipboard-rs");
                Ok(())
            }
        }
    }
}

fn copy_via_library(data: &[u8], mime_type: &str) -> Result<(), ExportError> {
    let mut opts = Options::new();
    // Serve one paste then exit.
    opts.serve_requests(ServeRequests::Only(1));

    opts.copy(
        Source::Bytes(data.into()),
        MimeType::Specific(mime_type.to_string()),
    )
    .map_err(|e| ExportError::Clipboard(format!("wl-clipboard-rs error: {}", e)))
}

fn copy_via_command(data: &[u8], mime_type: &str) -> Result<(), ExportError> {
    let mut child = Command::new("wl-copy")
        .arg("--type")
        .arg(mime_type)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            ExportError::Clipboard(format!("Failed to spawn wl-copy (is it installed?): {}", e))
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(data).map_err(|e| {
            ExportError::Clipboard(format!("Failed to write to wl-copy stdin: {}", e))
        })?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| ExportError::Clipboard(format!("Failed to wait for wl-copy: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExportError::Clipboard(format!(
            "wl-copy failed: {}",
            stderr.trim()
        )));
    }
    Ok(())
}
