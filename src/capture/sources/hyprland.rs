use std::{
    collections::HashSet,
    process::{Command, Stdio},
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::task;

use crate::{
    bitmap::Bitmap,
    capture::{
        dependencies::CaptureProvider,
        types::{
            CaptureError, ContentFilter, DisplayDescriptor, PixelFormat, ProviderWindow,
            ShareableContent,
        },
    },
    geometry::Rect,
};

/// Screen capture on Hyprland: `hyprctl` for displays and windows, `grim` for pixels.
#[derive(Debug, Default)]
pub struct HyprlandProvider;

impl HyprlandProvider {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Deserialize)]
struct HyprMonitor {
    id: i64,
    name: String,
    /// Physical pixels.
    width: f64,
    height: f64,
    /// Layout position in logical points.
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default = "unit_scale")]
    scale: f64,
    #[serde(rename = "activeWorkspace")]
    active_workspace: Option<HyprWorkspaceRef>,
}

#[derive(Debug, Deserialize)]
struct HyprWorkspaceRef {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct HyprClient {
    address: String,
    #[serde(default)]
    mapped: bool,
    #[serde(default)]
    hidden: bool,
    at: [f64; 2],
    size: [f64; 2],
    workspace: Option<HyprWorkspaceRef>,
    #[serde(default)]
    class: String,
    #[serde(default)]
    title: String,
}

fn unit_scale() -> f64 {
    1.0
}

#[async_trait]
impl CaptureProvider for HyprlandProvider {
    async fn enumerate(&self) -> Result<ShareableContent, CaptureError> {
        task::spawn_blocking(|| -> Result<ShareableContent, CaptureError> {
            let monitors: Vec<HyprMonitor> = hyprctl_json("monitors")?;
            let clients: Vec<HyprClient> = hyprctl_json("clients")?;
            Ok(shareable_content(monitors, clients))
        })
        .await
        .map_err(|e| CaptureError::ProviderFailure(format!("hyprctl task failed to join: {}", e)))?
    }

    async fn capture_image(
        &self,
        filter: &ContentFilter,
        pixel_width: u32,
        pixel_height: u32,
        pixel_format: PixelFormat,
        show_cursor: bool,
    ) -> Result<Bitmap, CaptureError> {
        log::debug!(
            "grim capture {:?} at {}x{} px ({:?}, cursor={})",
            filter,
            pixel_width,
            pixel_height,
            pixel_format,
            show_cursor
        );

        let (args, scale) = grim_args(filter, pixel_width, show_cursor);
        let png = task::spawn_blocking(move || run_grim(&args))
            .await
            .map_err(|e| CaptureError::ProviderFailure(format!("grim task failed to join: {}", e)))??;

        let bitmap = Bitmap::read_png(&mut png.as_slice(), scale)
            .map_err(|e| CaptureError::ProviderFailure(format!("grim output unreadable: {}", e)))?;

        if bitmap.width() != pixel_width || bitmap.height() != pixel_height {
            log::debug!(
                "Resampling {}x{} grim output to requested {}x{}",
                bitmap.width(),
                bitmap.height(),
                pixel_width,
                pixel_height
            );
            return bitmap
                .resized(pixel_width, pixel_height)
                .map_err(|e| CaptureError::ProviderFailure(format!("resample failed: {}", e)));
        }
        Ok(bitmap)
    }
}

fn shareable_content(monitors: Vec<HyprMonitor>, clients: Vec<HyprClient>) -> ShareableContent {
    let visible_workspaces: HashSet<i64> = monitors
        .iter()
        .filter_map(|m| m.active_workspace.as_ref().map(|w| w.id))
        .collect();

    let displays = monitors
        .into_iter()
        .map(|m| {
            let scale = if m.scale > 0.0 { m.scale } else { 1.0 };
            DisplayDescriptor {
                id: m.id.max(0) as u64,
                name: m.name,
                frame: Rect::new(m.x, m.y, m.width / scale, m.height / scale),
                scale_factor: scale,
            }
        })
        .collect();

    let windows = clients
        .into_iter()
        .map(|c| {
            let on_visible_workspace = c
                .workspace
                .as_ref()
                .is_some_and(|w| visible_workspaces.contains(&w.id));
            ProviderWindow {
                id: parse_address(&c.address),
                title: Some(c.title),
                owning_application: Some(c.class).filter(|class| !class.is_empty()),
                frame: Rect::new(c.at[0], c.at[1], c.size[0], c.size[1]),
                on_screen: c.mapped && !c.hidden && on_visible_workspace,
            }
        })
        .collect();

    ShareableContent { displays, windows }
}

/// Hyprland window addresses look like `0x55d3c1a2b3c0`.
fn parse_address(address: &str) -> u64 {
    let digits = address.trim_start_matches("0x");
    u64::from_str_radix(digits, 16).unwrap_or_else(|_| {
        log::warn!("Unparseable Hyprland window address '{}'", address);
        0
    })
}

/// Arguments for grim plus the pixels-per-point the result will have.
fn grim_args(filter: &ContentFilter, pixel_width: u32, show_cursor: bool) -> (Vec<String>, f64) {
    let mut args = Vec::new();
    if show_cursor {
        args.push("-c".to_string());
    }
    let scale = match filter {
        ContentFilter::Display(display) => {
            args.push("-o".to_string());
            args.push(display.name.clone());
            display.scale_factor
        }
        ContentFilter::Window(window) => {
            let frame = window.frame;
            let scale = if frame.width > 0.0 {
                pixel_width as f64 / frame.width
            } else {
                1.0
            };
            args.push("-g".to_string());
            args.push(format!(
                "{},{} {}x{}",
                frame.x.round() as i32,
                frame.y.round() as i32,
                frame.width.round() as u32,
                frame.height.round() as u32
            ));
            args.push("-s".to_string());
            args.push(format!("{scale}"));
            scale
        }
    };
    args.push("-".to_string());
    (args, scale)
}

fn hyprctl_json<T: serde::de::DeserializeOwned>(what: &str) -> Result<T, CaptureError> {
    let output = Command::new("hyprctl")
        .args([what, "-j"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| CaptureError::ProviderFailure(format!("Failed to run hyprctl {}: {}", what, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CaptureError::ProviderFailure(format!(
            "hyprctl {} failed: {}",
            what,
            stderr.trim()
        )));
    }

    serde_json::from_slice(&output.stdout).map_err(|e| {
        CaptureError::ProviderFailure(format!("Failed to parse hyprctl {} output: {}", what, e))
    })
}

fn run_grim(args: &[String]) -> Result<Vec<u8>, CaptureError> {
    let output = Command::new("grim")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| CaptureError::ProviderFailure(format!("Failed to run grim: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CaptureError::ProviderFailure(format!(
            "grim failed: {}",
            stderr.trim()
        )));
    }

    if output.stdout.is_empty() {
        return Err(CaptureError::ProviderFailure(
            "grim returned empty screenshot".into(),
        ));
    }

    Ok(output.stdout)
}
