use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use snapframe::{
    Bitmap, Config, EditingSession,
    capture::{CaptureMode, CaptureOrchestrator, CaptureOutcome, CaptureTarget, display_name},
    compose::{StyleParameters, preset_by_name, presets},
    export::{self, ExportFormat, ExportSettings},
};

#[derive(Parser, Debug)]
#[command(name = "snapframe")]
#[command(
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SNAPFRAME_GIT_HASH"), ")"),
    about = "Screenshot capture and framing tool"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture a screenshot and frame it
    Capture {
        /// What to capture
        #[arg(long, short = 'm', value_enum, default_value_t = ModeArg::FullScreen)]
        mode: ModeArg,

        /// Window id for --mode window (see `snapframe windows`)
        #[arg(long, short = 'w', value_name = "ID", value_parser = parse_window_id)]
        window: Option<u64>,

        /// Write to this file instead of the configured export directory
        #[arg(long, short = 'o', value_name = "PATH")]
        output: Option<PathBuf>,

        /// Also copy the result to the clipboard
        #[arg(long, action = ArgAction::SetTrue)]
        copy: bool,

        /// Save the capture as-is, without the frame
        #[arg(long, action = ArgAction::SetTrue)]
        raw: bool,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// List windows available for --mode window
    Windows,

    /// Frame an existing PNG
    Compose {
        /// Source PNG
        input: PathBuf,

        /// Destination file; format follows the extension unless --format is given
        #[arg(long, short = 'o', value_name = "PATH")]
        output: PathBuf,

        /// Pixels per point of the source image
        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// List the built-in gradient presets
    Presets,

    /// Write the example config to ~/.config/snapframe/config.toml
    InitConfig,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    FullScreen,
    Window,
    Selection,
}

impl From<ModeArg> for CaptureMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::FullScreen => CaptureMode::FullScreen,
            ModeArg::Window => CaptureMode::Window,
            ModeArg::Selection => CaptureMode::Selection,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Png => ExportFormat::Png,
            FormatArg::Jpeg => ExportFormat::Jpeg,
        }
    }
}

/// Per-invocation overrides of the configured `[style]`.
#[derive(clap::Args, Debug, Default)]
struct StyleArgs {
    /// Padding around the screenshot in points
    #[arg(long)]
    padding: Option<f64>,

    /// Gradient preset name
    #[arg(long, value_name = "NAME")]
    gradient: Option<String>,

    /// Corner radius of the screenshot in points
    #[arg(long)]
    corner_radius: Option<f64>,

    /// Transparent background instead of the gradient
    #[arg(long, action = ArgAction::SetTrue)]
    no_gradient: bool,

    #[arg(long, action = ArgAction::SetTrue)]
    no_shadow: bool,
}

impl StyleArgs {
    fn apply(&self, mut style: StyleParameters) -> Result<StyleParameters> {
        if let Some(padding) = self.padding {
            style.padding = padding;
        }
        if let Some(radius) = self.corner_radius {
            style.screenshot_corner_radius = radius;
        }
        if let Some(name) = &self.gradient {
            style.gradient =
                preset_by_name(name).ok_or_else(|| anyhow!("Unknown gradient preset '{}'", name))?;
        }
        if self.no_gradient {
            style.show_gradient = false;
        }
        if self.no_shadow {
            style.show_shadow = false;
        }
        Ok(style)
    }
}

fn parse_window_id(value: &str) -> Result<u64, String> {
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid window id '{}': {}", value, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Capture {
            mode,
            window,
            output,
            copy,
            raw,
            style,
        } => {
            let config = Config::load()?;
            run_capture(&config, mode.into(), window, output, copy, raw, &style).await
        }
        Command::Windows => {
            let config = Config::load()?;
            list_windows(&config).await
        }
        Command::Compose {
            input,
            output,
            scale,
            format,
            style,
        } => {
            let config = Config::load()?;
            run_compose(&config, &input, &output, scale, format, &style)
        }
        Command::Presets => {
            for preset in presets() {
                println!("{}", preset.name);
            }
            Ok(())
        }
        Command::InitConfig => {
            let path = Config::create_default_file()?;
            println!("Created {}", path.display());
            Ok(())
        }
    }
}

fn build_orchestrator(config: &Config) -> CaptureOrchestrator {
    CaptureOrchestrator::with_dependencies(config.capture_dependencies(), config.capture.settings())
}

async fn run_capture(
    config: &Config,
    mode: CaptureMode,
    window: Option<u64>,
    output: Option<PathBuf>,
    copy: bool,
    raw: bool,
    style_args: &StyleArgs,
) -> Result<()> {
    if mode == CaptureMode::Window && window.is_none() {
        bail!("--mode window needs --window <ID>; run `snapframe windows` to list them");
    }

    let orchestrator = build_orchestrator(config);
    if !orchestrator.check_permissions().await? {
        let message = orchestrator.snapshot().last_error.unwrap_or_default();
        bail!("{}", message);
    }

    let target = window.map(|id| {
        orchestrator
            .windows()
            .iter()
            .find(|w| w.id == id)
            .map(CaptureTarget::from)
            .unwrap_or(CaptureTarget {
                window_id: id,
                title: String::new(),
                app_name: String::new(),
            })
    });

    let image = match orchestrator.capture(mode, target).await? {
        CaptureOutcome::Captured(image) => image,
        CaptureOutcome::Cancelled => {
            println!("Capture cancelled");
            return Ok(());
        }
        CaptureOutcome::Failed(message) => bail!("{}", message),
        CaptureOutcome::PermissionChecked { granted } => {
            bail!("Permission check interrupted the capture (granted: {})", granted)
        }
    };

    let mut settings = config.export.settings();
    settings.copy_to_clipboard |= copy;
    if let Some(format) = output
        .as_deref()
        .and_then(|p| p.extension())
        .and_then(|ext| ExportFormat::from_extension(&ext.to_string_lossy()))
    {
        settings.format = format;
    }

    let saved = if raw {
        save_raw(&image, output, &settings)?
    } else {
        let style = style_args.apply(config.style.style_parameters())?;
        let session = EditingSession::new(image, style);
        match output {
            Some(path) => {
                let saved = session.save_to(&path, settings.format, settings.jpeg_quality)?;
                if settings.copy_to_clipboard {
                    session.copy_to_clipboard()?;
                }
                saved
            }
            None => session.save(&settings)?,
        }
    };

    println!("{}", saved.display());
    Ok(())
}

fn save_raw(image: &Bitmap, output: Option<PathBuf>, settings: &ExportSettings) -> Result<PathBuf> {
    let bytes = export::encode(image, settings.format, settings.jpeg_quality)?;
    let saved = match output {
        Some(path) => export::write_image(&bytes, &path)?,
        None => export::save_to_directory(&bytes, settings)?,
    };
    if settings.copy_to_clipboard {
        use snapframe::export::ClipboardSink;
        let png = export::encode(image, ExportFormat::Png, 1.0)?;
        export::WaylandClipboard.copy(&png, ExportFormat::Png.mime_type())?;
    }
    Ok(saved)
}

async fn list_windows(config: &Config) -> Result<()> {
    let orchestrator = build_orchestrator(config);
    if !orchestrator.check_permissions().await? {
        let message = orchestrator.snapshot().last_error.unwrap_or_default();
        bail!("{}", message);
    }

    let windows = orchestrator.windows();
    if windows.is_empty() {
        println!("No capturable windows");
    }
    for window in windows.iter() {
        println!(
            "{:#x}\t{}x{}\t{}",
            window.id,
            window.frame.width.round(),
            window.frame.height.round(),
            display_name(window)
        );
    }
    Ok(())
}

fn run_compose(
    config: &Config,
    input: &Path,
    output: &Path,
    scale: f64,
    format: Option<FormatArg>,
    style_args: &StyleArgs,
) -> Result<()> {
    let file =
        File::open(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let source = Bitmap::read_png(&mut BufReader::new(file), scale)
        .with_context(|| format!("Failed to decode {} as PNG", input.display()))?;

    let format = format
        .map(ExportFormat::from)
        .or_else(|| {
            output
                .extension()
                .and_then(|ext| ExportFormat::from_extension(&ext.to_string_lossy()))
        })
        .unwrap_or_default();

    let style = style_args.apply(config.style.style_parameters())?;
    let session = EditingSession::new(Arc::new(source), style);
    let saved = session.save_to(output, format, config.export.jpeg_quality)?;
    println!("{}", saved.display());
    Ok(())
}
