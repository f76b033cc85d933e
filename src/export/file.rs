//! Saving exported images to disk.

use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use chrono::{
    Local,
    format::{Item, StrftimeItems},
};

use super::{DEFAULT_JPEG_QUALITY, ExportError, ExportFormat};

/// Where and how finished images are saved.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    /// Directory images are saved into.
    pub directory: PathBuf,
    /// Filename template (chrono format specifiers, no extension).
    pub filename_template: String,
    pub format: ExportFormat,
    /// JPEG quality in 0.0..=1.0.
    pub jpeg_quality: f32,
    /// Also put the image on the clipboard after saving.
    pub copy_to_clipboard: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            directory: dirs::picture_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("Screenshots"),
            filename_template: "Screenshot-%Y-%m-%d-%H%M%S".to_string(),
            format: ExportFormat::Png,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            copy_to_clipboard: false,
        }
    }
}

/// True when every specifier in `template` is one chrono understands.
pub fn is_valid_template(template: &str) -> bool {
    !StrftimeItems::new(template).any(|item| matches!(item, Item::Error))
}

/// Filename from the template and the current local time.
pub fn generate_filename(template: &str, format: ExportFormat) -> Result<String, ExportError> {
    if !is_valid_template(template) {
        return Err(ExportError::FilenameTemplate(template.to_string()));
    }
    let mut stem = String::new();
    write!(stem, "{}", Local::now().format(template))
        .map_err(|_| ExportError::FilenameTemplate(template.to_string()))?;
    Ok(format!("{}.{}", stem, format.extension()))
}

fn ensure_directory_exists(directory: &Path) -> Result<PathBuf, ExportError> {
    if !directory.exists() {
        log::info!("Creating export directory: {}", directory.display());
        fs::create_dir_all(directory).map_err(|source| ExportError::Write {
            path: directory.to_path_buf(),
            source,
        })?;
    }

    Ok(directory
        .canonicalize()
        .unwrap_or_else(|_| directory.to_path_buf()))
}

/// Appends `-1`, `-2`, ... to the stem until the path is free.
fn unique_path(directory: &Path, filename: &str) -> PathBuf {
    let candidate = directory.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = filename.rsplit_once('.').unwrap_or((filename, ""));
    (1..)
        .map(|n| {
            if ext.is_empty() {
                directory.join(format!("{stem}-{n}"))
            } else {
                directory.join(format!("{stem}-{n}.{ext}"))
            }
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Writes encoded bytes to `path`, readable by the owner only on unix.
pub fn write_image(bytes: &[u8], path: &Path) -> Result<PathBuf, ExportError> {
    let write_err = |source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_directory_exists(parent)?;
    }

    log::info!("Saving image to: {} ({} bytes)", path.display(), bytes.len());
    fs::write(path, bytes).map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, Permissions::from_mode(0o600)).map_err(write_err)?;
    }

    Ok(path.to_path_buf())
}

/// Saves into the configured directory under a timestamped name.
pub fn save_to_directory(bytes: &[u8], settings: &ExportSettings) -> Result<PathBuf, ExportError> {
    let directory = ensure_directory_exists(&settings.directory)?;
    let filename = generate_filename(&settings.filename_template, settings.format)?;
    let path = unique_path(&directory, &filename);
    let saved = write_image(bytes, &path)?;
    log::info!("Image saved successfully: {}", saved.display());
    Ok(saved)
}

/// Expand tilde (~) in path strings.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}
