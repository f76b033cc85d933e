//! Owned raster image shared by the capture and compositing code.
//!
//! Pixels are stored in cairo's `ARgb32` layout: one native-endian `u32` per
//! pixel holding premultiplied `A R G B`, which is the same byte order as a
//! `32BGRA` buffer on little-endian machines. Rows are tightly packed
//! (`stride == width * 4`), so a [`Bitmap`] can be handed to cairo without
//! repacking and moved freely between threads.

use std::io::{Read, Write};

use cairo::{Context, Format, ImageSurface};
use thiserror::Error;

/// Errors raised while converting between bitmaps, cairo surfaces and PNG bytes.
#[derive(Debug, Error)]
pub enum BitmapError {
    #[error("Invalid bitmap dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Pixel buffer has {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("Cairo error: {0}")]
    Cairo(#[from] cairo::Error),

    #[error("Surface data is still borrowed: {0}")]
    Borrow(#[from] cairo::BorrowError),

    #[error("PNG I/O error: {0}")]
    Png(#[from] cairo::IoError),
}

/// A premultiplied ARGB32 raster with a pixel density.
#[derive(Clone, PartialEq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    /// Physical pixels per logical point.
    scale: f64,
    data: Vec<u8>,
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("scale", &self.scale)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Bitmap {
    /// Wraps an existing premultiplied ARGB32 buffer.
    pub fn from_argb32(
        width: u32,
        height: u32,
        scale: f64,
        data: Vec<u8>,
    ) -> Result<Self, BitmapError> {
        if width == 0 || height == 0 || width > i32::MAX as u32 / 4 || height > i32::MAX as u32 {
            return Err(BitmapError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(BitmapError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            scale: sanitize_scale(scale),
            data,
        })
    }

    /// Builds a bitmap from straight (non-premultiplied) RGBA bytes.
    pub fn from_rgba(
        width: u32,
        height: u32,
        scale: f64,
        rgba: &[u8],
    ) -> Result<Self, BitmapError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(BitmapError::BufferSize {
                expected,
                actual: rgba.len(),
            });
        }
        let mut data = Vec::with_capacity(expected);
        for px in rgba.chunks_exact(4) {
            let a = px[3] as u32;
            let r = premultiply(px[0], a);
            let g = premultiply(px[1], a);
            let b = premultiply(px[2], a);
            let word = (a << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32;
            data.extend_from_slice(&word.to_ne_bytes());
        }
        Self::from_argb32(width, height, scale, data)
    }

    /// A bitmap filled with a single straight RGBA color.
    pub fn solid(
        width: u32,
        height: u32,
        scale: f64,
        rgba: [u8; 4],
    ) -> Result<Self, BitmapError> {
        let pixels = rgba.repeat(width as usize * height as usize);
        Self::from_rgba(width, height, scale, &pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Size in logical points (pixels divided by scale).
    pub fn logical_size(&self) -> (f64, f64) {
        (
            self.width as f64 / self.scale,
            self.height as f64 / self.scale,
        )
    }

    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// Raw premultiplied ARGB32 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the same pixels tagged with a different density.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = sanitize_scale(scale);
        self
    }

    /// Straight RGBA color of one pixel, or `None` outside the bitmap.
    pub fn rgba_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride() + x as usize * 4;
        let word = u32::from_ne_bytes([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]);
        let a = (word >> 24) & 0xff;
        let r = (word >> 16) & 0xff;
        let g = (word >> 8) & 0xff;
        let b = word & 0xff;
        Some([
            unpremultiply(r, a),
            unpremultiply(g, a),
            unpremultiply(b, a),
            a as u8,
        ])
    }

    /// Copies the pixels into a fresh cairo image surface.
    pub fn to_surface(&self) -> Result<ImageSurface, BitmapError> {
        let surface = ImageSurface::create_for_data(
            self.data.clone(),
            Format::ARgb32,
            self.width as i32,
            self.height as i32,
            self.stride() as i32,
        )?;
        Ok(surface)
    }

    /// Copies a cairo surface into a bitmap, converting non-ARGB32 formats.
    pub fn from_surface(surface: ImageSurface, scale: f64) -> Result<Self, BitmapError> {
        let width = surface.width();
        let height = surface.height();
        if width <= 0 || height <= 0 {
            return Err(BitmapError::InvalidDimensions {
                width: width.max(0) as u32,
                height: height.max(0) as u32,
            });
        }

        let mut surface = if surface.format() == Format::ARgb32 {
            surface
        } else {
            let converted = ImageSurface::create(Format::ARgb32, width, height)?;
            {
                let ctx = Context::new(&converted)?;
                ctx.set_source_surface(&surface, 0.0, 0.0)?;
                ctx.paint()?;
            }
            converted
        };
        surface.flush();

        let stride = surface.stride() as usize;
        let row_bytes = width as usize * 4;
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        {
            let src = surface.data()?;
            for row in 0..height as usize {
                let start = row * stride;
                data.extend_from_slice(&src[start..start + row_bytes]);
            }
        }

        Self::from_argb32(width as u32, height as u32, scale, data)
    }

    /// Resamples to exactly `width` x `height` pixels, keeping the logical size.
    pub fn resized(&self, width: u32, height: u32) -> Result<Self, BitmapError> {
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }
        if width == 0 || height == 0 {
            return Err(BitmapError::InvalidDimensions { width, height });
        }
        let source = self.to_surface()?;
        let target = ImageSurface::create(Format::ARgb32, width as i32, height as i32)?;
        {
            let ctx = Context::new(&target)?;
            ctx.scale(
                width as f64 / self.width as f64,
                height as f64 / self.height as f64,
            );
            ctx.set_source_surface(&source, 0.0, 0.0)?;
            ctx.source().set_filter(cairo::Filter::Good);
            ctx.paint()?;
        }
        let scale = self.scale * width as f64 / self.width as f64;
        Self::from_surface(target, scale)
    }

    /// Decodes PNG bytes from a reader.
    pub fn read_png<R: Read>(reader: &mut R, scale: f64) -> Result<Self, BitmapError> {
        let surface = ImageSurface::create_from_png(reader)?;
        Self::from_surface(surface, scale)
    }

    /// Encodes the bitmap as PNG into a writer.
    pub fn write_png<W: Write>(&self, writer: &mut W) -> Result<(), BitmapError> {
        let surface = self.to_surface()?;
        surface.write_to_png(writer)?;
        Ok(())
    }

    /// Encodes the bitmap as an in-memory PNG.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, BitmapError> {
        let mut buffer = Vec::new();
        self.write_png(&mut buffer)?;
        Ok(buffer)
    }
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

fn premultiply(channel: u8, alpha: u32) -> u8 {
    ((channel as u32 * alpha + 127) / 255) as u8
}

fn unpremultiply(channel: u32, alpha: u32) -> u8 {
    if alpha == 0 {
        0
    } else {
        ((channel * 255 + alpha / 2) / alpha).min(255) as u8
    }
}
