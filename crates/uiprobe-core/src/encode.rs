//! Image encoder registry
//!
//! Captured frames are raw pixel buffers; a registry of encoders turns them
//! into wire formats. Lookup scans registered encoders and takes the first
//! one claiming the format, so hosts can prepend their own implementations
//! ahead of the built-in `image`-based ones.

use crate::capture::{Frame, PixelFormat};
use crate::error::ProbeError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Output formats served by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpg,
}

impl ImageFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpg => "image/jpeg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
        })
    }
}

/// A format string the endpoint does not serve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported image format `{0}`")]
pub struct UnknownFormat(pub String);

impl FromStr for ImageFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "png" => Ok(ImageFormat::Png),
            "jpg" => Ok(ImageFormat::Jpg),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// One encoder capable of some subset of the output formats.
pub trait FrameEncoder: Send + Sync {
    fn can_encode(&self, format: ImageFormat) -> bool;

    /// Encode a frame. `flipped` means the buffer is bottom-up (GL-style
    /// readback) and must be reversed row-wise first.
    fn encode(&self, frame: &Frame, flipped: bool, format: ImageFormat)
    -> Result<Vec<u8>, ProbeError>;
}

/// Ordered collection of encoders; first capable one wins.
pub struct EncoderRegistry {
    encoders: Vec<Box<dyn FrameEncoder>>,
}

impl EncoderRegistry {
    pub fn new() -> Self {
        Self {
            encoders: Vec::new(),
        }
    }

    /// Registry preloaded with the built-in PNG and JPEG encoders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PngFrameEncoder));
        registry.register(Box::new(JpegFrameEncoder));
        registry
    }

    pub fn register(&mut self, encoder: Box<dyn FrameEncoder>) {
        self.encoders.push(encoder);
    }

    /// The first registered encoder claiming `format`.
    pub fn find(&self, format: ImageFormat) -> Option<&dyn FrameEncoder> {
        self.encoders
            .iter()
            .find(|e| e.can_encode(format))
            .map(|e| e.as_ref())
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Row data in top-down order, reversing bottom-up buffers when asked.
fn packed_rows(frame: &Frame, flipped: bool) -> Vec<u8> {
    if !flipped {
        return frame.pixels.clone();
    }
    let stride = frame.width as usize * frame.format.bytes_per_pixel();
    if stride == 0 {
        return frame.pixels.clone();
    }
    let mut out = Vec::with_capacity(frame.pixels.len());
    for row in frame.pixels.chunks(stride).rev() {
        out.extend_from_slice(row);
    }
    out
}

/// PNG via the `image` crate.
pub struct PngFrameEncoder;

impl FrameEncoder for PngFrameEncoder {
    fn can_encode(&self, format: ImageFormat) -> bool {
        format == ImageFormat::Png
    }

    fn encode(
        &self,
        frame: &Frame,
        flipped: bool,
        format: ImageFormat,
    ) -> Result<Vec<u8>, ProbeError> {
        if !self.can_encode(format) {
            return Err(ProbeError::EncoderUnavailable(format));
        }
        let data = packed_rows(frame, flipped);
        let color = match frame.format {
            PixelFormat::Rgb => ExtendedColorType::Rgb8,
            PixelFormat::Rgba => ExtendedColorType::Rgba8,
        };
        let mut out = Vec::new();
        PngEncoder::new(&mut out).write_image(&data, frame.width, frame.height, color)?;
        Ok(out)
    }
}

/// JPEG via the `image` crate. Alpha is dropped; JPEG has no use for it.
pub struct JpegFrameEncoder;

impl FrameEncoder for JpegFrameEncoder {
    fn can_encode(&self, format: ImageFormat) -> bool {
        format == ImageFormat::Jpg
    }

    fn encode(
        &self,
        frame: &Frame,
        flipped: bool,
        format: ImageFormat,
    ) -> Result<Vec<u8>, ProbeError> {
        if !self.can_encode(format) {
            return Err(ProbeError::EncoderUnavailable(format));
        }
        let data = packed_rows(frame, flipped);
        let rgb: Vec<u8> = match frame.format {
            PixelFormat::Rgb => data,
            PixelFormat::Rgba => data
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
        };
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, 90).write_image(
            &rgb,
            frame.width,
            frame.height,
            ExtendedColorType::Rgb8,
        )?;
        Ok(out)
    }
}
