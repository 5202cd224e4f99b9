//! PNG screenshots of the rendered frame.
//!
//! A [`Framebuffer`] holds tightly packed RGB rows plus the corner its row 0
//! comes from. PNG files store the visual top row first, so the writer walks
//! a bottom-left-origin read from its last row to its first. Rows are
//! streamed straight out of the framebuffer; no reordered copy is made.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Channels per pixel in a framebuffer read.
pub const RGB_CHANNELS: usize = 3;

/// Errors raised while writing a screenshot. None of them stop the viewer.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode '{}': {source}", path.display())]
    Encoding {
        path: PathBuf,
        #[source]
        source: png::EncodingError,
    },
    #[error("framebuffer {width}x{height} needs {expected} bytes of RGB data, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("surface format {0:?} cannot be read back")]
    UnsupportedFormat(wgpu::TextureFormat),
    #[error("surface does not allow copies; screenshots are unavailable")]
    ReadbackUnsupported,
    #[error("failed to map readback buffer: {0}")]
    Map(String),
}

/// Which visual corner row 0 of a pixel buffer belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowOrigin {
    /// Row 0 is the visual bottom, as classic GL pixel reads deliver it.
    BottomLeft,
    /// Row 0 is the visual top, as wgpu texture copies deliver it.
    TopLeft,
}

/// RGB8 pixels read back from the colour target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    origin: RowOrigin,
    pixels: Vec<u8>,
}

impl Framebuffer {
    pub fn new(
        width: u32,
        height: u32,
        origin: RowOrigin,
        pixels: Vec<u8>,
    ) -> Result<Self, ScreenshotError> {
        let expected = width as usize * height as usize * RGB_CHANNELS;
        if pixels.len() != expected {
            return Err(ScreenshotError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            origin,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn origin(&self) -> RowOrigin {
        self.origin
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Rows from the visual top down, borrowed from the buffer.
    pub fn rows_top_down(&self) -> impl Iterator<Item = &[u8]> {
        let stride = self.width as usize * RGB_CHANNELS;
        let height = self.height as usize;
        let bottom_up = self.origin == RowOrigin::BottomLeft;

        (0..height).map(move |visual_row| {
            let row = if bottom_up {
                height - 1 - visual_row
            } else {
                visual_row
            };
            &self.pixels[row * stride..(row + 1) * stride]
        })
    }
}

/// File name for a capture taken at `unix_seconds`.
///
/// Two captures within the same second share a name and the later one wins.
pub fn screenshot_file_name(unix_seconds: i64) -> String {
    format!("screenshot_{unix_seconds}.png")
}

/// Writes `framebuffer` as an 8-bit RGB PNG with the visual top row first.
pub fn write_png(path: &Path, framebuffer: &Framebuffer) -> Result<(), ScreenshotError> {
    let io_error = |source| ScreenshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    let encoding_error = |source| ScreenshotError::Encoding {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_error)?;
    let mut encoder = png::Encoder::new(
        BufWriter::new(file),
        framebuffer.width(),
        framebuffer.height(),
    );
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let mut stream = encoder
        .write_header()
        .and_then(|writer| writer.into_stream_writer())
        .map_err(encoding_error)?;
    for row in framebuffer.rows_top_down() {
        stream.write_all(row).map_err(io_error)?;
    }
    stream.finish().map_err(encoding_error)
}

/// Writes `framebuffer` to `dir/screenshot_<unix seconds>.png` and returns the path.
pub fn capture(framebuffer: &Framebuffer, dir: &Path) -> Result<PathBuf, ScreenshotError> {
    let path = dir.join(screenshot_file_name(chrono::Utc::now().timestamp()));
    write_png(&path, framebuffer)?;
    Ok(path)
}
