// Screenshot functionality
//
// Expands the indexed framebuffer through the palette into RGB and writes
// a timestamped PNG.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::gpu::{PALETTE_BYTES, SCREEN_HEIGHT, SCREEN_PIXELS, SCREEN_WIDTH};

/// Errors that can occur while saving a screenshot.
#[derive(Debug)]
pub enum ScreenshotError {
    /// I/O error
    Io(io::Error),

    /// PNG encoding error
    PngEncoding(png::EncodingError),
}

impl std::fmt::Display for ScreenshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreenshotError::Io(e) => write!(f, "I/O error: {}", e),
            ScreenshotError::PngEncoding(e) => write!(f, "PNG encoding error: {}", e),
        }
    }
}

impl std::error::Error for ScreenshotError {}

impl From<io::Error> for ScreenshotError {
    fn from(e: io::Error) -> Self {
        ScreenshotError::Io(e)
    }
}

impl From<png::EncodingError> for ScreenshotError {
    fn from(e: png::EncodingError) -> Self {
        ScreenshotError::PngEncoding(e)
    }
}

/// Save the current frame as a PNG.
///
/// Returns the path of the written file.
pub fn save_screenshot(
    framebuffer: &[u8; SCREEN_PIXELS],
    palette: &[u8; PALETTE_BYTES],
    directory: &Path,
) -> Result<PathBuf, ScreenshotError> {
    fs::create_dir_all(directory)?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let file_path = directory.join(format!("screenshot_{}.png", timestamp));

    let mut rgb_data = Vec::with_capacity(SCREEN_PIXELS * 3);
    for &index in framebuffer.iter() {
        let base = index as usize * 3;
        rgb_data.extend_from_slice(&palette[base..base + 3]);
    }

    let file = fs::File::create(&file_path)?;
    let writer = io::BufWriter::new(file);

    let mut encoder = png::Encoder::new(writer, SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&rgb_data)?;

    Ok(file_path)
}
