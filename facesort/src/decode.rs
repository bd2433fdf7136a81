use std::fmt;
use std::path::{Path, PathBuf};

use image::DynamicImage;

/// A decoded image together with the file it came from.
pub struct FaceImage {
    pub path: PathBuf,
    pub pixels: DynamicImage,
}

impl fmt::Debug for FaceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceImage")
            .field("path", &self.path)
            .field("width", &self.pixels.width())
            .field("height", &self.pixels.height())
            .finish()
    }
}

/// Turns an image file into pixels.
pub trait ImageDecoder {
    /// Decodes the file at `path`. `Err` carries a human-readable reason;
    /// callers record the path as unreadable and move on.
    fn decode(&self, path: &Path) -> Result<FaceImage, String>;
}

/// [`ImageDecoder`] backed by the `image` crate.
///
/// Reads the whole file first, so any path the OS accepts works regardless
/// of length or script.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, path: &Path) -> Result<FaceImage, String> {
        let data = std::fs::read(path).map_err(|e| e.to_string())?;
        if data.is_empty() {
            return Err("empty file".into());
        }
        let pixels = image::load_from_memory(&data).map_err(|e| e.to_string())?;
        Ok(FaceImage {
            path: path.to_path_buf(),
            pixels,
        })
    }
}
