use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageEncoder, RgbaImage};

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Frame has zero area ({width}x{height})")]
    ZeroSized { width: u32, height: u32 },

    #[error("Pixel buffer holds {actual} bytes, expected {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Immutable RGBA8 pixel buffer captured from the screen.
///
/// Cloning is cheap: the pixels are shared, never copied.
#[derive(Clone)]
pub struct Frame {
    image: Arc<RgbaImage>,
}

impl Frame {
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::ZeroSized { width, height });
        }
        let expected = width as usize * height as usize * 4;
        let actual = data.len();
        let image = RgbaImage::from_raw(width, height, data)
            .ok_or(FrameError::BufferLength { expected, actual })?;
        Ok(Self {
            image: Arc::new(image),
        })
    }

    pub fn from_image(image: RgbaImage) -> Result<Self, FrameError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(FrameError::ZeroSized {
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(Self {
            image: Arc::new(image),
        })
    }

    /// Frame filled with a single colour
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, FrameError> {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::from_rgba(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Luminance projection
    pub fn luma(&self) -> GrayImage {
        imageops::grayscale(self.image.as_ref())
    }

    /// Rescaled copy. Returns a shared clone when the size already matches.
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        let image = imageops::resize(self.image.as_ref(), width, height, FilterType::Triangle);
        Frame {
            image: Arc::new(image),
        }
    }

    pub fn to_png(&self) -> Result<Vec<u8>, FrameError> {
        let mut buffer = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buffer).write_image(
            self.image.as_raw(),
            self.width(),
            self.height(),
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(buffer)
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
