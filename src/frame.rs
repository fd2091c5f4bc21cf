//! Frame buffers
//!
//! A `Frame` is the pipeline's unit of image data: a row-major grid of RGBA
//! pixels with `f32` channels in `[0, 1]`. The video copy, every texture mask,
//! every filter output and the feedback slot all use it.

use image::RgbaImage;

/// One RGBA pixel, channels in `[0, 1]`
pub type Pixel = [f32; 4];

pub const BLACK: Pixel = [0.0, 0.0, 0.0, 1.0];
pub const WHITE: Pixel = [1.0, 1.0, 1.0, 1.0];
pub const TRANSPARENT: Pixel = [0.0, 0.0, 0.0, 0.0];

#[derive(Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Frame {
    /// Create a frame filled with one pixel value
    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
        Self {
            width,
            height,
            pixels: vec![pixel; (width as usize) * (height as usize)],
        }
    }

    /// Create a transparent black frame
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TRANSPARENT)
    }

    /// Build a frame from a per-pixel function
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Pixel) -> Self {
        let mut pixels = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self { width, height, pixels }
    }

    pub(crate) fn from_pixels(width: u32, height: u32, pixels: Vec<Pixel>) -> Self {
        debug_assert_eq!(pixels.len(), (width as usize) * (height as usize));
        Self { width, height, pixels }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Reallocate to a new size, clearing contents
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![TRANSPARENT; (width as usize) * (height as usize)];
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Pixel at `(x, y)`; coordinates are clamped to the frame edges
    pub fn get(&self, x: u32, y: u32) -> Pixel {
        if self.pixels.is_empty() {
            return TRANSPARENT;
        }
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.pixels[self.index(x, y)]
    }

    /// Pixel at signed coordinates, clamped to the frame edges
    pub fn get_clamped(&self, x: i64, y: i64) -> Pixel {
        let x = x.clamp(0, self.width as i64 - 1).max(0) as u32;
        let y = y.clamp(0, self.height as i64 - 1).max(0) as u32;
        self.get(x, y)
    }

    /// Write a pixel; out-of-bounds writes are ignored
    pub fn put(&mut self, x: i64, y: i64, pixel: Pixel) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = self.index(x as u32, y as u32);
        self.pixels[idx] = pixel;
    }

    pub fn fill(&mut self, pixel: Pixel) {
        self.pixels.iter_mut().for_each(|p| *p = pixel);
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }

    /// Raw bytes of the pixel data (exact, for comparisons and hashing)
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Copy another frame's contents; sizes must match
    pub fn copy_from(&mut self, other: &Frame) -> bool {
        if self.dimensions() != other.dimensions() {
            return false;
        }
        self.pixels.copy_from_slice(&other.pixels);
        true
    }

    /// Convert from an 8-bit RGBA image
    pub fn from_rgba8(image: &RgbaImage) -> Self {
        let pixels = image
            .pixels()
            .map(|p| {
                [
                    p[0] as f32 / 255.0,
                    p[1] as f32 / 255.0,
                    p[2] as f32 / 255.0,
                    p[3] as f32 / 255.0,
                ]
            })
            .collect();
        Self::from_pixels(image.width(), image.height(), pixels)
    }

    /// Convert to an 8-bit RGBA image
    pub fn to_rgba8(&self) -> RgbaImage {
        let data: Vec<u8> = self
            .pixels
            .iter()
            .flat_map(|p| p.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect();
        RgbaImage::from_raw(self.width, self.height, data)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}

/// Perceptual luminance of a pixel (Rec. 601 weights)
pub fn luminance(p: &Pixel) -> f32 {
    0.299 * p[0] + 0.587 * p[1] + 0.114 * p[2]
}
