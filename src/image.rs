//! Image manipulation.
//!
//! This module provides:
//!
//! - The [`Image`] type, an owned RGBA image.
//! - A handful of `draw_*` functions to quickly visualize landmarks.
//! - [`Rect`], an integer-valued rectangle describing part of an image.
//!
//! Unlike a general-purpose image library, everything here runs on the CPU
//! and only supports the operations the recognition loop needs: decoding
//! camera frames, loading overlay images, nearest-neighbor letterboxing for
//! network input, and replacing a pixel block with an overlay.

pub mod draw;

use std::{fmt, path::Path};

use ::image::{ImageBuffer, Rgba, RgbaImage};
use embedded_graphics::{pixelcolor::raw::RawU32, prelude::PixelColor};

use crate::resolution::Resolution;

#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    fn from_path(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            Some("png") => Ok(Self::Png),
            _ => Err(anyhow::anyhow!(
                "invalid image path '{}' (must have one of the supported extensions)",
                path.display()
            )),
        }
    }
}

/// An 8-bit sRGB image with alpha channel.
#[derive(Clone)]
pub struct Image {
    // Internal representation is meant to be compatible with wgpu's texture formats for easy GPU
    // uploading.
    pub(crate) buf: RgbaImage,
}

impl Image {
    /// Creates an empty image of a specified size.
    ///
    /// The image will start out black and fully transparent.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: ImageBuffer::new(width, height),
        }
    }

    /// Loads an image from the filesystem.
    ///
    /// The path must have a supported file extension (`jpeg`, `jpg` or `png`).
    pub fn load<A: AsRef<Path>>(path: A) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        let format = ImageFormat::from_path(path)?;
        let data = std::fs::read(path)?;
        match format {
            ImageFormat::Jpeg => Self::decode_jpeg(&data),
            ImageFormat::Png => {
                let buf = ::image::load_from_memory_with_format(&data, ::image::ImageFormat::Png)?
                    .to_rgba8();
                Ok(Self { buf })
            }
        }
    }

    /// Decodes a JFIF JPEG or Motion JPEG from a byte slice.
    pub fn decode_jpeg(data: &[u8]) -> anyhow::Result<Self> {
        let mut decomp = zune_jpeg::Decoder::new();
        decomp.set_num_threads(1)?;
        decomp.rgba();
        let buf = decomp.decode_buffer(data)?;
        let width = u32::from(decomp.width());
        let height = u32::from(decomp.height());
        let buf = ImageBuffer::from_raw(width, height, buf)
            .ok_or_else(|| anyhow::anyhow!("JPEG decoder returned a short buffer"))?;

        Ok(Self { buf })
    }

    /// Saves an image to the file system.
    ///
    /// The path must have a supported file extension (`jpeg`, `jpg` or `png`).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        ImageFormat::from_path(path.as_ref())?;
        Ok(self.buf.save(path)?)
    }

    /// Returns the width of this image, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    /// Returns the height of this image, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    /// Returns the size of this image.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Gets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    #[inline]
    pub(crate) fn get(&self, x: u32, y: u32) -> Color {
        Color(self.buf[(x, y)].0)
    }

    /// Sets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    #[inline]
    pub(crate) fn set(&mut self, x: u32, y: u32, color: Color) {
        self.buf[(x, y)] = Rgba(color.0);
    }

    /// Clears the image, setting every pixel value to `color`.
    pub fn clear(&mut self, color: Color) {
        self.buf.pixels_mut().for_each(|pix| pix.0 = color.0);
    }

    pub fn flip_horizontal_in_place(&mut self) {
        ::image::imageops::flip_horizontal_in_place(&mut self.buf);
    }

    /// Resizes this image to `new_res`, adding black bars to keep the original aspect ratio.
    ///
    /// For performance (as this runs on the CPU), this uses nearest neighbor interpolation, so the
    /// result won't look very good, but it suffices as network input.
    ///
    /// The region of the output actually covered by image content is
    /// `new_res.fit_aspect_ratio(self.resolution().aspect_ratio())`.
    pub fn aspect_aware_resize(&self, new_res: Resolution) -> Image {
        let ratio = match self.resolution().aspect_ratio() {
            Some(ratio) => ratio,
            None => {
                // an empty source has no content to sample, return an all-black target
                return Image::new(new_res.width(), new_res.height());
            }
        };

        let mut out = Image::new(new_res.width(), new_res.height());
        let target_rect = new_res.fit_aspect_ratio(ratio);

        for dest_y in 0..target_rect.height() {
            for dest_x in 0..target_rect.width() {
                let src_x = ((dest_x as f32 + 0.5) / target_rect.width() as f32
                    * self.width() as f32) as u32;
                let src_y = ((dest_y as f32 + 0.5) / target_rect.height() as f32
                    * self.height() as f32) as u32;

                let pixel = self.get(src_x.min(self.width() - 1), src_y.min(self.height() - 1));
                out.set(
                    (target_rect.x() as u32) + dest_x,
                    (target_rect.y() as u32) + dest_y,
                    pixel,
                );
            }
        }

        out
    }

    /// Overwrites the pixel block at `(x, y)` with the contents of `src`.
    ///
    /// This is a raw replacement: no scaling, blending, or alpha compositing
    /// takes place. The block must lie fully inside `self`.
    pub fn blit_from(&mut self, src: &Image, x: u32, y: u32) -> anyhow::Result<()> {
        if x + src.width() > self.width() || y + src.height() > self.height() {
            anyhow::bail!(
                "cannot blit {} image at ({x}, {y}) into {} image",
                src.resolution(),
                self.resolution(),
            );
        }

        for src_y in 0..src.height() {
            for src_x in 0..src.width() {
                self.set(x + src_x, y + src_y, src.get(src_x, src_y));
            }
        }

        Ok(())
    }

    #[inline]
    pub(crate) fn data(&self) -> &[u8] {
        self.buf.as_raw()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} Image", self.width(), self.height())
    }
}

/// An 8-bit RGBA color.
///
/// Colors are always in the sRGB color space and use non-premultiplied alpha.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Color(pub(crate) [u8; 4]);

impl Color {
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    pub const RED: Self = Self([255, 0, 0, 255]);
    pub const GREEN: Self = Self([0, 255, 0, 255]);
    pub const BLUE: Self = Self([0, 0, 255, 255]);

    #[inline]
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    #[inline]
    pub fn r(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn g(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn b(&self) -> u8 {
        self.0[2]
    }

    #[inline]
    pub fn a(&self) -> u8 {
        self.0[3]
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r(),
            self.g(),
            self.b(),
            self.a(),
        )
    }
}

// FIXME leaks `embedded-graphics` dependency
impl PixelColor for Color {
    type Raw = RawU32;
}

/// An axis-aligned rectangle with integer coordinates.
///
/// Rectangles are allowed to have zero height and/or width.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl Rect {
    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y, w, h) = (self.x, self.y, self.width, self.height);
        let bx = i64::from(x) + i64::from(w);
        let by = i64::from(y) + i64::from(h);
        write!(f, "Rect @ ({x},{y})-({bx},{by})/{w}x{h}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set() {
        let mut image = Image::new(2, 2);
        assert_eq!(image.get(0, 0), Color([0, 0, 0, 0]));
        image.set(1, 0, Color::RED);
        assert_eq!(image.get(1, 0), Color::RED);
        assert_eq!(image.get(0, 1), Color([0, 0, 0, 0]));
    }

    #[test]
    fn blit_replaces_block() {
        let mut frame = Image::new(4, 4);
        frame.clear(Color::BLUE);
        let mut overlay = Image::new(2, 2);
        overlay.clear(Color::RED);

        frame.blit_from(&overlay, 0, 0).unwrap();
        assert_eq!(frame.get(0, 0), Color::RED);
        assert_eq!(frame.get(1, 1), Color::RED);
        assert_eq!(frame.get(2, 0), Color::BLUE);
        assert_eq!(frame.get(0, 2), Color::BLUE);
    }

    #[test]
    fn blit_rejects_oversized_source() {
        let mut frame = Image::new(2, 2);
        let overlay = Image::new(4, 4);
        assert!(frame.blit_from(&overlay, 0, 0).is_err());
        // also when the offset pushes an otherwise fitting image out of bounds
        let overlay = Image::new(2, 2);
        assert!(frame.blit_from(&overlay, 1, 0).is_err());
    }

    #[test]
    fn aspect_aware_resize_letterboxes() {
        let mut src = Image::new(4, 2);
        src.clear(Color::WHITE);
        let out = src.aspect_aware_resize(Resolution::new(4, 4));
        assert_eq!(out.resolution(), Resolution::new(4, 4));
        // black bars above and below the content
        assert_eq!(out.get(0, 0), Color([0, 0, 0, 0]));
        assert_eq!(out.get(0, 1), Color::WHITE);
        assert_eq!(out.get(3, 2), Color::WHITE);
        assert_eq!(out.get(3, 3), Color([0, 0, 0, 0]));
    }
}
