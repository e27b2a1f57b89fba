//! Text drawing onto `RgbImage` frames through embedded-graphics.
//!
//! `FrameCanvas` exposes an image buffer as a `DrawTarget`, with an integer
//! upscale so the small mono fonts stay readable on bigger panels. The clock
//! face is drawn with the 5×7 ASCII mono font.
//!
//! ## Rust concepts
//! - Implementing a foreign trait (`DrawTarget`) for a borrowing newtype
//! - `Infallible` as the error type of an operation that cannot fail

use crate::Color;
use embedded_graphics::mono_font::ascii::FONT_5X7;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::renderer::TextRenderer;
use embedded_graphics::text::{Baseline, Text};
use image::RgbImage;
use std::convert::Infallible;

/// Font for the `HH:MM` face.
pub const CLOCK_FONT: &MonoFont<'static> = &FONT_5X7;

/// An `RgbImage` seen as an embedded-graphics draw target.
///
/// Drawing coordinates are in font pixels: point `(x, y)` covers the
/// `scale`×`scale` block at `origin + (x, y) * scale`. Pixels that fall
/// outside the image are dropped.
pub struct FrameCanvas<'a> {
    img: &'a mut RgbImage,
    origin: Point,
    scale: u32,
}

impl<'a> FrameCanvas<'a> {
    pub fn new(img: &'a mut RgbImage, origin: Point, scale: u32) -> Self {
        Self {
            img,
            origin,
            scale: scale.max(1),
        }
    }
}

impl DrawTarget for FrameCanvas<'_> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = (self.img.width() as i32, self.img.height() as i32);
        let scale = self.scale as i32;

        for Pixel(point, color) in pixels {
            let left = self.origin.x + point.x * scale;
            let top = self.origin.y + point.y * scale;
            let rgb = image::Rgb([color.r(), color.g(), color.b()]);
            for y in top.max(0)..(top + scale).min(height) {
                for x in left.max(0)..(left + scale).min(width) {
                    self.img.put_pixel(x as u32, y as u32, rgb);
                }
            }
        }
        Ok(())
    }
}

impl OriginDimensions for FrameCanvas<'_> {
    /// Image size in font pixels.
    fn size(&self) -> Size {
        Size::new(self.img.width() / self.scale, self.img.height() / self.scale)
    }
}

/// Width and height of `text` in image pixels at the given scale.
pub fn text_size(text: &str, scale: u32) -> (u32, u32) {
    let style = MonoTextStyle::new(CLOCK_FONT, Rgb888::WHITE);
    let size = style
        .measure_string(text, Point::zero(), Baseline::Top)
        .bounding_box
        .size;
    let scale = scale.max(1);
    (size.width * scale, size.height * scale)
}

/// Draw `text` in the clock font with its top-left corner at `top_left`.
///
/// Only glyph pixels are written; the background is left as it is.
pub fn draw_text(img: &mut RgbImage, text: &str, top_left: (i32, i32), scale: u32, color: Color) {
    let color: Rgb888 = color.into();
    let style = MonoTextStyle::new(CLOCK_FONT, color);
    let mut canvas = FrameCanvas::new(img, Point::new(top_left.0, top_left.1), scale);
    Text::with_baseline(text, Point::zero(), style, Baseline::Top)
        .draw(&mut canvas)
        .ok();
}
