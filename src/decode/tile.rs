//! JPEG map tile decoding onto the fixed RGB565 canvas.
//!
//! The codec itself sits behind [`JpegCodec`].  It hands decoded pixels
//! to a sink as rectangular [`PixelBlock`]s; the canvas copies the part of
//! each block that lies on screen and ignores the rest.

use std::io::Cursor;
use std::sync::{Mutex, PoisonError};

use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, ImageDecoder};
use log::{debug, warn};

use crate::error::{AllocError, DecodeError};

pub const CANVAS_WIDTH: usize = 320;
pub const CANVAS_HEIGHT: usize = 480;

/// Decoded-size ceiling for the default codec: twice the canvas area.
pub const DEFAULT_MAX_PIXELS: u64 = (CANVAS_WIDTH * CANVAS_HEIGHT * 2) as u64;

/// Rows per block handed to the sink.
const STRIPE_ROWS: u32 = 16;

/// Pack 8-bit RGB into RGB565.
#[inline]
pub const fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

/// A rectangle of decoded RGB565 pixels, row-major, `width * height` long.
/// Position is in canvas coordinates and may lie partly or fully off it.
#[derive(Debug, Clone, Copy)]
pub struct PixelBlock<'a> {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u16],
}

/// External JPEG decoder.  Returns the image dimensions on success.
pub trait JpegCodec: Send + Sync {
    fn decode(
        &self,
        jpeg: &[u8],
        sink: &mut dyn FnMut(PixelBlock<'_>),
    ) -> Result<(u32, u32), DecodeError>;
}

// ── Canvas ────────────────────────────────────────────────────

/// Portrait 320x480 RGB565 raster.  Pixels persist across tiles until
/// [`clear`](Self::clear).
pub struct TileCanvas {
    pixels: Vec<u16>,
}

impl TileCanvas {
    pub const WIDTH: usize = CANVAS_WIDTH;
    pub const HEIGHT: usize = CANVAS_HEIGHT;

    pub fn try_new() -> Result<Self, AllocError> {
        let len = Self::WIDTH * Self::HEIGHT;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| AllocError::Canvas {
                bytes: len * core::mem::size_of::<u16>(),
            })?;
        pixels.resize(len, 0);
        Ok(Self { pixels })
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u16> {
        if x >= Self::WIDTH || y >= Self::HEIGHT {
            return None;
        }
        Some(self.pixels[y * Self::WIDTH + x])
    }

    /// Copy the on-canvas intersection of `block`.  Returns the number of
    /// pixels written.
    pub fn blit(&mut self, block: &PixelBlock<'_>) -> usize {
        let w = block.width as i64;
        if w == 0 {
            return 0;
        }
        // A short pixel slice only covers its complete rows.
        let rows = (block.height as i64).min(block.pixels.len() as i64 / w);

        let x0 = i64::from(block.x).max(0);
        let y0 = i64::from(block.y).max(0);
        let x1 = (i64::from(block.x) + w).min(Self::WIDTH as i64);
        let y1 = (i64::from(block.y) + rows).min(Self::HEIGHT as i64);
        if x0 >= x1 || y0 >= y1 {
            return 0;
        }

        let span = (x1 - x0) as usize;
        let src_col = (x0 - i64::from(block.x)) as usize;
        for y in y0..y1 {
            let src_row = (y - i64::from(block.y)) as usize;
            let src = src_row * block.width as usize + src_col;
            let dst = y as usize * Self::WIDTH + x0 as usize;
            self.pixels[dst..dst + span].copy_from_slice(&block.pixels[src..src + span]);
        }
        span * (y1 - y0) as usize
    }
}

/// Decode `jpeg` onto `canvas`.  The lock is taken per block only, so
/// readers never wait on the codec itself.
pub fn decode_tile(
    codec: &dyn JpegCodec,
    jpeg: &[u8],
    canvas: &Mutex<TileCanvas>,
) -> Result<(u32, u32), DecodeError> {
    let mut written = 0usize;
    let dims = codec.decode(jpeg, &mut |block| {
        written += canvas
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .blit(&block);
    })?;
    debug!(
        "Maps: tile {}x{} ({} bytes), {} px on canvas",
        dims.0,
        dims.1,
        jpeg.len(),
        written
    );
    Ok(dims)
}

// ── image-backed codec ────────────────────────────────────────

/// [`JpegCodec`] on top of the `image` crate.
pub struct ImageJpegCodec {
    max_pixels: u64,
}

impl Default for ImageJpegCodec {
    fn default() -> Self {
        Self {
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl ImageJpegCodec {
    pub fn with_max_pixels(max_pixels: u64) -> Self {
        Self { max_pixels }
    }
}

impl JpegCodec for ImageJpegCodec {
    fn decode(
        &self,
        jpeg: &[u8],
        sink: &mut dyn FnMut(PixelBlock<'_>),
    ) -> Result<(u32, u32), DecodeError> {
        let decoder = JpegDecoder::new(Cursor::new(jpeg)).map_err(|e| {
            warn!("Maps: JPEG header rejected: {e}");
            DecodeError::Jpeg
        })?;
        let (width, height) = decoder.dimensions();
        if u64::from(width) * u64::from(height) > self.max_pixels {
            return Err(DecodeError::ImageTooLarge { width, height });
        }
        let channels = match decoder.color_type() {
            ColorType::L8 => 1usize,
            ColorType::Rgb8 => 3,
            _ => return Err(DecodeError::UnsupportedColor),
        };

        let total = usize::try_from(decoder.total_bytes()).map_err(|_| DecodeError::Jpeg)?;
        let mut raw = Vec::new();
        raw.try_reserve_exact(total)
            .map_err(|_| DecodeError::ImageTooLarge { width, height })?;
        raw.resize(total, 0);
        decoder.read_image(&mut raw).map_err(|e| {
            warn!("Maps: JPEG decode failed: {e}");
            DecodeError::Jpeg
        })?;

        let row_bytes = width as usize * channels;
        let mut stripe: Vec<u16> = Vec::with_capacity(width as usize * STRIPE_ROWS as usize);
        let mut y = 0u32;
        for rows in raw.chunks(row_bytes * STRIPE_ROWS as usize) {
            stripe.clear();
            stripe.extend(rows.chunks_exact(channels).map(|px| match px {
                [l] => rgb565(*l, *l, *l),
                [r, g, b] => rgb565(*r, *g, *b),
                _ => 0,
            }));
            let h = (rows.len() / row_bytes) as u32;
            sink(PixelBlock {
                x: 0,
                y: y as i32,
                width,
                height: h,
                pixels: &stripe,
            });
            y += h;
        }
        Ok((width, height))
    }
}
