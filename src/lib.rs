//! A small structural gif decoder: it maps out a gif buffer without decompressing any pixels.
//!
//! [`decode`] walks the header, the logical screen descriptor, the global color table, one
//! graphics control extension and every image block, and returns them as a [`GifLayout`]. Image
//! data is handed back still LZW-encoded, with the sub-block framing stripped. Every palette entry
//! carries its CIELAB coordinates and a `#rrggbb` string next to the raw RGB value.
//!
//! ```no_run
//! let bytes = std::fs::read("animation.gif")?;
//! let layout = giflayout::decode(&bytes)?;
//! for image in layout.images() {
//!     let area = image.descriptor.bounding_box();
//!     println!("{:?}: {} encoded bytes", area, image.encoded_data.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Geometry is reported with [`embedded_graphics`] types so layouts drop straight into a
//! [`DrawTarget`] based renderer.
//!
//! [`DrawTarget`]: embedded_graphics::draw_target::DrawTarget

use std::path::Path;

use embedded_graphics::prelude::{OriginDimensions, Size};
use log::debug;

mod color;
mod common;
mod cursor;
mod frame;
mod header;
#[cfg(test)]
mod test_utils;

pub use color::{rgb_to_lab, Color, ColorTable, Lab};
pub use common::{BitField, Block, DecodeError, ExtensionLabel, Stage};
pub use cursor::{ByteCursor, OutOfRange};
pub use frame::{Image, ImageDescriptor, ScanMode};
pub use header::{DisposalMethod, GraphicsControlExtension, HeaderBlock, LogicalScreenDescriptor};

use frame::ImageScanner;
use header::SCREEN_DESCRIPTOR_END;

/// Everything decoded from one gif buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct GifLayout {
    header: HeaderBlock,
    screen: LogicalScreenDescriptor,
    global_color_table: Option<ColorTable>,
    graphics_control: GraphicsControlExtension,
    images: Vec<Image>,
}

impl GifLayout {
    /// Read a whole file and decode it with default options.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        DecodeOptions::new().decode_file(path)
    }

    pub fn header(&self) -> &HeaderBlock {
        &self.header
    }

    pub fn screen_descriptor(&self) -> &LogicalScreenDescriptor {
        &self.screen
    }

    pub fn global_color_table(&self) -> Option<&ColorTable> {
        self.global_color_table.as_ref()
    }

    /// The control extension at the fixed position right after the global color table.
    ///
    /// Its introducer is not checked, and multi-frame files only ever report this one. Use
    /// [`ScanMode::BlockWalk`] and [`Image::graphics_control`] for per-frame values.
    pub fn graphics_control(&self) -> &GraphicsControlExtension {
        &self.graphics_control
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn num_images(&self) -> usize {
        self.images.len()
    }

    /// The palette in effect for image `idx`.
    pub fn palette_for(&self, idx: usize) -> Option<&ColorTable> {
        self.images
            .get(idx)?
            .palette(self.global_color_table.as_ref())
    }

    /// Amount of time to delay until the next frame, from [`GifLayout::graphics_control`].
    pub fn delay_ms(&self) -> u32 {
        self.graphics_control.delay_ms()
    }
}

impl OriginDimensions for GifLayout {
    fn size(&self) -> Size {
        self.screen.size()
    }
}

/// Options for decoding a gif buffer.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    scan_mode: ScanMode,
    max_images: Option<usize>,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// How image blocks are located. Defaults to [`ScanMode::ByteScan`].
    pub fn scan_mode(&mut self, mode: ScanMode) -> &mut Self {
        self.scan_mode = mode;
        self
    }

    /// Stop after this many images. `None`, the default, reads them all.
    pub fn max_images(&mut self, limit: Option<usize>) -> &mut Self {
        self.max_images = limit;
        self
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<GifLayout, DecodeError> {
        let cursor = ByteCursor::new(bytes);

        let header = header::decode_header(&cursor)?;
        let screen = header::decode_screen_descriptor(&cursor)?;
        let global_color_table = header::decode_global_color_table(&cursor, &screen)?;

        let blocks_start = SCREEN_DESCRIPTOR_END + screen.global_color_table_bytes();
        let graphics_control = header::decode_graphics_control(&cursor, blocks_start)?;

        let scanner = ImageScanner::new(cursor, self.max_images);
        let images = match self.scan_mode {
            ScanMode::ByteScan => scanner.byte_scan(blocks_start)?,
            ScanMode::BlockWalk => scanner.block_walk(blocks_start)?,
        };

        debug!(
            "decoded {}{} {}x{} with {} images",
            header.signature,
            header.version,
            screen.width,
            screen.height,
            images.len()
        );

        Ok(GifLayout {
            header,
            screen,
            global_color_table,
            graphics_control,
            images,
        })
    }

    /// Read all bytes of `path`, then decode them.
    pub fn decode_file(&self, path: impl AsRef<Path>) -> Result<GifLayout, DecodeError> {
        let bytes = std::fs::read(path)?;
        self.decode(&bytes)
    }
}

/// Decode `bytes` with default options.
pub fn decode(bytes: &[u8]) -> Result<GifLayout, DecodeError> {
    DecodeOptions::new().decode(bytes)
}
