use embedded_graphics::prelude::Size;
use log::trace;

use crate::{
    color::ColorTable,
    common::{control_flags, screen_flags, table_len, DecodeError, Stage},
    cursor::{ByteCursor, OutOfRange},
};

/// Offset of the logical screen descriptor.
pub(crate) const SCREEN_DESCRIPTOR_OFFSET: usize = 6;
/// Offset of the first byte after the logical screen descriptor.
pub(crate) const SCREEN_DESCRIPTOR_END: usize = 13;

/// Signature and version, e.g. `GIF` / `89a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBlock {
    pub signature: String,
    pub version: String,
}

impl HeaderBlock {
    /// Whether the signature reads `GIF`. Decoding never checks this.
    pub fn is_gif(&self) -> bool {
        self.signature == "GIF"
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LogicalScreenDescriptor {
    /// Canvas size in pixels.
    pub width: u16,
    pub height: u16,
    pub global_color_table_flag: bool,
    /// Raw 3 bit field; see [`LogicalScreenDescriptor::color_resolution_value`].
    pub color_resolution: u8,
    pub sort_flag: bool,
    /// Raw 3 bit size exponent of the global table.
    pub global_color_table_exponent: u8,
    pub background_color_index: u8,
    pub pixel_aspect_ratio: u8,
}

impl LogicalScreenDescriptor {
    /// `2^(color_resolution + 1)`, always a power of two in `2..=256`.
    pub fn color_resolution_value(&self) -> u32 {
        1 << (u32::from(self.color_resolution & 0x7) + 1)
    }

    /// Entries in the global table, if the flag says one follows.
    pub fn global_color_table_len(&self) -> Option<usize> {
        self.global_color_table_flag
            .then(|| table_len(self.global_color_table_exponent))
    }

    /// Byte length of the global table, zero when absent.
    pub(crate) fn global_color_table_bytes(&self) -> usize {
        self.global_color_table_len().map_or(0, |len| 3 * len)
    }

    pub fn size(&self) -> Size {
        Size::new(u32::from(self.width), u32::from(self.height))
    }
}

/// How a renderer should treat the canvas before the next frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DisposalMethod {
    NotSpecified,
    DoNotDispose,
    OverwriteWithBackground,
    OverwriteWithPrevious,
    /// Values 4 to 7 carry no defined meaning.
    Reserved(u8),
}

impl DisposalMethod {
    pub fn from_u8(n: u8) -> Self {
        match n {
            0 => DisposalMethod::NotSpecified,
            1 => DisposalMethod::DoNotDispose,
            2 => DisposalMethod::OverwriteWithBackground,
            3 => DisposalMethod::OverwriteWithPrevious,
            other => DisposalMethod::Reserved(other),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GraphicsControlExtension {
    /// Raw 3 bit field, not interpreted.
    pub disposal_method: u8,
    pub user_input_flag: bool,
    pub transparent_color_flag: bool,
    /// Delay time, in hundredths of a second
    pub delay_time: u16,
    /// Table index for a transparent color
    pub transparent_color_index: u8,
}

impl GraphicsControlExtension {
    pub fn disposal(&self) -> DisposalMethod {
        DisposalMethod::from_u8(self.disposal_method)
    }

    pub fn transparent_index(&self) -> Option<u8> {
        self.transparent_color_flag
            .then_some(self.transparent_color_index)
    }

    pub fn delay_ms(&self) -> u32 {
        u32::from(self.delay_time) * 10
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

pub fn decode_header(cursor: &ByteCursor<'_>) -> Result<HeaderBlock, DecodeError> {
    let raw: [u8; 6] = cursor.read_array(0).map_err(|e| e.during(Stage::Header))?;
    Ok(HeaderBlock {
        signature: latin1(&raw[..3]),
        version: latin1(&raw[3..]),
    })
}

pub fn decode_screen_descriptor(
    cursor: &ByteCursor<'_>,
) -> Result<LogicalScreenDescriptor, DecodeError> {
    // Bounds check the whole descriptor up front so a short buffer never yields a partial record.
    let raw = cursor
        .read_fixed(SCREEN_DESCRIPTOR_OFFSET, SCREEN_DESCRIPTOR_END - SCREEN_DESCRIPTOR_OFFSET)
        .map_err(|e| e.during(Stage::ScreenDescriptor))?;
    let packed = raw[4];

    Ok(LogicalScreenDescriptor {
        width: u16::from_le_bytes([raw[0], raw[1]]),
        height: u16::from_le_bytes([raw[2], raw[3]]),
        global_color_table_flag: screen_flags::GLOBAL_TABLE.is_set(packed),
        color_resolution: screen_flags::COLOR_RESOLUTION.extract(packed),
        sort_flag: screen_flags::SORT.is_set(packed),
        global_color_table_exponent: screen_flags::TABLE_SIZE.extract(packed),
        background_color_index: raw[5],
        pixel_aspect_ratio: raw[6],
    })
}

/// Decode the global table that directly follows the screen descriptor.
pub fn decode_global_color_table(
    cursor: &ByteCursor<'_>,
    screen: &LogicalScreenDescriptor,
) -> Result<Option<ColorTable>, DecodeError> {
    if !screen.global_color_table_flag {
        return Ok(None);
    }
    let raw = cursor
        .read_fixed(SCREEN_DESCRIPTOR_END, screen.global_color_table_bytes())
        .map_err(|e| e.during(Stage::GlobalColorTable))?;
    trace!("global color table of {} entries", raw.len() / 3);
    Ok(Some(ColorTable::from_rgb_bytes(raw)))
}

/// Field offsets relative to the `0x21` that opens the extension block.
const CONTROL_PACKED: usize = 3;
const CONTROL_DELAY: usize = 4;
const CONTROL_TRANSPARENT_INDEX: usize = 6;
const CONTROL_END: usize = 7;

fn read_control_fields(
    cursor: &ByteCursor<'_>,
    block_start: usize,
) -> Result<GraphicsControlExtension, OutOfRange> {
    // Same up-front bounds check as the screen descriptor.
    let raw = cursor.read_fixed(block_start, CONTROL_END)?;
    let packed = raw[CONTROL_PACKED];
    Ok(GraphicsControlExtension {
        disposal_method: control_flags::DISPOSAL.extract(packed),
        user_input_flag: control_flags::USER_INPUT.is_set(packed),
        transparent_color_flag: control_flags::TRANSPARENT.is_set(packed),
        delay_time: u16::from_le_bytes([raw[CONTROL_DELAY], raw[CONTROL_DELAY + 1]]),
        transparent_color_index: raw[CONTROL_TRANSPARENT_INDEX],
    })
}

/// Decode a graphics control extension whose block starts at `block_start`.
///
/// The introducer and label bytes are not checked; the caller decides where the block is.
pub fn decode_graphics_control(
    cursor: &ByteCursor<'_>,
    block_start: usize,
) -> Result<GraphicsControlExtension, DecodeError> {
    read_control_fields(cursor, block_start).map_err(|e| e.during(Stage::GraphicsControl))
}
