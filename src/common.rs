use core::fmt;

/// Known GIF block introducers.
///
/// The byte scan only ever looks for [`Block::Image`]; the block walk dispatches on all three.
/// After an unknown introducer the layout of the following bytes is unclear, so the block walk
/// refuses to continue.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Block {
    /// Image separator.
    Image = 0x2C,
    /// Extension introducer.
    Extension = 0x21,
    /// Image trailer.
    Trailer = 0x3B,
}

impl Block {
    pub fn from_u8(n: u8) -> Option<Self> {
        match n {
            0x2C => Some(Block::Image),
            0x21 => Some(Block::Extension),
            0x3B => Some(Block::Trailer),
            _ => None,
        }
    }
}

/// Known GIF extension labels.
///
/// Only the graphics control extension is decoded; the others are listed so they can be named in
/// logs while their sub-blocks are skipped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExtensionLabel {
    /// Graphics control extension.
    Graphics,
    /// Application extension.
    App,
    /// Plain text extension.
    Text,
    /// Comment extension.
    Comment,
    /// Anything else; still framed as sub-blocks.
    Other(u8),
}

impl ExtensionLabel {
    pub fn from_u8(n: u8) -> Self {
        match n {
            0xf9 => ExtensionLabel::Graphics,
            0xff => ExtensionLabel::App,
            0x01 => ExtensionLabel::Text,
            0xfe => ExtensionLabel::Comment,
            other => ExtensionLabel::Other(other),
        }
    }
}

/// A field inside a packed byte, selected by `mask` and then shifted down by `shift`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BitField {
    pub mask: u8,
    pub shift: u8,
}

impl BitField {
    pub const fn new(mask: u8, shift: u8) -> Self {
        Self { mask, shift }
    }

    #[inline]
    pub const fn extract(self, byte: u8) -> u8 {
        (byte & self.mask) >> self.shift
    }

    #[inline]
    pub const fn is_set(self, byte: u8) -> bool {
        self.extract(byte) != 0
    }
}

/// Packed byte of the logical screen descriptor (offset 10).
pub mod screen_flags {
    use super::BitField;

    /// bit 7
    pub const GLOBAL_TABLE: BitField = BitField::new(0b1000_0000, 7);
    /// bits 6..4
    pub const COLOR_RESOLUTION: BitField = BitField::new(0b0111_0000, 4);
    /// bit 3
    pub const SORT: BitField = BitField::new(0b0000_1000, 3);
    /// bits 2..0
    pub const TABLE_SIZE: BitField = BitField::new(0b0000_0111, 0);
}

/// Packed byte of an image descriptor.
pub mod image_flags {
    use super::BitField;

    /// bit 7
    pub const LOCAL_TABLE: BitField = BitField::new(0b1000_0000, 7);
    /// bit 6
    pub const INTERLACE: BitField = BitField::new(0b0100_0000, 6);
    /// bit 5
    pub const SORT: BitField = BitField::new(0b0010_0000, 5);
    /// bits 2..0
    pub const TABLE_SIZE: BitField = BitField::new(0b0000_0111, 0);
}

/// Packed byte of the graphics control extension.
pub mod control_flags {
    use super::BitField;

    /// bits 4..2
    pub const DISPOSAL: BitField = BitField::new(0b0001_1100, 2);
    /// bit 1
    pub const USER_INPUT: BitField = BitField::new(0b0000_0010, 1);
    /// bit 0
    pub const TRANSPARENT: BitField = BitField::new(0b0000_0001, 0);
}

/// Number of entries in a color table whose packed size exponent is `exponent`.
#[inline]
pub const fn table_len(exponent: u8) -> usize {
    1 << ((exponent & 0x7) + 1)
}

/// The decode step that was running when a read failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Header,
    ScreenDescriptor,
    GlobalColorTable,
    GraphicsControl,
    ImageDescriptor,
    LocalColorTable,
    ImageData,
    Extension,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Header => "header",
            Stage::ScreenDescriptor => "logical screen descriptor",
            Stage::GlobalColorTable => "global color table",
            Stage::GraphicsControl => "graphics control extension",
            Stage::ImageDescriptor => "image descriptor",
            Stage::LocalColorTable => "local color table",
            Stage::ImageData => "image data",
            Stage::Extension => "extension block",
        };
        f.write_str(name)
    }
}

/// Errors that emerge when decoding a gif buffer
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A read ran past the end of the buffer.
    #[error("{stage} truncated: needed {len} bytes at offset {offset}, buffer holds {available}")]
    OutOfBounds {
        stage: Stage,
        offset: usize,
        len: usize,
        available: usize,
    },
    /// The block walk met a byte that introduces no known block.
    #[error("unknown block introducer {byte:#04x} at offset {offset}")]
    UnknownBlock { offset: usize, byte: u8 },
    /// The bytes could not be loaded.
    #[error("failed to load gif bytes")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Stage that failed, for bounds failures.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DecodeError::OutOfBounds { stage, .. } => Some(*stage),
            DecodeError::UnknownBlock { .. } => Some(Stage::Extension),
            DecodeError::Io(_) => None,
        }
    }
}
