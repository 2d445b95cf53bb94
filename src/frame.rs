use embedded_graphics::{
    prelude::{Point, Size},
    primitives::Rectangle,
};
use log::{debug, trace};
use smallvec::SmallVec;

use crate::{
    color::ColorTable,
    common::{image_flags, table_len, Block, DecodeError, ExtensionLabel, Stage},
    cursor::{ByteCursor, OutOfRange},
    header::{decode_graphics_control, GraphicsControlExtension},
};

/// Bytes from the image separator up to the local table, separator included.
const DESCRIPTOR_LEN: usize = 10;

/// How the image blocks are located after the global color table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Step byte by byte to each `0x2C`. Extension blocks are not framed, so a `0x2C` inside
    /// extension data is taken for an image separator.
    #[default]
    ByteScan,
    /// Follow block introducers and extension sub-blocks, pairing each graphics control
    /// extension with the image after it.
    BlockWalk,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub local_color_table_flag: bool,
    pub interlace_flag: bool,
    pub sort_flag: bool,
    /// Raw 3 bit size exponent of the local table.
    pub local_color_table_exponent: u8,
}

impl ImageDescriptor {
    /// Decode the nine bytes following the separator at `separator`.
    pub fn decode(cursor: &ByteCursor<'_>, separator: usize) -> Result<Self, OutOfRange> {
        let raw: [u8; DESCRIPTOR_LEN - 1] = cursor.read_array(separator + 1)?;
        let packed = raw[8];
        Ok(Self {
            left: u16::from_le_bytes([raw[0], raw[1]]),
            top: u16::from_le_bytes([raw[2], raw[3]]),
            width: u16::from_le_bytes([raw[4], raw[5]]),
            height: u16::from_le_bytes([raw[6], raw[7]]),
            local_color_table_flag: image_flags::LOCAL_TABLE.is_set(packed),
            interlace_flag: image_flags::INTERLACE.is_set(packed),
            sort_flag: image_flags::SORT.is_set(packed),
            local_color_table_exponent: image_flags::TABLE_SIZE.extract(packed),
        })
    }

    /// Byte length of the local table, zero when absent.
    pub fn local_color_table_bytes(&self) -> usize {
        if self.local_color_table_flag {
            3 * table_len(self.local_color_table_exponent)
        } else {
            0
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(i32::from(self.left), i32::from(self.top))
    }

    pub fn size(&self) -> Size {
        Size::new(u32::from(self.width), u32::from(self.height))
    }

    pub fn bounding_box(&self) -> Rectangle {
        Rectangle::new(self.origin(), self.size())
    }

    pub fn num_pixels(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }
}

/// One image block with its still LZW-encoded pixel stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Offset of the `0x2C` separator that opened the block.
    pub offset: usize,
    pub descriptor: ImageDescriptor,
    pub local_color_table: Option<ColorTable>,
    pub lzw_min_code_size: u8,
    /// Sub-block payloads back to back, without size prefixes or terminator.
    pub encoded_data: Vec<u8>,
    /// The control extension preceding this image. Only filled by [`ScanMode::BlockWalk`].
    pub graphics_control: Option<GraphicsControlExtension>,
}

impl Image {
    /// The local table if present, else `global`.
    pub fn palette<'t>(&'t self, global: Option<&'t ColorTable>) -> Option<&'t ColorTable> {
        self.local_color_table.as_ref().or(global)
    }
}

/// Image whose data sub-blocks are still being collected.
struct PendingImage<'a> {
    offset: usize,
    descriptor: ImageDescriptor,
    local_color_table: Option<ColorTable>,
    lzw_min_code_size: u8,
    chunks: SmallVec<[&'a [u8]; 16]>,
}

impl PendingImage<'_> {
    fn finish(self) -> Image {
        let total = self.chunks.iter().map(|chunk| chunk.len()).sum();
        let mut encoded_data = Vec::with_capacity(total);
        for chunk in &self.chunks {
            encoded_data.extend_from_slice(chunk);
        }
        Image {
            offset: self.offset,
            descriptor: self.descriptor,
            local_color_table: self.local_color_table,
            lzw_min_code_size: self.lzw_min_code_size,
            encoded_data,
            graphics_control: None,
        }
    }
}

enum ScanState<'a> {
    /// Looking for the next separator at or after the offset.
    SeekingDescriptor(usize),
    Image(ImageState<'a>),
    Done,
}

/// Progress through one image block.
enum ImageState<'a> {
    /// Separator found at the offset.
    HaveDescriptor(usize),
    /// Local table starts at the offset.
    ReadingLocalTable(PendingImage<'a>, usize),
    /// Next sub-block length byte is at the offset.
    ReadingDataSubBlocks(PendingImage<'a>, usize),
    /// Image pushed; the offset is the byte after its terminator.
    Finished(usize),
}

pub(crate) struct ImageScanner<'a> {
    cursor: ByteCursor<'a>,
    images: Vec<Image>,
    max_images: Option<usize>,
}

impl<'a> ImageScanner<'a> {
    pub fn new(cursor: ByteCursor<'a>, max_images: Option<usize>) -> Self {
        Self {
            cursor,
            images: Vec::new(),
            max_images,
        }
    }

    fn limit_reached(&self) -> bool {
        self.max_images
            .map_or(false, |max| self.images.len() >= max)
    }

    /// Read the LZW code size at `at` and move on to the sub-blocks.
    fn begin_data(
        &self,
        image: PendingImage<'a>,
        at: usize,
    ) -> Result<ImageState<'a>, DecodeError> {
        let lzw_min_code_size = self
            .cursor
            .read_u8(at)
            .map_err(|e| e.during(Stage::ImageData))?;
        Ok(ImageState::ReadingDataSubBlocks(
            PendingImage {
                lzw_min_code_size,
                ..image
            },
            at + 1,
        ))
    }

    fn step(&mut self, state: ScanState<'a>) -> Result<ScanState<'a>, DecodeError> {
        Ok(match state {
            ScanState::SeekingDescriptor(from) => {
                if self.limit_reached() {
                    ScanState::Done
                } else {
                    match self.cursor.find_byte(from, Block::Image as u8) {
                        Some(separator) => ScanState::Image(ImageState::HaveDescriptor(separator)),
                        None => ScanState::Done,
                    }
                }
            }
            ScanState::Image(ImageState::Finished(next)) => ScanState::SeekingDescriptor(next),
            ScanState::Image(image) => ScanState::Image(self.step_image(image)?),
            ScanState::Done => ScanState::Done,
        })
    }

    fn step_image(&mut self, state: ImageState<'a>) -> Result<ImageState<'a>, DecodeError> {
        Ok(match state {
            ImageState::HaveDescriptor(separator) => {
                trace!("image descriptor at {}", separator);
                let descriptor = ImageDescriptor::decode(&self.cursor, separator)
                    .map_err(|e| e.during(Stage::ImageDescriptor))?;
                let image = PendingImage {
                    offset: separator,
                    descriptor,
                    local_color_table: None,
                    lzw_min_code_size: 0,
                    chunks: SmallVec::new(),
                };
                let at = separator + DESCRIPTOR_LEN;
                if descriptor.local_color_table_flag {
                    ImageState::ReadingLocalTable(image, at)
                } else {
                    self.begin_data(image, at)?
                }
            }
            ImageState::ReadingLocalTable(image, at) => {
                let len = image.descriptor.local_color_table_bytes();
                let raw = self
                    .cursor
                    .read_fixed(at, len)
                    .map_err(|e| e.during(Stage::LocalColorTable))?;
                let image = PendingImage {
                    local_color_table: Some(ColorTable::from_rgb_bytes(raw)),
                    ..image
                };
                self.begin_data(image, at + len)?
            }
            ImageState::ReadingDataSubBlocks(mut image, at) => {
                let len = self
                    .cursor
                    .read_u8(at)
                    .map_err(|e| e.during(Stage::ImageData))?;
                if len == 0 {
                    let image = image.finish();
                    trace!(
                        "image at {} holds {} encoded bytes",
                        image.offset,
                        image.encoded_data.len()
                    );
                    self.images.push(image);
                    ImageState::Finished(at + 1)
                } else {
                    let chunk = self
                        .cursor
                        .read_fixed(at + 1, usize::from(len))
                        .map_err(|e| e.during(Stage::ImageData))?;
                    image.chunks.push(chunk);
                    ImageState::ReadingDataSubBlocks(image, at + 1 + usize::from(len))
                }
            }
            ImageState::Finished(next) => ImageState::Finished(next),
        })
    }

    /// Collect every image found by stepping through the buffer from `start`.
    pub fn byte_scan(mut self, start: usize) -> Result<Vec<Image>, DecodeError> {
        let mut state = ScanState::SeekingDescriptor(start);
        loop {
            state = self.step(state)?;
            if let ScanState::Done = state {
                break;
            }
        }
        debug!("byte scan found {} images", self.images.len());
        Ok(self.images)
    }

    /// Decode the image block whose separator sits at `separator`, returning the offset after its
    /// terminator.
    fn read_image(&mut self, separator: usize) -> Result<usize, DecodeError> {
        let mut state = ImageState::HaveDescriptor(separator);
        loop {
            state = match self.step_image(state)? {
                ImageState::Finished(next) => return Ok(next),
                other => other,
            };
        }
    }

    /// Collect images by following the block structure from `start`.
    ///
    /// Stops at the trailer, or quietly at the end of the buffer when the trailer is missing.
    pub fn block_walk(mut self, start: usize) -> Result<Vec<Image>, DecodeError> {
        let mut pos = start;
        let mut pending_control = None;

        while !self.limit_reached() {
            let introducer = match self.cursor.read_u8(pos) {
                Ok(byte) => byte,
                Err(_) => {
                    debug!("buffer ended at {} without a trailer", pos);
                    break;
                }
            };

            match Block::from_u8(introducer) {
                Some(Block::Image) => {
                    pos = self.read_image(pos)?;
                    if let Some(image) = self.images.last_mut() {
                        image.graphics_control = pending_control.take();
                    }
                }
                Some(Block::Extension) => {
                    let label = self
                        .cursor
                        .read_u8(pos + 1)
                        .map_err(|e| e.during(Stage::Extension))?;
                    match ExtensionLabel::from_u8(label) {
                        ExtensionLabel::Graphics => {
                            trace!("graphics control extension at {}", pos);
                            pending_control = Some(decode_graphics_control(&self.cursor, pos)?);
                        }
                        other => trace!("skipping {:?} extension at {}", other, pos),
                    }
                    pos = skip_sub_blocks(&self.cursor, pos + 2)
                        .map_err(|e| e.during(Stage::Extension))?;
                }
                Some(Block::Trailer) => break,
                None => {
                    return Err(DecodeError::UnknownBlock {
                        offset: pos,
                        byte: introducer,
                    })
                }
            }
        }

        debug!("block walk found {} images", self.images.len());
        Ok(self.images)
    }
}

/// Skip a run of sub-blocks starting at the first length byte, returning the offset past the
/// zero terminator.
pub(crate) fn skip_sub_blocks(cursor: &ByteCursor<'_>, mut at: usize) -> Result<usize, OutOfRange> {
    loop {
        let len = usize::from(cursor.read_u8(at)?);
        at += 1;
        if len == 0 {
            return Ok(at);
        }
        cursor.read_fixed(at, len)?;
        at += len;
    }
}
