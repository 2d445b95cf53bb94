use std::ops::{Deref, DerefMut};

/// Synthetic gif assembled by [`GifBuilder`].
pub(crate) struct TestGif {
    bytes: Vec<u8>,
    scan_start: usize,
}

impl TestGif {
    /// First byte after the global color table.
    pub fn scan_start(&self) -> usize {
        self.scan_start
    }
}

impl Deref for TestGif {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.bytes
    }
}

impl DerefMut for TestGif {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }
}

/// Smallest exponent whose table holds `len` entries.
fn exponent_for(len: usize) -> u8 {
    (0..8u8).find(|e| 1usize << (e + 1) >= len).unwrap_or(7)
}

fn push_table(out: &mut Vec<u8>, table: &[[u8; 3]]) -> u8 {
    let exponent = exponent_for(table.len());
    for entry in table {
        out.extend_from_slice(entry);
    }
    for _ in table.len()..(1 << (exponent + 1)) {
        out.extend_from_slice(&[0, 0, 0]);
    }
    exponent
}

fn push_sub_blocks(out: &mut Vec<u8>, blocks: &[&[u8]]) {
    for block in blocks {
        assert!(!block.is_empty() && block.len() < 256);
        out.push(block.len() as u8);
        out.extend_from_slice(block);
    }
    out.push(0);
}

/// Builds byte-exact gif layouts block by block, without any LZW encoding.
pub(crate) struct GifBuilder {
    width: u16,
    height: u16,
    global: Option<Vec<[u8; 3]>>,
    blocks: Vec<u8>,
}

impl GifBuilder {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            global: None,
            blocks: Vec::new(),
        }
    }

    pub fn global_table(mut self, table: &[[u8; 3]]) -> Self {
        self.global = Some(table.to_vec());
        self
    }

    pub fn control(mut self, packed: u8, delay: u16, transparent_idx: u8) -> Self {
        self.blocks.extend_from_slice(&[0x21, 0xF9, 0x04, packed]);
        self.blocks.extend_from_slice(&delay.to_le_bytes());
        self.blocks.extend_from_slice(&[transparent_idx, 0x00]);
        self
    }

    pub fn comment(mut self, text: &[u8]) -> Self {
        self.blocks.extend_from_slice(&[0x21, 0xFE]);
        push_sub_blocks(&mut self.blocks, &[text]);
        self
    }

    fn descriptor(&mut self, packed: u8) {
        self.blocks.push(0x2C);
        self.blocks.extend_from_slice(&[0, 0, 0, 0]);
        self.blocks.extend_from_slice(&self.width.to_le_bytes());
        self.blocks.extend_from_slice(&self.height.to_le_bytes());
        self.blocks.push(packed);
    }

    pub fn image(mut self, data: &[&[u8]]) -> Self {
        self.descriptor(0);
        self.blocks.push(2);
        push_sub_blocks(&mut self.blocks, data);
        self
    }

    pub fn image_with_local_table(mut self, table: &[[u8; 3]], data: &[&[u8]]) -> Self {
        let mut raw = Vec::new();
        let exponent = push_table(&mut raw, table);
        self.descriptor(0x80 | exponent);
        self.blocks.extend_from_slice(&raw);
        self.blocks.push(2);
        push_sub_blocks(&mut self.blocks, data);
        self
    }

    pub fn build(self) -> TestGif {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&self.width.to_le_bytes());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        let mut table = Vec::new();
        let packed = match &self.global {
            Some(global) => 0xF0 | push_table(&mut table, global),
            None => 0x70,
        };
        bytes.extend_from_slice(&[packed, 0, 0]);
        bytes.extend_from_slice(&table);
        let scan_start = bytes.len();
        bytes.extend_from_slice(&self.blocks);
        bytes.push(0x3B);
        TestGif { bytes, scan_start }
    }
}
