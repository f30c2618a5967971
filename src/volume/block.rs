use std::cell::RefCell;
use std::rc::Rc;
use std::io;

use crate::volume::error::VolumeError;
use crate::volume::image::Image;

/// All the in-scope DEC filesystems use 512-byte logical blocks, even on
/// devices whose physical sector size differs.
pub const BLOCK_SIZE: usize = 512;

pub type BlockDeviceRef = Rc<RefCell<BlockDevice>>;

/// Flat, logical-block-number addressed access to a disk image.  Reads are
/// stateless positioned reads; there is no shared cursor, so multiple
/// extraction requests may interleave block reads freely.
#[derive(Debug)]
pub struct BlockDevice {
    image: Image,
    total_blocks: usize,
}

impl BlockDevice {
    /// Wrap an image.  Fails with `InvalidLayout` if the image is not a
    /// whole number of 512-byte blocks, or is empty.
    pub fn new(image: Image) -> io::Result<BlockDevice> {
        let len = image.len();
        if len == 0 || len % BLOCK_SIZE != 0 {
            return Err(VolumeError::InvalidLayout.into());
        }
        Ok(BlockDevice {
            image,
            total_blocks: len / BLOCK_SIZE,
        })
    }

    #[inline]
    pub fn total_blocks(&self) -> usize {
        self.total_blocks
    }

    /// Read one logical block.  `OutOfRange` if `lbn` is past the end of
    /// the volume; `ShortRead` if the underlying image is truncated.
    pub fn block(&self, lbn: usize) -> io::Result<&[u8]> {
        if lbn >= self.total_blocks {
            return Err(VolumeError::OutOfRange.into());
        }
        self.image.slice(lbn * BLOCK_SIZE, BLOCK_SIZE)
    }

    pub fn block_owned(&self, lbn: usize) -> io::Result<Vec<u8>> {
        Ok(self.block(lbn)?.to_vec())
    }

    /// Read `count` consecutive blocks starting at `lbn` into one buffer.
    pub fn blocks_owned(&self, lbn: usize, count: usize) -> io::Result<Vec<u8>> {
        let mut data = Vec::with_capacity(count * BLOCK_SIZE);
        for n in 0..count {
            data.extend_from_slice(self.block(lbn + n)?);
        }
        Ok(data)
    }
}

/// Decode a 16-bit little-endian word at a byte offset.  All RT-11 and
/// Files-11 on-disk fields are 16-bit words stored low byte first.
#[inline]
pub fn word(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

/// Decode a 32-bit value stored as two words, high-order word first.
/// Files-11 stores block numbers this way (e.g. H.IBLB, F.EFBK).
#[inline]
pub fn dword_high_low(buf: &[u8], offset: usize) -> u32 {
    (u32::from(word(buf, offset)) << 16) | u32::from(word(buf, offset + 2))
}
