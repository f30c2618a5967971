use std::fs::File;
use std::io;
use std::path::Path;

use memmap::{Mmap, MmapOptions};

use crate::volume::error::VolumeError;

/// Provide backing storage (file or memory) for disk images.  All access
/// is read-only; callers must not mutate the underlying image file while
/// a volume is open.
#[derive(Debug)]
pub enum Image {
    Map(Mmap),
    Memory(Box<[u8]>),
}

impl Image {
    /// Open a disk image file with a read-only memory mapping.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Image> {
        let file = File::open(path)?;
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(Image::Map(mmap))
    }

    /// Wrap an in-memory byte buffer.  Used for synthetic volumes in tests.
    pub fn from_bytes(bytes: Vec<u8>) -> Image {
        Image::Memory(bytes.into_boxed_slice())
    }

    pub fn len(&self) -> usize {
        match self {
            Image::Map(mmap) => mmap.len(),
            Image::Memory(array) => array.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn slice(&self, offset: usize, length: usize) -> io::Result<&[u8]> {
        let end = offset
            .checked_add(length)
            .ok_or_else(|| VolumeError::OutOfRange.to_io_error())?;
        if end > self.len() {
            return Err(VolumeError::ShortRead.into());
        }
        Ok(match self {
            Image::Map(mmap) => &mmap[offset..end],
            Image::Memory(array) => &array[offset..end],
        })
    }
}
