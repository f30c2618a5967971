//! RT-11 directory segments.
//!
//! An RT-11 directory is a chain of two-block segments starting at a
//! fixed block.  Each segment carries a five-word header and fixed-size
//! entries; file data is contiguous, so an entry's start block is the
//! segment's data start plus the lengths of all prior entries in the
//! segment, empty and tentative ones included.

use std::collections::HashSet;
use std::io;

use log::{debug, warn};

use crate::rad50;
use crate::volume::block::{word, BlockDevice, BLOCK_SIZE};
use crate::volume::error::VolumeError;

/// First directory segment, in logical blocks.
pub const DIRECTORY_START_BLOCK: usize = 6;

/// Every segment spans two blocks.
pub const BLOCKS_PER_SEGMENT: usize = 2;

/// Entry size before per-volume extra bytes.
const ENTRY_BASE_SIZE: usize = 14;

const SEGMENT_HEADER_SIZE: usize = 10;

// Entry status word bits.
pub const STATUS_TENTATIVE: u16 = 0o400;
pub const STATUS_EMPTY: u16 = 0o1000;
pub const STATUS_PERMANENT: u16 = 0o2000;
pub const STATUS_END_OF_SEGMENT: u16 = 0o4000;
pub const STATUS_PROTECTED: u16 = 0o100000;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One directory entry, with its start block already resolved from the
/// running allocation offset.
#[derive(Clone, Debug)]
pub struct DirectoryEntry {
    pub status: u16,
    /// Decoded "NAME.EXT"; None when the RADIX-50 words are invalid.
    pub name: Option<String>,
    /// File length in blocks.
    pub length: usize,
    /// First data block of the file.
    pub start_block: usize,
    pub job: u8,
    pub channel: u8,
    /// Decoded creation date; None when the packed word is zero or
    /// implausible.
    pub date: Option<String>,
}

impl DirectoryEntry {
    pub fn is_permanent(&self) -> bool {
        self.status & STATUS_PERMANENT != 0
    }

    pub fn is_empty_area(&self) -> bool {
        self.status & STATUS_EMPTY != 0
    }

    pub fn is_tentative(&self) -> bool {
        self.status & STATUS_TENTATIVE != 0
    }

    pub fn is_protected(&self) -> bool {
        self.status & STATUS_PROTECTED != 0
    }

    /// A listable file: permanent status, plausible length, and a name
    /// with at least one real character.
    pub fn is_valid_file(&self, total_blocks: usize) -> bool {
        self.is_permanent()
            && self.length > 0
            && self.length < total_blocks
            && self
                .name
                .as_ref()
                .map_or(false, |n| n.chars().any(|c| c != ' ' && c != '.'))
    }
}

/// Decode an RT-11 packed date word: month in bits 10-13, day in bits
/// 5-9, year in bits 0-4 relative to 1972, with an epoch extension in
/// bits 14-15 worth 32 years each.
pub fn decode_date(word: u16) -> Option<String> {
    if word == 0 {
        return None;
    }
    let age = (word >> 14) & 0o3;
    let month = (word >> 10) & 0o17;
    let day = (word >> 5) & 0o37;
    let year = 1972 + u32::from(word & 0o37) + 32 * u32::from(age);
    if month == 0 || month > 12 || day == 0 || day > 31 {
        return None;
    }
    Some(format!("{:02}-{}-{}", day, MONTHS[month as usize - 1], year))
}

/// A parsed directory segment.
pub struct Segment {
    pub number: usize,
    pub total_segments: usize,
    pub next_segment: usize,
    pub highest_segment: usize,
    pub extra_bytes: usize,
    pub data_start: usize,
    pub entries: Vec<DirectoryEntry>,
}

impl Segment {
    /// Read and parse one directory segment.  Segment numbers are
    /// 1-based, as on disk.
    pub fn read(blocks: &BlockDevice, number: usize) -> io::Result<Segment> {
        if number == 0 {
            return Err(VolumeError::InvalidEntry.into());
        }
        let lbn = DIRECTORY_START_BLOCK + BLOCKS_PER_SEGMENT * (number - 1);
        let raw = blocks.blocks_owned(lbn, BLOCKS_PER_SEGMENT)?;

        let total_segments = word(&raw, 0) as usize;
        let next_segment = word(&raw, 2) as usize;
        let highest_segment = word(&raw, 4) as usize;
        let extra_bytes = word(&raw, 6) as usize;
        let data_start = word(&raw, 8) as usize;

        let entry_size = ENTRY_BASE_SIZE + extra_bytes;
        let mut entries = Vec::new();
        let mut offset = SEGMENT_HEADER_SIZE;
        // Start block accumulates over every entry, listable or not.
        let mut next_start = data_start;
        while offset + entry_size <= BLOCKS_PER_SEGMENT * BLOCK_SIZE {
            let status = word(&raw, offset);
            if status & STATUS_END_OF_SEGMENT != 0 {
                break;
            }
            let name_words = [
                word(&raw, offset + 2),
                word(&raw, offset + 4),
                word(&raw, offset + 6),
            ];
            let length = word(&raw, offset + 8) as usize;
            let entry = DirectoryEntry {
                status,
                name: entry_name(&name_words),
                length,
                start_block: next_start,
                job: raw[offset + 10],
                channel: raw[offset + 11],
                date: decode_date(word(&raw, offset + 12)),
            };
            next_start += length;
            entries.push(entry);
            offset += entry_size;
        }

        Ok(Segment {
            number,
            total_segments,
            next_segment,
            highest_segment,
            extra_bytes,
            data_start,
            entries,
        })
    }
}

/// Join the two RADIX-50 name words and the extension word into the
/// conventional "NAME.EXT" rendering.
fn entry_name(words: &[u16; 3]) -> Option<String> {
    let name = rad50::decode_name(&words[..2])?;
    let ext = rad50::decode_name(&words[2..]).unwrap_or_default();
    if ext.is_empty() {
        Some(name)
    } else {
        Some(format!("{}.{}", name, ext))
    }
}

/// Walk the whole segment chain and return every entry in on-disk
/// order.  A revisited segment number or an out-of-range chain link
/// ends the walk without discarding what was already collected.
pub fn walk_directory(blocks: &BlockDevice) -> io::Result<Vec<DirectoryEntry>> {
    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    let mut number = 1;
    loop {
        if !seen.insert(number) {
            warn!("directory segment chain loops back to segment {}", number);
            break;
        }
        let segment = match Segment::read(blocks, number) {
            Ok(segment) => segment,
            // The first segment failing to read means there is no
            // directory at all; a later one failing truncates the walk
            // but keeps everything gathered so far.
            Err(e) if number == 1 => return Err(e),
            Err(e) => {
                warn!(
                    "directory segment {} unreadable ({}); keeping {} entries",
                    number,
                    e,
                    entries.len()
                );
                break;
            }
        };
        debug!(
            "segment {}: {} entries, next {}",
            number,
            segment.entries.len(),
            segment.next_segment
        );
        entries.extend(segment.entries);
        if segment.next_segment == 0 {
            break;
        }
        if segment.next_segment > segment.total_segments.max(seen.len()) {
            warn!(
                "directory segment {} links to implausible segment {}",
                number, segment.next_segment
            );
            break;
        }
        number = segment.next_segment;
    }
    Ok(entries)
}
