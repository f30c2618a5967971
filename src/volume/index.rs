//! Discovery of Files-11 file headers.
//!
//! The primary path resolves the index file (file #1) through its own
//! retrieval pointers and enumerates header blocks exactly.  When that
//! resolution fails (damaged index header, unresolvable map), the
//! walker falls back to a bounded heuristic scan of block ranges where
//! headers are conventionally found.  The fallback relies on the header
//! validator to separate genuine headers from noise.

use std::io;

use log::{debug, info};

use crate::volume::block::BlockDevice;
use crate::volume::error::VolumeError;
use crate::volume::header::FileHeader;
use crate::volume::home::HomeBlock;
use crate::volume::map::Extent;

/// Index file VBN 1 is the boot block and VBN 2 the home block; the
/// bitmap follows, and file headers come after that.  The header for
/// file `n` is index file VBN `2 + bitmap_size + n`.
const INDEX_FILE_NUMBER: u16 = 1;

/// Upper bound on blocks probed by the fallback scan, independent of
/// volume size.
const SCAN_BLOCK_LIMIT: usize = 4096;

/// A header together with the logical block it was found in.
pub struct DiscoveredHeader {
    pub lbn: usize,
    pub header: FileHeader,
}

/// Map a file-relative virtual block number (1-based) to a logical
/// block number through an extent list.
pub fn vbn_to_lbn(extents: &[Extent], vbn: usize) -> Option<usize> {
    let mut remaining = vbn.checked_sub(1)?;
    for extent in extents {
        // Only the (0,0) sentinel is a hole; an extent may legitimately
        // start at LBN 0, where the boot block lives.
        if extent.is_empty() {
            continue;
        }
        let count = extent.count as usize;
        if remaining < count {
            return Some(extent.lbn as usize + remaining);
        }
        remaining -= count;
    }
    None
}

/// Enumerate all valid file headers on the volume.
///
/// Per-candidate parse failures are soft rejections: the candidate is
/// skipped and discovery continues.  Only volume-level I/O trouble that
/// prevents any discovery at all surfaces as an error.
pub fn discover_headers(
    blocks: &BlockDevice,
    home: &HomeBlock,
) -> io::Result<Vec<DiscoveredHeader>> {
    match walk_index_file(blocks, home) {
        Ok(found) if !found.is_empty() => Ok(found),
        Ok(_) => {
            info!("index file walk found no headers; falling back to range scan");
            Ok(scan_ranges(blocks, home))
        }
        Err(e) => {
            info!("index file resolution failed ({}); falling back to range scan", e);
            Ok(scan_ranges(blocks, home))
        }
    }
}

/// Primary discovery: read the index file's own header, then map each
/// file's header block through the index file's retrieval pointers.
fn walk_index_file(blocks: &BlockDevice, home: &HomeBlock) -> io::Result<Vec<DiscoveredHeader>> {
    // The index file's own header is the first header slot, directly
    // after the index file bitmap.
    let index_header_lbn = home.index_bitmap_lbn as usize + home.index_bitmap_size as usize;
    let block = blocks.block(index_header_lbn)?;
    let index_header = FileHeader::parse(block, home.structure_level)?;
    if index_header.file_number != INDEX_FILE_NUMBER {
        debug!(
            "block {} is not the index file header (file number {})",
            index_header_lbn, index_header.file_number
        );
        return Err(VolumeError::InvalidHeader.into());
    }
    let extents = match index_header.extents {
        Some(ref extents) if !(extents.len() == 1 && extents[0].is_empty()) => extents.clone(),
        _ => return Err(VolumeError::Unresolvable.into()),
    };

    let first_header_vbn = 2 + home.index_bitmap_size as usize;
    let mut found = Vec::new();
    for file_number in 1..=home.max_files as usize {
        let vbn = first_header_vbn + file_number;
        let lbn = match vbn_to_lbn(&extents, vbn) {
            Some(lbn) => lbn,
            None => break, // past the allocated end of the index file
        };
        let block = match blocks.block(lbn) {
            Ok(block) => block,
            Err(e) => {
                debug!("header slot {} at LBN {} unreadable: {}", file_number, lbn, e);
                continue;
            }
        };
        match FileHeader::parse(block, home.structure_level) {
            Ok(header) if header.file_number as usize == file_number => {
                found.push(DiscoveredHeader { lbn, header });
            }
            Ok(header) => debug!(
                "header slot {} holds file number {}; skipped",
                file_number, header.file_number
            ),
            Err(_) => {} // empty or never-used header slot
        }
    }
    Ok(found)
}

/// Fallback discovery: probe bounded ranges near the home block, near
/// the index file bitmap, and at proportional offsets on large volumes.
fn scan_ranges(blocks: &BlockDevice, home: &HomeBlock) -> Vec<DiscoveredHeader> {
    let total = blocks.total_blocks();
    let bitmap_lbn = home.index_bitmap_lbn as usize;
    let bitmap_end = bitmap_lbn + home.index_bitmap_size as usize;
    let headers_span = (home.max_files as usize).min(SCAN_BLOCK_LIMIT / 2);

    let mut ranges: Vec<(usize, usize)> = vec![
        // Right after the home block.
        (2, 2 + 16),
        // The conventional header region after the index file bitmap.
        (bitmap_end, bitmap_end + headers_span),
    ];
    if total > 8192 {
        // Large volumes sometimes carry index extensions further out.
        ranges.push((total / 2, total / 2 + 16));
        ranges.push((total * 3 / 4, total * 3 / 4 + 16));
    }

    let mut found: Vec<DiscoveredHeader> = Vec::new();
    let mut probed = 0usize;
    for (start, end) in ranges {
        for lbn in start..end.min(total) {
            if probed >= SCAN_BLOCK_LIMIT {
                debug!("range scan stopped at probe limit");
                return found;
            }
            probed += 1;
            let block = match blocks.block(lbn) {
                Ok(block) => block,
                Err(_) => continue, // skip unreadable candidates, keep scanning
            };
            let header = match FileHeader::parse(block, home.structure_level) {
                Ok(header) => header,
                Err(_) => continue,
            };
            // The same header may be visible from overlapping ranges.
            if found.iter().any(|d| {
                d.header.file_number == header.file_number
                    && d.header.file_sequence == header.file_sequence
            }) {
                continue;
            }
            found.push(DiscoveredHeader { lbn, header });
        }
    }
    found
}
