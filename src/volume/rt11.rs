//! RT-11 volumes: directory segment chain walking and contiguous file
//! extraction behind the common `Volume` trait.
//!
//! RT-11's home block carries no checkable structure level, so mounting
//! is gated on the first directory segment looking plausible rather
//! than on a signature.  The home block's identification strings are
//! read best-effort for display only.

use std::io;

use log::debug;

use crate::util::ascii_trimmed;
use crate::volume::directory::{self, DirectoryEntry};
use crate::volume::error::VolumeError;
use crate::volume::{
    block::BLOCK_SIZE, Allocation, BlockDeviceRef, ExtractedFile, FileKind, FileRecord, Volume,
    VolumeType,
};

const HOME_BLOCK_LBN: usize = 1;

// Identification strings in the home block, 12 ASCII bytes each.
const H_VOLID: usize = 0o730;
const H_OWNER: usize = 0o744;
const H_SYSID: usize = 0o760;
const ID_LEN: usize = 12;

/// Directory files rarely exceed a handful of segments; a first segment
/// claiming more than this is noise, not a directory.
const MAX_SEGMENTS: usize = 31;

#[derive(Debug)]
pub struct Rt11Volume {
    device: BlockDeviceRef,
    volume_id: String,
    owner: String,
    system_id: String,
}

impl Rt11Volume {
    /// Mount an RT-11 volume.  The gate is the first directory segment:
    /// its header must describe a plausible chain and data area.
    pub fn new(device: BlockDeviceRef) -> io::Result<Rt11Volume> {
        let (volume_id, owner, system_id) = {
            let blocks = device.borrow();
            let total = blocks.total_blocks();
            let segment = directory::Segment::read(&blocks, 1)?;
            if segment.total_segments == 0 || segment.total_segments > MAX_SEGMENTS {
                debug!(
                    "first segment claims {} total segments",
                    segment.total_segments
                );
                return Err(VolumeError::InvalidLayout.into());
            }
            if segment.data_start == 0 || segment.data_start >= total {
                debug!("first segment data start {} out of range", segment.data_start);
                return Err(VolumeError::InvalidLayout.into());
            }
            let home = blocks.block(HOME_BLOCK_LBN)?;
            (
                ascii_trimmed(&home[H_VOLID..H_VOLID + ID_LEN]),
                ascii_trimmed(&home[H_OWNER..H_OWNER + ID_LEN]),
                ascii_trimmed(&home[H_SYSID..H_SYSID + ID_LEN]),
            )
        };
        Ok(Rt11Volume {
            device,
            volume_id,
            owner,
            system_id,
        })
    }

    fn valid_entries(&self) -> io::Result<Vec<DirectoryEntry>> {
        let blocks = self.device.borrow();
        let total = blocks.total_blocks();
        let entries = directory::walk_directory(&blocks)?;
        Ok(entries
            .into_iter()
            .filter(|e| e.is_valid_file(total))
            .collect())
    }

    fn record_for(entry: &DirectoryEntry) -> FileRecord {
        let name = entry.name.clone().unwrap_or_default();
        let extension = name.rsplit_once('.').map_or("", |(_, ext)| ext);
        FileRecord {
            name: name.clone(),
            size_blocks: entry.length,
            size_bytes: entry.length * BLOCK_SIZE,
            kind: FileKind::classify(extension),
            date: entry.date.clone(),
            allocation: Allocation::Contiguous {
                start_block: entry.start_block,
                length: entry.length,
            },
        }
    }
}

impl Volume for Rt11Volume {
    fn volume_type(&self) -> VolumeType {
        VolumeType::Rt11
    }

    fn describe(&self) -> String {
        let mut text = format!("{} volume", self.volume_type());
        if !self.volume_id.is_empty() {
            text.push_str(&format!(" {:?}", self.volume_id));
        }
        if !self.owner.is_empty() {
            text.push_str(&format!(", owner {}", self.owner));
        }
        if !self.system_id.is_empty() {
            text.push_str(&format!(" ({})", self.system_id));
        }
        text
    }

    fn list_files(&self) -> io::Result<Vec<FileRecord>> {
        Ok(self.valid_entries()?.iter().map(Self::record_for).collect())
    }

    fn extract_file(&self, name: &str) -> io::Result<ExtractedFile> {
        let entries = self.valid_entries()?;
        let entry = entries
            .iter()
            .find(|e| e.name.as_deref() == Some(name))
            .ok_or(VolumeError::NotFound)?;

        let blocks = self.device.borrow();
        let data = blocks
            .blocks_owned(entry.start_block, entry.length)
            .map_err(|e| {
                debug!(
                    "blocks {}..{} unreadable: {}",
                    entry.start_block,
                    entry.start_block + entry.length,
                    e
                );
                io::Error::from(VolumeError::ReadError)
            })?;
        Ok(ExtractedFile {
            record: Self::record_for(entry),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::directory::STATUS_PERMANENT;

    fn entry(name: &str) -> DirectoryEntry {
        DirectoryEntry {
            status: STATUS_PERMANENT,
            name: Some(name.to_string()),
            length: 1,
            start_block: 14,
            job: 0,
            channel: 0,
            date: None,
        }
    }

    #[test]
    fn test_classification_uses_extension_only() {
        assert_eq!(Rt11Volume::record_for(&entry("NOTES.TXT")).kind, FileKind::Text);
        // A dotless name has no extension; the name itself must not be
        // mistaken for one.
        assert_eq!(Rt11Volume::record_for(&entry("TXT")).kind, FileKind::Binary);
        assert_eq!(Rt11Volume::record_for(&entry("BOOT.SAV")).kind, FileKind::Executable);
    }
}
