//! Files-11 ODS-1 volumes: home block, header discovery, and extent
//! materialization behind the common `Volume` trait.

use std::io;

use log::{debug, warn};

use crate::volume::error::VolumeError;
use crate::volume::header::FileHeader;
use crate::volume::home::HomeBlock;
use crate::volume::index;
use crate::volume::map::Extent;
use crate::volume::{
    Allocation, BlockDeviceRef, ExtractedFile, FileKind, FileRecord, Volume, VolumeType,
};

#[derive(Debug)]
pub struct Ods1Volume {
    device: BlockDeviceRef,
    home: HomeBlock,
}

impl Ods1Volume {
    /// Mount an ODS-1 volume.  Fails closed on an invalid home block;
    /// no other operation is attempted on a volume that cannot mount.
    pub fn new(device: BlockDeviceRef) -> io::Result<Ods1Volume> {
        let home = HomeBlock::read(&device.borrow())?;
        Ok(Ods1Volume { device, home })
    }

    pub fn home(&self) -> &HomeBlock {
        &self.home
    }

    fn headers(&self) -> io::Result<Vec<FileHeader>> {
        let device = self.device.borrow();
        let discovered = index::discover_headers(&device, &self.home)?;
        Ok(discovered.into_iter().map(|d| d.header).collect())
    }

    /// Concatenate a header's extents and apply end-of-file truncation.
    fn materialize(&self, header: &FileHeader) -> io::Result<Vec<u8>> {
        let extents = match &header.extents {
            Some(extents) => extents,
            None => {
                warn!(
                    "{} has an unrecognized map format ({},{})",
                    header.display_name(),
                    header.count_size,
                    header.lbn_size
                );
                return Err(VolumeError::UnknownFormat.into());
            }
        };

        let mut data = Vec::new();
        for extent in extents {
            if extent.is_empty() || extent.lbn == 0 {
                // Sentinel or hole; contributes no bytes.
                continue;
            }
            data.extend_from_slice(&self.read_extent(extent)?);
        }

        if let Some(byte_size) = header.byte_size() {
            if byte_size < data.len() {
                data.truncate(byte_size);
            }
        }
        Ok(data)
    }

    fn read_extent(&self, extent: &Extent) -> io::Result<Vec<u8>> {
        self.device
            .borrow()
            .blocks_owned(extent.lbn as usize, extent.count as usize)
            .map_err(|e| {
                debug!("extent {} unreadable: {}", extent, e);
                VolumeError::ReadError.into()
            })
    }

    fn record_for(header: &FileHeader) -> FileRecord {
        let size_blocks = header.size_blocks();
        let size_bytes = header
            .byte_size()
            .unwrap_or(size_blocks * crate::volume::block::BLOCK_SIZE);
        FileRecord {
            name: header.display_name(),
            size_blocks,
            size_bytes,
            kind: FileKind::classify(header.file_type.as_deref().unwrap_or("")),
            date: if header.creation_date.is_empty() {
                None
            } else {
                Some(header.creation_date.clone())
            },
            allocation: match &header.extents {
                Some(extents) => Allocation::Mapped(extents.clone()),
                None => Allocation::Unresolvable,
            },
        }
    }
}

impl Volume for Ods1Volume {
    fn volume_type(&self) -> VolumeType {
        VolumeType::Ods1
    }

    fn describe(&self) -> String {
        format!(
            "{} volume {:?}, owner {}",
            self.volume_type(),
            self.home.volume_name,
            self.home.owner
        )
    }

    fn list_files(&self) -> io::Result<Vec<FileRecord>> {
        Ok(self.headers()?.iter().map(Self::record_for).collect())
    }

    fn extract_file(&self, name: &str) -> io::Result<ExtractedFile> {
        let headers = self.headers()?;
        let header = headers
            .iter()
            .find(|h| h.display_name() == name)
            .ok_or(VolumeError::NotFound)?;
        let data = self.materialize(header)?;
        let mut record = Self::record_for(header);
        record.size_bytes = data.len();
        Ok(ExtractedFile { record, data })
    }
}
