//! The Files-11 home block: the volume's fixed-location metadata block,
//! analogous to a superblock.  ODS-1 places it at logical block 1.

use std::fmt;
use std::io;

use log::warn;

use crate::util::ascii_trimmed;
use crate::volume::block::{dword_high_low, word, BlockDevice};
use crate::volume::error::VolumeError;
use crate::volume::Uic;

/// The logical block holding the home block.
pub const HOME_BLOCK_LBN: usize = 1;

/// H.VLEV for ODS-1: version 1, level 1 (0x0101).  This implementation
/// targets exactly this structure level; ODS-2 and later are rejected.
pub const ODS1_STRUCTURE_LEVEL: u16 = 0o401;

// Home block field offsets, in bytes.
const H_IBSZ: usize = 0; // index file bitmap size, blocks
const H_IBLB: usize = 2; // index file bitmap LBN, high word first
const H_FMAX: usize = 6; // maximum number of files
const H_SBCL: usize = 8; // storage bitmap cluster factor
const H_DVTY: usize = 10; // disk device type
const H_VLEV: usize = 12; // volume structure level
const H_VNAM: usize = 14; // volume name, 12 bytes, space padded
const H_VOWN: usize = 30; // volume owner UIC
const H_VPRO: usize = 32; // volume protection
const H_VCHA: usize = 34; // volume characteristics
const H_DFPR: usize = 36; // default file protection
const H_WISZ: usize = 44; // default window size, 1 byte
const H_FIEX: usize = 45; // default file extend, 1 byte
const H_VDAT: usize = 60; // volume creation date, 14 ASCII bytes
const VNAM_LEN: usize = 12;
const VDAT_LEN: usize = 14;

/// Volume-identifying metadata parsed from the home block.  Immutable
/// once parsed; a volume whose home block fails validation supports no
/// further operations.
pub struct HomeBlock {
    pub index_bitmap_size: u16,
    pub index_bitmap_lbn: u32,
    pub max_files: u16,
    pub cluster_factor: u16,
    pub device_type: u16,
    pub structure_level: u16,
    pub volume_name: String,
    pub owner: Uic,
    pub protection: u16,
    pub characteristics: u16,
    pub default_file_protection: u16,
    pub default_window_size: u8,
    pub default_file_extend: u8,
    pub creation_date: String,
}

impl HomeBlock {
    /// Read and validate the home block.  Validation is fail-closed: a
    /// zero index bitmap size or LBN, a zero file limit, or a structure
    /// level other than ODS-1 makes the whole volume unusable.
    pub fn read(blocks: &BlockDevice) -> io::Result<HomeBlock> {
        let block = blocks.block(HOME_BLOCK_LBN)?;
        let home = HomeBlock {
            index_bitmap_size: word(block, H_IBSZ),
            index_bitmap_lbn: dword_high_low(block, H_IBLB),
            max_files: word(block, H_FMAX),
            cluster_factor: word(block, H_SBCL),
            device_type: word(block, H_DVTY),
            structure_level: word(block, H_VLEV),
            volume_name: ascii_trimmed(&block[H_VNAM..H_VNAM + VNAM_LEN]),
            owner: Uic::from_word(word(block, H_VOWN)),
            protection: word(block, H_VPRO),
            characteristics: word(block, H_VCHA),
            default_file_protection: word(block, H_DFPR),
            default_window_size: block[H_WISZ],
            default_file_extend: block[H_FIEX],
            creation_date: ascii_trimmed(&block[H_VDAT..H_VDAT + VDAT_LEN]),
        };
        home.validate()?;
        Ok(home)
    }

    fn validate(&self) -> io::Result<()> {
        if self.structure_level != ODS1_STRUCTURE_LEVEL {
            warn!(
                "home block structure level {:#o} is not ODS-1 ({:#o})",
                self.structure_level, ODS1_STRUCTURE_LEVEL
            );
            return Err(VolumeError::InvalidHomeBlock.into());
        }
        if self.index_bitmap_size == 0 {
            warn!("home block has zero index file bitmap size");
            return Err(VolumeError::InvalidHomeBlock.into());
        }
        if self.index_bitmap_lbn == 0 {
            warn!("home block has zero index file bitmap LBN");
            return Err(VolumeError::InvalidHomeBlock.into());
        }
        if self.max_files == 0 {
            warn!("home block has zero maximum file count");
            return Err(VolumeError::InvalidHomeBlock.into());
        }
        Ok(())
    }
}

impl fmt::Debug for HomeBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "volume name: {:?}", self.volume_name)?;
        writeln!(f, "owner: {}", self.owner)?;
        writeln!(
            f,
            "structure level: {:#o}  max files: {}  cluster: {}",
            self.structure_level, self.max_files, self.cluster_factor
        )?;
        writeln!(
            f,
            "index bitmap: {} block(s) at LBN {}",
            self.index_bitmap_size, self.index_bitmap_lbn
        )?;
        writeln!(f, "created: {}", self.creation_date)
    }
}
