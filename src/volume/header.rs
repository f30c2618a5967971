//! Files-11 file headers: one 512-byte block per file, holding the
//! file's identity, attributes, and the map area of retrieval pointers.
//!
//! Because header blocks may be discovered by heuristic scanning (see
//! `index.rs`), the parser doubles as the primary correctness gate: a
//! block that fails any structural check is rejected and the scan moves
//! on, rather than presenting garbage to the caller.

use std::fmt;
use std::io;

use log::debug;

use crate::rad50;
use crate::util::ascii_trimmed;
use crate::volume::block::{dword_high_low, word, BLOCK_SIZE};
use crate::volume::error::VolumeError;
use crate::volume::map::{decode_retrieval_pointers, Extent};
use crate::volume::Uic;

// Header area offsets, bytes.
const H_IDOF: usize = 0; // ident area offset, in words
const H_MPOF: usize = 1; // map area offset, in words
const H_FNUM: usize = 2; // file number
const H_FSEQ: usize = 4; // file sequence number
const H_FLEV: usize = 6; // structure level
const H_FOWN: usize = 8; // owner UIC
const H_FPRO: usize = 10; // protection
const H_FCHA: usize = 12; // characteristics
const H_UFAT: usize = 14; // user attribute area (FCS-11 file attributes)

// FCS-11 attribute offsets within the user attribute area.
const F_RTYP: usize = 0; // record type, 1 byte
const F_RATT: usize = 1; // record attributes, 1 byte
const F_RSIZ: usize = 2; // record size
const F_HIBK: usize = 4; // highest VBN allocated, high word first
const F_EFBK: usize = 8; // end of file block, high word first
const F_FFBY: usize = 12; // first free byte in the EOF block

// Ident area offsets, bytes from the start of the ident area.
const I_FNAM: usize = 0; // file name, 3 RADIX-50 words
const I_FTYP: usize = 6; // file type, 1 RADIX-50 word
const I_FVER: usize = 8; // version, signed
const I_RVDT: usize = 12; // revision date, "DDMMMYY"
const I_RVTI: usize = 19; // revision time, "HHMMSS"
const I_CRDT: usize = 25; // creation date
const I_CRTI: usize = 32; // creation time
const IDENT_AREA_SIZE: usize = 46;

// Map area offsets, bytes from the start of the map area.
const M_CTSZ: usize = 6; // count field size, bytes
const M_LBSZ: usize = 7; // LBN field size, bytes
const M_USE: usize = 8; // map words in use
const M_RTRV: usize = 10; // first retrieval pointer

// The last word of the header block is the checksum; retrieval pointers
// may not extend into it.
const CHECKSUM_OFFSET: usize = BLOCK_SIZE - 2;

/// A validated Files-11 file header.  Produced transiently while
/// scanning; never mutated after validation.
#[derive(Debug)]
pub struct FileHeader {
    pub file_number: u16,
    pub file_sequence: u16,
    pub structure_level: u16,
    pub owner: Uic,
    pub protection: u16,
    pub characteristics: u16,
    pub record_type: u8,
    pub record_attributes: u8,
    pub record_size: u16,
    pub highest_vbn: u32,
    pub eof_block: u32,
    pub first_free_byte: u16,
    /// Decoded file name, or None when the RADIX-50 field held no valid
    /// words at all.
    pub name: Option<String>,
    pub file_type: Option<String>,
    pub version: i16,
    pub creation_date: String,
    pub revision_date: String,
    pub count_size: u8,
    pub lbn_size: u8,
    /// The decoded extent list.  `Some(vec![Extent::EMPTY])` is an
    /// allocated-but-empty file; None means the map area's field widths
    /// were unrecognized and the allocation is unresolvable.
    pub extents: Option<Vec<Extent>>,
}

impl FileHeader {
    /// Parse and validate a candidate header block.  Any structural
    /// implausibility rejects the block with `InvalidHeader`; scanning
    /// callers treat that as a soft rejection.
    pub fn parse(block: &[u8], expected_level: u16) -> io::Result<FileHeader> {
        if block.len() != BLOCK_SIZE {
            return Err(VolumeError::InvalidHeader.into());
        }

        let file_number = word(block, H_FNUM);
        if file_number == 0 {
            debug!("header candidate rejected: zero file number");
            return Err(VolumeError::InvalidHeader.into());
        }

        let structure_level = word(block, H_FLEV);
        if structure_level != expected_level {
            debug!(
                "header candidate rejected: structure level {:#o} (want {:#o})",
                structure_level, expected_level
            );
            return Err(VolumeError::InvalidHeader.into());
        }

        // H.IDOF and H.MPOF are word offsets; double them for bytes.
        // Both areas must land inside the header block, in order, and
        // without overlapping.
        let ident_offset = usize::from(block[H_IDOF]) * 2;
        let map_offset = usize::from(block[H_MPOF]) * 2;
        if ident_offset < H_UFAT
            || ident_offset + IDENT_AREA_SIZE > map_offset
            || map_offset + M_RTRV > CHECKSUM_OFFSET
        {
            debug!(
                "header candidate rejected: area offsets ident={} map={}",
                ident_offset, map_offset
            );
            return Err(VolumeError::InvalidHeader.into());
        }

        let ident = &block[ident_offset..];
        let name_words = [
            word(ident, I_FNAM),
            word(ident, I_FNAM + 2),
            word(ident, I_FNAM + 4),
        ];
        let name = rad50::decode_name(&name_words);
        let file_type = rad50::decode_name(&[word(ident, I_FTYP)]);

        let map = &block[map_offset..CHECKSUM_OFFSET];
        let count_size = map[M_CTSZ];
        let lbn_size = map[M_LBSZ];
        let words_in_use = usize::from(map[M_USE]);
        let pointers = &map[M_RTRV..];
        let extents =
            match decode_retrieval_pointers(pointers, count_size, lbn_size, words_in_use) {
                Ok(extents) => Some(extents),
                Err(ref e) if *e == VolumeError::UnknownFormat => None,
                Err(e) => return Err(e),
            };

        let attributes = &block[H_UFAT..];
        Ok(FileHeader {
            file_number,
            file_sequence: word(block, H_FSEQ),
            structure_level,
            owner: Uic::from_word(word(block, H_FOWN)),
            protection: word(block, H_FPRO),
            characteristics: word(block, H_FCHA),
            record_type: attributes[F_RTYP],
            record_attributes: attributes[F_RATT],
            record_size: word(attributes, F_RSIZ),
            highest_vbn: dword_high_low(attributes, F_HIBK),
            eof_block: dword_high_low(attributes, F_EFBK),
            first_free_byte: word(attributes, F_FFBY),
            name,
            file_type,
            version: word(ident, I_FVER) as i16,
            creation_date: date_time(&ident[I_CRDT..I_CRDT + 7], &ident[I_CRTI..I_CRTI + 6]),
            revision_date: date_time(&ident[I_RVDT..I_RVDT + 7], &ident[I_RVTI..I_RVTI + 6]),
            count_size,
            lbn_size,
            extents,
        })
    }

    /// The user-facing filename, e.g. `TEST.TXT`.  Headers whose name
    /// field held no valid RADIX-50 words get a placeholder derived from
    /// the file number, so they remain addressable.
    pub fn display_name(&self) -> String {
        match (&self.name, &self.file_type) {
            (Some(name), Some(ftype)) if !ftype.is_empty() => format!("{}.{}", name, ftype),
            (Some(name), _) => name.clone(),
            (None, _) => format!("FILE-{}", self.file_number),
        }
    }

    /// Declared byte size from the FCS end-of-file fields, if present.
    /// `eof_block` counts from 1; `first_free_byte == 0` means the EOF
    /// block is fully used.
    pub fn byte_size(&self) -> Option<usize> {
        if self.eof_block == 0 {
            return None;
        }
        let full_blocks = (self.eof_block as usize - 1) * BLOCK_SIZE;
        let tail = if self.first_free_byte > 0 {
            self.first_free_byte as usize
        } else {
            BLOCK_SIZE
        };
        Some(full_blocks + tail)
    }

    /// Blocks of data covered by the extent list.
    pub fn size_blocks(&self) -> usize {
        match &self.extents {
            Some(extents) => extents.iter().map(|e| e.count as usize).sum(),
            None => 0,
        }
    }
}

impl fmt::Display for FileHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "({},{}) {};{} {}",
            self.file_number,
            self.file_sequence,
            self.display_name(),
            self.version,
            self.owner
        )
    }
}

/// Combine the ident area's ASCII `DDMMMYY` date and `HHMMSS` time
/// fields into one display string.  Unset fields (zeros or spaces)
/// yield an empty string.
fn date_time(date: &[u8], time: &[u8]) -> String {
    let date = ascii_trimmed(date);
    let time = ascii_trimmed(time);
    match (date.is_empty(), time.is_empty()) {
        (true, _) => String::new(),
        (false, true) => date,
        (false, false) => format!("{} {}", date, time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::home::ODS1_STRUCTURE_LEVEL;

    fn put_word(block: &mut [u8], offset: usize, value: u16) {
        block[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    /// Build a minimal valid header block in the conventional layout:
    /// ident area at word 23, map area at word 46.
    fn synthetic_header(name: &str, ftype: &str, extent: (u32, u32)) -> Vec<u8> {
        let mut block = vec![0u8; BLOCK_SIZE];
        block[H_IDOF] = 23;
        block[H_MPOF] = 46;
        put_word(&mut block, H_FNUM, 7);
        put_word(&mut block, H_FSEQ, 1);
        put_word(&mut block, H_FLEV, ODS1_STRUCTURE_LEVEL);
        put_word(&mut block, H_FOWN, 0o010_007);

        let ident = 46;
        let name_words = rad50::encode_name(name, 3).unwrap();
        for (i, w) in name_words.iter().enumerate() {
            put_word(&mut block, ident + I_FNAM + i * 2, *w);
        }
        put_word(
            &mut block,
            ident + I_FTYP,
            rad50::encode_name(ftype, 1).unwrap()[0],
        );
        put_word(&mut block, ident + I_FVER, 1);

        let map = 92;
        block[map + M_CTSZ] = 1;
        block[map + M_LBSZ] = 3;
        block[map + M_USE] = 2;
        let (lbn, count) = extent;
        block[map + M_RTRV] = (lbn >> 16) as u8;
        block[map + M_RTRV + 1] = (count - 1) as u8;
        put_word(&mut block, map + M_RTRV + 2, lbn as u16);
        block
    }

    #[test]
    fn test_parse_valid_header() {
        let block = synthetic_header("TEST", "TXT", (100, 3));
        let header = FileHeader::parse(&block, ODS1_STRUCTURE_LEVEL).unwrap();
        assert_eq!(header.file_number, 7);
        assert_eq!(header.display_name(), "TEST.TXT");
        assert_eq!(header.version, 1);
        assert_eq!(header.owner, Uic::from_word(0o010_007));
        assert_eq!(
            header.extents,
            Some(vec![Extent {
                lbn: 100,
                count: 3
            }])
        );
        assert_eq!(header.size_blocks(), 3);
    }

    #[test]
    fn test_zero_file_number_rejected() {
        let mut block = synthetic_header("TEST", "TXT", (100, 3));
        put_word(&mut block, H_FNUM, 0);
        let err = FileHeader::parse(&block, ODS1_STRUCTURE_LEVEL).unwrap_err();
        assert_eq!(err, VolumeError::InvalidHeader);
    }

    #[test]
    fn test_wrong_structure_level_rejected() {
        let mut block = synthetic_header("TEST", "TXT", (100, 3));
        put_word(&mut block, H_FLEV, 0o402);
        let err = FileHeader::parse(&block, ODS1_STRUCTURE_LEVEL).unwrap_err();
        assert_eq!(err, VolumeError::InvalidHeader);
    }

    #[test]
    fn test_implausible_area_offsets_rejected() {
        // Map area starting past the checksum word.
        let mut block = synthetic_header("TEST", "TXT", (100, 3));
        block[H_MPOF] = 255;
        assert!(FileHeader::parse(&block, ODS1_STRUCTURE_LEVEL).is_err());

        // Ident area overlapping the map area.
        let mut block = synthetic_header("TEST", "TXT", (100, 3));
        block[H_IDOF] = 45;
        assert!(FileHeader::parse(&block, ODS1_STRUCTURE_LEVEL).is_err());

        // Ident area inside the fixed header fields.
        let mut block = synthetic_header("TEST", "TXT", (100, 3));
        block[H_IDOF] = 2;
        assert!(FileHeader::parse(&block, ODS1_STRUCTURE_LEVEL).is_err());
    }

    #[test]
    fn test_unknown_map_format_is_unresolvable_not_fatal() {
        let mut block = synthetic_header("TEST", "TXT", (100, 3));
        block[92 + M_CTSZ] = 3;
        block[92 + M_LBSZ] = 5;
        let header = FileHeader::parse(&block, ODS1_STRUCTURE_LEVEL).unwrap();
        assert_eq!(header.extents, None);
    }

    #[test]
    fn test_byte_size() {
        let mut block = synthetic_header("TEST", "TXT", (100, 3));
        let attrs = H_UFAT;
        // EOF block 3 (high word first), 40 bytes used in the last block.
        put_word(&mut block, attrs + F_EFBK, 0);
        put_word(&mut block, attrs + F_EFBK + 2, 3);
        put_word(&mut block, attrs + F_FFBY, 40);
        let header = FileHeader::parse(&block, ODS1_STRUCTURE_LEVEL).unwrap();
        assert_eq!(header.byte_size(), Some(2 * BLOCK_SIZE + 40));

        // first_free_byte == 0: the EOF block is entirely used.
        put_word(&mut block, attrs + F_FFBY, 0);
        let header = FileHeader::parse(&block, ODS1_STRUCTURE_LEVEL).unwrap();
        assert_eq!(header.byte_size(), Some(3 * BLOCK_SIZE));
    }
}
