//! Decoding of the map area of a Files-11 file header: the variable-width
//! retrieval pointers that describe which logical blocks a file occupies.

use std::fmt;
use std::io;

use crate::volume::block::word;
use crate::volume::error::VolumeError;

/// One extent: a contiguous run of `count` blocks starting at `lbn`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extent {
    pub lbn: u32,
    pub count: u32,
}

impl Extent {
    /// The sentinel for a file that is allocated but holds no data.  A
    /// decoded extent list of exactly `[Extent::EMPTY]` means "empty
    /// file", which is distinct from a decode failure.
    pub const EMPTY: Extent = Extent { lbn: 0, count: 0 };

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lbn == 0 && self.count == 0
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.lbn, self.count)
    }
}

/// Cap on decoded pointers per header, guarding against runaway loops on
/// corrupt map areas.  Hitting the cap is a soft stop, not a failure.
pub const MAX_POINTERS: usize = 100;

/// Decode the retrieval pointer region of a map area.
///
/// `count_size` and `lbn_size` come from the header's M.CTSZ and M.LBSZ
/// bytes and select the pointer layout; only `(1,3)`, `(2,2)`, and
/// `(2,4)` are defined.  The on-disk count field stores `blocks - 1`;
/// the extents returned here carry the actual block count.
pub fn decode_retrieval_pointers(
    map_area: &[u8],
    count_size: u8,
    lbn_size: u8,
    words_in_use: usize,
) -> io::Result<Vec<Extent>> {
    let pointer_bytes = match (count_size, lbn_size) {
        (1, 3) => 4,
        (2, 2) => 4,
        (2, 4) => 6,
        _ => return Err(VolumeError::UnknownFormat.into()),
    };

    let used = (words_in_use * 2).min(map_area.len());
    let region = &map_area[..used];

    // A region of nothing but zeros is the on-disk representation of an
    // allocated but empty file.  Callers must receive the sentinel, not
    // an empty list and not an error.
    if region.iter().all(|b| *b == 0) {
        return Ok(vec![Extent::EMPTY]);
    }

    let mut extents = Vec::new();
    let mut offset = 0;
    while offset + pointer_bytes <= region.len() && extents.len() < MAX_POINTERS {
        let (raw_count, lbn) = match (count_size, lbn_size) {
            (1, 3) => {
                // byte 0: high 8 bits of the LBN, byte 1: count,
                // bytes 2-3: low 16 bits of the LBN.
                let high = u32::from(region[offset]);
                let count = u32::from(region[offset + 1]);
                let low = u32::from(word(region, offset + 2));
                (count, (high << 16) | low)
            }
            (2, 2) => {
                let count = u32::from(word(region, offset));
                let lbn = u32::from(word(region, offset + 2));
                (count, lbn)
            }
            (2, 4) => {
                // 32-bit LBN stored low word first.
                let count = u32::from(word(region, offset));
                let low = u32::from(word(region, offset + 2));
                let high = u32::from(word(region, offset + 4));
                (count, (high << 16) | low)
            }
            _ => unreachable!(),
        };
        offset += pointer_bytes;

        if raw_count == 0 && lbn == 0 {
            // End-of-extents sentinel inside an otherwise non-empty list.
            break;
        }
        extents.push(Extent {
            lbn,
            count: raw_count + 1,
        });
    }
    Ok(extents)
}
