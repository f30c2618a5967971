use std::cell::RefCell;
use std::rc::Rc;

use rand::{Rng, XorShiftRng};

use decfs::rad50;
use decfs::volume::block::{BlockDevice, BLOCK_SIZE};
use decfs::volume::error::VolumeError;
use decfs::volume::home::ODS1_STRUCTURE_LEVEL;
use decfs::volume::image::Image;
use decfs::volume::ods1::Ods1Volume;
use decfs::volume::{self, VolumeType};

const FUZZ_ITERATIONS: usize = 100;
const RNG_SEED: [u8; 16] = [
    0x04, 0xC1, 0x1D, 0xB7, 0x1E, 0xDC, 0x6F, 0x41, 0x74, 0x1B, 0x8C, 0xD7, 0x32, 0x58, 0x34, 0x99,
];

fn deterministic_rng() -> XorShiftRng {
    rand::SeedableRng::from_seed(RNG_SEED)
}

fn put_word(buffer: &mut [u8], offset: usize, value: u16) {
    buffer[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn fill_pattern(image: &mut [u8], first_block: usize, count: usize) {
    let start = first_block * BLOCK_SIZE;
    let end = start + count * BLOCK_SIZE;
    for (i, b) in image[start..end].iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
}

/// Build a Files-11 header block in the conventional layout: ident area
/// at word 23, map area at word 46, one (1,3) format retrieval pointer.
fn ods1_header(
    file_number: u16,
    level: u16,
    name: &str,
    ftype: &str,
    extent: (u32, u32),
    eof_block: u32,
    first_free_byte: u16,
) -> Vec<u8> {
    let mut block = vec![0u8; BLOCK_SIZE];
    block[0] = 23; // ident area offset, words
    block[1] = 46; // map area offset, words
    put_word(&mut block, 2, file_number);
    put_word(&mut block, 4, 1); // sequence
    put_word(&mut block, 6, level);
    put_word(&mut block, 8, 0o010_007); // owner

    // FCS attributes: end-of-file block (high word first) and first
    // free byte in that block.
    put_word(&mut block, 14 + 8, (eof_block >> 16) as u16);
    put_word(&mut block, 14 + 10, eof_block as u16);
    put_word(&mut block, 14 + 12, first_free_byte);

    let ident = 46;
    for (i, w) in rad50::encode_name(name, 3).unwrap().iter().enumerate() {
        put_word(&mut block, ident + i * 2, *w);
    }
    put_word(&mut block, ident + 6, rad50::encode_name(ftype, 1).unwrap()[0]);
    put_word(&mut block, ident + 8, 1); // version

    let map = 92;
    block[map + 6] = 1; // count field size
    block[map + 7] = 3; // LBN field size
    block[map + 8] = 2; // words in use
    let (lbn, count) = extent;
    block[map + 10] = (lbn >> 16) as u8;
    block[map + 11] = (count - 1) as u8;
    put_word(&mut block, map + 12, lbn as u16);
    block
}

/// A small ODS-1 volume: home block at LBN 1, one-block index bitmap at
/// LBN 2, headers from LBN 3.  The index file's extent starts at LBN 0
/// so that header slot `n` lands at LBN `2 + n`.
fn ods1_image() -> Vec<u8> {
    let mut image = vec![0u8; BLOCK_SIZE * 128];

    let home = &mut image[BLOCK_SIZE..2 * BLOCK_SIZE];
    put_word(home, 0, 1); // index bitmap size
    put_word(home, 2, 0); // bitmap LBN, high word
    put_word(home, 4, 2); // bitmap LBN, low word
    put_word(home, 6, 4); // max files
    put_word(home, 8, 1); // cluster factor
    put_word(home, 12, ODS1_STRUCTURE_LEVEL);
    home[14..21].copy_from_slice(b"TESTVOL");

    let index_header = ods1_header(1, ODS1_STRUCTURE_LEVEL, "INDEXF", "SYS", (0, 20), 0, 0);
    image[3 * BLOCK_SIZE..4 * BLOCK_SIZE].copy_from_slice(&index_header);

    // TEST.TXT;1 at header slot 2: three blocks at LBN 100, with the
    // end-of-file fields declaring 2*512+10 bytes.
    let file_header = ods1_header(2, ODS1_STRUCTURE_LEVEL, "TEST", "TXT", (100, 3), 3, 10);
    image[4 * BLOCK_SIZE..5 * BLOCK_SIZE].copy_from_slice(&file_header);

    fill_pattern(&mut image, 100, 3);
    image
}

/// A small RT-11 volume: one directory segment at block 6 holding a
/// single permanent file of 10 blocks starting at block 14.
fn rt11_image() -> Vec<u8> {
    let mut image = vec![0u8; BLOCK_SIZE * 64];
    {
        let seg = &mut image[6 * BLOCK_SIZE..8 * BLOCK_SIZE];
        put_word(seg, 0, 1); // total segments
        put_word(seg, 2, 0); // next segment
        put_word(seg, 4, 1); // highest segment
        put_word(seg, 6, 0); // extra bytes
        put_word(seg, 8, 14); // data start block

        put_word(seg, 10, 0o2000); // permanent
        let name = rad50::encode_name("BOOT", 2).unwrap();
        put_word(seg, 12, name[0]);
        put_word(seg, 14, name[1]);
        put_word(seg, 16, rad50::encode_name("SAV", 1).unwrap()[0]);
        put_word(seg, 18, 10); // length in blocks
        put_word(seg, 24, 0o4000); // end of segment
    }
    fill_pattern(&mut image, 14, 10);
    image
}

#[test]
fn test_ods1_listing() {
    let volume = volume::from_image(Image::from_bytes(ods1_image())).unwrap();
    assert_eq!(volume.volume_type(), VolumeType::Ods1);

    let files = volume.list_files().unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["INDEXF.SYS", "TEST.TXT"]);

    let test = &files[1];
    assert_eq!(test.size_blocks, 3);
    assert_eq!(test.size_bytes, 2 * BLOCK_SIZE + 10);
}

#[test]
fn test_ods1_extract_applies_truncation() {
    let image = ods1_image();
    let expected = image[100 * BLOCK_SIZE..100 * BLOCK_SIZE + 2 * BLOCK_SIZE + 10].to_vec();

    let volume = volume::from_image(Image::from_bytes(image)).unwrap();
    let file = volume.extract_file("TEST.TXT").unwrap();
    assert_eq!(file.data.len(), 2 * BLOCK_SIZE + 10);
    assert_eq!(file.data, expected);
    assert_eq!(file.record.size_bytes, file.data.len());
}

#[test]
fn test_ods1_wrong_level_header_excluded() {
    let mut image = ods1_image();
    // A header slot whose structure level is ODS-2: plausible, but not
    // something this implementation can interpret.
    let bad = ods1_header(3, 0o402, "BAD", "DAT", (110, 2), 0, 0);
    image[5 * BLOCK_SIZE..6 * BLOCK_SIZE].copy_from_slice(&bad);

    let volume = volume::from_image(Image::from_bytes(image)).unwrap();
    let names: Vec<String> = volume
        .list_files()
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert!(!names.iter().any(|n| n == "BAD.DAT"));
}

#[test]
fn test_ods1_damaged_index_header_falls_back_to_scan() {
    // Zero out the index file's own header: the precise index walk can
    // no longer resolve header slots, so discovery must fall back to
    // scanning the conventional ranges, where TEST.TXT's header still
    // sits.
    let mut image = ods1_image();
    for b in image[3 * BLOCK_SIZE..4 * BLOCK_SIZE].iter_mut() {
        *b = 0;
    }

    let volume = volume::from_image(Image::from_bytes(image)).unwrap();
    let files = volume.list_files().unwrap();
    assert!(files.iter().any(|f| f.name == "TEST.TXT"));

    let file = volume.extract_file("TEST.TXT").unwrap();
    assert_eq!(file.data.len(), 2 * BLOCK_SIZE + 10);
}

#[test]
fn test_ods1_unresolvable_map_listed_but_not_extractable() {
    let mut image = ods1_image();
    // Valid header whose map area declares field widths nothing uses.
    let mut odd = ods1_header(3, ODS1_STRUCTURE_LEVEL, "ODD", "DAT", (110, 2), 0, 0);
    odd[92 + 6] = 3;
    odd[92 + 7] = 5;
    image[5 * BLOCK_SIZE..6 * BLOCK_SIZE].copy_from_slice(&odd);

    let volume = volume::from_image(Image::from_bytes(image)).unwrap();
    let files = volume.list_files().unwrap();
    let odd = files.iter().find(|f| f.name == "ODD.DAT").unwrap();
    assert_eq!(odd.allocation, decfs::Allocation::Unresolvable);

    let err = volume.extract_file("ODD.DAT").unwrap_err();
    assert_eq!(err, VolumeError::UnknownFormat);
}

#[test]
fn test_ods1_missing_file() {
    let volume = volume::from_image(Image::from_bytes(ods1_image())).unwrap();
    let err = volume.extract_file("NOPE.DAT").unwrap_err();
    assert_eq!(err, VolumeError::NotFound);
}

#[test]
fn test_rt11_end_to_end() {
    let image = rt11_image();
    let expected = image[14 * BLOCK_SIZE..24 * BLOCK_SIZE].to_vec();

    let volume = volume::from_image(Image::from_bytes(image)).unwrap();
    assert_eq!(volume.volume_type(), VolumeType::Rt11);

    let files = volume.list_files().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "BOOT.SAV");
    assert_eq!(files[0].size_blocks, 10);

    let file = volume.extract_file("BOOT.SAV").unwrap();
    assert_eq!(file.data.len(), 10 * BLOCK_SIZE);
    assert_eq!(file.data, expected);
}

#[test]
fn test_unmountable_image_rejected() {
    // All zeros: no ODS-1 structure level, no plausible RT-11 segment.
    let err = volume::from_image(Image::from_bytes(vec![0u8; BLOCK_SIZE * 16])).unwrap_err();
    assert_eq!(err, VolumeError::Unknown);
}

#[test]
fn test_home_block_fuzz_zero_bitmap_size() {
    // However the rest of the home block is scrambled, a zero index
    // bitmap size must always refuse to mount as InvalidHomeBlock.
    let mut rng = deterministic_rng();
    for _ in 0..FUZZ_ITERATIONS {
        let mut image = vec![0u8; BLOCK_SIZE * 16];
        rng.fill(&mut image[BLOCK_SIZE..2 * BLOCK_SIZE]);
        put_word(&mut image[BLOCK_SIZE..], 0, 0); // H.IBSZ
        let device = Rc::new(RefCell::new(
            BlockDevice::new(Image::from_bytes(image)).unwrap(),
        ));
        let err = Ods1Volume::new(device).unwrap_err();
        assert_eq!(err, VolumeError::InvalidHomeBlock);
    }
}
