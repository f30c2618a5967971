//! Volume-level model: open a disk image, identify its on-disk family,
//! and expose listing and extraction over a common trait.

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::rc::Rc;

use log::{debug, info, warn};

pub mod block;
pub mod directory;
pub mod error;
pub mod header;
pub mod home;
pub mod image;
pub mod index;
pub mod map;
pub mod ods1;
pub mod rt11;

use self::block::BlockDevice;
use self::error::VolumeError;
use self::image::Image;
use self::ods1::Ods1Volume;
use self::rt11::Rt11Volume;

pub use self::block::BlockDeviceRef;

/// User identification code, stored on disk as one word with the group
/// number in the high byte and the member number in the low byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Uic {
    pub group: u8,
    pub member: u8,
}

impl Uic {
    pub fn from_word(word: u16) -> Uic {
        Uic {
            group: (word >> 8) as u8,
            member: word as u8,
        }
    }
}

impl fmt::Display for Uic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Rendered in octal, the way DEC utilities print UICs.
        write!(f, "[{:o},{:o}]", self.group, self.member)
    }
}

/// Rough content classification derived from the file extension.  Used
/// only for display; extraction never depends on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Executable,
    Object,
    Binary,
}

impl FileKind {
    pub fn classify(extension: &str) -> FileKind {
        match extension.to_ascii_uppercase().as_str() {
            "TXT" | "MAC" | "FOR" | "BAS" | "LST" | "CMD" | "COM" | "DOC" | "HLP" => {
                FileKind::Text
            }
            "SAV" | "SYS" | "TSK" | "EXE" => FileKind::Executable,
            "OBJ" | "OLB" | "STB" | "MLB" => FileKind::Object,
            _ => FileKind::Binary,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            FileKind::Text => "text",
            FileKind::Executable => "executable",
            FileKind::Object => "object",
            FileKind::Binary => "binary",
        };
        f.write_str(text)
    }
}

/// The on-disk families this crate understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeType {
    Ods1,
    Rt11,
}

impl fmt::Display for VolumeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VolumeType::Ods1 => f.write_str("Files-11 ODS-1"),
            VolumeType::Rt11 => f.write_str("RT-11"),
        }
    }
}

/// How a file's data is laid out on the volume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Allocation {
    /// Files-11: an extent list decoded from retrieval pointers.
    Mapped(Vec<map::Extent>),
    /// RT-11: one contiguous run of blocks.
    Contiguous { start_block: usize, length: usize },
    /// The header is valid but its map area uses field widths this
    /// implementation does not recognize.  The file is listed, but
    /// extraction fails with `UnknownFormat`.
    Unresolvable,
}

/// Metadata for one listed file.  Listing never materializes data.
#[derive(Clone, Debug)]
pub struct FileRecord {
    pub name: String,
    pub size_blocks: usize,
    pub size_bytes: usize,
    pub kind: FileKind,
    pub date: Option<String>,
    pub allocation: Allocation,
}

impl FileRecord {
    /// The machine-readable record consumed by wrapping tools:
    /// `FILE_INFO: name|size_blocks|size_bytes|type|date|display_path`.
    pub fn info_line(&self, display_path: &str) -> String {
        format!(
            "FILE_INFO: {}|{}|{}|{}|{}|{}",
            self.name,
            self.size_blocks,
            self.size_bytes,
            self.kind,
            self.date.as_deref().unwrap_or(""),
            display_path
        )
    }
}

/// A fully materialized file.
#[derive(Debug)]
pub struct ExtractedFile {
    pub record: FileRecord,
    pub data: Vec<u8>,
}

/// Listing and extraction over one mounted volume.  Implementations
/// never write to the underlying image.
pub trait Volume: std::fmt::Debug {
    fn volume_type(&self) -> VolumeType;

    /// Human-readable volume identification for headers and banners.
    fn describe(&self) -> String;

    /// Best-effort metadata for every valid file found on the volume.
    fn list_files(&self) -> io::Result<Vec<FileRecord>>;

    /// Materialize one file by its listed name.  Fails with `NotFound`
    /// when the name matches no validated entry.
    fn extract_file(&self, name: &str) -> io::Result<ExtractedFile>;
}

/// Open a disk image and mount it as whichever volume family accepts
/// it.  ODS-1 is tried first because its home block carries a checkable
/// structure level; RT-11 has no such signature and is the fallback.
pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Volume>> {
    from_image(Image::open(path)?)
}

/// Mount an already-loaded image.
pub fn from_image(image: Image) -> io::Result<Box<dyn Volume>> {
    let device: BlockDeviceRef = Rc::new(RefCell::new(BlockDevice::new(image)?));
    match Ods1Volume::new(device.clone()) {
        Ok(volume) => {
            info!("mounted {}", volume.describe());
            return Ok(Box::new(volume));
        }
        Err(e) => debug!("not an ODS-1 volume: {}", e),
    }
    match Rt11Volume::new(device) {
        Ok(volume) => {
            info!("mounted {}", volume.describe());
            Ok(Box::new(volume))
        }
        Err(e) => {
            debug!("not an RT-11 volume: {}", e);
            Err(VolumeError::Unknown.into())
        }
    }
}

/// Per-file outcome counts for a batch extraction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractTally {
    pub extracted: usize,
    pub failed: usize,
}

/// Extract every listed file into `output_dir`.  Individual failures
/// are tallied and logged; they never abort the rest of the batch.
pub fn extract_all(volume: &dyn Volume, output_dir: &Path) -> io::Result<ExtractTally> {
    fs::create_dir_all(output_dir)?;
    let mut tally = ExtractTally::default();
    for record in volume.list_files()? {
        let target = output_dir.join(safe_filename(&record.name));
        let outcome = volume
            .extract_file(&record.name)
            .and_then(|file| fs::write(&target, &file.data));
        match outcome {
            Ok(()) => tally.extracted += 1,
            Err(e) => {
                warn!("could not extract {}: {}", record.name, e);
                tally.failed += 1;
            }
        }
    }
    Ok(tally)
}

/// Recovered names may contain placeholder or path-hostile characters.
fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect()
}
