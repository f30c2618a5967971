//! This is a Rust library for recovering files from disk images produced
//! by Digital Equipment Corporation (DEC) operating systems of the 1970's
//! and 1980's, principally RT-11 and the Files-11 ODS-1 structure used by
//! RSX-11 and early VMS.  The images themselves are flat files of 512-byte
//! logical blocks, as written by PDP-11 era disk and tape hardware.
//!
//! Features:
//!
//! * Open RT-11 and ODS-1 disk images, with automatic family detection.
//! * Parse and validate the ODS-1 home block and file headers.
//! * Resolve ODS-1 files through their retrieval pointers, with a
//! heuristic fallback scan for volumes whose index file cannot be
//! resolved.
//! * Walk RT-11 directory segment chains, including damaged chains.
//! * Decode RADIX-50 packed filenames.
//! * Materialize file contents with end-of-file truncation applied.
//! * A sample `dextract` program for listing and extracting files.
//!
//! Current shortcomings:
//!
//! * ODS-2 and later Files-11 structure levels are rejected rather than
//! parsed.
//! * Extension file headers (multi-header files) are not followed.
//! * All access is read-only; images are never modified.
//!
//! # Example
//!
//! The following example opens a disk image and prints a directory
//! listing:
//!
//! ```no_run
//! use std::io;
//!
//! fn list(path: &str) -> io::Result<()> {
//!     let volume = decfs::volume::open(path)?;
//!     println!("{}", volume.describe());
//!     for file in volume.list_files()? {
//!         println!("{:10} {:>6} blocks  {}", file.name, file.size_blocks,
//!             file.date.as_deref().unwrap_or(""));
//!     }
//!     Ok(())
//! }
//! ```

pub mod rad50;
pub mod util;
pub mod volume;

pub use volume::{open, Allocation, ExtractedFile, FileKind, FileRecord, Volume, VolumeType};
