use std::error;
use std::fmt;
use std::io;

/// Errors that can be returned from volume operations.  These are
/// generally converted into `io::Error`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VolumeError {
    /// Unknown error
    Unknown,
    /// Home block failed validation; the volume cannot be mounted
    InvalidHomeBlock,
    /// Image size is not a whole number of blocks
    InvalidLayout,
    /// Block number beyond the end of the volume
    OutOfRange,
    /// Fewer bytes available than a full block (truncated image)
    ShortRead,
    /// Retrieval pointer field widths not recognized
    UnknownFormat,
    /// A block read failed while materializing file data
    ReadError,
    /// File not found among validated entries
    NotFound,
    /// Directory segment chain loops or exceeds its declared bound
    SegmentLoop,
    /// File header failed structural validation
    InvalidHeader,
    /// Directory entry failed structural validation
    InvalidEntry,
    /// The file's block allocation could not be resolved
    Unresolvable,
}

impl error::Error for VolumeError {}

impl fmt::Display for VolumeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl From<VolumeError> for io::Error {
    fn from(e: VolumeError) -> io::Error {
        use self::VolumeError::*;
        use std::io::ErrorKind::*;
        match e {
            Unknown => io::Error::new(Other, e),
            InvalidHomeBlock => io::Error::new(InvalidData, e),
            InvalidLayout => io::Error::new(InvalidData, e),
            OutOfRange => io::Error::new(InvalidInput, e),
            ShortRead => io::Error::new(UnexpectedEof, e),
            UnknownFormat => io::Error::new(InvalidData, e),
            ReadError => io::Error::new(Other, e),
            VolumeError::NotFound => io::Error::new(io::ErrorKind::NotFound, e),
            SegmentLoop => io::Error::new(InvalidData, e),
            InvalidHeader => io::Error::new(InvalidData, e),
            InvalidEntry => io::Error::new(InvalidData, e),
            Unresolvable => io::Error::new(InvalidData, e),
        }
    }
}

impl VolumeError {
    /// If the provided `io::Error` contains a `VolumeError`, return the
    /// underlying `VolumeError`.  If not, return None.
    pub fn from_io_error(error: &io::Error) -> Option<VolumeError> {
        match error.get_ref() {
            Some(e) => e.downcast_ref::<VolumeError>().cloned(),
            None => None,
        }
    }

    /// This is sometimes useful instead of .into() when the compiler doesn't
    /// have enough information to perform type inference.
    pub fn to_io_error(&self) -> io::Error {
        self.clone().into()
    }

    /// Provide terse descriptions of the errors.
    fn message(&self) -> &str {
        use self::VolumeError::*;
        match *self {
            Unknown => "unknown error",
            InvalidHomeBlock => "home block failed validation",
            InvalidLayout => "image size is not a whole number of blocks",
            OutOfRange => "block number beyond the end of the volume",
            ShortRead => "truncated image: short block read",
            UnknownFormat => "unrecognized retrieval pointer format",
            ReadError => "block read failed during file materialization",
            NotFound => "file not found",
            SegmentLoop => "directory segment chain does not terminate",
            InvalidHeader => "file header failed structural validation",
            InvalidEntry => "directory entry failed structural validation",
            Unresolvable => "file allocation could not be resolved",
        }
    }
}

impl PartialEq<io::Error> for VolumeError {
    fn eq(&self, other: &io::Error) -> bool {
        match VolumeError::from_io_error(other) {
            Some(ref e) if e == self => true,
            _ => false,
        }
    }
}

impl PartialEq<VolumeError> for io::Error {
    fn eq(&self, other: &VolumeError) -> bool {
        match VolumeError::from_io_error(self) {
            Some(ref e) if e == other => true,
            _ => false,
        }
    }
}
