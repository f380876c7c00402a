use super::TagId;
use std::io;

#[derive(Debug)]
pub enum TiffError {
    BadMagicBytes,
    ReadError(io::Error),
    MissingTag(TagId),
    BadTag(TagId),
    NoIfd,
    IfdLoop(u64),
    OffsetOverflow(u64),
    OutOfBounds { offset: u64, size: u64 },
}

impl From<io::Error> for TiffError {
    fn from(e: io::Error) -> Self {
        TiffError::ReadError(e)
    }
}
