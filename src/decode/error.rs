use crate::compression::CompressionError;
use crate::raster::RasterError;
use crate::tiff::TiffError;
use std::fmt;
use std::io;

pub type DecodeResult<T> = Result<T, DecodeError>;

#[derive(Debug)]
pub enum DecodeError {
    ReadError(io::Error),
    BadTiff(TiffError),
    DecompressionError(CompressionError),
    RasterizationError(RasterError),
    BadLayout(String),
    NotSupported(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for DecodeError {}

impl From<TiffError> for DecodeError {
    fn from(e: TiffError) -> Self {
        match e {
            TiffError::ReadError(io_error) => DecodeError::ReadError(io_error),
            tiff_error => DecodeError::BadTiff(tiff_error),
        }
    }
}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        DecodeError::ReadError(e)
    }
}

impl From<CompressionError> for DecodeError {
    fn from(e: CompressionError) -> Self {
        DecodeError::DecompressionError(e)
    }
}

impl From<RasterError> for DecodeError {
    fn from(e: RasterError) -> Self {
        DecodeError::RasterizationError(e)
    }
}
