use crate::compression::CompressionError;
use crate::raster::RasterError;
use crate::tiff::TiffError;
use std::fmt;
use std::io;

pub type EncodeResult<T> = Result<T, EncodeError>;

#[derive(Debug)]
pub enum EncodeError {
    WriteError(io::Error),
    RasterizationError(RasterError),
    CompressionError(CompressionError),
    TiffError(TiffError),
    BadLayout(String),
    EmptyRaster,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for EncodeError {}

impl From<io::Error> for EncodeError {
    fn from(e: io::Error) -> Self {
        EncodeError::WriteError(e)
    }
}

impl From<RasterError> for EncodeError {
    fn from(e: RasterError) -> Self {
        EncodeError::RasterizationError(e)
    }
}

impl From<CompressionError> for EncodeError {
    fn from(e: CompressionError) -> Self {
        EncodeError::CompressionError(e)
    }
}

impl From<TiffError> for EncodeError {
    fn from(e: TiffError) -> Self {
        match e {
            TiffError::ReadError(io_error) => EncodeError::WriteError(io_error),
            tiff_error => EncodeError::TiffError(tiff_error),
        }
    }
}
