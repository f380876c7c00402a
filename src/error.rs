use crate::decode::DecodeError;
use crate::encode::EncodeError;
use std::fmt;

pub type GradTiffResult<T> = Result<T, GradTiffError>;

#[derive(Debug)]
pub enum GradTiffError {
    Encode(EncodeError),
    Decode(DecodeError),
    ShapeMismatch(String),
    ValueMismatch { max_error: u8, tolerance: u8 },
}

impl fmt::Display for GradTiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for GradTiffError {}

impl From<EncodeError> for GradTiffError {
    fn from(e: EncodeError) -> Self {
        GradTiffError::Encode(e)
    }
}

impl From<DecodeError> for GradTiffError {
    fn from(e: DecodeError) -> Self {
        GradTiffError::Decode(e)
    }
}
