use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum J2kError {
    InvalidOptions(String),
    BufferSize { expected: usize, actual: usize },
    EmptyImage,
    UnsupportedComponents(u32),
    UnsupportedPrecision(u32),
    UnknownFormat,
    CodecUnavailable,
    StreamUnavailable,
    Setup(Vec<String>),
    Encode(Vec<String>),
    Decode(Vec<String>),
}

impl fmt::Display for J2kError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for J2kError {}
