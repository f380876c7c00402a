use super::{PhotometricInterpretation, Raster, SampleFormat};
use crate::tiff::Endian;

pub const GRADIENT_WIDTH: u32 = 256;
pub const GRADIENT_HEIGHT: u32 = 256;

/// The 256x256 fixture gradient.
pub fn gradient() -> Raster {
    Raster::gradient(GRADIENT_WIDTH, GRADIENT_HEIGHT)
}

impl Raster {
    /// 8-bit grayscale horizontal ramp: every row holds `col mod 256`.
    pub fn gradient(width: u32, height: u32) -> Self {
        let row: Vec<u8> = (0..width).map(|x| (x % 256) as u8).collect();
        let buffer = row.repeat(height as usize);
        let mut raster = Self::blank(
            (width, height),
            vec![8],
            PhotometricInterpretation::BlackIsZero,
            vec![SampleFormat::Unsigned],
            vec![],
            Endian::Little,
        );
        raster.buffer = buffer;
        raster
    }
}
