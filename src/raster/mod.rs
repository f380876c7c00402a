use crate::tiff::Endian;
use std::fmt::Display;

mod ramp;
#[cfg(feature = "image")]
mod image;
mod ops;
mod photometrics;

pub use ramp::{gradient, GRADIENT_HEIGHT, GRADIENT_WIDTH};
pub use photometrics::{ExtraSamples, PhotometricInterpretation, PlanarConfiguration, SampleFormat};

#[derive(Debug)]
pub enum RasterError {
    BufferSize((usize, (u32, u32), Vec<u16>)),
    NotSupported(String),
}

/// Row-major, chunky pixel grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    pub dimensions: (u32, u32),
    pub buffer: Vec<u8>,
    pub bits_per_sample: Vec<u16>,
    pub interpretation: PhotometricInterpretation,
    pub sample_format: Vec<SampleFormat>,
    pub extra_samples: Vec<ExtraSamples>,
    pub endian: Endian,
    bits_per_pixel: u32, // calculated from bits_per_sample and cached
}

impl Raster {
    pub fn new(
        dimensions: (u32, u32),
        buffer: Vec<u8>,
        bits_per_sample: Vec<u16>,
        interpretation: PhotometricInterpretation,
        sample_format: Vec<SampleFormat>,
        extra_samples: Vec<ExtraSamples>,
        endian: Endian,
    ) -> Result<Self, RasterError> {
        let bits_per_pixel = bits_per_sample.iter().map(|b| *b as u32).sum::<u32>();
        let required_bytes = Self::required_bytes(dimensions, bits_per_pixel);
        if buffer.len() != required_bytes {
            Err(RasterError::BufferSize((
                buffer.len(),
                dimensions,
                bits_per_sample,
            )))
        } else {
            Ok(Self {
                dimensions,
                buffer,
                bits_per_sample,
                interpretation,
                sample_format,
                extra_samples,
                endian,
                bits_per_pixel,
            })
        }
    }

    pub fn blank(
        dimensions: (u32, u32),
        bits_per_sample: Vec<u16>,
        interpretation: PhotometricInterpretation,
        sample_format: Vec<SampleFormat>,
        extra_samples: Vec<ExtraSamples>,
        endian: Endian,
    ) -> Self {
        let bits_per_pixel = bits_per_sample.iter().map(|b| *b as u32).sum::<u32>();
        let buffer = vec![0; Self::required_bytes(dimensions, bits_per_pixel)];
        Self {
            dimensions,
            buffer,
            bits_per_sample,
            interpretation,
            sample_format,
            extra_samples,
            endian,
            bits_per_pixel,
        }
    }

    fn required_bytes(dimensions: (u32, u32), bits_per_pixel: u32) -> usize {
        let row_bytes = (dimensions.0 as usize * bits_per_pixel as usize + 7) / 8;
        row_bytes * dimensions.1 as usize
    }

    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    pub fn height(&self) -> u32 {
        self.dimensions.1
    }

    pub fn samples_per_pixel(&self) -> usize {
        self.bits_per_sample.len()
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.bits_per_pixel
    }

    pub fn row_size(&self) -> usize {
        (self.dimensions.0 as usize * self.bits_per_pixel as usize + 7) / 8
    }

    /// Bytes per pixel, or an error for pixels that do not end on a byte boundary.
    pub fn bytes_per_pixel(&self) -> Result<usize, RasterError> {
        if self.bits_per_pixel % 8 != 0 {
            return Err(RasterError::NotSupported(format!(
                "Pixel is not byte aligned: {} bits",
                self.bits_per_pixel
            )));
        }
        Ok(self.bits_per_pixel as usize / 8)
    }

    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.dimensions.1 {
            return None;
        }
        let row_size = self.row_size();
        let start = y as usize * row_size;
        Some(&self.buffer[start..start + row_size])
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.dimensions.0 {
            return None;
        }
        let n = self.bytes_per_pixel().ok()?;
        let start = x as usize * n;
        self.row(y).map(|row| &row[start..start + n])
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: &[u8]) -> Result<(), RasterError> {
        let n = self.bytes_per_pixel()?;
        if x >= self.dimensions.0 || y >= self.dimensions.1 {
            return Err(RasterError::NotSupported(format!("Bad pixel index ({x}, {y})")));
        }
        if pixel.len() != n {
            return Err(RasterError::NotSupported(format!(
                "Bad pixel size {} (expected {n})",
                pixel.len()
            )));
        }
        let start = y as usize * self.row_size() + x as usize * n;
        self.buffer[start..start + n].copy_from_slice(pixel);
        Ok(())
    }
}

impl Display for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Raster({}x{}, {:?}, {:?}, {}Bytes, {:?} Endian)",
            self.dimensions.0,
            self.dimensions.1,
            self.bits_per_sample,
            self.interpretation,
            self.buffer.len(),
            self.endian
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: u32, height: u32) -> Raster {
        Raster::blank(
            (width, height),
            vec![8],
            PhotometricInterpretation::BlackIsZero,
            vec![SampleFormat::Unsigned],
            vec![],
            Endian::Little,
        )
    }

    #[test]
    fn buffer_size_is_checked() {
        let result = Raster::new(
            (4, 4),
            vec![0; 15],
            vec![8],
            PhotometricInterpretation::BlackIsZero,
            vec![SampleFormat::Unsigned],
            vec![],
            Endian::Little,
        );
        assert!(matches!(result, Err(RasterError::BufferSize((15, (4, 4), _)))));
    }

    #[test]
    fn put_then_get_pixel() {
        let mut raster = gray(3, 2);
        raster.put_pixel(2, 1, &[42]).unwrap();
        assert_eq!(raster.get_pixel(2, 1), Some(&[42_u8][..]));
        assert_eq!(raster.row(1), Some(&[0_u8, 0, 42][..]));
        assert!(raster.get_pixel(3, 0).is_none());
        assert!(raster.put_pixel(0, 2, &[1]).is_err());
        assert!(raster.put_pixel(0, 0, &[1, 2]).is_err());
    }

    #[test]
    fn sub_byte_pixels_are_not_addressable() {
        let raster = Raster::blank(
            (8, 1),
            vec![1],
            PhotometricInterpretation::BlackIsZero,
            vec![SampleFormat::Unsigned],
            vec![],
            Endian::Little,
        );
        assert_eq!(raster.buffer.len(), 1);
        assert!(raster.bytes_per_pixel().is_err());
        assert!(raster.get_pixel(0, 0).is_none());
    }
}
