use super::{Raster, RasterError};
use crate::tiff::Endian;

impl Raster {
    /// Same pixels with multi-byte samples stored in `endian` order.
    pub fn with_endian(&self, endian: Endian) -> Result<Self, RasterError> {
        if endian == self.endian {
            return Ok(self.clone());
        }
        let mut raster = self.clone();
        raster.endian = endian;
        match self.bits_per_sample.first() {
            Some(&bits) if self.bits_per_sample.iter().all(|b| *b == bits) => match bits {
                8 => {}
                16 | 32 | 64 => raster
                    .buffer
                    .chunks_exact_mut(bits as usize / 8)
                    .for_each(|sample| sample.reverse()),
                _ => {
                    return Err(RasterError::NotSupported(format!(
                        "Byte swapping {bits}-bit samples"
                    )))
                }
            },
            None => {}
            Some(_) => {
                return Err(RasterError::NotSupported(format!(
                    "Byte swapping mixed samples {:?}",
                    self.bits_per_sample
                )))
            }
        }
        Ok(raster)
    }

    /// Copies a `width` x `height` window starting at (`x`, `y`).
    /// Parts of the window outside the raster are zero filled, which is how
    /// TIFF pads edge tiles.
    pub fn get_region(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Vec<u8>, RasterError> {
        let bytes_per_pixel = self.bytes_per_pixel()?;
        let mut buffer = vec![0; width as usize * height as usize * bytes_per_pixel];
        let copy_width = self.dimensions.0.saturating_sub(x).min(width) as usize;
        let copy_height = self.dimensions.1.saturating_sub(y).min(height);
        let row_size = self.row_size();
        for j in 0..copy_height {
            let src = (y + j) as usize * row_size + x as usize * bytes_per_pixel;
            let dst = (j * width) as usize * bytes_per_pixel;
            let n = copy_width * bytes_per_pixel;
            buffer[dst..dst + n].copy_from_slice(&self.buffer[src..src + n]);
        }
        Ok(buffer)
    }

    /// Inverse of `get_region`: writes the window back, dropping the padding.
    pub fn put_region(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        bytes: &[u8],
    ) -> Result<(), RasterError> {
        let bytes_per_pixel = self.bytes_per_pixel()?;
        let expected = width as usize * height as usize * bytes_per_pixel;
        if bytes.len() < expected {
            return Err(RasterError::NotSupported(format!(
                "Region of {width}x{height} needs {expected} bytes, got {}",
                bytes.len()
            )));
        }
        let copy_width = self.dimensions.0.saturating_sub(x).min(width) as usize;
        let copy_height = self.dimensions.1.saturating_sub(y).min(height);
        let row_size = self.row_size();
        for j in 0..copy_height {
            let dst = (y + j) as usize * row_size + x as usize * bytes_per_pixel;
            let src = (j * width) as usize * bytes_per_pixel;
            let n = copy_width * bytes_per_pixel;
            self.buffer[dst..dst + n].copy_from_slice(&bytes[src..src + n]);
        }
        Ok(())
    }
}
