//! Synthesizes a JPEG2000-compressed gradient TIFF for exercising TIFF readers.
//!
//! ```no_run
//! gradtiff::write_gradient(gradtiff::OUTPUT_FILE, gradtiff::Jpeg2000Options::lossless()).unwrap();
//! ```

use std::path::Path;
use tracing::info;

mod compression;
mod decode;
mod encode;
mod error;
pub mod j2k;
mod layout;
mod raster;
mod tiff;

pub use compression::{Chunk, Compression, CompressionError, Predictor};
pub use decode::{DecodeError, DecodeResult, Decoder};
pub use encode::{EncodeError, EncodeResult, Encoder};
pub use error::{GradTiffError, GradTiffResult};
pub use j2k::{J2kError, Jpeg2000Format, Jpeg2000Mode, Jpeg2000Options};
pub use layout::{Layout, Window};
pub use raster::{
    gradient, ExtraSamples, PhotometricInterpretation, PlanarConfiguration, Raster, RasterError,
    SampleFormat, GRADIENT_HEIGHT, GRADIENT_WIDTH,
};
pub use tiff::{Endian, Ifd, Tag, TagData, TagId, TagType, Tiff, TiffError, TiffVariant};

/// Fixture file name, relative to the working directory.
pub const OUTPUT_FILE: &str = "gradient_jpeg2000.tiff";

/// Writes the 256x256 gradient to `path` as a JPEG2000 TIFF.
pub fn write_gradient<P: AsRef<Path>>(path: P, options: Jpeg2000Options) -> GradTiffResult<()> {
    Encoder::from_raster(gradient())
        .with_jpeg2000(options)
        .save(path)?;
    Ok(())
}

/// Largest absolute sample difference between two rasters of the same shape.
pub fn max_abs_error(a: &Raster, b: &Raster) -> GradTiffResult<u8> {
    if a.dimensions != b.dimensions || a.bits_per_sample != b.bits_per_sample {
        return Err(GradTiffError::ShapeMismatch(format!("{a} vs {b}")));
    }
    if a.bits_per_sample.iter().any(|bits| *bits != 8) {
        return Err(GradTiffError::ShapeMismatch(format!(
            "only 8-bit samples compare, got {:?}",
            a.bits_per_sample
        )));
    }
    Ok(a.buffer
        .iter()
        .zip(b.buffer.iter())
        .map(|(x, y)| x.abs_diff(*y))
        .max()
        .unwrap_or(0))
}

/// Decodes `path` and checks it against `source`, returning the largest sample error.
pub fn verify<P: AsRef<Path>>(path: P, source: &Raster, tolerance: u8) -> GradTiffResult<u8> {
    let decoded = Decoder::open(path)?.read_raster()?;
    let max_error = max_abs_error(&decoded, source)?;
    if max_error > tolerance {
        return Err(GradTiffError::ValueMismatch {
            max_error,
            tolerance,
        });
    }
    info!("Verified {decoded}: max error {max_error} (tolerance {tolerance})");
    Ok(max_error)
}
