use super::{ExtraSamples, PhotometricInterpretation as Style, Raster, RasterError, SampleFormat};
use crate::tiff::Endian;
use ::image::{DynamicImage, ImageBuffer};

impl TryFrom<Raster> for DynamicImage {
    type Error = RasterError;

    fn try_from(raster: Raster) -> Result<Self, Self::Error> {
        let Raster {
            dimensions: (width, height),
            buffer,
            bits_per_sample,
            interpretation,
            ..
        } = raster;

        match (interpretation, bits_per_sample.as_slice()) {
            (Style::BlackIsZero, [8]) => {
                ImageBuffer::from_raw(width, height, buffer).map(DynamicImage::ImageLuma8)
            }
            (Style::BlackIsZero, [8, 8]) => {
                ImageBuffer::from_raw(width, height, buffer).map(DynamicImage::ImageLumaA8)
            }
            (Style::RGB, [8, 8, 8]) => {
                ImageBuffer::from_raw(width, height, buffer).map(DynamicImage::ImageRgb8)
            }
            (Style::RGB, [8, 8, 8, 8]) => {
                ImageBuffer::from_raw(width, height, buffer).map(DynamicImage::ImageRgba8)
            }
            _ => None,
        }
        .ok_or(RasterError::NotSupported(format!(
            "No image layout for {interpretation:?} {bits_per_sample:?}"
        )))
    }
}

impl Raster {
    pub fn into_image(self) -> Result<DynamicImage, RasterError> {
        self.try_into()
    }

    pub fn from_image(img: &DynamicImage) -> Result<Self, RasterError> {
        let dimensions = (img.width(), img.height());
        let (interpretation, bits_per_sample, extra_samples) = match img {
            DynamicImage::ImageLuma8(_) => (Style::BlackIsZero, vec![8], vec![]),
            DynamicImage::ImageLumaA8(_) => (
                Style::BlackIsZero,
                vec![8, 8],
                vec![ExtraSamples::UnassociatedAlpha],
            ),
            DynamicImage::ImageRgb8(_) => (Style::RGB, vec![8, 8, 8], vec![]),
            DynamicImage::ImageRgba8(_) => (
                Style::RGB,
                vec![8, 8, 8, 8],
                vec![ExtraSamples::UnassociatedAlpha],
            ),
            other => {
                return Err(RasterError::NotSupported(format!(
                    "Image color type {:?}",
                    other.color()
                )))
            }
        };
        let sample_format = vec![SampleFormat::Unsigned; bits_per_sample.len()];

        Self::new(
            dimensions,
            img.as_bytes().to_vec(),
            bits_per_sample,
            interpretation,
            sample_format,
            extra_samples,
            Endian::Little,
        )
    }
}
