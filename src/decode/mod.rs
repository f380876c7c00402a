use crate::compression::{Chunk, Compression, Predictor};
use crate::layout::Layout;
use crate::raster::{ExtraSamples, PhotometricInterpretation, PlanarConfiguration, Raster, SampleFormat};
use crate::tiff::{Ifd, TagId, Tiff};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

mod error;

pub use error::{DecodeError, DecodeResult};

/// Reads the first page of a TIFF back into a [`Raster`].
#[derive(Debug)]
pub struct Decoder<R> {
    stream: R,
    tiff: Tiff,
}

impl Decoder<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> DecodeResult<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> Decoder<R> {
    pub fn new(mut stream: R) -> DecodeResult<Self> {
        let tiff = Tiff::open(&mut stream)?;
        Ok(Self { stream, tiff })
    }

    pub fn tiff(&self) -> &Tiff {
        &self.tiff
    }

    pub fn compression(&self) -> DecodeResult<Compression> {
        let ifd = self.tiff.first_ifd()?;
        Ok(ifd.get_tag_value_or::<u16>(TagId::Compression, 1)?.into())
    }

    pub fn read_raster(&mut self) -> DecodeResult<Raster> {
        let t0 = Instant::now();
        let endian = self.tiff.endian;
        let ifd = self.tiff.first_ifd()?.clone();

        let width = ifd.get_tag_value::<u32>(TagId::ImageWidth)?;
        let height = ifd.get_tag_value::<u32>(TagId::ImageHeight)?;
        let samples_per_pixel = ifd.get_tag_value_or::<u16>(TagId::SamplesPerPixel, 1)?;
        if samples_per_pixel == 0 {
            return Err(DecodeError::BadLayout("SamplesPerPixel is 0".into()));
        }
        let bits_per_sample = match ifd.get_tag_values::<u16>(TagId::BitsPerSample) {
            Ok(bps) if bps.len() == samples_per_pixel as usize => bps,
            Ok(bps) if bps.len() == 1 => vec![bps[0]; samples_per_pixel as usize],
            Ok(bps) => {
                return Err(DecodeError::BadLayout(format!(
                    "{} BitsPerSample values for {samples_per_pixel} samples",
                    bps.len()
                )))
            }
            Err(_) => vec![1; samples_per_pixel as usize],
        };
        let bit_depth = bits_per_sample[0];
        if bits_per_sample.iter().any(|b| *b != bit_depth) {
            return Err(DecodeError::NotSupported(format!(
                "Mixed bits per sample {bits_per_sample:?}"
            )));
        }

        let compression: Compression = ifd.get_tag_value_or::<u16>(TagId::Compression, 1)?.into();
        let predictor: Predictor = ifd.get_tag_value_or::<u16>(TagId::Predictor, 1)?.into();
        let planar: PlanarConfiguration = ifd
            .get_tag_value_or::<u16>(TagId::PlanarConfiguration, 1)?
            .into();
        if planar != PlanarConfiguration::Chunky {
            return Err(DecodeError::NotSupported(format!("{planar:?} planar configuration")));
        }
        let interpretation: PhotometricInterpretation = ifd
            .get_tag_value_or::<u16>(TagId::PhotometricInterpretation, 1)?
            .into();
        let sample_format = match ifd.get_tag_values::<u16>(TagId::SampleFormat) {
            Ok(formats) if formats.len() == samples_per_pixel as usize => {
                formats.into_iter().map(SampleFormat::from).collect()
            }
            Ok(formats) if formats.len() == 1 => vec![SampleFormat::from(formats[0]); samples_per_pixel as usize],
            _ => vec![SampleFormat::Unsigned; samples_per_pixel as usize],
        };
        let extra_samples = ifd
            .get_tag_values::<u16>(TagId::ExtraSamples)
            .map(|v| v.into_iter().map(ExtraSamples::from).collect())
            .unwrap_or_default();

        let (layout, offsets_id, counts_id) = chunk_layout(&ifd, height)?;
        let offsets = ifd.get_tag_values::<u64>(offsets_id)?;
        let byte_counts = ifd.get_tag_values::<u64>(counts_id)?;
        let windows = layout.windows((width, height));
        if offsets.len() != windows.len() || byte_counts.len() != windows.len() {
            return Err(DecodeError::BadLayout(format!(
                "{} chunks expected, found {} offsets and {} byte counts",
                windows.len(),
                offsets.len(),
                byte_counts.len()
            )));
        }

        let mut raster = Raster::blank(
            (width, height),
            bits_per_sample,
            interpretation,
            sample_format,
            extra_samples,
            endian,
        );
        raster.bytes_per_pixel()?;

        let stream_len = self.stream.seek(SeekFrom::End(0))?;
        for ((window, offset), count) in windows.iter().zip(offsets).zip(byte_counts) {
            if offset.checked_add(count).map_or(true, |end| end > stream_len) {
                return Err(DecodeError::BadLayout(format!(
                    "Chunk of {count} bytes at {offset} overruns the {stream_len} byte file"
                )));
            }
            let mut bytes = vec![0; count as usize];
            self.stream.seek(SeekFrom::Start(offset))?;
            self.stream.read_exact(&mut bytes)?;

            let chunk = Chunk {
                width: window.width,
                height: window.height,
                samples_per_pixel,
                bits_per_sample: bit_depth,
            };
            let mut buf = compression.decode(&bytes, &chunk)?;
            predictor.predict(
                &mut buf,
                window.width as usize,
                bit_depth as usize,
                samples_per_pixel as usize,
            )?;
            raster.put_region(window.x, window.y, window.width, window.height, &buf)?;
        }

        debug!(
            "Decoded {} {:?} chunks into {raster} in {:.3}ms",
            windows.len(),
            compression,
            t0.elapsed().as_secs_f64() * 1e3
        );
        Ok(raster)
    }
}

fn chunk_layout(ifd: &Ifd, height: u32) -> DecodeResult<(Layout, TagId, TagId)> {
    if ifd.get_tag(TagId::TileWidth).is_ok() {
        let layout = Layout::Tiles {
            width: ifd.get_tag_value(TagId::TileWidth)?,
            height: ifd.get_tag_value(TagId::TileLength)?,
        };
        layout.validate().map_err(DecodeError::BadLayout)?;
        Ok((layout, TagId::TileOffsets, TagId::TileByteCounts))
    } else {
        let rows_per_strip = ifd
            .get_tag_value_or::<u64>(TagId::RowsPerStrip, u32::MAX as u64)?
            .clamp(1, height.max(1) as u64) as u32;
        Ok((
            Layout::Strips { rows_per_strip },
            TagId::StripOffsets,
            TagId::StripByteCounts,
        ))
    }
}
