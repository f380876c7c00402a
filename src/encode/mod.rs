use crate::compression::{Chunk, Compression, CompressionError, Predictor};
use crate::j2k::Jpeg2000Options;
use crate::layout::Layout;
use crate::raster::{PlanarConfiguration, Raster};
use crate::tiff::{Endian, TagData, TagId, Tiff, TiffError, TiffVariant};
#[cfg(feature = "image")]
use image::DynamicImage;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

pub mod error;

pub use error::{EncodeError, EncodeResult};

const SOFTWARE: &str = concat!("gradtiff ", env!("CARGO_PKG_VERSION"));

/// Writes a [`Raster`] as a single-page TIFF.
///
/// Defaults to little endian classic TIFF holding one JPEG2000 (34712) strip,
/// compressed losslessly.
#[derive(Debug)]
pub struct Encoder {
    raster: Raster,
    endian: Endian,
    variant: TiffVariant,
    compression: Compression,
    predictor: Predictor,
    jpeg2000: Jpeg2000Options,
    layout: Option<Layout>,
    description: Option<String>,
}

impl Encoder {
    pub fn from_raster(raster: Raster) -> Self {
        Self {
            raster,
            endian: Endian::Little,
            variant: TiffVariant::Normal,
            compression: Compression::Jpeg2000Olympus,
            predictor: Predictor::No,
            jpeg2000: Jpeg2000Options::lossless(),
            layout: None,
            description: None,
        }
    }

    #[cfg(feature = "image")]
    pub fn from_image(img: &DynamicImage) -> EncodeResult<Self> {
        Ok(Self::from_raster(Raster::from_image(img)?))
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_jpeg2000(mut self, options: Jpeg2000Options) -> Self {
        self.jpeg2000 = options;
        self
    }

    pub fn with_predictor(mut self, predictor: Predictor) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_rows_per_strip(mut self, rows: u32) -> Self {
        self.layout = Some(Layout::Strips {
            rows_per_strip: rows,
        });
        self
    }

    pub fn with_tile_size(mut self, pixels: u16) -> Self {
        self.layout = Some(Layout::Tiles {
            width: pixels as u32,
            height: pixels as u32,
        });
        self
    }

    pub fn with_big_endian(mut self, big: bool) -> Self {
        self.endian = if big { Endian::Big } else { Endian::Little };
        self
    }

    pub fn with_big_tiff(mut self, big: bool) -> Self {
        self.variant = if big {
            TiffVariant::Big
        } else {
            TiffVariant::Normal
        };
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    fn layout(&self) -> Layout {
        self.layout.unwrap_or(Layout::Strips {
            rows_per_strip: self.raster.height().max(1),
        })
    }

    /// Creates `path`, encodes into it and flushes.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> EncodeResult<()> {
        let path = path.as_ref();
        // Encode fully before touching the filesystem
        let mut bytes = Vec::new();
        self.encode(&mut bytes)?;
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&bytes)?;
        writer.flush()?;
        info!("Saved {} to {}", self.raster, path.display());
        Ok(())
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> EncodeResult<()> {
        let t0 = Instant::now();
        let endian = self.endian;
        let variant = self.variant;
        let (width, height) = self.raster.dimensions;
        if width == 0 || height == 0 {
            return Err(EncodeError::EmptyRaster);
        }
        let layout = self.layout();
        layout.validate().map_err(EncodeError::BadLayout)?;
        if self.compression.is_jpeg2000() && self.predictor != Predictor::No {
            return Err(CompressionError::PredictorNotSupported(self.predictor).into());
        }

        let raster = self.raster.with_endian(endian)?;
        let bps = raster.bits_per_sample.clone();
        let samples_per_pixel = bps.len();
        let bit_depth = bps.first().copied().unwrap_or(8);
        // chunks are cut on byte boundaries
        raster.bytes_per_pixel()?;
        let interpretation = raster.interpretation;

        // Compress every chunk up front, offsets depend on their sizes
        let windows = layout.windows((width, height));
        let mut chunks = Vec::with_capacity(windows.len());
        for window in windows.iter() {
            let chunk = Chunk {
                width: window.width,
                height: window.height,
                samples_per_pixel: samples_per_pixel as u16,
                bits_per_sample: bit_depth,
            };
            let mut bytes = raster.get_region(window.x, window.y, window.width, window.height)?;
            self.predictor
                .difference(&mut bytes, window.width as usize, bit_depth as usize, samples_per_pixel)?;
            let compressed = self.compression.encode(&bytes, &chunk, &self.jpeg2000)?;
            debug!(
                "Chunk at ({}, {}) {}x{}: {} -> {} bytes",
                window.x,
                window.y,
                window.width,
                window.height,
                bytes.len(),
                compressed.len()
            );
            chunks.push(compressed);
        }

        // Layout: header, chunk data, IFD
        let header_size = variant.header_bytesize() as u64;
        let mut offsets = Vec::with_capacity(chunks.len());
        let mut position = header_size;
        for chunk in chunks.iter() {
            offsets.push(position);
            position += chunk.len() as u64;
        }
        let padding = position % 2;
        let ifd_offset = position + padding;
        let byte_counts: Vec<u64> = chunks.iter().map(|c| c.len() as u64).collect();

        let mut tiff = Tiff::new(endian, variant);
        let ifd = &mut tiff.ifds[0];
        ifd.set_tag(TagId::SubfileType, TagData::from_long(0), endian);
        ifd.set_tag(TagId::ImageWidth, TagData::from_long(width), endian);
        ifd.set_tag(TagId::ImageHeight, TagData::from_long(height), endian);
        ifd.set_tag(TagId::BitsPerSample, TagData::Short(bps.clone()), endian);
        ifd.set_tag(TagId::Compression, TagData::from_short(self.compression.into()), endian);
        ifd.set_tag(TagId::PhotometricInterpretation, TagData::from_short(interpretation.into()), endian);
        ifd.set_tag(TagId::SamplesPerPixel, TagData::from_short(samples_per_pixel as u16), endian);
        ifd.set_tag(TagId::PlanarConfiguration, TagData::from_short(PlanarConfiguration::Chunky.into()), endian);
        ifd.set_tag(TagId::Software, TagData::from_string(SOFTWARE), endian);
        if let Some(description) = &self.description {
            ifd.set_tag(TagId::ImageDescription, TagData::from_string(description), endian);
        }
        if self.predictor != Predictor::No {
            ifd.set_tag(TagId::Predictor, TagData::from_short(self.predictor.into()), endian);
        }
        if !raster.extra_samples.is_empty() {
            let extra: Vec<u16> = raster.extra_samples.iter().map(|e| (*e).into()).collect();
            ifd.set_tag(TagId::ExtraSamples, TagData::Short(extra), endian);
        }
        let formats: Vec<u16> = raster.sample_format.iter().map(|f| (*f).into()).collect();
        ifd.set_tag(TagId::SampleFormat, TagData::Short(formats), endian);

        let max_offset = offsets.last().copied().unwrap_or(0);
        let offsets = TagData::from_offsets(offsets, variant).ok_or(TiffError::OffsetOverflow(max_offset))?;
        let byte_counts =
            TagData::from_offsets(byte_counts, variant).ok_or(TiffError::OffsetOverflow(position))?;
        match layout {
            Layout::Strips { rows_per_strip } => {
                ifd.set_tag(TagId::RowsPerStrip, TagData::from_long(rows_per_strip.min(height)), endian);
                ifd.set_tag(TagId::StripOffsets, offsets, endian);
                ifd.set_tag(TagId::StripByteCounts, byte_counts, endian);
            }
            Layout::Tiles {
                width: tile_width,
                height: tile_height,
            } => {
                ifd.set_tag(TagId::TileWidth, TagData::from_long(tile_width), endian);
                ifd.set_tag(TagId::TileLength, TagData::from_long(tile_height), endian);
                ifd.set_tag(TagId::TileOffsets, offsets, endian);
                ifd.set_tag(TagId::TileByteCounts, byte_counts, endian);
            }
        }

        // write all
        writer.write_all(&tiff.header_bytes(ifd_offset)?)?;
        for chunk in chunks.iter() {
            writer.write_all(chunk)?;
        }
        if padding == 1 {
            writer.write_all(&[0])?;
        }
        writer.write_all(&tiff.ifds[0].encode(ifd_offset, 0, endian, variant)?)?;

        info!(
            "Encoded {width}x{height} {:?} as {} {:?} chunks ({} bytes of pixel data) in {:.3}ms",
            self.compression,
            chunks.len(),
            layout,
            position - header_size,
            t0.elapsed().as_secs_f64() * 1e3
        );
        Ok(())
    }
}
