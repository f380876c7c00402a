// https://en.wikipedia.org/wiki/TIFF#TIFF_Compression_Tag
// https://exiftool.org/TagNames/EXIF.html#Compression

use crate::j2k::{self, J2kError, Jpeg2000Options};
use num_enum::{FromPrimitive, IntoPrimitive};
use salzweg::decoder::{DecodingError, TiffStyleDecoder};
use salzweg::encoder::{EncodingError, TiffStyleEncoder};
use std::io::{self, Read, Write};

#[derive(Debug)]
pub enum CompressionError {
    LzwError(DecodingError),
    LzwEncodeError(EncodingError),
    Jpeg2000Error(J2kError),
    CompressionNotSupported(Compression),
    PredictorNotSupported(Predictor),
    ChunkSize { expected: usize, actual: usize },
    PackBitsTruncated(usize),
    IoError(io::Error),
}

impl From<io::Error> for CompressionError {
    fn from(e: io::Error) -> Self {
        CompressionError::IoError(e)
    }
}

impl From<J2kError> for CompressionError {
    fn from(e: J2kError) -> Self {
        CompressionError::Jpeg2000Error(e)
    }
}

/// Geometry of one strip or tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chunk {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
}

impl Chunk {
    pub fn byte_size(&self) -> usize {
        self.row_size() * self.height as usize
    }

    pub fn row_size(&self) -> usize {
        let row_bits = self.width as usize * self.samples_per_pixel as usize * self.bits_per_sample as usize;
        (row_bits + 7) / 8
    }
}

#[derive(Debug, PartialEq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum Compression {
    Uncompressed = 1,
    CCITT1D = 2,
    T4Group3Fax = 3,
    T6Group4Fax = 4,
    Lzw = 5,
    JpegOld = 6,
    Jpeg = 7,
    DeflateAdobe = 8,
    PackBits = 32773,
    Deflate = 32946,
    Jpeg2000 = 33003,
    Jpeg2000Lossy = 33004,
    Jpeg2000Alternative = 33005,
    JBIG = 34661,
    Jpeg2000Olympus = 34712,
    LZMA2 = 34925,
    Zstd = 34926,
    WebP = 34927,
    JPEGXL = 52546,

    #[num_enum(default)]
    Unknown = 0x0000,
}

impl Compression {
    pub fn is_jpeg2000(&self) -> bool {
        matches!(
            self,
            Self::Jpeg2000 | Self::Jpeg2000Lossy | Self::Jpeg2000Alternative | Self::Jpeg2000Olympus
        )
    }

    pub fn encode(
        &self,
        bytes: &[u8],
        chunk: &Chunk,
        options: &Jpeg2000Options,
    ) -> Result<Vec<u8>, CompressionError> {
        check_size(bytes, chunk)?;
        match self {
            Self::Uncompressed => Ok(bytes.to_vec()),
            Self::Lzw => TiffStyleEncoder::encode_to_vec(bytes).map_err(CompressionError::LzwEncodeError),
            Self::DeflateAdobe | Self::Deflate => {
                let mut encoder =
                    flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(bytes)?;
                Ok(encoder.finish()?)
            }
            Self::PackBits => Ok(pack_bits(bytes, chunk.row_size())),
            Self::Jpeg2000Lossy => Ok(self.encode_jpeg2000(bytes, chunk, &options.lossy_or_default())?),
            j if j.is_jpeg2000() => Ok(self.encode_jpeg2000(bytes, chunk, options)?),
            other => Err(CompressionError::CompressionNotSupported(*other)),
        }
    }

    fn encode_jpeg2000(
        &self,
        bytes: &[u8],
        chunk: &Chunk,
        options: &Jpeg2000Options,
    ) -> Result<Vec<u8>, J2kError> {
        if chunk.bits_per_sample != 8 {
            return Err(J2kError::UnsupportedPrecision(chunk.bits_per_sample as u32));
        }
        j2k::encode(
            bytes,
            chunk.width,
            chunk.height,
            chunk.samples_per_pixel as u32,
            options,
        )
    }

    pub fn decode(&self, bytes: &[u8], chunk: &Chunk) -> Result<Vec<u8>, CompressionError> {
        let buf = match self {
            Self::Uncompressed => bytes.to_vec(),
            Self::Lzw => TiffStyleDecoder::decode_to_vec(bytes).map_err(CompressionError::LzwError)?,
            Self::DeflateAdobe | Self::Deflate => {
                let mut buf = vec![];
                flate2::read::ZlibDecoder::new(bytes).read_to_end(&mut buf)?;
                buf
            }
            Self::PackBits => unpack_bits(bytes, chunk.byte_size())?,
            j if j.is_jpeg2000() => {
                let decoded = j2k::decode(bytes)?;
                if (decoded.width, decoded.height) != (chunk.width, chunk.height)
                    || decoded.components != chunk.samples_per_pixel as u32
                {
                    return Err(CompressionError::ChunkSize {
                        expected: chunk.byte_size(),
                        actual: decoded.samples.len(),
                    });
                }
                decoded.samples
            }
            other => return Err(CompressionError::CompressionNotSupported(*other)),
        };
        // LZW strips may carry trailing padding
        let mut buf = buf;
        if buf.len() > chunk.byte_size() {
            buf.truncate(chunk.byte_size());
        }
        check_size(&buf, chunk)?;
        Ok(buf)
    }
}

// PackBits runs never cross a row boundary.
// https://www.fileformat.info/format/tiff/corion-packbits.htm
fn pack_bits(bytes: &[u8], row_size: usize) -> Vec<u8> {
    let mut packed = Vec::with_capacity(bytes.len() + bytes.len() / 128 + 1);
    if row_size == 0 {
        return packed;
    }
    for row in bytes.chunks(row_size) {
        let mut i = 0;
        while i < row.len() {
            let run = row[i..].iter().take(128).take_while(|b| **b == row[i]).count();
            if run > 1 {
                packed.push((1 - run as i16) as i8 as u8);
                packed.push(row[i]);
                i += run;
                continue;
            }
            // Literal until the next pair of repeats
            let start = i;
            while i < row.len() && i - start < 128 {
                if i + 1 < row.len() && row[i] == row[i + 1] {
                    break;
                }
                i += 1;
            }
            packed.push((i - start - 1) as u8);
            packed.extend_from_slice(&row[start..i]);
        }
    }
    packed
}

fn unpack_bits(bytes: &[u8], expected: usize) -> Result<Vec<u8>, CompressionError> {
    let mut buf = Vec::with_capacity(expected);
    let mut i = 0;
    while i < bytes.len() && buf.len() < expected {
        let header = bytes[i] as i8;
        i += 1;
        match header {
            -128 => {}
            n if n < 0 => {
                let value = *bytes.get(i).ok_or(CompressionError::PackBitsTruncated(i))?;
                buf.extend(std::iter::repeat(value).take(1 + (-n) as usize));
                i += 1;
            }
            n => {
                let literal = bytes
                    .get(i..i + n as usize + 1)
                    .ok_or(CompressionError::PackBitsTruncated(i))?;
                buf.extend_from_slice(literal);
                i += literal.len();
            }
        }
    }
    Ok(buf)
}

fn check_size(bytes: &[u8], chunk: &Chunk) -> Result<(), CompressionError> {
    let expected = chunk.byte_size();
    if bytes.len() != expected {
        return Err(CompressionError::ChunkSize {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

#[derive(Debug, PartialEq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum Predictor {
    No = 1,
    Horizontal = 2,
    FloatingPoint = 3,

    #[num_enum(default)]
    Unknown = 0x0000,
}

impl Predictor {
    fn check(&self, bit_depth: usize) -> Result<(), CompressionError> {
        match self {
            Self::No => Ok(()),
            Self::Horizontal if bit_depth == 8 => Ok(()),
            other => Err(CompressionError::PredictorNotSupported(*other)),
        }
    }

    /// Undoes the predictor after decompression.
    pub fn predict(
        &self,
        buffer: &mut [u8],
        width: usize,
        bit_depth: usize,
        samples_per_pixel: usize,
    ) -> Result<(), CompressionError> {
        self.check(bit_depth)?;
        if *self == Self::Horizontal {
            let row_bytes = width * samples_per_pixel;
            for row in buffer.chunks_mut(row_bytes) {
                for i in samples_per_pixel..row.len() {
                    row[i] = row[i].wrapping_add(row[i - samples_per_pixel]);
                }
            }
        }
        Ok(())
    }

    /// Applies the predictor before compression.
    pub fn difference(
        &self,
        buffer: &mut [u8],
        width: usize,
        bit_depth: usize,
        samples_per_pixel: usize,
    ) -> Result<(), CompressionError> {
        self.check(bit_depth)?;
        if *self == Self::Horizontal {
            let row_bytes = width * samples_per_pixel;
            for row in buffer.chunks_mut(row_bytes) {
                for i in (samples_per_pixel..row.len()).rev() {
                    row[i] = row[i].wrapping_sub(row[i - samples_per_pixel]);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHUNK: Chunk = Chunk {
        width: 32,
        height: 4,
        samples_per_pixel: 1,
        bits_per_sample: 8,
    };

    fn ramp() -> Vec<u8> {
        (0..4).flat_map(|_| 0..32_u8).collect()
    }

    #[test]
    fn unknown_codes_map_to_unknown() {
        assert_eq!(Compression::from(34712), Compression::Jpeg2000Olympus);
        assert_eq!(Compression::from(33003), Compression::Jpeg2000);
        assert_eq!(Compression::from(12345), Compression::Unknown);
        assert_eq!(u16::from(Compression::Deflate), 32946);
    }

    #[test]
    fn lossless_codecs_restore_input() {
        let options = Jpeg2000Options::lossless();
        for compression in [
            Compression::Uncompressed,
            Compression::Lzw,
            Compression::PackBits,
            Compression::DeflateAdobe,
            Compression::Deflate,
            Compression::Jpeg2000,
            Compression::Jpeg2000Olympus,
        ] {
            let encoded = compression.encode(&ramp(), &CHUNK, &options).unwrap();
            let decoded = compression.decode(&encoded, &CHUNK).unwrap();
            assert_eq!(decoded, ramp(), "{compression:?}");
        }
    }

    #[test]
    fn pack_bits_matches_reference_stream() {
        let unpacked = [
            0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0xAA, 0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0x22, 0xAA,
            0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
        ];
        let packed = [
            0xFE, 0xAA, 0x02, 0x80, 0x00, 0x2A, 0xFD, 0xAA, 0x03, 0x80, 0x00, 0x2A, 0x22, 0xF7, 0xAA,
        ];
        let chunk = Chunk {
            width: 24,
            height: 1,
            samples_per_pixel: 1,
            bits_per_sample: 8,
        };
        let options = Jpeg2000Options::lossless();
        assert_eq!(Compression::PackBits.encode(&unpacked, &chunk, &options).unwrap(), packed);
        assert_eq!(Compression::PackBits.decode(&packed, &chunk).unwrap(), unpacked);
    }

    #[test]
    fn pack_bits_runs_stop_at_rows() {
        let chunk = Chunk {
            width: 200,
            height: 2,
            samples_per_pixel: 1,
            bits_per_sample: 8,
        };
        let flat = vec![7_u8; 400];
        let packed = Compression::PackBits
            .encode(&flat, &chunk, &Jpeg2000Options::lossless())
            .unwrap();
        // Each row: a run of 128 then a run of 72
        assert_eq!(packed, vec![0x81, 7, 0xB9, 7, 0x81, 7, 0xB9, 7]);
        assert_eq!(Compression::PackBits.decode(&packed, &chunk).unwrap(), flat);
    }

    #[test]
    fn truncated_pack_bits_fails() {
        let chunk = Chunk {
            width: 4,
            height: 1,
            samples_per_pixel: 1,
            bits_per_sample: 8,
        };
        assert!(matches!(
            Compression::PackBits.decode(&[0x03, 1, 2], &chunk),
            Err(CompressionError::PackBitsTruncated(1))
        ));
    }

    #[test]
    fn unsupported_compression_fails() {
        let options = Jpeg2000Options::lossless();
        for compression in [Compression::Jpeg, Compression::Zstd, Compression::Unknown] {
            assert!(matches!(
                compression.encode(&ramp(), &CHUNK, &options),
                Err(CompressionError::CompressionNotSupported(c)) if c == compression
            ));
        }
    }

    #[test]
    fn wrong_chunk_size_fails() {
        let result = Compression::Uncompressed.encode(&[0; 3], &CHUNK, &Jpeg2000Options::lossless());
        assert!(matches!(
            result,
            Err(CompressionError::ChunkSize {
                expected: 128,
                actual: 3
            })
        ));
    }

    #[test]
    fn jpeg2000_rejects_16_bit_samples() {
        let chunk = Chunk {
            bits_per_sample: 16,
            ..CHUNK
        };
        let result = Compression::Jpeg2000.encode(&[0; 256], &chunk, &Jpeg2000Options::lossless());
        assert!(matches!(
            result,
            Err(CompressionError::Jpeg2000Error(J2kError::UnsupportedPrecision(16)))
        ));
    }

    #[test]
    fn horizontal_predictor_inverts() {
        let mut buf = ramp();
        Predictor::Horizontal.difference(&mut buf, 32, 8, 1).unwrap();
        assert_eq!(&buf[..4], &[0, 1, 1, 1]);
        assert_eq!(buf[32], 0);
        Predictor::Horizontal.predict(&mut buf, 32, 8, 1).unwrap();
        assert_eq!(buf, ramp());
    }

    #[test]
    fn predictor_limits() {
        let mut buf = vec![0; 8];
        assert!(Predictor::Horizontal.predict(&mut buf, 2, 16, 1).is_err());
        assert!(Predictor::FloatingPoint.difference(&mut buf, 2, 8, 1).is_err());
        assert!(Predictor::No.difference(&mut buf, 2, 16, 1).is_ok());
    }
}
