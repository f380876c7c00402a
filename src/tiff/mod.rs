use std::collections::HashSet;
use std::fmt::Display;
use std::io::{self, Read, Seek};

mod endian;
mod error;
mod ifd;
mod tag;

pub use endian::Endian;
pub use error::TiffError;
pub use ifd::Ifd;
pub use tag::{Tag, TagData, TagId, TagType};

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum TiffVariant {
    Normal,
    Big,
}

impl TiffVariant {
    fn read_offset<R: Read>(&self, endian: Endian, stream: &mut R) -> io::Result<u64> {
        match self {
            TiffVariant::Normal => endian.read::<4, u32>(stream).map(|v| v as u64),
            TiffVariant::Big => endian.read(stream),
        }
    }

    fn encode_offset(&self, endian: Endian, value: u64) -> Result<Vec<u8>, TiffError> {
        match self {
            TiffVariant::Normal => u32::try_from(value)
                .map(|v| endian.encode(v).to_vec())
                .map_err(|_| TiffError::OffsetOverflow(value)),
            TiffVariant::Big => Ok(endian.encode(value).to_vec()),
        }
    }

    pub const fn offset_bytesize(&self) -> usize {
        match self {
            TiffVariant::Normal => 4,
            TiffVariant::Big => 8,
        }
    }

    pub const fn header_bytesize(&self) -> usize {
        match self {
            TiffVariant::Normal => 8,
            TiffVariant::Big => 16,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Tiff {
    pub endian: Endian,
    pub variant: TiffVariant,
    pub ifds: Vec<Ifd>,
}

impl Tiff {
    pub fn new(endian: Endian, variant: TiffVariant) -> Self {
        Self {
            endian,
            variant,
            ifds: vec![Ifd::default()],
        }
    }

    pub fn open<R: Read + Seek>(stream: &mut R) -> Result<Self, TiffError> {
        stream.rewind()?;

        // TIFF Header
        let mut buf = [0; 4];
        stream.read_exact(&mut buf)?;

        let endian = Endian::from_magic(&buf[..2]).ok_or(TiffError::BadMagicBytes)?;
        let variant = match endian.decode::<2, u16>([buf[2], buf[3]])? {
            42 => TiffVariant::Normal,
            43 => TiffVariant::Big,
            _ => return Err(TiffError::BadMagicBytes),
        };

        if TiffVariant::Big == variant {
            // BigTIFFs have 4 extra bytes in the header
            let offset_bytesize: u16 = endian.read(stream)?;
            let _: u16 = endian.read(stream)?;
            if offset_bytesize != 8 {
                return Err(TiffError::BadMagicBytes);
            }
        }

        // IFDs
        let mut ifds = vec![];
        let mut seen = HashSet::new();
        let mut ifd_offset = variant.read_offset(endian, stream)?;
        while ifd_offset != 0 {
            if !seen.insert(ifd_offset) {
                return Err(TiffError::IfdLoop(ifd_offset));
            }
            let (ifd, next_offset) = Ifd::parse(stream, ifd_offset, endian, variant)?;
            ifd_offset = next_offset;
            ifds.push(ifd);
        }

        if ifds.is_empty() {
            return Err(TiffError::NoIfd);
        }

        Ok(Self {
            endian,
            variant,
            ifds,
        })
    }

    pub fn first_ifd(&self) -> Result<&Ifd, TiffError> {
        self.ifds.first().ok_or(TiffError::NoIfd)
    }

    pub fn header_bytes(&self, first_ifd_offset: u64) -> Result<Vec<u8>, TiffError> {
        let endian = self.endian;
        let mut bytes = endian.magic().to_vec();
        match self.variant {
            TiffVariant::Normal => bytes.extend(endian.encode(42_u16)),
            TiffVariant::Big => {
                bytes.extend(endian.encode(43_u16));
                bytes.extend(endian.encode(8_u16));
                bytes.extend(endian.encode(0_u16));
            }
        }
        bytes.extend(self.variant.encode_offset(endian, first_ifd_offset)?);
        Ok(bytes)
    }
}

impl Display for Tiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:?} endian, {:?} TIFF", self.endian, self.variant)?;
        for (i, ifd) in self.ifds.iter().enumerate() {
            writeln!(f, "IFD {i}:")?;
            for tag in ifd.0.iter() {
                writeln!(f, "\t{}", tag)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_round_trips_for_all_variants() {
        for variant in [TiffVariant::Normal, TiffVariant::Big] {
            for endian in [Endian::Little, Endian::Big] {
                let mut tiff = Tiff::new(endian, variant);
                tiff.ifds[0].set_tag(TagId::ImageWidth, TagData::from_long(3), endian);

                let first = variant.header_bytesize() as u64;
                let mut bytes = tiff.header_bytes(first).unwrap();
                assert_eq!(bytes.len(), variant.header_bytesize());
                bytes.extend(tiff.ifds[0].encode(first, 0, endian, variant).unwrap());

                let parsed = Tiff::open(&mut Cursor::new(bytes)).unwrap();
                assert_eq!(parsed.endian, endian);
                assert_eq!(parsed.variant, variant);
                assert_eq!(parsed.ifds.len(), 1);
                let ifd = parsed.first_ifd().unwrap();
                assert_eq!(ifd.get_tag_value::<u32>(TagId::ImageWidth).unwrap(), 3);
            }
        }
    }

    #[test]
    fn rejects_garbage() {
        let result = Tiff::open(&mut Cursor::new(b"GIF89a\0\0".to_vec()));
        assert!(matches!(result, Err(TiffError::BadMagicBytes)));
    }

    #[test]
    fn rejects_ifd_cycle() {
        let endian = Endian::Little;
        let mut tiff = Tiff::new(endian, TiffVariant::Normal);
        tiff.ifds[0].set_tag(TagId::ImageWidth, TagData::from_long(1), endian);
        let mut bytes = tiff.header_bytes(8).unwrap();
        // next IFD points back at itself
        bytes.extend(tiff.ifds[0].encode(8, 8, endian, TiffVariant::Normal).unwrap());
        let result = Tiff::open(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(TiffError::IfdLoop(8))));
    }

    #[test]
    fn classic_tiff_offsets_are_32_bit() {
        let tiff = Tiff::new(Endian::Little, TiffVariant::Normal);
        assert!(matches!(
            tiff.header_bytes(u32::MAX as u64 + 1),
            Err(TiffError::OffsetOverflow(_))
        ));
    }
}
