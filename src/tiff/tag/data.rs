use super::TagType;
use crate::tiff::{Endian, TiffVariant};

/// Typed tag payload used when building an IFD for writing.
#[derive(Clone, Debug, PartialEq)]
pub enum TagData {
    Byte(Vec<u8>),
    Ascii(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    Undefined(Vec<u8>),
    Long8(Vec<u64>),
}

impl TagData {
    /// ASCII tags are NUL terminated on disk.
    pub fn from_string(s: &str) -> Self {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        Self::Ascii(bytes)
    }

    pub fn from_short(v: u16) -> Self {
        Self::Short(vec![v])
    }

    pub fn from_long(v: u32) -> Self {
        Self::Long(vec![v])
    }

    /// Offsets and byte counts are LONG in classic TIFF and LONG8 in BigTIFF.
    pub fn from_offsets(values: Vec<u64>, variant: TiffVariant) -> Option<Self> {
        match variant {
            TiffVariant::Normal => values
                .into_iter()
                .map(|v| u32::try_from(v).ok())
                .collect::<Option<Vec<u32>>>()
                .map(Self::Long),
            TiffVariant::Big => Some(Self::Long8(values)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Byte(vec) => vec.len(),
            Self::Ascii(vec) => vec.len(),
            Self::Short(vec) => vec.len(),
            Self::Long(vec) => vec.len(),
            Self::Rational(vec) => vec.len(),
            Self::Undefined(vec) => vec.len(),
            Self::Long8(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tag_type(&self) -> TagType {
        match self {
            Self::Byte(_) => TagType::Byte,
            Self::Ascii(_) => TagType::Ascii,
            Self::Short(_) => TagType::Short,
            Self::Long(_) => TagType::Long,
            Self::Rational(_) => TagType::Rational,
            Self::Undefined(_) => TagType::Undefined,
            Self::Long8(_) => TagType::Long8,
        }
    }

    pub fn bytes(&self, endian: Endian) -> Vec<u8> {
        match self {
            Self::Byte(vec) | Self::Ascii(vec) | Self::Undefined(vec) => vec.clone(),
            Self::Short(vec) => endian.encode_all(vec),
            Self::Long(vec) => endian.encode_all(vec),
            Self::Rational(vec) => vec
                .iter()
                .flat_map(|(a, b)| endian.encode(*a).into_iter().chain(endian.encode(*b)))
                .collect(),
            Self::Long8(vec) => endian.encode_all(vec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_nul_terminated() {
        let data = TagData::from_string("abc");
        assert_eq!(data.len(), 4);
        assert_eq!(data.bytes(Endian::Little), b"abc\0".to_vec());
    }

    #[test]
    fn offsets_pick_width_by_variant() {
        let normal = TagData::from_offsets(vec![8, 16], TiffVariant::Normal).unwrap();
        assert_eq!(normal, TagData::Long(vec![8, 16]));
        let big = TagData::from_offsets(vec![8, 16], TiffVariant::Big).unwrap();
        assert_eq!(big.tag_type(), TagType::Long8);
        assert!(TagData::from_offsets(vec![u64::MAX], TiffVariant::Normal).is_none());
    }

    #[test]
    fn rationals_encode_both_halves() {
        let data = TagData::Rational(vec![(72, 1)]);
        assert_eq!(data.bytes(Endian::Big), vec![0, 0, 0, 72, 0, 0, 0, 1]);
    }
}
