// refs
// https://www.itu.int/itudoc/itu-t/com16/tiff-fx/docs/tiff6.pdf
// https://www.awaresystems.be/imaging/tiff/bigtiff.html

use super::Endian;
use num_enum::{FromPrimitive, IntoPrimitive};
use num_traits::NumCast;
use std::fmt::Display;

mod data;
mod id;

pub use data::TagData;
pub use id::TagId;

#[derive(Clone, Debug)]
pub struct Tag {
    pub code: u16,
    pub datatype: TagType,
    pub count: usize,
    pub data: Vec<u8>,
    pub endian: Endian,
}

impl Tag {
    pub fn new(id: TagId, data: TagData, endian: Endian) -> Self {
        Self {
            code: id.into(),
            datatype: data.tag_type(),
            count: data.len(),
            data: data.bytes(endian),
            endian,
        }
    }

    pub fn id(&self) -> Option<TagId> {
        TagId::try_from(self.code).ok()
    }

    /// Numeric values coerced to `T`. Rationals are skipped, use `Display` for those.
    pub fn values<T: NumCast>(&self) -> Option<Vec<T>> {
        let e = self.endian;
        let bytes = self.data.as_slice();
        match self.datatype {
            TagType::Byte | TagType::Undefined => bytes.iter().map(|v| <T as NumCast>::from(*v)).collect(),
            TagType::SByte => bytes.iter().map(|v| <T as NumCast>::from(*v as i8)).collect(),
            TagType::Short => e.decode_all_to_primative::<2, u16, T>(bytes),
            TagType::SShort => e.decode_all_to_primative::<2, i16, T>(bytes),
            TagType::Long | TagType::Ifd => e.decode_all_to_primative::<4, u32, T>(bytes),
            TagType::SLong => e.decode_all_to_primative::<4, i32, T>(bytes),
            TagType::Float => e.decode_all_to_primative::<4, f32, T>(bytes),
            TagType::Double => e.decode_all_to_primative::<8, f64, T>(bytes),
            TagType::Long8 | TagType::Ifd8 => e.decode_all_to_primative::<8, u64, T>(bytes),
            TagType::SLong8 => e.decode_all_to_primative::<8, i64, T>(bytes),
            _ => None,
        }
    }

    pub fn value<T: NumCast + Copy>(&self) -> Option<T> {
        match self.values::<T>()?.as_slice() {
            [v] => Some(*v),
            _ => None,
        }
    }

    pub fn ascii(&self) -> Option<String> {
        if self.datatype != TagType::Ascii {
            return None;
        }
        let end = self.data.iter().position(|b| *b == 0).unwrap_or(self.data.len());
        String::from_utf8(self.data[..end].to_vec()).ok()
    }

    fn rationals(&self) -> Option<Vec<f64>> {
        let pairs: Vec<u64> = match self.datatype {
            TagType::Rational => self.endian.decode_all_to_primative::<4, u32, u64>(&self.data)?,
            _ => return None,
        };
        Some(
            pairs
                .chunks_exact(2)
                .map(|c| c[0] as f64 / c[1] as f64)
                .collect(),
        )
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut value_string = if let Some(s) = self.ascii() {
            s.replace('\n', "\\n")
        } else if let Some(v) = self.rationals() {
            format!("{v:?}")
        } else if let Some(v) = self.values::<f64>() {
            match v.as_slice() {
                [single] => format!("{single}"),
                many => format!("{many:?}"),
            }
        } else {
            "Undefined".to_string()
        };
        if value_string.chars().count() > 100 {
            value_string = format!("{}...", value_string.chars().take(98).collect::<String>())
        }
        let id_string = match self.id() {
            Some(id) => format!("{id:?}"),
            None => format!("Unknown({})", self.code),
        };
        write!(
            f,
            "{} {:?}[{}]: {}",
            id_string, self.datatype, self.count, value_string
        )
    }
}

#[derive(Debug, PartialEq, Clone, Copy, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum TagType {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    Rational = 5,
    SByte = 6,
    Undefined = 7,
    SShort = 8,
    SLong = 9,
    SRational = 10,
    Float = 11,
    Double = 12,
    Ifd = 13,
    Long8 = 16,
    SLong8 = 17,
    Ifd8 = 18,

    #[num_enum(default)]
    Unknown = 0xFFFF,
}

impl TagType {
    pub fn size_in_bytes(&self) -> usize {
        match self {
            TagType::Byte => 1,
            TagType::Ascii => 1,
            TagType::Short => 2,
            TagType::Long => 4,
            TagType::Rational => 8,
            TagType::SByte => 1,
            TagType::Undefined => 1,
            TagType::SShort => 2,
            TagType::SLong => 4,
            TagType::SRational => 8,
            TagType::Float => 4,
            TagType::Double => 8,
            TagType::Ifd => 4,
            TagType::Long8 => 8,
            TagType::SLong8 => 8,
            TagType::Ifd8 => 8,

            TagType::Unknown => 1,
        }
    }
}
