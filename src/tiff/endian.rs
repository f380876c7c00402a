use eio::{FromBytes, ReadExt, ToBytes};
use num_traits::{cast::NumCast, ToPrimitive};
use std::io::{Read, Result, Write};
use std::mem;

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"II" => Some(Endian::Little),
            b"MM" => Some(Endian::Big),
            _ => None,
        }
    }

    pub const fn magic(&self) -> &'static [u8; 2] {
        match self {
            Endian::Big => b"MM",
            Endian::Little => b"II",
        }
    }

    pub fn read<const N: usize, T: FromBytes<N>>(&self, stream: &mut impl Read) -> Result<T> {
        let mut buf = [0u8; N];
        stream.read_exact(&mut buf)?;
        self.decode(buf)
    }

    pub fn write<const N: usize, T: ToBytes<N>>(
        &self,
        stream: &mut impl Write,
        value: T,
    ) -> Result<()> {
        stream.write_all(&self.encode(value))
    }

    pub fn decode<const N: usize, T: FromBytes<N>>(&self, bytes: [u8; N]) -> Result<T> {
        match self {
            Endian::Big => bytes.as_slice().read_be(),
            Endian::Little => bytes.as_slice().read_le(),
        }
    }

    pub fn decode_all<const N: usize, T: FromBytes<N>>(&self, bytes: &[u8]) -> Option<Vec<T>> {
        bytes
            .chunks_exact(mem::size_of::<T>())
            .map(|chunk| {
                chunk
                    .try_into()
                    .ok()
                    .and_then(|arr| self.decode::<N, T>(arr).ok())
            })
            .collect()
    }

    pub fn decode_all_to_primative<const N: usize, A: FromBytes<N> + ToPrimitive, T: NumCast>(
        &self,
        bytes: &[u8],
    ) -> Option<Vec<T>> {
        self.decode_all::<N, A>(bytes)?
            .into_iter()
            .map(|v| T::from(v))
            .collect()
    }

    pub fn encode<const N: usize, T: ToBytes<N>>(&self, value: T) -> [u8; N] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }

    pub fn encode_all<const N: usize, T: ToBytes<N> + Copy>(&self, values: &[T]) -> Vec<u8> {
        values.iter().flat_map(|v| self.encode(*v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_selects_byte_order() {
        assert_eq!(Endian::from_magic(b"II"), Some(Endian::Little));
        assert_eq!(Endian::from_magic(b"MM"), Some(Endian::Big));
        assert_eq!(Endian::from_magic(b"XX"), None);
        assert_eq!(Endian::Big.magic(), b"MM");
    }

    #[test]
    fn shorts_follow_byte_order() {
        assert_eq!(Endian::Little.encode(0x0102_u16), [0x02, 0x01]);
        assert_eq!(Endian::Big.encode(0x0102_u16), [0x01, 0x02]);
        let values: Vec<u16> = Endian::Big.decode_all(&[0, 1, 1, 0]).unwrap();
        assert_eq!(values, vec![1, 256]);
    }

    #[test]
    fn longs_widen_to_u64() {
        let bytes = Endian::Little.encode_all(&[7_u32, 70000]);
        let values: Vec<u64> = Endian::Little
            .decode_all_to_primative::<4, u32, u64>(&bytes)
            .unwrap();
        assert_eq!(values, vec![7, 70000]);
    }
}
