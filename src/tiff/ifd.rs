use num_traits::NumCast;

use super::{Endian, Tag, TagData, TagId, TagType, TiffError, TiffVariant};
use std::io::{Read, Seek, SeekFrom};

#[derive(Clone, Debug, Default)]
pub struct Ifd(pub Vec<Tag>);

impl Ifd {
    pub fn parse<R: Read + Seek>(
        stream: &mut R,
        offset: u64,
        endian: Endian,
        variant: TiffVariant,
    ) -> Result<(Ifd, u64), TiffError> {
        let stream_len = stream.seek(SeekFrom::End(0))?;

        // IFD starts at offset
        stream.seek(SeekFrom::Start(offset))?;

        // IFD header is just the number of tags
        let tag_count = match variant {
            TiffVariant::Normal => endian.read::<2, u16>(stream)? as u64,
            TiffVariant::Big => endian.read(stream)?,
        };

        // Parse each tag in the IFD
        let mut tags = Vec::with_capacity(tag_count.min(4096) as usize);
        for _ in 0..tag_count {
            let code = endian.read(stream)?;
            let datatype: TagType = endian.read::<2, u16>(stream)?.into();
            let count = variant.read_offset(endian, stream)? as usize;

            let data_size = count
                .checked_mul(datatype.size_in_bytes())
                .ok_or(TiffError::OffsetOverflow(count as u64))?;
            let offset_size = variant.offset_bytesize();

            let data = if data_size > offset_size {
                let data_offset = variant.read_offset(endian, stream)?;
                // Declared sizes must fit inside the stream
                match data_offset.checked_add(data_size as u64) {
                    Some(end) if end <= stream_len => {}
                    _ => {
                        return Err(TiffError::OutOfBounds {
                            offset: data_offset,
                            size: data_size as u64,
                        })
                    }
                }
                let mut data = vec![0; data_size];
                let pos = stream.stream_position()?;
                stream.seek(SeekFrom::Start(data_offset))?;
                stream.read_exact(&mut data)?;
                stream.seek(SeekFrom::Start(pos))?;
                data
            } else {
                let mut data = vec![0; offset_size];
                stream.read_exact(&mut data)?;
                data.truncate(data_size);
                data
            };

            tags.push(Tag {
                code,
                datatype,
                endian,
                count,
                data,
            });
        }

        let ifd = Ifd(tags);
        let next_ifd_offset = variant.read_offset(endian, stream)?;

        Ok((ifd, next_ifd_offset))
    }

    /// Inserts or replaces a tag, keeping entries sorted by code.
    pub fn set_tag(&mut self, id: TagId, data: TagData, endian: Endian) {
        let tag = Tag::new(id, data, endian);
        let Self(tags) = self;
        match tags.binary_search_by_key(&tag.code, |t| t.code) {
            Ok(i) => tags[i] = tag,
            Err(i) => tags.insert(i, tag),
        }
    }

    pub fn get_tag(&self, id: TagId) -> Result<&Tag, TiffError> {
        let code: u16 = id.into();
        let Self(tags) = &self;
        tags.iter()
            .find(|tag| tag.code == code)
            .ok_or(TiffError::MissingTag(id))
    }

    pub fn get_tag_values<T: NumCast>(&self, id: TagId) -> Result<Vec<T>, TiffError> {
        self.get_tag(id)?.values().ok_or(TiffError::BadTag(id))
    }

    pub fn get_tag_value<T: NumCast + Copy>(&self, id: TagId) -> Result<T, TiffError> {
        self.get_tag(id)?.value().ok_or(TiffError::BadTag(id))
    }

    /// Like `get_tag_value` but falls back to the TIFF default when the tag is absent.
    pub fn get_tag_value_or<T: NumCast + Copy>(&self, id: TagId, default: T) -> Result<T, TiffError> {
        match self.get_tag(id) {
            Ok(tag) => tag.value().ok_or(TiffError::BadTag(id)),
            Err(TiffError::MissingTag(_)) => Ok(default),
            Err(e) => Err(e),
        }
    }

    /// Size of the serialized directory including its out-of-line data.
    pub fn encoded_size(&self, variant: TiffVariant) -> u64 {
        let offset_size = variant.offset_bytesize();
        let header = match variant {
            TiffVariant::Normal => 2 + 12 * self.0.len() + 4,
            TiffVariant::Big => 8 + 20 * self.0.len() + 8,
        };
        let spill: usize = self
            .0
            .iter()
            .filter(|tag| tag.data.len() > offset_size)
            .map(|tag| word_align(tag.data.len()))
            .sum();
        (header + spill) as u64
    }

    /// Serializes the directory as if it were placed at `offset` in the file.
    pub fn encode(
        &self,
        offset: u64,
        next_ifd_offset: u64,
        endian: Endian,
        variant: TiffVariant,
    ) -> Result<Vec<u8>, TiffError> {
        let Self(tags) = self;
        let offset_size = variant.offset_bytesize();
        let mut entries = Vec::new();
        match variant {
            TiffVariant::Normal => entries.extend(endian.encode(tags.len() as u16)),
            TiffVariant::Big => entries.extend(endian.encode(tags.len() as u64)),
        }

        let entry_size = match variant {
            TiffVariant::Normal => 12,
            TiffVariant::Big => 20,
        };
        let mut spill_offset = offset + (entries.len() + entry_size * tags.len() + offset_size) as u64;
        let mut spill = Vec::new();

        for tag in tags.iter() {
            entries.extend(endian.encode(tag.code));
            let datatype: u16 = tag.datatype.into();
            entries.extend(endian.encode(datatype));
            entries.extend(variant.encode_offset(endian, tag.count as u64)?);
            if tag.data.len() > offset_size {
                entries.extend(variant.encode_offset(endian, spill_offset)?);
                spill.extend_from_slice(&tag.data);
                if tag.data.len() % 2 == 1 {
                    spill.push(0);
                }
                spill_offset += word_align(tag.data.len()) as u64;
            } else {
                let mut inline = tag.data.clone();
                inline.resize(offset_size, 0);
                entries.extend(inline);
            }
        }
        entries.extend(variant.encode_offset(endian, next_ifd_offset)?);
        entries.extend(spill);
        Ok(entries)
    }
}

fn word_align(n: usize) -> usize {
    n + n % 2
}
