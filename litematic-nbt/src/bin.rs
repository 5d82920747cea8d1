use std::io::{Read, Write};

use litematic_util::{ByteCursor, ReadExt as _, TruncatedRead};

use crate::{NBTCompound, NBTError, NBTList, NBTTag, NBT};

/// Nesting limit used by `NBT::read` and `NBT::from_bytes`, matching the game's own reader.
pub const DEFAULT_MAX_DEPTH: usize = 512;

struct NBTReader<'a> {
    cursor: ByteCursor<'a>,
    max_depth: usize,
}

impl<'a> NBTReader<'a> {
    fn read_tag_kind(&mut self) -> Result<NBTTag, NBTError> {
        let offset = self.cursor.position();
        let [value] = self.cursor.read_const()?;
        NBTTag::try_from(value).map_err(|value| NBTError::UnknownTagKind { offset, value })
    }

    fn read_string(&mut self) -> Result<String, NBTError> {
        let length = u16::from_be_bytes(self.cursor.read_const()?) as usize;
        let offset = self.cursor.position();
        let bytes = self.cursor.read_var(length)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|source| NBTError::MalformedString { offset, source })
    }

    fn read_length(&mut self) -> Result<usize, NBTError> {
        let offset = self.cursor.position();
        let length = i32::from_be_bytes(self.cursor.read_const()?);
        usize::try_from(length).map_err(|_| NBTError::NegativeLength { offset, length })
    }

    /// Reads a length-prefixed run of fixed width big-endian values.
    /// The whole run is bounds checked before anything is allocated.
    fn read_array<const N: usize, T>(
        &mut self,
        parse: fn([u8; N]) -> T,
    ) -> Result<Box<[T]>, NBTError> {
        let length = self.read_length()?;
        let offset = self.cursor.position();
        let remaining = self.cursor.remaining();
        if length.checked_mul(N).is_none_or(|size| size > remaining) {
            return Err(NBTError::TruncatedInput(TruncatedRead {
                offset,
                needed: length.saturating_mul(N),
                remaining,
            }));
        }
        (0..length)
            .map(|_| Ok(parse(self.cursor.read_const()?)))
            .collect()
    }

    fn check_depth(&self, depth: usize) -> Result<(), NBTError> {
        if depth > self.max_depth {
            return Err(NBTError::DepthLimitExceeded {
                offset: self.cursor.position(),
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    fn read_list(&mut self, depth: usize) -> Result<NBTList, NBTError> {
        self.check_depth(depth)?;
        let tag_offset = self.cursor.position();
        let tag = self.read_tag_kind()?;
        let length = self.read_length()?;
        if tag == NBTTag::End && length > 0 {
            return Err(NBTError::UnexpectedEnd { offset: tag_offset });
        }
        let mut list = NBTList::new_with_tag(tag);
        (0..length).try_for_each(|_| {
            let item = self.read_value(tag, depth)?;
            list.push(item)
        })?;
        Ok(list)
    }

    fn read_compound(&mut self, depth: usize) -> Result<NBTCompound, NBTError> {
        self.check_depth(depth)?;
        let mut compound = NBTCompound::new();
        loop {
            let offset = self.cursor.position();
            let tag = self.read_tag_kind()?;
            if tag == NBTTag::End {
                break;
            }
            let name = self.read_string()?;
            if compound.contains_key(&name) {
                return Err(NBTError::DuplicateKey { offset, key: name });
            }
            let value = self.read_value(tag, depth)?;
            compound.push_unchecked(name, value);
        }
        Ok(compound)
    }

    /// `depth` is the nesting level of the container holding this value.
    fn read_value(&mut self, tag: NBTTag, depth: usize) -> Result<NBT, NBTError> {
        match tag {
            NBTTag::End => Err(NBTError::UnexpectedEnd {
                offset: self.cursor.position(),
            }),
            NBTTag::Byte => Ok(NBT::Byte(i8::from_be_bytes(self.cursor.read_const()?))),
            NBTTag::Short => Ok(NBT::Short(i16::from_be_bytes(self.cursor.read_const()?))),
            NBTTag::Int => Ok(NBT::Int(i32::from_be_bytes(self.cursor.read_const()?))),
            NBTTag::Long => Ok(NBT::Long(i64::from_be_bytes(self.cursor.read_const()?))),
            NBTTag::Float => Ok(NBT::Float(f32::from_be_bytes(self.cursor.read_const()?))),
            NBTTag::Double => Ok(NBT::Double(f64::from_be_bytes(self.cursor.read_const()?))),
            NBTTag::ByteArray => Ok(NBT::ByteArray(self.read_array(i8::from_be_bytes)?)),
            NBTTag::String => Ok(NBT::String(self.read_string()?)),
            NBTTag::List => Ok(NBT::List(self.read_list(depth + 1)?)),
            NBTTag::Compound => Ok(NBT::Compound(self.read_compound(depth + 1)?)),
            NBTTag::IntArray => Ok(NBT::IntArray(self.read_array(i32::from_be_bytes)?)),
            NBTTag::LongArray => Ok(NBT::LongArray(self.read_array(i64::from_be_bytes)?)),
        }
    }

    fn read_root(&mut self) -> Result<(String, NBTCompound), NBTError> {
        let tag = self.read_tag_kind()?;
        if tag != NBTTag::Compound {
            return Err(NBTError::RootNotCompound { got: tag });
        }
        let name = self.read_string()?;
        Ok((name, self.read_compound(1)?))
    }
}

impl NBT {
    /// Reads a named root compound. The input is read fully into memory first, so
    /// every error offset refers to the decompressed stream.
    pub fn read(mut data: impl Read, is_compressed: bool) -> Result<(String, NBTCompound), NBTError> {
        let bytes = if is_compressed {
            flate2::read::GzDecoder::new(data).read_all()?
        } else {
            data.read_all()?
        };
        NBT::from_bytes(&bytes, false)
    }

    pub fn from_bytes(bytes: &[u8], is_compressed: bool) -> Result<(String, NBTCompound), NBTError> {
        NBT::from_bytes_with_max_depth(bytes, is_compressed, DEFAULT_MAX_DEPTH)
    }

    pub fn from_bytes_with_max_depth(
        bytes: &[u8],
        is_compressed: bool,
        max_depth: usize,
    ) -> Result<(String, NBTCompound), NBTError> {
        if is_compressed {
            let decompressed = flate2::read::GzDecoder::new(bytes).read_all()?;
            return NBT::from_bytes_with_max_depth(&decompressed, false, max_depth);
        }
        NBTReader {
            cursor: ByteCursor::new(bytes),
            max_depth,
        }
        .read_root()
    }

    fn write_tag(
        &self,
        name: Option<&str>,
        write_tag: bool,
        data: &mut impl Write,
    ) -> Result<(), NBTError> {
        fn write_string(data: &mut impl Write, string: &str) -> Result<(), NBTError> {
            let length =
                u16::try_from(string.len()).map_err(|_| NBTError::LengthOverflow(string.len()))?;
            data.write_all(&length.to_be_bytes())?;
            data.write_all(string.as_bytes())?;
            Ok(())
        }

        fn write_length(data: &mut impl Write, length: usize) -> Result<(), NBTError> {
            let length = i32::try_from(length).map_err(|_| NBTError::LengthOverflow(length))?;
            data.write_all(&length.to_be_bytes())?;
            Ok(())
        }

        if write_tag {
            data.write_all(&u8::from(self.tag()).to_be_bytes())?;
        }
        if let Some(name) = name {
            write_string(data, name)?;
        }
        match self {
            NBT::Byte(byte) => data.write_all(&byte.to_be_bytes())?,
            NBT::Short(short) => data.write_all(&short.to_be_bytes())?,
            NBT::Int(int) => data.write_all(&int.to_be_bytes())?,
            NBT::Long(long) => data.write_all(&long.to_be_bytes())?,
            NBT::Float(float) => data.write_all(&float.to_be_bytes())?,
            NBT::Double(double) => data.write_all(&double.to_be_bytes())?,
            NBT::ByteArray(bytes) => {
                write_length(data, bytes.len())?;
                data.write_all(&bytes.iter().flat_map(|b| b.to_be_bytes()).collect::<Vec<_>>())?;
            }
            NBT::String(string) => write_string(data, string)?,
            NBT::List(list) => {
                data.write_all(&u8::from(list.tag().unwrap_or(NBTTag::End)).to_be_bytes())?;
                write_length(data, list.len())?;
                list.iter()
                    .try_for_each(|item| item.write_tag(None, false, data))?;
            }
            NBT::Compound(compound) => {
                compound
                    .iter()
                    .try_for_each(|(key, value)| value.write_tag(Some(key), true, data))?;
                data.write_all(&u8::from(NBTTag::End).to_be_bytes())?;
            }
            NBT::IntArray(ints) => {
                write_length(data, ints.len())?;
                data.write_all(&ints.iter().flat_map(|i| i.to_be_bytes()).collect::<Vec<_>>())?;
            }
            NBT::LongArray(longs) => {
                write_length(data, longs.len())?;
                data.write_all(&longs.iter().flat_map(|l| l.to_be_bytes()).collect::<Vec<_>>())?;
            }
        }
        Ok(())
    }

    pub fn write(
        &self,
        name: &str,
        mut data: impl Write,
        is_compressed: bool,
    ) -> Result<(), NBTError> {
        if !is_compressed {
            self.write_tag(Some(name), true, &mut data)?;
            Ok(())
        } else {
            let mut encoder = flate2::write::GzEncoder::new(data, flate2::Compression::best());
            self.write_tag(Some(name), true, &mut encoder)?;
            encoder.finish()?;
            Ok(())
        }
    }

    pub fn to_bytes(&self, name: &str, is_compressed: bool) -> Result<Box<[u8]>, NBTError> {
        let mut data = Vec::new();
        self.write(name, &mut data, is_compressed)?;
        Ok(data.into_boxed_slice())
    }
}

#[cfg(test)]
mod test {
    use crate::{nbt_compound, nbt_list, NBTError, NBTList, NBTTag, NBT};

    #[test]
    fn decodes_hand_written_bytes() -> Result<(), NBTError> {
        #[rustfmt::skip]
        let bytes = [
            10, 0, 4, b'r', b'o', b'o', b't',
                3, 0, 1, b'i', 0x12, 0x34, 0x56, 0x78,
                8, 0, 1, b's', 0, 2, b'h', b'i',
                9, 0, 1, b'l', 2, 0, 0, 0, 2, 0xFF, 0xFE, 0x00, 0x01,
                12, 0, 1, b'L', 0, 0, 0, 1, 0x80, 0, 0, 0, 0, 0, 0, 0x01,
                10, 0, 1, b'c', 0,
            0,
        ];
        let (name, root) = NBT::from_bytes(&bytes, false)?;
        assert_eq!(name, "root");
        assert_eq!(
            NBT::Compound(root),
            nbt_compound![
                "i" => 0x12345678,
                "s" => "hi",
                "l" => nbt_list![-2i16, 1i16],
                "L" => NBT::LongArray(vec![i64::MIN + 1].into_boxed_slice()),
                "c" => nbt_compound![],
            ]
        );
        Ok(())
    }

    #[test]
    fn round_trip() -> Result<(), NBTError> {
        let nbt = nbt_compound![
            "Version" => 6,
            "Metadata" => nbt_compound![
                "Name" => "Test ÅÄÖ",
                "TimeCreated" => 1_700_000_000_000i64,
                "EnclosingSize" => nbt_compound!["x" => 3, "y" => 4, "z" => 5],
            ],
            "floats" => nbt_list![0.5f32, -1.25f32],
            "doubles" => nbt_list![0.493_128_713_218_231_5f64],
            "bytes" => NBT::ByteArray((0..100).map(|i: i32| ((i * i * 255 + i * 7) % 100) as i8).collect()),
            "ints" => NBT::IntArray(vec![i32::MIN, 0, i32::MAX].into_boxed_slice()),
            "empty untyped" => NBT::List(NBTList::new()),
            "empty typed" => NBT::List(NBTList::new_with_tag(NBTTag::Compound)),
            "nested" => nbt_list![nbt_list![1i8], nbt_list![2i8, 3i8]],
        ];

        for compressed in [false, true] {
            let binary = nbt.to_bytes("", compressed)?;
            let (name, parsed) = NBT::from_bytes(&binary, compressed)?;
            assert_eq!(name, "");
            assert_eq!(NBT::Compound(parsed), nbt);
        }
        Ok(())
    }

    #[test]
    fn truncated_input_reports_offset() -> Result<(), NBTError> {
        let binary = nbt_compound!["value" => 7i64].to_bytes("r", false)?;
        // Cut into the middle of the long payload.
        let cut = &binary[..binary.len() - 5];
        let err = NBT::from_bytes(cut, false).unwrap_err();
        assert_eq!(err.offset(), Some(1 + 2 + 1 + 1 + 2 + 5));
        match err {
            NBTError::TruncatedInput(truncated) => {
                assert_eq!(truncated.offset, 1 + 2 + 1 + 1 + 2 + 5);
                assert_eq!(truncated.needed, 8);
            }
            other => panic!("expected truncated input, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn unknown_tag_kind() {
        let bytes = [10, 0, 0, 13, 0, 1, b'x', 0];
        assert!(matches!(
            NBT::from_bytes(&bytes, false),
            Err(NBTError::UnknownTagKind { offset: 3, value: 13 })
        ));
    }

    #[test]
    fn malformed_string() {
        let bytes = [10, 0, 0, 8, 0, 1, b'x', 0, 2, 0xC3, 0x28, 0];
        assert!(matches!(
            NBT::from_bytes(&bytes, false),
            Err(NBTError::MalformedString { offset: 9, .. })
        ));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let bytes = [10, 0, 0, 1, 0, 1, b'a', 1, 1, 0, 1, b'a', 2, 0];
        match NBT::from_bytes(&bytes, false) {
            Err(NBTError::DuplicateKey { offset, key }) => {
                assert_eq!(offset, 8);
                assert_eq!(key, "a");
            }
            other => panic!("expected duplicate key, got {:?}", other),
        }
    }

    #[test]
    fn list_edge_cases() {
        // End-typed list with elements.
        let bytes = [10, 0, 0, 9, 0, 1, b'l', 0, 0, 0, 0, 1, 0];
        assert!(matches!(
            NBT::from_bytes(&bytes, false),
            Err(NBTError::UnexpectedEnd { offset: 7 })
        ));

        // Negative length.
        let bytes = [10, 0, 0, 9, 0, 1, b'l', 3, 0xFF, 0xFF, 0xFF, 0xFF, 0];
        assert!(matches!(
            NBT::from_bytes(&bytes, false),
            Err(NBTError::NegativeLength { offset: 8, length: -1 })
        ));

        // Huge declared length must fail without allocating.
        let bytes = [10, 0, 0, 12, 0, 1, b'L', 0x7F, 0xFF, 0xFF, 0xFF, 0];
        assert!(matches!(
            NBT::from_bytes(&bytes, false),
            Err(NBTError::TruncatedInput(..))
        ));
    }

    #[test]
    fn error_offsets() {
        let unknown = NBT::from_bytes(&[10, 0, 0, 13, 0, 1, b'x', 0], false).unwrap_err();
        assert_eq!(unknown.offset(), Some(3));

        let negative =
            NBT::from_bytes(&[10, 0, 0, 9, 0, 1, b'l', 3, 0xFF, 0xFF, 0xFF, 0xFF, 0], false)
                .unwrap_err();
        assert_eq!(negative.offset(), Some(8));

        // Not a read failure, there is no offset to report.
        let root = NBT::from_bytes(&[3, 0, 0, 0, 0, 0, 1], false).unwrap_err();
        assert_eq!(root.offset(), None);
    }

    #[test]
    fn root_must_be_compound() {
        assert!(matches!(
            NBT::from_bytes(&[3, 0, 0, 0, 0, 0, 1], false),
            Err(NBTError::RootNotCompound { got: NBTTag::Int })
        ));
    }

    #[test]
    fn depth_limit() -> Result<(), NBTError> {
        let mut nbt = nbt_compound![];
        (0..10).for_each(|_| nbt = nbt_compound!["inner" => nbt.clone()]);
        let binary = nbt.to_bytes("", false)?;

        let (_, parsed) = NBT::from_bytes_with_max_depth(&binary, false, 11)?;
        assert_eq!(NBT::Compound(parsed), nbt);
        assert!(matches!(
            NBT::from_bytes_with_max_depth(&binary, false, 10),
            Err(NBTError::DepthLimitExceeded { limit: 10, .. })
        ));
        Ok(())
    }
}
