use litematic_util::{PackedArray, PackedArrayError};
use thiserror::Error;

/// Litematica never packs with fewer bits than this, even for single-entry palettes.
pub const MIN_BITS_PER_ENTRY: u8 = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnpackError {
    #[error("Palette is empty, no block index can be valid")]
    EmptyPalette,
    #[error(
        "Block states hold {got} words, {block_count} blocks at {bits_per_entry} bits need {expected}"
    )]
    InsufficientWords {
        got: usize,
        expected: usize,
        block_count: usize,
        bits_per_entry: u8,
    },
    #[error("Block {index} refers to palette entry {value}, palette has {palette_len} entries")]
    IndexOutOfPalette {
        index: usize,
        value: u64,
        palette_len: usize,
    },
    #[error("{block_count} blocks overflow the addressable bit range")]
    SizeOverflow { block_count: usize },
    #[error(transparent)]
    Packing(PackedArrayError),
}

impl From<PackedArrayError> for UnpackError {
    fn from(value: PackedArrayError) -> Self {
        match value {
            PackedArrayError::InsufficientWords {
                bits_per_entry,
                num_entries,
                expected,
                got,
            } => UnpackError::InsufficientWords {
                got,
                expected,
                block_count: num_entries,
                bits_per_entry,
            },
            PackedArrayError::Overflow { num_entries, .. } => UnpackError::SizeOverflow {
                block_count: num_entries,
            },
            err => UnpackError::Packing(err),
        }
    }
}

/// `max(2, ceil(log2(palette_len)))`
pub const fn bits_per_entry(palette_len: usize) -> u8 {
    let bits = PackedArray::bits_per_entry(palette_len);
    if bits < MIN_BITS_PER_ENTRY {
        MIN_BITS_PER_ENTRY
    } else {
        bits
    }
}

/// Views packed block states as a [`PackedArray`] without checking entries against the palette.
pub fn packed_block_states(
    palette_len: usize,
    words: &[i64],
    block_count: usize,
) -> Result<PackedArray, UnpackError> {
    if palette_len == 0 {
        return Err(UnpackError::EmptyPalette);
    }
    Ok(PackedArray::from_signed(
        words,
        bits_per_entry(palette_len),
        block_count,
    )?)
}

/// Decodes `block_count` palette indices, ordered `y * (size_x * size_z) + z * size_x + x`.
/// Extra trailing words are ignored.
pub fn unpack(
    palette_len: usize,
    words: &[i64],
    block_count: usize,
) -> Result<Vec<usize>, UnpackError> {
    packed_block_states(palette_len, words, block_count)?
        .iter()
        .enumerate()
        .map(|(index, value)| match usize::try_from(value) {
            Ok(value) if value < palette_len => Ok(value),
            _ => Err(UnpackError::IndexOutOfPalette {
                index,
                value,
                palette_len,
            }),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::{bits_per_entry, unpack, UnpackError};

    /// Packs one bit at a time, independent of `PackedArray`.
    fn pack_naive(values: &[usize], width: u8) -> Vec<i64> {
        let total_bits = values.len() * width as usize;
        let mut words = vec![0u64; total_bits.div_ceil(64)];
        for (i, value) in values.iter().enumerate() {
            for bit in 0..width as usize {
                if (value >> bit) & 1 == 1 {
                    let position = i * width as usize + bit;
                    words[position / 64] |= 1 << (position % 64);
                }
            }
        }
        words.into_iter().map(|word| word as i64).collect()
    }

    #[test]
    fn widths() {
        assert_eq!(bits_per_entry(1), 2);
        assert_eq!(bits_per_entry(2), 2);
        assert_eq!(bits_per_entry(4), 2);
        assert_eq!(bits_per_entry(5), 3);
        assert_eq!(bits_per_entry(16), 4);
        assert_eq!(bits_per_entry(17), 5);
        assert_eq!(bits_per_entry(256), 8);
        assert_eq!(bits_per_entry(257), 9);
    }

    #[test]
    fn matches_naive_packing() -> Result<(), UnpackError> {
        for palette_len in [1, 2, 3, 4, 5, 16, 17, 256, 257] {
            let width = bits_per_entry(palette_len);
            // Enough entries that several of them straddle a word boundary.
            let values = (0..200)
                .map(|i| (i * 7 + i / 3) % palette_len)
                .collect::<Vec<_>>();
            let words = pack_naive(&values, width);
            assert_eq!(
                unpack(palette_len, &words, values.len())?,
                values,
                "palette_len {}",
                palette_len
            );
        }
        Ok(())
    }

    #[test]
    fn straddling_entry() -> Result<(), UnpackError> {
        // 5 entries at 3 bits, entry 21 spans bits 63..66.
        let mut values = vec![0; 30];
        values[20] = 4;
        values[21] = 3;
        values[22] = 1;
        let words = pack_naive(&values, 3);
        assert_eq!(words[0] as u64 >> 63, 1);
        assert_eq!(words[1] & 0b11, 0b01);
        assert_eq!(unpack(5, &words, values.len())?, values);
        Ok(())
    }

    #[test]
    fn negative_words_are_raw_bits() -> Result<(), UnpackError> {
        // All bits set, every 2 bit entry reads 3.
        assert_eq!(unpack(4, &[-1], 32)?, vec![3; 32]);
        Ok(())
    }

    #[test]
    fn two_block_region() -> Result<(), UnpackError> {
        assert_eq!(unpack(2, &[0b01], 2)?, vec![1, 0]);
        Ok(())
    }

    #[test]
    fn single_entry_palette_uses_two_bits() -> Result<(), UnpackError> {
        assert_eq!(unpack(1, &[0], 32)?, vec![0; 32]);
        assert_eq!(
            unpack(1, &[0], 33),
            Err(UnpackError::InsufficientWords {
                got: 1,
                expected: 2,
                block_count: 33,
                bits_per_entry: 2,
            })
        );
        Ok(())
    }

    #[test]
    fn one_word_short() {
        let values = vec![1usize; 40];
        let mut words = pack_naive(&values, 3);
        assert_eq!(words.len(), 2);
        words.pop();
        assert_eq!(
            unpack(5, &words, values.len()),
            Err(UnpackError::InsufficientWords {
                got: 1,
                expected: 2,
                block_count: 40,
                bits_per_entry: 3,
            })
        );
    }

    #[test]
    fn empty_palette() {
        assert_eq!(unpack(0, &[0], 1), Err(UnpackError::EmptyPalette));
    }

    #[test]
    fn index_out_of_palette() {
        // 3 entries at 2 bits, value 3 has no palette entry.
        assert_eq!(
            unpack(3, &[0b11_00], 2),
            Err(UnpackError::IndexOutOfPalette {
                index: 1,
                value: 3,
                palette_len: 3,
            })
        );
    }

    #[test]
    fn empty_region() -> Result<(), UnpackError> {
        assert_eq!(unpack(3, &[], 0)?, Vec::<usize>::new());
        Ok(())
    }

    #[test]
    fn trailing_words_ignored() -> Result<(), UnpackError> {
        assert_eq!(unpack(2, &[0b0100, -1, -1], 2)?, vec![0, 1]);
        Ok(())
    }
}
