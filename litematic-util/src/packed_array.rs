use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackedArrayError {
    #[error("Bits per entry must be within 1..=64, got {0}")]
    InvalidBitsPerEntry(u8),
    #[error("{num_entries} entries at {bits_per_entry} bits need {expected} words, got {got}")]
    InsufficientWords {
        bits_per_entry: u8,
        num_entries: usize,
        expected: usize,
        got: usize,
    },
    #[error("{num_entries} entries at {bits_per_entry} bits overflow the addressable bit range")]
    Overflow { bits_per_entry: u8, num_entries: usize },
    #[error("Index {index} out of bounds for {num_entries} entries")]
    IndexOutOfBounds { index: usize, num_entries: usize },
    #[error("Value {value} does not fit in {bits_per_entry} bits")]
    ValueTooLarge { value: u64, bits_per_entry: u8 },
}

/// Fixed-width integers packed back to back into 64-bit words.
///
/// Entry `i` occupies bits `[i * bits_per_entry, (i + 1) * bits_per_entry)` of the
/// bitstream formed by the words in order, least significant bit of word 0 first.
/// Unlike the per-long padded layout, entries are allowed to span two adjacent words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedArray {
    bits_per_entry: u8,
    num_entries: usize,
    entry_mask: u64,
    packed: Box<[u64]>,
}

impl PackedArray {
    /// Bits needed to address `num_values` distinct values, `ceil(log2(num_values))`.
    /// Returns 0 for zero or one value.
    pub const fn bits_per_entry(num_values: usize) -> u8 {
        match num_values {
            0 | 1 => 0,
            _ => (usize::BITS - (num_values - 1).leading_zeros()) as u8,
        }
    }

    /// Words needed to hold `num_entries` entries, `None` if the bit count overflows.
    pub fn packed_size(bits_per_entry: u8, num_entries: usize) -> Option<usize> {
        num_entries
            .checked_mul(bits_per_entry as usize)
            .map(|bits| bits.div_ceil(u64::BITS as usize))
    }
}

impl PackedArray {
    /// Trailing words past what `num_entries` needs are kept but never read.
    pub fn from_inner(
        packed: Box<[u64]>,
        bits_per_entry: u8,
        num_entries: usize,
    ) -> Result<Self, PackedArrayError> {
        if bits_per_entry == 0 || bits_per_entry as u32 > u64::BITS {
            return Err(PackedArrayError::InvalidBitsPerEntry(bits_per_entry));
        }
        let expected = PackedArray::packed_size(bits_per_entry, num_entries).ok_or(
            PackedArrayError::Overflow {
                bits_per_entry,
                num_entries,
            },
        )?;
        if packed.len() < expected {
            return Err(PackedArrayError::InsufficientWords {
                bits_per_entry,
                num_entries,
                expected,
                got: packed.len(),
            });
        }
        Ok(Self {
            bits_per_entry,
            num_entries,
            entry_mask: u64::MAX >> (u64::BITS - bits_per_entry as u32),
            packed,
        })
    }

    /// Reinterprets each signed word's bit pattern as unsigned.
    pub fn from_signed(
        packed: &[i64],
        bits_per_entry: u8,
        num_entries: usize,
    ) -> Result<Self, PackedArrayError> {
        Self::from_inner(
            packed.iter().map(|word| *word as u64).collect(),
            bits_per_entry,
            num_entries,
        )
    }

    pub fn new(bits_per_entry: u8, num_entries: usize) -> Result<Self, PackedArrayError> {
        let size = PackedArray::packed_size(bits_per_entry, num_entries).ok_or(
            PackedArrayError::Overflow {
                bits_per_entry,
                num_entries,
            },
        )?;
        Self::from_inner(
            vec![0; size].into_boxed_slice(),
            bits_per_entry,
            num_entries,
        )
    }

    pub fn into_inner(self) -> Box<[u64]> {
        self.packed
    }

    pub fn len(&self) -> usize {
        self.num_entries
    }

    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    fn index_offset(&self, index: usize) -> (usize, u32) {
        // Cannot overflow, num_entries * bits_per_entry was checked on construction.
        let bit = index * self.bits_per_entry as usize;
        (
            bit / u64::BITS as usize,
            (bit % u64::BITS as usize) as u32,
        )
    }

    fn read(&self, index: usize) -> u64 {
        let (word, offset) = self.index_offset(index);
        let mut value = self.packed[word] >> offset;
        if offset + self.bits_per_entry as u32 > u64::BITS {
            // Low bits sit at the tail of this word, high bits at the head of the next.
            value |= self.packed[word + 1] << (u64::BITS - offset);
        }
        value & self.entry_mask
    }

    pub fn get(&self, index: usize) -> Option<u64> {
        (index < self.num_entries).then(|| self.read(index))
    }

    pub fn set(&mut self, index: usize, value: u64) -> Result<(), PackedArrayError> {
        if index >= self.num_entries {
            return Err(PackedArrayError::IndexOutOfBounds {
                index,
                num_entries: self.num_entries,
            });
        }
        if value > self.entry_mask {
            return Err(PackedArrayError::ValueTooLarge {
                value,
                bits_per_entry: self.bits_per_entry,
            });
        }
        let (word, offset) = self.index_offset(index);
        self.packed[word] = (self.packed[word] & !(self.entry_mask << offset)) | (value << offset);
        if offset + self.bits_per_entry as u32 > u64::BITS {
            let shift = u64::BITS - offset;
            let high_mask = self.entry_mask >> shift;
            self.packed[word + 1] = (self.packed[word + 1] & !high_mask) | (value >> shift);
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.num_entries).map(|index| self.read(index))
    }
}
