use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("tried to read {needed} bytes at offset {offset}, only {remaining} remaining")]
pub struct TruncatedRead {
    pub offset: usize,
    pub needed: usize,
    pub remaining: usize,
}

/// Sequential reader over an in-memory buffer.
/// Every read either consumes exactly the requested bytes or fails without advancing.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_var(&mut self, size: usize) -> Result<&'a [u8], TruncatedRead> {
        let end = self
            .position
            .checked_add(size)
            .filter(|end| *end <= self.data.len())
            .ok_or(TruncatedRead {
                offset: self.position,
                needed: size,
                remaining: self.remaining(),
            })?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    pub fn read_const<const N: usize>(&mut self) -> Result<[u8; N], TruncatedRead> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_var(N)?);
        Ok(buf)
    }
}
