//! Big-endian integer helpers and a small cursor over a byte slice.

use crate::error::{Result, TokenFileError};

/// Interpret exactly four bytes as an unsigned big-endian integer.
pub fn make_int(bytes: &[u8]) -> Result<u32> {
    let array: [u8; 4] = bytes.try_into().map_err(|_| {
        TokenFileError::IllegalArgument(format!(
            "integer fields are 4 bytes wide, got {}",
            bytes.len()
        ))
    })?;
    Ok(u32::from_be_bytes(array))
}

/// Big-endian encoding of `value`, most significant byte first.
pub fn make_bytes(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

/// Forward-only reader used by the binary decoder. Every read reports what
/// it was reading so a short file produces a useful error.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(TokenFileError::Truncated { what });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u32(&mut self, what: &'static str) -> Result<u32> {
        make_int(self.take(4, what)?)
    }
}
