//! Bit-level storage and sequential reading.
//!
//! `BitBuffer` is a growable, bit-addressable sequence of bits and
//! `BitReader` consumes bits from a byte slice in order. Both use MSB-first
//! packing: absolute bit `p` lives in byte `p / 8` at bit `7 - p % 8`.
//! Artifacts depend on this order, so it must never change.
//!
//! # Padding Rules
//! - `BitBuffer::to_bytes` pads the final partial byte with zero low bits and
//!   reports their count through `free_bits`
//! - `BitReader` stops at an explicit bit limit, so padding is never read as data
//!
//! # Example
//! ```
//! use archiver_core::bitio::BitBuffer;
//!
//! let mut bits = BitBuffer::new();
//! bits.push_bit(true);
//! bits.push_bit(false);
//! bits.push_bit(true);
//! assert_eq!(bits.to_bytes(), vec![0b1010_0000]);
//! assert_eq!(bits.free_bits(), 5);
//!
//! let mut reader = bits.reader();
//! assert!(reader.read_bit().unwrap());
//! assert!(!reader.read_bit().unwrap());
//! assert!(reader.read_bit().unwrap());
//! assert!(reader.read_bit().is_err());
//! ```

use crate::error::{ArgumentError, BitIoError, Result};

/// Growable bit sequence backed by bytes.
///
/// # Invariants
/// - `storage.len() * 8 >= len`
/// - every storage bit at or beyond `len` is zero
#[derive(Clone, Default)]
pub struct BitBuffer {
    /// Allocated bytes; grows by doubling
    storage: Vec<u8>,
    /// Number of meaningful bits
    len: usize,
}

impl BitBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `bits` bits.
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            storage: vec![0; bits.div_ceil(8)],
            len: 0,
        }
    }

    /// Rebuild a buffer from materialized bytes and their free-bit count.
    ///
    /// # Errors
    /// - `ArgumentError::InvalidFreeBits` if `free_bits > 7`
    /// - `ArgumentError::FreeBitsWithoutData` if `bytes` is empty and
    ///   `free_bits` is not zero
    pub fn from_bytes(bytes: &[u8], free_bits: u8) -> Result<Self> {
        let len = bit_len_of(bytes, free_bits)?;
        let mut storage = bytes.to_vec();
        if let Some(last) = storage.last_mut() {
            // Padding must stay zero for equality and re-materialization.
            *last &= 0xFFu8 << free_bits;
        }
        Ok(Self { storage, len })
    }

    /// Append one bit. Amortized O(1).
    pub fn push_bit(&mut self, bit: bool) {
        if self.len == self.storage.len() * 8 {
            let grown = (self.storage.len() * 2).max(1);
            self.storage.resize(grown, 0);
        }
        let index = self.len;
        self.len += 1;
        self.write(index, bit);
    }

    /// Remove and return the last bit.
    pub fn pop_bit(&mut self) -> Option<bool> {
        let index = self.len.checked_sub(1)?;
        let bit = self.read(index);
        self.write(index, false);
        self.len = index;
        Some(bit)
    }

    /// Append the eight bits of `byte`, most significant first.
    pub fn push_byte(&mut self, byte: u8) {
        for shift in (0..8).rev() {
            self.push_bit((byte >> shift) & 1 == 1);
        }
    }

    /// Append all bits of `other` in order.
    pub fn extend_from_bit_buffer(&mut self, other: &BitBuffer) {
        for bit in other.iter() {
            self.push_bit(bit);
        }
    }

    /// Read the bit at `index`.
    ///
    /// # Errors
    /// Returns `BitIoError::IndexOutOfRange` if `index >= len`.
    pub fn get(&self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        Ok(self.read(index))
    }

    /// Overwrite the bit at `index`.
    ///
    /// # Errors
    /// Returns `BitIoError::IndexOutOfRange` if `index >= len`.
    pub fn set(&mut self, index: usize, bit: bool) -> Result<()> {
        self.check_index(index)?;
        self.write(index, bit);
        Ok(())
    }

    /// Number of meaningful bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no bits have been pushed.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Unused low-order bits in the last materialized byte (0-7).
    pub fn free_bits(&self) -> u8 {
        ((8 - self.len % 8) % 8) as u8
    }

    /// Materialize the bits as bytes, zero-padding the final partial byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Consume the buffer and return its materialized bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.storage.truncate(self.len.div_ceil(8));
        self.storage
    }

    /// Reset to empty.
    pub fn clear(&mut self) {
        self.storage.clear();
        self.len = 0;
    }

    /// Iterate over the meaningful bits in order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |index| self.read(index))
    }

    /// Sequential reader bounded by this buffer's length.
    pub fn reader(&self) -> BitReader<'_> {
        BitReader {
            data: self.as_bytes(),
            bit_position: 0,
            bit_limit: self.len,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        &self.storage[..self.len.div_ceil(8)]
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.len {
            return Err(BitIoError::IndexOutOfRange {
                index,
                len: self.len,
            }
            .into());
        }
        Ok(())
    }

    fn read(&self, index: usize) -> bool {
        (self.storage[index / 8] >> (7 - index % 8)) & 1 == 1
    }

    fn write(&mut self, index: usize, bit: bool) {
        let mask = 1u8 << (7 - index % 8);
        if bit {
            self.storage[index / 8] |= mask;
        } else {
            self.storage[index / 8] &= !mask;
        }
    }
}

impl PartialEq for BitBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.as_bytes() == other.as_bytes()
    }
}

impl Eq for BitBuffer {}

impl std::fmt::Debug for BitBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits: String = self.iter().map(|bit| if bit { '1' } else { '0' }).collect();
        write!(f, "BitBuffer({bits})")
    }
}

impl FromIterator<bool> for BitBuffer {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        let mut buffer = BitBuffer::new();
        for bit in iter {
            buffer.push_bit(bit);
        }
        buffer
    }
}

/// Authoritative bit count of `bytes` with `free_bits` unused low bits at the end.
pub(crate) fn bit_len_of(bytes: &[u8], free_bits: u8) -> Result<usize> {
    if free_bits > 7 {
        return Err(ArgumentError::InvalidFreeBits(free_bits).into());
    }
    if bytes.is_empty() && free_bits != 0 {
        return Err(ArgumentError::FreeBitsWithoutData(free_bits).into());
    }
    Ok(bytes.len() * 8 - free_bits as usize)
}

/// Reads bits MSB-first from a byte slice.
///
/// # Invariants
/// - `bit_position <= bit_limit <= data.len() * 8`
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// Source data
    data: &'a [u8],
    /// Current bit position (0 = MSB of first byte)
    bit_position: usize,
    /// Number of readable bits; trailing padding lies beyond it
    bit_limit: usize,
}

impl<'a> BitReader<'a> {
    /// Create a reader over every bit of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            bit_position: 0,
            bit_limit: data.len() * 8,
        }
    }

    /// Create a reader that stops after `bit_len` bits.
    ///
    /// # Errors
    /// Returns `BitIoError::IndexOutOfRange` if `bit_len` exceeds the bits in `data`.
    pub fn with_bit_len(data: &'a [u8], bit_len: usize) -> Result<Self> {
        let available = data.len() * 8;
        if bit_len > available {
            return Err(BitIoError::IndexOutOfRange {
                index: bit_len,
                len: available,
            }
            .into());
        }
        Ok(Self {
            data,
            bit_position: 0,
            bit_limit: bit_len,
        })
    }

    /// Read up to 64 bits, MSB-first.
    ///
    /// # Errors
    /// - `BitIoError::InvalidBitCount` if count > 64
    /// - `BitIoError::UnexpectedEof` if fewer than `count` bits remain
    pub fn read_bits(&mut self, count: usize) -> Result<u64> {
        if count > 64 {
            return Err(BitIoError::InvalidBitCount(count).into());
        }
        if count > self.bits_remaining() {
            return Err(BitIoError::UnexpectedEof.into());
        }

        let mut result = 0u64;
        let mut remaining = count;

        while remaining > 0 {
            let byte_idx = self.bit_position / 8;
            let bit_offset = self.bit_position % 8;

            let bits_in_byte = 8 - bit_offset;
            let bits_to_read = remaining.min(bits_in_byte);

            let byte = self.data[byte_idx];
            let mask = ((1u16 << bits_to_read) - 1) as u8;
            let bits = (byte >> (bits_in_byte - bits_to_read)) & mask;

            result = (result << bits_to_read) | bits as u64;

            self.bit_position += bits_to_read;
            remaining -= bits_to_read;
        }

        Ok(result)
    }

    /// Read a single bit.
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Read eight bits as a byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    /// Number of bits left before the limit.
    pub fn bits_remaining(&self) -> usize {
        self.bit_limit - self.bit_position
    }

    /// Current bit position.
    pub fn position(&self) -> usize {
        self.bit_position
    }

    /// Check if every readable bit has been consumed.
    pub fn is_empty(&self) -> bool {
        self.bit_position >= self.bit_limit
    }
}
