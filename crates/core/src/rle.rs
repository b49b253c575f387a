//! Run-length pre-pass.
//!
//! Input is rewritten as `(count, value)` byte pairs with `count` in 1-255;
//! longer runs are split across several pairs. The Huffman stage treats the
//! result as opaque bytes.

use crate::error::{FormatError, Result};

const MAX_RUN: usize = u8::MAX as usize;

/// Collapse runs of equal bytes into `(count, value)` pairs.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len().min(1 << 16));
    let mut rest = data;

    while let Some(&value) = rest.first() {
        let run = rest
            .iter()
            .take(MAX_RUN)
            .take_while(|&&byte| byte == value)
            .count();
        out.push(run as u8);
        out.push(value);
        rest = &rest[run..];
    }
    out
}

/// Expand `(count, value)` pairs.
///
/// # Errors
/// - `FormatError::RunLengthOddLength` if the stream is not made of pairs
/// - `FormatError::RunLengthZeroCount` if a pair has a zero count
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % 2 != 0 {
        return Err(FormatError::RunLengthOddLength(data.len()).into());
    }

    let mut out = Vec::with_capacity(data.len());
    for (index, pair) in data.chunks_exact(2).enumerate() {
        let (count, value) = (pair[0], pair[1]);
        if count == 0 {
            return Err(FormatError::RunLengthZeroCount { offset: index * 2 }.into());
        }
        out.extend(std::iter::repeat(value).take(count as usize));
    }
    Ok(out)
}
