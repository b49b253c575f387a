//! Artifact framing and the compress/extract pipeline.
//!
//! # Frame Format
//!
//! ```text
//! +------------------------+
//! | tree_len (4)           |  i32 little-endian, bytes of serialized tree
//! +------------------------+
//! | tree_free_bits (1)     |  unused low bits in the last tree byte
//! +------------------------+
//! | tree                   |  tree_len bytes
//! | (variable)             |
//! +------------------------+
//! | payload_len (4)        |  i32 little-endian
//! +------------------------+
//! | payload                |  payload_len bytes of packed codes
//! | (variable)             |
//! +------------------------+
//! | payload_free_bits (1)  |  unused low bits in the last payload byte
//! +------------------------+
//! ```
//!
//! The layout carries no magic number, version, or checksum, and no record
//! of whether the run-length pre-pass was applied. Extraction must be told
//! the same `ArchiveOptions` that were used for compression.

use std::io::{Read, Write};

use tracing::{debug, trace};

use crate::bitio::BitBuffer;
use crate::error::{FramingError, Result};
use crate::huffman::serializer::MAX_SERIALIZED_BYTES;
use crate::huffman::{self, Artifact};
use crate::metrics::{CompressionStats, Direction};
use crate::rle;

/// Size of a frame with an empty tree and payload.
pub const EMPTY_FRAME_SIZE: usize = 4 + 1 + 4 + 1;

/// Writes frame primitives to a byte sink.
pub struct FrameWriter<W> {
    inner: W,
    written: usize,
}

impl<W: Write> FrameWriter<W> {
    /// Wrap a byte sink.
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Write a little-endian 32-bit signed integer.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_raw(&value.to_le_bytes())
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_raw(&[value])
    }

    /// Write `bytes` as-is.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len();
        Ok(())
    }

    /// Write a byte length as an i32 field.
    ///
    /// # Errors
    /// Returns `FramingError::InvalidLength` if `len` does not fit in an i32.
    pub fn write_len(&mut self, field: &'static str, len: usize) -> Result<()> {
        let value = i32::try_from(len).map_err(|_| FramingError::InvalidLength {
            field,
            value: len as i64,
        })?;
        self.write_i32(value)
    }

    /// Bytes written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Unwrap the sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads frame primitives from a byte source.
pub struct FrameReader<R> {
    inner: R,
    consumed: usize,
}

impl<R: Read> FrameReader<R> {
    /// Wrap a byte source.
    pub fn new(inner: R) -> Self {
        Self { inner, consumed: 0 }
    }

    /// Read a little-endian 32-bit signed integer.
    pub fn read_i32(&mut self) -> Result<i32> {
        let mut bytes = [0u8; 4];
        self.fill(&mut bytes)?;
        Ok(i32::from_le_bytes(bytes))
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.fill(&mut byte)?;
        Ok(byte[0])
    }

    /// Read exactly `len` bytes.
    ///
    /// Memory grows with the bytes actually received, so a corrupt length
    /// field cannot force a huge allocation up front.
    ///
    /// # Errors
    /// Returns `FramingError::ShortRead` if the source ends early.
    pub fn read_raw(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let received = (&mut self.inner).take(len as u64).read_to_end(&mut bytes)?;
        self.consumed += received;
        if received < len {
            return Err(FramingError::ShortRead {
                requested: len,
                received,
            }
            .into());
        }
        Ok(bytes)
    }

    /// Read an i32 length field.
    ///
    /// # Errors
    /// Returns `FramingError::InvalidLength` if the value is negative or above `max`.
    pub fn read_len(&mut self, field: &'static str, max: usize) -> Result<usize> {
        let value = self.read_i32()?;
        match usize::try_from(value) {
            Ok(len) if len <= max => Ok(len),
            _ => Err(FramingError::InvalidLength {
                field,
                value: value as i64,
            }
            .into()),
        }
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Unwrap the source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut received = 0;
        while received < buf.len() {
            match self.inner.read(&mut buf[received..]) {
                Ok(0) => {
                    self.consumed += received;
                    return Err(FramingError::ShortRead {
                        requested: buf.len(),
                        received,
                    }
                    .into());
                }
                Ok(n) => received += n,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
        self.consumed += received;
        Ok(())
    }
}

/// Write `artifact` in the frame layout.
pub fn write_artifact<W: Write>(writer: &mut FrameWriter<W>, artifact: &Artifact) -> Result<()> {
    let tree = artifact.serialized_tree.to_bytes();
    writer.write_len("tree", tree.len())?;
    writer.write_u8(artifact.serialized_tree.free_bits())?;
    writer.write_raw(&tree)?;

    writer.write_len("payload", artifact.payload.len())?;
    writer.write_raw(&artifact.payload)?;
    writer.write_u8(artifact.free_bits)?;
    Ok(())
}

/// Read one artifact in the frame layout.
///
/// # Errors
/// - `FramingError::ShortRead` if the source ends mid-frame
/// - `FramingError::InvalidLength` for negative lengths or a tree longer than
///   any serialized tree can be
/// - `ArgumentError` for free-bit bytes outside 0-7
pub fn read_artifact<R: Read>(reader: &mut FrameReader<R>) -> Result<Artifact> {
    let tree_len = reader.read_len("tree", MAX_SERIALIZED_BYTES)?;
    let tree_free_bits = reader.read_u8()?;
    let tree = reader.read_raw(tree_len)?;
    let serialized_tree = BitBuffer::from_bytes(&tree, tree_free_bits)?;

    let payload_len = reader.read_len("payload", i32::MAX as usize)?;
    let payload = reader.read_raw(payload_len)?;
    let free_bits = reader.read_u8()?;

    trace!(tree_len, payload_len, free_bits, "read artifact frame");
    Artifact::new(serialized_tree, payload, free_bits)
}

/// Serialize `artifact` into a new byte vector.
pub fn serialize_artifact(artifact: &Artifact) -> Result<Vec<u8>> {
    let capacity = EMPTY_FRAME_SIZE
        + artifact.serialized_tree.len().div_ceil(8)
        + artifact.payload.len();
    let mut writer = FrameWriter::new(Vec::with_capacity(capacity));
    write_artifact(&mut writer, artifact)?;
    Ok(writer.into_inner())
}

/// Parse exactly one artifact from `bytes`.
///
/// # Errors
/// Everything `read_artifact` reports, plus `FramingError::TrailingBytes`
/// if bytes remain after the frame.
pub fn parse_artifact(bytes: &[u8]) -> Result<Artifact> {
    let mut reader = FrameReader::new(bytes);
    let artifact = read_artifact(&mut reader)?;

    let trailing = bytes.len() - reader.consumed();
    if trailing > 0 {
        return Err(FramingError::TrailingBytes(trailing).into());
    }
    Ok(artifact)
}

/// Pipeline options shared by compression and extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Apply the run-length pre-pass before Huffman coding
    pub run_length: bool,
}

/// Compress raw data into a framed artifact.
///
/// # Returns
/// The framed bytes and the run's statistics.
pub fn compress_and_frame(
    raw_data: &[u8],
    options: ArchiveOptions,
) -> Result<(Vec<u8>, CompressionStats)> {
    let mut stats = CompressionStats::new(Direction::Compress);
    stats.record_raw(raw_data);

    let run_length;
    let codec_input = if options.run_length {
        run_length = rle::encode(raw_data);
        stats.run_length_bytes = Some(run_length.len() as u64);
        debug!(
            raw_bytes = raw_data.len(),
            run_length_bytes = run_length.len(),
            "applied run-length pre-pass"
        );
        &run_length[..]
    } else {
        raw_data
    };

    let artifact = huffman::encode(codec_input)?;
    stats.tree_bits = artifact.serialized_tree.len() as u64;
    stats.payload_bits = artifact.payload_bit_len()? as u64;

    let framed = serialize_artifact(&artifact)?;
    stats.archive_bytes = framed.len() as u64;
    stats.complete();
    Ok((framed, stats))
}

/// Parse a framed artifact and recover the raw data.
///
/// # Returns
/// The raw bytes and the run's statistics.
pub fn parse_and_decompress(
    bytes: &[u8],
    options: ArchiveOptions,
) -> Result<(Vec<u8>, CompressionStats)> {
    let mut stats = CompressionStats::new(Direction::Extract);
    stats.archive_bytes = bytes.len() as u64;

    let artifact = parse_artifact(bytes)?;
    stats.tree_bits = artifact.serialized_tree.len() as u64;
    stats.payload_bits = artifact.payload_bit_len()? as u64;

    let decoded = huffman::decode(&artifact)?;
    let raw = if options.run_length {
        stats.run_length_bytes = Some(decoded.len() as u64);
        rle::decode(&decoded)?
    } else {
        decoded
    };

    stats.record_raw(&raw);
    stats.complete();
    Ok((raw, stats))
}
