//! Error types for the archiver.
//!
//! All operations return structured errors rather than panicking. Every error
//! is raised where it is detected and handed to the immediate caller; nothing
//! in the library retries or repairs.

use thiserror::Error;

/// Top-level error type for all operations in the archiver.
///
/// Each variant corresponds to a specific failure domain:
/// - Bit I/O: index or read position outside a bit buffer
/// - Format: a serialized tree, payload or run-length stream is malformed
/// - Argument: a caller supplied a value the operation cannot accept
/// - Framing: the byte source ended before the artifact was complete
/// - I/O: the underlying reader or writer failed
#[derive(Debug, Error)]
pub enum Error {
    /// Bit I/O operation failed (e.g., index past the end of a buffer)
    #[error("bit I/O error: {0}")]
    BitIo(#[from] BitIoError),

    /// Malformed serialized data
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// Invalid argument supplied by the caller
    #[error("invalid argument: {0}")]
    Argument(#[from] ArgumentError),

    /// Artifact framing error (short read, bad length field)
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Reader or writer error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bit-level I/O errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BitIoError {
    /// Bit index outside `[0, len)`
    #[error("bit index {index} out of range for buffer of {len} bits")]
    IndexOutOfRange { index: usize, len: usize },

    /// Attempted to read past the end of the bit stream
    #[error("unexpected end of bit stream")]
    UnexpectedEof,

    /// Invalid bit count (more than 64 bits in one read)
    #[error("invalid bit count: {0}")]
    InvalidBitCount(usize),
}

/// Errors for data that cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// Serialized tree ended before the root was complete
    #[error("serialized tree truncated at bit {position}")]
    TruncatedTree { position: usize },

    /// Bits left over after the root was complete
    #[error("serialized tree has {remaining} trailing bits")]
    TrailingTreeBits { remaining: usize },

    /// The same byte value appears in two leaves
    #[error("byte {0:#04x} appears in more than one leaf")]
    DuplicateSymbol(u8),

    /// Tree deeper than any 256-symbol merge tree can be
    #[error("serialized tree exceeds maximum depth {max}")]
    TreeTooDeep { max: usize },

    /// Payload bits present but no tree to decode them with
    #[error("payload has {payload_bits} bits but no tree")]
    MissingTree { payload_bits: usize },

    /// Payload ended in the middle of a code
    #[error("payload ended mid-code at bit {position}")]
    IncompleteCode { position: usize },

    /// Bit that does not lead to any leaf
    #[error("invalid code bit at position {position}")]
    InvalidCode { position: usize },

    /// Run-length stream is not a sequence of (count, value) pairs
    #[error("run-length stream has odd length {0}")]
    RunLengthOddLength(usize),

    /// Run-length pair with a zero count
    #[error("run-length pair at offset {offset} has zero count")]
    RunLengthZeroCount { offset: usize },
}

/// Errors for caller-supplied values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    /// Free-bit counts must be 0-7
    #[error("free bit count {0} out of range 0..=7")]
    InvalidFreeBits(u8),

    /// Non-zero free bits on an empty byte sequence
    #[error("free bit count {0} given for an empty byte sequence")]
    FreeBitsWithoutData(u8),

    /// The supplied tree has no code for this byte
    #[error("no code for byte {0:#04x} in the supplied tree")]
    MissingCode(u8),

    /// The supplied tree holds this byte in more than one leaf
    #[error("byte {0:#04x} appears in more than one leaf of the supplied tree")]
    DuplicateLeaf(u8),
}

/// Artifact framing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// Byte source returned fewer bytes than requested
    #[error("short read: requested {requested} bytes, received {received}")]
    ShortRead { requested: usize, received: usize },

    /// Length field is negative, too large, or not representable
    #[error("invalid {field} length: {value}")]
    InvalidLength { field: &'static str, value: i64 },

    /// Bytes left after the final frame field
    #[error("{0} trailing bytes after artifact")]
    TrailingBytes(usize),
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
