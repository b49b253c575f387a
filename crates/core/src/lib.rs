//! archiver-core: lossless byte compression with Huffman coding
//!
//! The compressed artifact is self-describing: the merge tree is serialized
//! next to the payload, so decoding needs no external dictionary.
//!
//! # Architecture
//!
//! Modules, leaves first:
//! - `bitio`: bit-addressable buffer and sequential bit reader
//! - `huffman`: merge tree, tree serialization, encoder and decoder
//! - `rle`: optional run-length pre-pass
//! - `framing`: fixed on-disk layout and the compress/extract pipeline
//! - `metrics`: per-run statistics
//!
//! # Example
//!
//! ```
//! use archiver_core::framing::{compress_and_frame, parse_and_decompress, ArchiveOptions};
//!
//! let options = ArchiveOptions { run_length: true };
//! let (archive, _) = compress_and_frame(b"aaaaabbbcc", options).unwrap();
//! let (raw, _) = parse_and_decompress(&archive, options).unwrap();
//! assert_eq!(raw, b"aaaaabbbcc");
//! ```

pub mod bitio;
pub mod error;
pub mod framing;
pub mod huffman;
pub mod metrics;
pub mod rle;

// Re-export commonly used types
pub use error::{Error, Result};
pub use framing::ArchiveOptions;
pub use huffman::{decode, encode, Artifact, Encoder};
