//! Huffman codec.
//!
//! - `tree`: frequency counting, merge-tree construction, code lookup
//! - `serializer`: pre-order tree (de)serialization embedded in artifacts
//! - `codec`: `Encoder`, `decode`, and the `Artifact` they exchange

pub mod codec;
pub mod serializer;
pub mod tree;

pub use codec::{decode, encode, Artifact, Encoder};
pub use tree::{CodeTable, FrequencyTable, Node, Tree, TreeBuilder};
