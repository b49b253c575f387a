//! Encoding raw bytes into artifacts and back.
//!
//! # Artifact
//!
//! An artifact carries everything needed to decode: the serialized tree, the
//! packed payload, and the number of padding bits at the end of the payload.
//! `payload.len() * 8 - free_bits` is the exact number of payload bits;
//! decoding stops there, never at the end of the byte buffer.

use tracing::{debug, trace};

use crate::bitio::{bit_len_of, BitBuffer, BitReader};
use crate::error::{ArgumentError, FormatError, Result};
use crate::huffman::serializer;
use crate::huffman::tree::{CodeTable, FrequencyTable, Node, Tree, TreeBuilder};

/// Complete output of one encode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Pre-order serialized tree (empty for empty input)
    pub serialized_tree: BitBuffer,

    /// Packed payload bits, MSB-first
    pub payload: Vec<u8>,

    /// Unused low-order bits in the last payload byte (0-7)
    pub free_bits: u8,
}

impl Artifact {
    /// Assemble an artifact, validating the free-bit count.
    ///
    /// # Errors
    /// - `ArgumentError::InvalidFreeBits` if `free_bits > 7`
    /// - `ArgumentError::FreeBitsWithoutData` if the payload is empty but
    ///   `free_bits` is not zero
    pub fn new(serialized_tree: BitBuffer, payload: Vec<u8>, free_bits: u8) -> Result<Self> {
        bit_len_of(&payload, free_bits)?;
        Ok(Self {
            serialized_tree,
            payload,
            free_bits,
        })
    }

    /// Number of meaningful payload bits.
    pub fn payload_bit_len(&self) -> Result<usize> {
        bit_len_of(&self.payload, self.free_bits)
    }
}

/// Turns raw bytes into artifacts.
///
/// An encoder may be reused across inputs. Its code cache is keyed by byte
/// value only, so it is emptied at the start of every call; codes from one
/// tree never leak into the next.
#[derive(Debug, Default)]
pub struct Encoder {
    codes: CodeTable,
}

impl Encoder {
    /// Encoder with an empty code cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `input` with a tree built from its own frequencies.
    pub fn encode(&mut self, input: &[u8]) -> Result<Artifact> {
        let frequencies = FrequencyTable::from_bytes(input);
        match TreeBuilder::build(&frequencies) {
            Some(tree) => {
                debug!(
                    input_bytes = frequencies.total(),
                    distinct = frequencies.distinct(),
                    height = tree.height(),
                    "built merge tree"
                );
                self.encode_with_tree(input, &tree)
            }
            None => {
                self.codes.clear();
                debug!("empty input, no tree built");
                Artifact::new(BitBuffer::new(), Vec::new(), 0)
            }
        }
    }

    /// Encode `input` with an externally supplied tree.
    ///
    /// # Errors
    /// - `ArgumentError::DuplicateLeaf` if `tree` holds a byte in two leaves
    /// - `ArgumentError::MissingCode` if `tree` has no leaf for some input byte
    ///
    /// Nothing is emitted in either case.
    pub fn encode_with_tree(&mut self, input: &[u8], tree: &Tree) -> Result<Artifact> {
        self.codes.clear();
        tree.validate()?;

        let mut payload = BitBuffer::with_capacity(input.len());
        for &byte in input {
            let code = self.codes.get_or_try_insert_with(byte, || {
                tree.code(byte).ok_or(ArgumentError::MissingCode(byte))
            })?;
            payload.extend_from_bit_buffer(code);
        }

        let serialized_tree = serializer::serialize(tree);
        let free_bits = payload.free_bits();
        trace!(
            tree_bits = serialized_tree.len(),
            payload_bits = payload.len(),
            free_bits,
            "encoded payload"
        );
        Artifact::new(serialized_tree, payload.into_bytes(), free_bits)
    }
}

/// Encode `input` with a fresh encoder.
pub fn encode(input: &[u8]) -> Result<Artifact> {
    Encoder::new().encode(input)
}

/// Decode an artifact back into the original bytes.
///
/// # Errors
/// - `ArgumentError` if the free-bit count is out of range
/// - `FormatError::MissingTree` if there are payload bits but no tree
/// - `FormatError::IncompleteCode` if the payload ends mid-code
/// - `FormatError::InvalidCode` if a single-leaf tree meets a `1` bit
/// - any tree deserialization error
pub fn decode(artifact: &Artifact) -> Result<Vec<u8>> {
    let payload_bits = artifact.payload_bit_len()?;
    if payload_bits == 0 {
        return Ok(Vec::new());
    }

    let tree = serializer::deserialize(&artifact.serialized_tree)?
        .ok_or(FormatError::MissingTree { payload_bits })?;
    let mut reader = BitReader::with_bit_len(&artifact.payload, payload_bits)?;

    let output = match tree.root() {
        Node::Leaf(byte) => decode_single_symbol(*byte, &mut reader)?,
        root => decode_walk(root, &mut reader)?,
    };
    debug!(payload_bits, output_bytes = output.len(), "decoded payload");
    Ok(output)
}

fn decode_single_symbol(byte: u8, reader: &mut BitReader<'_>) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(reader.bits_remaining());
    while !reader.is_empty() {
        let position = reader.position();
        if reader.read_bit()? {
            return Err(FormatError::InvalidCode { position }.into());
        }
        output.push(byte);
    }
    Ok(output)
}

fn decode_walk(root: &Node, reader: &mut BitReader<'_>) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(reader.bits_remaining() / 2);
    let mut current = root;

    while !reader.is_empty() {
        current = match current {
            Node::Internal { left, right } => {
                if reader.read_bit()? {
                    right.as_ref()
                } else {
                    left.as_ref()
                }
            }
            // The walk resets to the root on every leaf, and the root is internal.
            Node::Leaf(_) => root,
        };
        if let Node::Leaf(byte) = current {
            output.push(*byte);
            current = root;
        }
    }

    if !std::ptr::eq(current, root) {
        return Err(FormatError::IncompleteCode {
            position: reader.position(),
        }
        .into());
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_worked_example() {
        let artifact = encode(b"aaabbc").unwrap();

        // a=0, c=10, b=11: 0 0 0 11 11 10
        assert_eq!(artifact.payload, vec![0b0001_1111, 0b0000_0000]);
        assert_eq!(artifact.free_bits, 7);
        assert_eq!(artifact.payload_bit_len().unwrap(), 9);
        assert_eq!(decode(&artifact).unwrap(), b"aaabbc");
    }

    #[test]
    fn test_empty_input() {
        let artifact = encode(b"").unwrap();
        assert!(artifact.serialized_tree.is_empty());
        assert!(artifact.payload.is_empty());
        assert_eq!(artifact.free_bits, 0);
        assert!(decode(&artifact).unwrap().is_empty());
    }

    #[test]
    fn test_empty_payload_ignores_tree() {
        let artifact = Artifact::new(
            std::iter::repeat(false).take(3).collect(),
            Vec::new(),
            0,
        )
        .unwrap();
        assert!(decode(&artifact).unwrap().is_empty());
    }

    #[test]
    fn test_single_symbol_uses_one_bit() {
        let input = vec![0x7Au8; 13];
        let artifact = encode(&input).unwrap();

        assert_eq!(artifact.payload_bit_len().unwrap(), 13);
        assert_eq!(artifact.payload, vec![0, 0]);
        assert_eq!(artifact.free_bits, 3);
        assert_eq!(decode(&artifact).unwrap(), input);
    }

    #[test]
    fn test_single_symbol_rejects_one_bit() {
        let mut artifact = encode(b"zzzz").unwrap();
        artifact.payload[0] |= 0b0010_0000;
        assert!(matches!(
            decode(&artifact),
            Err(Error::Format(FormatError::InvalidCode { position: 2 }))
        ));
    }

    #[test]
    fn test_payload_without_tree() {
        let artifact = Artifact::new(BitBuffer::new(), vec![0xAA], 0).unwrap();
        assert!(matches!(
            decode(&artifact),
            Err(Error::Format(FormatError::MissingTree { payload_bits: 8 }))
        ));
    }

    #[test]
    fn test_ends_mid_code() {
        let mut artifact = encode(b"aaabbc").unwrap();
        // Drop the final bit of c's code "10": the walk stops inside the tree.
        artifact.free_bits = 0;
        artifact.payload = vec![0b0001_1111];
        assert!(matches!(
            decode(&artifact),
            Err(Error::Format(FormatError::IncompleteCode { position: 8 }))
        ));
    }

    #[test]
    fn test_artifact_rejects_bad_free_bits() {
        assert!(matches!(
            Artifact::new(BitBuffer::new(), vec![0], 8),
            Err(Error::Argument(ArgumentError::InvalidFreeBits(8)))
        ));

        let mut artifact = encode(b"abc").unwrap();
        artifact.free_bits = 9;
        assert!(matches!(
            decode(&artifact),
            Err(Error::Argument(ArgumentError::InvalidFreeBits(9)))
        ));
    }

    #[test]
    fn test_supplied_tree_missing_code() {
        let tree = TreeBuilder::build(&FrequencyTable::from_bytes(b"ab")).unwrap();
        let mut encoder = Encoder::new();
        assert!(matches!(
            encoder.encode_with_tree(b"abc", &tree),
            Err(Error::Argument(ArgumentError::MissingCode(b'c')))
        ));
    }

    #[test]
    fn test_supplied_tree_with_repeated_leaf() {
        let tree = Tree::new(Node::internal(Node::Leaf(b'a'), Node::Leaf(b'a')));
        let mut encoder = Encoder::new();
        assert!(matches!(
            encoder.encode_with_tree(b"aaaa", &tree),
            Err(Error::Argument(ArgumentError::DuplicateLeaf(b'a')))
        ));

        // The encoder stays usable and its cache holds nothing from the bad tree.
        assert!(encoder.codes.is_empty());
        let artifact = encoder.encode(b"aaaa").unwrap();
        assert_eq!(decode(&artifact).unwrap(), b"aaaa");
    }

    #[test]
    fn test_supplied_tree_round_trip() {
        let tree = TreeBuilder::build(&FrequencyTable::from_bytes(b"abcdef")).unwrap();
        let artifact = Encoder::new().encode_with_tree(b"fedcba", &tree).unwrap();
        assert_eq!(artifact.serialized_tree, serializer::serialize(&tree));
        assert_eq!(decode(&artifact).unwrap(), b"fedcba");
    }

    #[test]
    fn test_reused_encoder_does_not_use_stale_codes() {
        let mut encoder = Encoder::new();

        // 'a' is the one-bit code here...
        let first = encoder.encode(b"aaaaaaab").unwrap();
        // ...and a long code here, where it is the rarest byte.
        let second = encoder.encode(b"bbbbccccddda").unwrap();

        assert_eq!(decode(&first).unwrap(), b"aaaaaaab");
        assert_eq!(decode(&second).unwrap(), b"bbbbccccddda");
        assert_eq!(second, encode(b"bbbbccccddda").unwrap());
    }

    #[test]
    fn test_deterministic_output() {
        let input = b"the quick brown fox jumps over the lazy dog";
        assert_eq!(encode(input).unwrap(), encode(input).unwrap());
    }
}
